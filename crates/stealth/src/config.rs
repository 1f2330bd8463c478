//! Stealth profile definitions and bundle loading.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

pub const DEFAULT_PROFILE_NAME: &str = "desktop_chrome";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize profile bundle: {0}")]
    Deserialize(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StealthProfileBundle {
    pub profiles: Vec<StealthProfile>,
    /// Profile used when the caller does not name one.
    #[serde(default)]
    pub default_profile: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StealthProfile {
    pub name: String,
    pub user_agent: String,
    #[serde(default)]
    pub accept_language: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub evasions: Evasions,
}

impl Default for StealthProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            accept_language: Some("en-US,en;q=0.9".into()),
            platform: Some("Win32".into()),
            locale: Some("en-US".into()),
            timezone: None,
            viewport: Some(Viewport::default()),
            evasions: Evasions::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    #[serde(default)]
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
            mobile: false,
        }
    }
}

/// Which fingerprint patches to inject. Everything is on unless a bundle turns it off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Evasions {
    pub webdriver: bool,
    pub chrome_runtime: bool,
    pub plugins: bool,
    pub languages: bool,
    pub permissions: bool,
}

impl Default for Evasions {
    fn default() -> Self {
        Self {
            webdriver: true,
            chrome_runtime: true,
            plugins: true,
            languages: true,
            permissions: true,
        }
    }
}

impl Evasions {
    pub fn none() -> Self {
        Self {
            webdriver: false,
            chrome_runtime: false,
            plugins: false,
            languages: false,
            permissions: false,
        }
    }
}

pub fn load_bundle_from_reader<R: Read>(
    mut reader: R,
) -> Result<StealthProfileBundle, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_bundle_str(&buf)
}

pub fn load_bundle_from_path(path: impl AsRef<Path>) -> Result<StealthProfileBundle, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_bundle_from_reader(file)
}

pub fn parse_bundle_str(raw: &str) -> Result<StealthProfileBundle, ConfigError> {
    match serde_json::from_str(raw) {
        Ok(bundle) => Ok(bundle),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}
