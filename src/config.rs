//! Service configuration.
//!
//! Resolution order: built-in defaults, then a YAML file, then environment variables. The
//! extraction core never reads the environment itself; everything it needs is handed over
//! through [`Config`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use cdp_adapter::{detect_chrome_executable, CdpConfig};
use network_tap_light::config::InterceptConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CONFIG_PATH: &str = "config/statgrab.yaml";

pub const ENV_API_KEY: &str = "SCRAPER_API_KEY";
pub const ENV_PORT: &str = "PORT";
pub const ENV_CHROME: &str = "STATGRAB_CHROME";
pub const ENV_HEADLESS: &str = "STATGRAB_HEADLESS";
pub const ENV_NO_SANDBOX: &str = "STATGRAB_NO_SANDBOX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub render: RenderConfig,
    pub stealth: StealthConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Shared secret expected in `x-api-key`. Without one every scrape is refused.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_key: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub no_sandbox: bool,
    pub ws_url: Option<String>,
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            no_sandbox: true,
            ws_url: None,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub launch_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub marker_timeout_ms: u64,
    pub grace_delay_ms: u64,
    pub marker_selector: String,
    pub blocked_resource_types: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            launch_timeout_ms: 20_000,
            command_timeout_ms: 30_000,
            navigation_timeout_ms: 45_000,
            marker_timeout_ms: 15_000,
            grace_delay_ms: 1_500,
            marker_selector: perceiver_stats::MARKER_SELECTOR.to_string(),
            blocked_resource_types: InterceptConfig::default().blocked_resource_types,
        }
    }
}

impl RenderConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_millis(self.marker_timeout_ms)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    pub fn intercept_config(&self) -> InterceptConfig {
        InterceptConfig {
            blocked_resource_types: self.blocked_resource_types.clone(),
            ..InterceptConfig::default()
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StealthConfig {
    /// YAML or JSON profile bundle; the built-in desktop profile is used when absent.
    pub profile_path: Option<PathBuf>,
    pub profile: Option<String>,
}

impl Config {
    pub fn from_yaml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw, path)
    }

    /// Overlay environment variables. `lookup` is injected so tests need not touch the process env.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(secret) = lookup(ENV_API_KEY) {
            self.server.api_key = Some(secret);
        }
        if let Some(raw) = lookup(ENV_PORT) {
            self.server.port = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_PORT,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_CHROME) {
            self.browser.executable = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            self.browser.headless = parse_flag(ENV_HEADLESS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_NO_SANDBOX) {
            self.browser.no_sandbox = parse_flag(ENV_NO_SANDBOX, &raw)?;
        }
        Ok(())
    }

    /// Browser launch settings derived from the `browser` and `render` sections.
    pub fn cdp_config(&self) -> CdpConfig {
        CdpConfig {
            executable: self
                .browser
                .executable
                .clone()
                .or_else(detect_chrome_executable)
                .unwrap_or_default(),
            headless: self.browser.headless,
            no_sandbox: self.browser.no_sandbox,
            default_deadline_ms: self.render.command_timeout_ms,
            launch_timeout_ms: self.render.launch_timeout_ms,
            extra_args: self.browser.extra_args.clone(),
            websocket_url: self.browser.ws_url.clone(),
        }
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.server.api_key.is_some() {
            copy.server.api_key = Some("<redacted>".into());
        }
        copy
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key,
            value: raw.to_string(),
        }),
    }
}
