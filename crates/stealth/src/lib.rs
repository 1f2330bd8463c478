//! Stealth fingerprint profiles for statgrab.
//!
//! A [`StealthRuntime`] holds the known profiles and one active selection. Before navigation the
//! renderer hands it a fresh [`PageSession`]; the runtime overrides the user agent, locale,
//! timezone and viewport, then registers the evasion scripts so they run ahead of page code.

pub mod config;
pub mod evasions;

use crate::config::{StealthProfile, StealthProfileBundle};
use async_trait::async_trait;
use cdp_adapter::{AdapterError, PageSession};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub use evasions::{evasion_scripts, navigator_languages};

/// Launch flag that stops Blink from advertising automation.
pub const AUTOMATION_CONTROLLED_ARG: &str = "--disable-blink-features=AutomationControlled";

#[derive(Clone, Debug, Error)]
pub enum StealthError {
    #[error("unknown stealth profile: {0}")]
    UnknownProfile(String),
    #[error("cdp I/O failure: {0}")]
    CdpIo(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait StealthControl: Send + Sync {
    /// Extra Chromium flags the profile needs at launch.
    fn launch_args(&self) -> Vec<String>;
    async fn configure_page(&self, page: &PageSession) -> Result<(), StealthError>;
}

/// In-memory profile catalog with one active profile.
pub struct StealthRuntime {
    profiles: RwLock<HashMap<String, StealthProfile>>,
    active: RwLock<StealthProfile>,
}

impl Default for StealthRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl StealthRuntime {
    /// Runtime with only the built-in desktop profile.
    pub fn new() -> Self {
        let profile = StealthProfile::default();
        let mut profiles = HashMap::new();
        profiles.insert(profile.name.clone(), profile.clone());
        Self {
            profiles: RwLock::new(profiles),
            active: RwLock::new(profile),
        }
    }

    /// Load `bundle` and activate `name`, falling back to the bundle default, then the
    /// first bundle profile.
    pub fn from_bundle(
        bundle: StealthProfileBundle,
        name: Option<&str>,
    ) -> Result<Self, StealthError> {
        let runtime = Self::new();
        let fallback = bundle
            .default_profile
            .clone()
            .or_else(|| bundle.profiles.first().map(|p| p.name.clone()));
        runtime.load_bundle(bundle);
        if let Some(name) = name.map(str::to_string).or(fallback) {
            runtime.select(&name)?;
        }
        Ok(runtime)
    }

    pub fn load_bundle(&self, bundle: StealthProfileBundle) {
        let mut profiles = self.profiles.write();
        for profile in bundle.profiles {
            profiles.insert(profile.name.clone(), profile);
        }
    }

    pub fn select(&self, name: &str) -> Result<(), StealthError> {
        let profile = self
            .profiles
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StealthError::UnknownProfile(name.to_string()))?;
        *self.active.write() = profile;
        Ok(())
    }

    pub fn active_profile(&self) -> StealthProfile {
        self.active.read().clone()
    }

    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.read().keys().cloned().collect();
        names.sort();
        names
    }

    async fn inject_profile(
        &self,
        page: &PageSession,
        profile: &StealthProfile,
    ) -> Result<(), StealthError> {
        if !profile.user_agent.is_empty() {
            page.set_user_agent(
                &profile.user_agent,
                profile.accept_language.as_deref(),
                profile.platform.as_deref(),
                profile.locale.as_deref(),
            )
            .await
            .map_err(map_adapter_error)?;
        }

        if let Some(timezone) = &profile.timezone {
            page.set_timezone(timezone)
                .await
                .map_err(map_adapter_error)?;
        }

        if let Some(viewport) = &profile.viewport {
            page.set_device_metrics(
                viewport.width,
                viewport.height,
                viewport.device_scale_factor,
                viewport.mobile,
            )
            .await
            .map_err(map_adapter_error)?;
        }

        for script in evasion_scripts(profile) {
            page.add_init_script(&script)
                .await
                .map_err(map_adapter_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl StealthControl for StealthRuntime {
    fn launch_args(&self) -> Vec<String> {
        vec![AUTOMATION_CONTROLLED_ARG.to_string()]
    }

    async fn configure_page(&self, page: &PageSession) -> Result<(), StealthError> {
        let profile = self.active_profile();
        self.inject_profile(page, &profile).await?;
        debug!(
            target: "stealth",
            profile = %profile.name,
            session = %page.session_id(),
            "stealth profile applied"
        );
        Ok(())
    }
}

fn map_adapter_error(err: AdapterError) -> StealthError {
    StealthError::CdpIo(err.to_string())
}
