//! Configuration types for request interception.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterceptConfig {
    /// CDP `Network.ResourceType` names to abort, compared case-insensitively.
    #[serde(default = "InterceptConfig::default_blocked")]
    pub blocked_resource_types: Vec<String>,
    /// `Fetch.enable` URL pattern.
    #[serde(default = "InterceptConfig::default_url_pattern")]
    pub url_pattern: String,
}

impl InterceptConfig {
    fn default_blocked() -> Vec<String> {
        vec!["Image".into(), "Font".into(), "Media".into()]
    }

    fn default_url_pattern() -> String {
        "*".into()
    }
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            blocked_resource_types: Self::default_blocked(),
            url_pattern: Self::default_url_pattern(),
        }
    }
}
