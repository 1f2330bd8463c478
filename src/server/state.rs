use std::sync::Arc;

use crate::orchestrator::StatisticsSource;

#[derive(Clone)]
pub struct ServeState {
    pub(crate) source: Arc<dyn StatisticsSource>,
    api_key: Option<Arc<str>>,
}

impl ServeState {
    pub fn new(source: Arc<dyn StatisticsSource>, api_key: Option<String>) -> Self {
        Self {
            source,
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .map(Arc::from),
        }
    }

    /// True only when a secret is configured and `provided` equals it.
    pub(crate) fn accepts(&self, provided: Option<&str>) -> bool {
        match (self.api_key.as_deref(), provided) {
            (Some(expected), Some(provided)) => expected == provided,
            _ => false,
        }
    }

    pub fn auth_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}
