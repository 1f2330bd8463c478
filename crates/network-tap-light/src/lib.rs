//! Request interception for rendered pages.
//!
//! [`RequestPolicy`] decides, per paused request, whether the browser should fetch it at all.
//! [`RequestTap`] keeps per-page counters of those decisions so callers can log how much work
//! was skipped.

pub mod config;

use std::collections::HashSet;

use crate::config::InterceptConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

/// Identifier representing a page whose requests are being intercepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors emitted by the tap surface.
#[derive(Clone, Debug, Error)]
pub enum TapError {
    #[error("page not enabled")]
    PageNotEnabled,
    #[error("malformed paused request: {0}")]
    Malformed(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum InterceptDecision {
    Continue,
    Abort,
}

/// Request paused by the `Fetch` domain, awaiting a decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PausedRequest {
    pub request_id: String,
    pub url: String,
    pub resource_type: Option<String>,
}

impl PausedRequest {
    /// Decode the params of a `Fetch.requestPaused` event.
    pub fn from_params(params: &Value) -> Result<Self, TapError> {
        let request_id = params
            .get("requestId")
            .and_then(Value::as_str)
            .ok_or_else(|| TapError::Malformed("missing requestId".into()))?
            .to_string();
        let url = params
            .get("request")
            .and_then(|req| req.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let resource_type = params
            .get("resourceType")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self {
            request_id,
            url,
            resource_type,
        })
    }
}

/// Resource-type based abort policy.
#[derive(Clone, Debug)]
pub struct RequestPolicy {
    blocked: HashSet<String>,
    url_pattern: String,
}

impl RequestPolicy {
    pub fn from_config(config: &InterceptConfig) -> Self {
        Self {
            blocked: config
                .blocked_resource_types
                .iter()
                .map(|kind| kind.trim().to_ascii_lowercase())
                .filter(|kind| !kind.is_empty())
                .collect(),
            url_pattern: config.url_pattern.clone(),
        }
    }

    /// Requests without a resource type are always let through.
    pub fn decide(&self, resource_type: Option<&str>) -> InterceptDecision {
        match resource_type {
            Some(kind) if self.blocked.contains(&kind.to_ascii_lowercase()) => {
                InterceptDecision::Abort
            }
            _ => InterceptDecision::Continue,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn url_pattern(&self) -> &str {
        &self.url_pattern
    }
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self::from_config(&InterceptConfig::default())
    }
}

/// Cumulative interception counters for one page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptSnapshot {
    pub continued: u64,
    pub aborted: u64,
}

/// Applies a [`RequestPolicy`] and tracks decisions per page.
pub struct RequestTap {
    policy: RequestPolicy,
    pages: DashMap<PageId, Mutex<InterceptSnapshot>>,
}

impl RequestTap {
    pub fn new(policy: RequestPolicy) -> Self {
        Self {
            policy,
            pages: DashMap::new(),
        }
    }

    pub fn with_config(config: &InterceptConfig) -> Self {
        Self::new(RequestPolicy::from_config(config))
    }

    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    pub async fn enable(&self, page: PageId) -> Result<(), TapError> {
        self.pages
            .entry(page)
            .or_insert_with(|| Mutex::new(InterceptSnapshot::default()));
        Ok(())
    }

    pub async fn disable(&self, page: PageId) -> Result<(), TapError> {
        if self.forget(page) {
            Ok(())
        } else {
            Err(TapError::PageNotEnabled)
        }
    }

    /// Drop the counters for `page` without waiting. Returns whether the page was enabled.
    pub fn forget(&self, page: PageId) -> bool {
        self.pages.remove(&page).is_some()
    }

    /// Decide on a paused request and count the decision against `page`.
    pub async fn ingest(
        &self,
        page: PageId,
        request: &PausedRequest,
    ) -> Result<InterceptDecision, TapError> {
        let decision = self.policy.decide(request.resource_type.as_deref());
        let entry = self.pages.get(&page).ok_or(TapError::PageNotEnabled)?;
        let mut counters = entry.value().lock().await;
        match decision {
            InterceptDecision::Continue => counters.continued += 1,
            InterceptDecision::Abort => counters.aborted += 1,
        }
        trace!(
            target: "network-tap",
            url = %request.url,
            resource_type = request.resource_type.as_deref().unwrap_or("-"),
            ?decision,
            "request intercepted"
        );
        Ok(decision)
    }

    pub async fn current_snapshot(&self, page: PageId) -> Option<InterceptSnapshot> {
        let entry = self.pages.get(&page)?;
        let snapshot = entry.value().lock().await.clone();
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_policy_blocks_heavy_assets() {
        let policy = RequestPolicy::default();
        assert_eq!(policy.decide(Some("Image")), InterceptDecision::Abort);
        assert_eq!(policy.decide(Some("font")), InterceptDecision::Abort);
        assert_eq!(policy.decide(Some("Media")), InterceptDecision::Abort);
        assert_eq!(policy.decide(Some("Document")), InterceptDecision::Continue);
        assert_eq!(policy.decide(Some("Script")), InterceptDecision::Continue);
        assert_eq!(policy.decide(Some("XHR")), InterceptDecision::Continue);
        assert_eq!(policy.decide(None), InterceptDecision::Continue);
    }

    #[test]
    fn empty_block_list_is_passthrough() {
        let policy = RequestPolicy::from_config(&InterceptConfig {
            blocked_resource_types: vec!["  ".into()],
            url_pattern: "*".into(),
        });
        assert!(policy.is_passthrough());
        assert_eq!(policy.decide(Some("Image")), InterceptDecision::Continue);
    }

    #[test]
    fn decodes_paused_request() {
        let paused = PausedRequest::from_params(&json!({
            "requestId": "interception-job-1.0",
            "request": { "url": "https://cdn.example/avatar.png", "method": "GET" },
            "resourceType": "Image",
            "frameId": "F1"
        }))
        .unwrap();
        assert_eq!(paused.request_id, "interception-job-1.0");
        assert_eq!(paused.url, "https://cdn.example/avatar.png");
        assert_eq!(paused.resource_type.as_deref(), Some("Image"));

        let err = PausedRequest::from_params(&json!({ "request": {} })).unwrap_err();
        assert!(matches!(err, TapError::Malformed(_)));
    }
}
