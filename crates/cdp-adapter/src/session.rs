//! A single attached page target.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{sleep, timeout as within, Instant};
use tracing::{debug, trace};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::metrics;
use crate::transport::{CdpTransport, CommandTarget, TransportEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Page target attached in flatten mode; every command is routed through its session id.
#[derive(Clone)]
pub struct PageSession {
    transport: Arc<dyn CdpTransport>,
    target_id: String,
    session_id: String,
}

impl std::fmt::Debug for PageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSession")
            .field("target_id", &self.target_id)
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl PageSession {
    /// Open a blank tab and attach to it.
    pub async fn create(transport: Arc<dyn CdpTransport>) -> Result<Self, AdapterError> {
        let created = send_browser(&transport, "Target.createTarget", json!({ "url": "about:blank" }))
            .await?;
        let target_id = created
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("createTarget missing targetId")
                    .with_data(created.clone())
            })?
            .to_string();

        let attached = send_browser(
            &transport,
            "Target.attachToTarget",
            json!({ "targetId": target_id, "flatten": true }),
        )
        .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("attachToTarget missing sessionId")
                    .with_data(attached.clone())
            })?
            .to_string();

        let session = Self {
            transport,
            target_id,
            session_id,
        };
        session.send("Page.enable", json!({})).await?;
        session.send("Runtime.enable", json!({})).await?;
        debug!(
            target: "cdp-session",
            target_id = %session.target_id,
            session_id = %session.session_id,
            "page session attached"
        );
        Ok(session)
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transport(&self) -> Arc<dyn CdpTransport> {
        self.transport.clone()
    }

    /// Whether `event` was emitted by this page.
    pub fn owns(&self, event: &TransportEvent) -> bool {
        event.session_id.as_deref() == Some(self.session_id.as_str())
    }

    pub async fn send(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        metrics::observe_command(
            method,
            self.transport.send_command(
                CommandTarget::Session(self.session_id.clone()),
                method,
                params,
            ),
        )
        .await
    }

    pub async fn set_user_agent(
        &self,
        user_agent: &str,
        accept_language: Option<&str>,
        platform: Option<&str>,
        locale: Option<&str>,
    ) -> Result<(), AdapterError> {
        let mut params = serde_json::Map::new();
        params.insert("userAgent".into(), Value::String(user_agent.to_string()));
        if let Some(lang) = accept_language {
            params.insert("acceptLanguage".into(), Value::String(lang.to_string()));
        }
        if let Some(platform) = platform {
            params.insert("platform".into(), Value::String(platform.to_string()));
        }
        self.send("Emulation.setUserAgentOverride", Value::Object(params))
            .await?;

        if let Some(locale) = locale {
            self.send("Emulation.setLocaleOverride", json!({ "locale": locale }))
                .await?;
        }
        Ok(())
    }

    pub async fn set_timezone(&self, timezone: &str) -> Result<(), AdapterError> {
        self.send(
            "Emulation.setTimezoneOverride",
            json!({ "timezoneId": timezone }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_device_metrics(
        &self,
        width: u32,
        height: u32,
        device_scale_factor: f64,
        mobile: bool,
    ) -> Result<(), AdapterError> {
        self.send(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": device_scale_factor,
                "mobile": mobile,
            }),
        )
        .await?;
        Ok(())
    }

    /// Register a script that runs before any page script in every new document.
    pub async fn add_init_script(&self, source: &str) -> Result<Option<String>, AdapterError> {
        let response = self
            .send(
                "Page.addScriptToEvaluateOnNewDocument",
                json!({ "source": source }),
            )
            .await?;
        Ok(response
            .get("identifier")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Pause every request matching `url_pattern` at the request stage.
    pub async fn enable_request_interception(&self, url_pattern: &str) -> Result<(), AdapterError> {
        self.send(
            "Fetch.enable",
            json!({
                "patterns": [{ "urlPattern": url_pattern, "requestStage": "Request" }],
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn continue_request(&self, request_id: &str) -> Result<(), AdapterError> {
        self.send("Fetch.continueRequest", json!({ "requestId": request_id }))
            .await?;
        Ok(())
    }

    pub async fn fail_request(&self, request_id: &str) -> Result<(), AdapterError> {
        self.send(
            "Fetch.failRequest",
            json!({ "requestId": request_id, "errorReason": "BlockedByClient" }),
        )
        .await?;
        Ok(())
    }

    /// Navigate and wait until the document is parsed, not until the network is idle.
    ///
    /// `timeout` bounds the whole step, including a `Runtime.evaluate` that stalls on a busy page.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError> {
        let deadline = deadline_after(timeout);
        let expired = || {
            AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!(
                    "document not ready within {}ms",
                    timeout.as_millis()
                ))
                .retriable(true)
        };

        let response = within(
            remaining(deadline),
            self.send("Page.navigate", json!({ "url": url })),
        )
        .await
        .map_err(|_| expired())??;
        if let Some(error_text) = response
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("navigation to {url} failed: {error_text}"))
                .retriable(true));
        }

        loop {
            let left = remaining(deadline);
            if left.is_zero() {
                return Err(expired());
            }

            let state = within(left, self.evaluate("document.readyState"))
                .await
                .map_err(|_| expired())??;
            let ready = state
                .as_str()
                .map(|state| matches!(state, "interactive" | "complete"))
                .unwrap_or(false);
            trace!(target: "cdp-session", ?state, "readyState polled");
            if ready {
                return Ok(());
            }

            sleep(POLL_INTERVAL.min(remaining(deadline))).await;
        }
    }

    /// Poll until `selector` matches an element, giving up once `timeout` has elapsed.
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AdapterError> {
        let deadline = deadline_after(timeout);
        let selector_literal = Value::String(selector.to_string()).to_string();
        let expression = format!("document.querySelector({selector_literal}) !== null");
        let expired = || {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!(
                    "selector {selector} did not appear within {}ms",
                    timeout.as_millis()
                ))
                .retriable(true)
        };

        loop {
            let left = remaining(deadline);
            if left.is_zero() {
                return Err(expired());
            }

            let found = within(left, self.evaluate(&expression))
                .await
                .map_err(|_| expired())??;
            if found.as_bool().unwrap_or(false) {
                return Ok(());
            }

            sleep(POLL_INTERVAL.min(remaining(deadline))).await;
        }
    }

    /// Evaluate `expression` in the page and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError> {
        let response = self
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            return Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint("evaluate raised exception")
                .with_data(details.clone()));
        }

        Ok(response
            .get("result")
            .and_then(|res| res.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Serialized HTML of the current document.
    pub async fn content(&self) -> Result<String, AdapterError> {
        let value = self
            .evaluate(
                "(() => { const d = document.doctype ? new XMLSerializer().serializeToString(document.doctype) : ''; \
                 return d + (document.documentElement ? document.documentElement.outerHTML : ''); })()",
            )
            .await?;
        match value {
            Value::String(html) => Ok(html),
            other => Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint("document content was not a string")
                .with_data(other)),
        }
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let start = Instant::now();
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + Duration::from_secs(30))
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

async fn send_browser(
    transport: &Arc<dyn CdpTransport>,
    method: &str,
    params: Value,
) -> Result<Value, AdapterError> {
    metrics::observe_command(
        method,
        transport.send_command(CommandTarget::Browser, method, params),
    )
    .await
}
