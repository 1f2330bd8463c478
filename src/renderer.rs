//! Page renderer: turns a profile URL into fully rendered HTML.
//!
//! The browser itself is opened and closed by the orchestrator; this module only drives an
//! already running browser through one page:
//!
//! 1. attach a fresh page session
//! 2. apply the stealth profile (user agent, viewport, evasion scripts)
//! 3. pause every request and abort the resource types the policy blocks
//! 4. navigate, waiting for DOM readiness rather than network idle
//! 5. wait for the statistics marker, then hold for the grace delay
//! 6. read the document HTML

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{AdapterError, CdpConfig, CdpTransport, ChromiumTransport, PageSession};
use network_tap_light::{InterceptDecision, PageId, PausedRequest, RequestTap};
use stealth::StealthControl;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::RenderConfig;
use crate::errors::RenderError;

/// Opens a browser. The production launcher spawns Chromium; tests substitute scripted transports.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, cfg: &CdpConfig) -> Result<Arc<dyn CdpTransport>, AdapterError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, cfg: &CdpConfig) -> Result<Arc<dyn CdpTransport>, AdapterError> {
        let transport = ChromiumTransport::launch(cfg.clone()).await?;
        Ok(Arc::new(transport))
    }
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url` in the browser behind `transport` and return the document HTML.
    async fn render(
        &self,
        transport: Arc<dyn CdpTransport>,
        url: &str,
    ) -> Result<String, RenderError>;
}

#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub navigation_timeout: Duration,
    pub marker_selector: String,
    pub marker_timeout: Duration,
    pub grace_delay: Duration,
}

impl From<&RenderConfig> for RenderOptions {
    fn from(cfg: &RenderConfig) -> Self {
        Self {
            navigation_timeout: cfg.navigation_timeout(),
            marker_selector: cfg.marker_selector.clone(),
            marker_timeout: cfg.marker_timeout(),
            grace_delay: cfg.grace_delay(),
        }
    }
}

pub struct PageRenderer {
    options: RenderOptions,
    stealth: Arc<dyn StealthControl>,
    tap: Arc<RequestTap>,
}

impl PageRenderer {
    pub fn new(options: RenderOptions, stealth: Arc<dyn StealthControl>, tap: Arc<RequestTap>) -> Self {
        Self {
            options,
            stealth,
            tap,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    async fn drive(&self, page: &PageSession, url: &str) -> Result<String, RenderError> {
        debug!(target: "statgrab::renderer", %url, "navigating");
        page.navigate(url, self.options.navigation_timeout)
            .await
            .map_err(RenderError::Navigation)?;

        page.wait_for_selector(&self.options.marker_selector, self.options.marker_timeout)
            .await
            .map_err(RenderError::Marker)?;
        debug!(
            target: "statgrab::renderer",
            marker = %self.options.marker_selector,
            grace_ms = self.options.grace_delay.as_millis() as u64,
            "marker present, holding for client-side rendering"
        );

        tokio::time::sleep(self.options.grace_delay).await;

        page.content().await.map_err(RenderError::Content)
    }

    async fn enable_interception(&self, page: &PageSession, page_id: PageId) -> Result<Option<Interceptor>, RenderError> {
        if self.tap.policy().is_passthrough() {
            return Ok(None);
        }
        if let Err(err) = self.tap.enable(page_id).await {
            debug!(target: "statgrab::renderer", %err, "request tap not registered");
        }
        let interceptor = Interceptor {
            task: tokio::spawn(answer_paused_requests(
                page.clone(),
                self.tap.clone(),
                page_id,
            )),
            tap: self.tap.clone(),
            page_id,
        };
        page.enable_request_interception(self.tap.policy().url_pattern())
            .await
            .map_err(RenderError::Setup)?;
        Ok(Some(interceptor))
    }
}

#[async_trait]
impl Renderer for PageRenderer {
    async fn render(
        &self,
        transport: Arc<dyn CdpTransport>,
        url: &str,
    ) -> Result<String, RenderError> {
        let page = PageSession::create(transport)
            .await
            .map_err(RenderError::Setup)?;

        self.stealth
            .configure_page(&page)
            .await
            .map_err(RenderError::Stealth)?;

        let page_id = PageId::new();
        let interceptor = self.enable_interception(&page, page_id).await?;

        let result = self.drive(&page, url).await;

        if let Some(interceptor) = interceptor {
            interceptor.finish().await;
        }

        if let Ok(html) = &result {
            debug!(target: "statgrab::renderer", bytes = html.len(), "document captured");
        }
        result
    }
}

/// Background task answering paused requests for one page.
///
/// Dropping it, including when the render future is cancelled, aborts the task so it releases
/// its handle on the transport, and forgets the page's counters.
struct Interceptor {
    task: JoinHandle<()>,
    tap: Arc<RequestTap>,
    page_id: PageId,
}

impl Interceptor {
    async fn finish(self) {
        self.task.abort();
        if let Some(stats) = self.tap.current_snapshot(self.page_id).await {
            info!(
                target: "statgrab::renderer",
                continued = stats.continued,
                aborted = stats.aborted,
                "request interception summary"
            );
        }
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        self.task.abort();
        if !self.tap.forget(self.page_id) {
            debug!(target: "statgrab::renderer", page = ?self.page_id, "request tap already released");
        }
    }
}

/// Answer `Fetch.requestPaused` events for `page` until the event stream ends.
async fn answer_paused_requests(page: PageSession, tap: Arc<RequestTap>, page_id: PageId) {
    let transport = page.transport();
    while let Some(event) = transport.next_event().await {
        if event.method != "Fetch.requestPaused" || !page.owns(&event) {
            continue;
        }
        let request = match PausedRequest::from_params(&event.params) {
            Ok(request) => request,
            Err(err) => {
                warn!(target: "statgrab::renderer", %err, "ignoring paused request");
                continue;
            }
        };
        let decision = match tap.ingest(page_id, &request).await {
            Ok(decision) => decision,
            Err(_) => tap.policy().decide(request.resource_type.as_deref()),
        };

        let page = page.clone();
        tokio::spawn(async move {
            let outcome = match decision {
                InterceptDecision::Continue => page.continue_request(&request.request_id).await,
                InterceptDecision::Abort => page.fail_request(&request.request_id).await,
            };
            if let Err(err) = outcome {
                trace!(
                    target: "statgrab::renderer",
                    url = %request.url,
                    %err,
                    "paused request could not be answered"
                );
            }
        });
    }
}
