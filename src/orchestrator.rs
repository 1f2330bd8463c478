//! End-to-end extraction: launch, render, parse, close.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use cdp_adapter::{CdpConfig, CdpTransport};
use network_tap_light::RequestTap;
use perceiver_stats::StatisticsRecord;
use stealth::config::load_bundle_from_path;
use stealth::{StealthControl, StealthRuntime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{ExtractionError, RenderError};
use crate::metrics;
use crate::renderer::{BrowserLauncher, ChromiumLauncher, PageRenderer, RenderOptions, Renderer};

/// Anything that can turn a profile URL into a statistics record.
#[async_trait]
pub trait StatisticsSource: Send + Sync {
    async fn extract_statistics(&self, url: &str) -> Result<StatisticsRecord, ExtractionError>;
}

pub struct Extractor {
    launcher: Arc<dyn BrowserLauncher>,
    renderer: Arc<dyn Renderer>,
    cdp: CdpConfig,
}

impl Extractor {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, renderer: Arc<dyn Renderer>, cdp: CdpConfig) -> Self {
        Self {
            launcher,
            renderer,
            cdp,
        }
    }

    /// Production wiring: Chromium launcher, configured stealth profile, resource blocking.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let stealth = match &config.stealth.profile_path {
            Some(path) => {
                let bundle = load_bundle_from_path(path)
                    .with_context(|| format!("failed to load stealth bundle {}", path.display()))?;
                StealthRuntime::from_bundle(bundle, config.stealth.profile.as_deref())?
            }
            None => {
                let runtime = StealthRuntime::new();
                if let Some(name) = &config.stealth.profile {
                    runtime.select(name)?;
                }
                runtime
            }
        };

        let mut cdp = config.cdp_config();
        for arg in stealth.launch_args() {
            if !cdp.extra_args.contains(&arg) {
                cdp.extra_args.push(arg);
            }
        }

        let tap = Arc::new(RequestTap::with_config(&config.render.intercept_config()));
        let renderer = PageRenderer::new(RenderOptions::from(&config.render), Arc::new(stealth), tap);
        Ok(Self::new(Arc::new(ChromiumLauncher), Arc::new(renderer), cdp))
    }

    pub fn cdp_config(&self) -> &CdpConfig {
        &self.cdp
    }
}

#[async_trait]
impl StatisticsSource for Extractor {
    async fn extract_statistics(&self, url: &str) -> Result<StatisticsRecord, ExtractionError> {
        let extraction_id = Uuid::new_v4();
        let started = Instant::now();
        info!(target: "statgrab::extract", %extraction_id, %url, "extraction started");

        let transport = match self.launcher.launch(&self.cdp).await {
            Ok(transport) => transport,
            Err(err) => {
                let err = ExtractionError::from(RenderError::Launch(err));
                metrics::record_extraction(err.cause.phase(), started.elapsed());
                error!(target: "statgrab::extract", %extraction_id, error = %err, "extraction failed");
                return Err(err);
            }
        };

        let browser = BrowserGuard::new(transport.clone(), extraction_id, started);
        let rendered = self.renderer.render(transport, url).await;
        browser.close().await;

        match rendered {
            Ok(html) => {
                let record = perceiver_stats::extract_statistics_from_html(&html);
                metrics::record_extraction("ok", started.elapsed());
                info!(
                    target: "statgrab::extract",
                    %extraction_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    kills = record.kills,
                    deaths = record.deaths,
                    best_class = record.best_class.as_deref().unwrap_or("-"),
                    "extraction finished"
                );
                Ok(record)
            }
            Err(cause) => {
                let err = ExtractionError::from(cause);
                metrics::record_extraction(err.cause.phase(), started.elapsed());
                error!(target: "statgrab::extract", %extraction_id, error = %err, "extraction failed");
                Err(err)
            }
        }
    }
}

/// Owns the close of one launched browser.
///
/// `close` shuts it down in line. If the extraction future is dropped first (client gone,
/// caller timeout) the guard spawns the close instead.
struct BrowserGuard {
    transport: Option<Arc<dyn CdpTransport>>,
    extraction_id: Uuid,
    started: Instant,
}

impl BrowserGuard {
    fn new(transport: Arc<dyn CdpTransport>, extraction_id: Uuid, started: Instant) -> Self {
        Self {
            transport: Some(transport),
            extraction_id,
            started,
        }
    }

    async fn close(mut self) {
        if let Some(transport) = self.transport.take() {
            close_browser(transport, self.extraction_id).await;
        }
    }
}

impl Drop for BrowserGuard {
    fn drop(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        let extraction_id = self.extraction_id;
        metrics::record_extraction("cancelled", self.started.elapsed());
        warn!(target: "statgrab::extract", %extraction_id, "extraction cancelled, closing browser");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close_browser(transport, extraction_id));
            }
            Err(_) => debug!(
                target: "statgrab::extract",
                %extraction_id,
                "no runtime left, browser is killed when its transport drops"
            ),
        }
    }
}

async fn close_browser(transport: Arc<dyn CdpTransport>, extraction_id: Uuid) {
    if let Err(err) = transport.close().await {
        warn!(target: "statgrab::extract", %extraction_id, %err, "browser close reported an error");
    }
}
