use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::metrics;
use crate::orchestrator::Extractor;
use crate::server::{build_router, ServeState};

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Port to listen on (defaults to the configured port, 3001)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn cmd_serve(args: ServeArgs, config: Config) -> Result<()> {
    metrics::register_metrics();

    let extractor = Extractor::from_config(&config).context("failed to prepare extractor")?;
    let cdp = extractor.cdp_config();
    if let Some(ws) = cdp.websocket_url.as_deref() {
        info!("Using external DevTools endpoint: {}", ws);
    } else {
        info!(executable = %cdp.executable.display(), "Using local Chrome");
    }

    let state = ServeState::new(Arc::new(extractor), config.server.api_key.clone());
    if !state.auth_enabled() {
        warn!("SCRAPER_API_KEY is not set; every /scrape request will be rejected");
    }
    let router = build_router(state);

    let port = args.port.unwrap_or(config.server.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind scrape server on {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("scrape server exited unexpectedly")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
