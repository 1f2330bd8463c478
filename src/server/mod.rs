//! HTTP surface: `/scrape` behind the API key guard, plus `/health` and `/metrics`.

mod auth;
mod routes;
mod state;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::metrics;

pub use state::ServeState;

pub fn build_router(state: ServeState) -> Router {
    let guarded = Router::new()
        .route("/scrape", get(routes::scrape_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(guarded)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
