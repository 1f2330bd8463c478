use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use super::state::ServeState;

pub(crate) const API_KEY_HEADER: &str = "x-api-key";

pub(crate) async fn api_key_middleware(
    State(state): State<ServeState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if state.accepts(provided) {
        return next.run(req).await;
    }

    warn!(
        target: "statgrab::server",
        path = %req.uri().path(),
        header_present = provided.is_some(),
        "rejected unauthenticated request"
    );
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
