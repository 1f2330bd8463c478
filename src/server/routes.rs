use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::percent_decode_str;
use serde_json::json;
use tracing::{info, warn};
use url::{form_urlencoded, Url};

use super::state::ServeState;
use crate::errors::ExtractionError;

#[derive(Debug)]
pub(crate) enum ScrapeError {
    MissingUrl,
    InvalidUrl(String),
    Failed(ExtractionError),
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        match self {
            ScrapeError::MissingUrl => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "url is required" })),
            )
                .into_response(),
            ScrapeError::InvalidUrl(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "url is invalid", "details": details })),
            )
                .into_response(),
            ScrapeError::Failed(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Scraping failed", "details": err.message })),
            )
                .into_response(),
        }
    }
}

pub(crate) async fn scrape_handler(
    State(state): State<ServeState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ScrapeError> {
    let target = profile_url(query.as_deref())?;
    info!(target: "statgrab::server", url = %target, "scrape requested");

    match state.source.extract_statistics(target.as_str()).await {
        Ok(record) => Ok(Json(record).into_response()),
        Err(err) => {
            warn!(target: "statgrab::server", url = %target, error = %err, "scrape failed");
            Err(ScrapeError::Failed(err))
        }
    }
}

pub(crate) async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Pull `url` out of the query string and decode it once more, so clients may send it
/// percent-encoded on top of the query encoding.
pub(crate) fn profile_url(query: Option<&str>) -> Result<Url, ScrapeError> {
    let raw = query
        .and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
        })
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ScrapeError::MissingUrl)?;

    let decoded = percent_decode_str(&raw)
        .decode_utf8()
        .map_err(|err| ScrapeError::InvalidUrl(err.to_string()))?;

    let url = Url::parse(decoded.trim()).map_err(|err| ScrapeError::InvalidUrl(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScrapeError::InvalidUrl(format!("unsupported scheme {other}"))),
    }
}
