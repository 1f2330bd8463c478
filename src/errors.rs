//! Error types surfaced by the renderer and the extraction orchestrator.

use cdp_adapter::AdapterError;
use std::error::Error as _;

use stealth::StealthError;
use thiserror::Error;

/// Step of the render pipeline that failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser launch failed")]
    Launch(#[source] AdapterError),
    #[error("page setup failed")]
    Setup(#[source] AdapterError),
    #[error("stealth profile could not be applied")]
    Stealth(#[source] StealthError),
    #[error("navigation failed")]
    Navigation(#[source] AdapterError),
    #[error("statistics marker never appeared")]
    Marker(#[source] AdapterError),
    #[error("reading page content failed")]
    Content(#[source] AdapterError),
}

impl RenderError {
    pub fn phase(&self) -> &'static str {
        match self {
            RenderError::Launch(_) => "launch",
            RenderError::Setup(_) => "setup",
            RenderError::Stealth(_) => "stealth",
            RenderError::Navigation(_) => "navigation",
            RenderError::Marker(_) => "marker",
            RenderError::Content(_) => "content",
        }
    }

    /// Underlying adapter failure, when the step failed inside the browser.
    pub fn adapter_error(&self) -> Option<&AdapterError> {
        match self {
            RenderError::Launch(err)
            | RenderError::Setup(err)
            | RenderError::Navigation(err)
            | RenderError::Marker(err)
            | RenderError::Content(err) => Some(err),
            RenderError::Stealth(_) => None,
        }
    }
}

/// Failure of one end-to-end extraction.
///
/// `message` is the flattened cause chain and is what callers show to users. The structured
/// cause stays reachable through `cause` but is not reported as an error source, so chain
/// printers show the text once.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub message: String,
    pub cause: RenderError,
}

impl From<RenderError> for ExtractionError {
    fn from(cause: RenderError) -> Self {
        let mut message = cause.to_string();
        let mut next = cause.source();
        while let Some(err) = next {
            message.push_str(": ");
            message.push_str(&err.to_string());
            next = err.source();
        }
        Self { message, cause }
    }
}
