//! statgrab: render tracker profile pages in headless Chromium and turn them into
//! statistics records.

pub mod cli;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod orchestrator;
pub mod renderer;
pub mod server;

pub use config::Config;
pub use errors::{ExtractionError, RenderError};
pub use orchestrator::{Extractor, StatisticsSource};
pub use perceiver_stats::StatisticsRecord;
