//! Turns a rendered tracker profile page into a [`StatisticsRecord`].
//!
//! Everything here is synchronous and browser-agnostic: the caller hands over the document HTML
//! and receives a best-effort record. Missing widgets, sections, or unparseable values never
//! fail the extraction; they fall back to zero or absent fields.

pub mod aggregate;
pub mod classes;
pub mod locator;
pub mod model;
pub mod signatures;
pub mod value;

use scraper::Html;
use tracing::debug;

pub use aggregate::aggregate_statistics;
pub use classes::{aggregate_class_usage, ClassUsage};
pub use locator::find_stat_value;
pub use model::{ClassPlaytime, RawStatToken, StatisticsRecord};
pub use signatures::{MarkupSignatures, MARKER_SELECTOR};
pub use value::{parse_duration_minutes, parse_number};

/// Run both aggregation passes over a parsed document and merge them into one record.
pub fn extract_statistics(document: &Html) -> StatisticsRecord {
    let usage = aggregate_class_usage(document);
    let record = aggregate_statistics(document).with_class_usage(usage);
    debug!(
        target: "perceiver-stats",
        kills = record.kills,
        deaths = record.deaths,
        best_class = record.best_class.as_deref().unwrap_or("-"),
        time_played = %record.time_played,
        "statistics extracted"
    );
    record
}

/// Parse `html` and extract its statistics.
pub fn extract_statistics_from_html(html: &str) -> StatisticsRecord {
    let document = Html::parse_document(html);
    extract_statistics(&document)
}
