//! Counter aggregation across the summary grid and every detail grid.

use scraper::{ElementRef, Html};
use tracing::{debug, trace};

use crate::locator::{find_stat_value, stat_tokens};
use crate::model::StatisticsRecord;
use crate::signatures::SIGNATURES;
use crate::value::parse_number;

#[derive(Clone, Copy, Debug)]
enum Field {
    Kills,
    Wins,
    Losses,
    Assists,
    Deaths,
    Revives,
    HsPercent,
    ObjectivesCaptured,
    ObjectivesDestroyed,
}

impl Field {
    fn slot(self, record: &mut StatisticsRecord) -> &mut f64 {
        match self {
            Field::Kills => &mut record.kills,
            Field::Wins => &mut record.wins,
            Field::Losses => &mut record.losses,
            Field::Assists => &mut record.assists,
            Field::Deaths => &mut record.deaths,
            Field::Revives => &mut record.revives,
            Field::HsPercent => &mut record.hs_percent,
            Field::ObjectivesCaptured => &mut record.objectives_captured,
            Field::ObjectivesDestroyed => &mut record.objectives_destroyed,
        }
    }
}

/// Labels summed across detail grids.
const DETAIL_COUNTERS: &[(&str, Field)] = &[
    ("Kills", Field::Kills),
    ("Wins", Field::Wins),
    ("Losses", Field::Losses),
    ("Assists", Field::Assists),
    ("Deaths", Field::Deaths),
    ("Revives", Field::Revives),
];

/// Labels read once from the summary grid.
const SUMMARY_FIELDS: &[(&str, Field)] = &[
    ("HS%", Field::HsPercent),
    ("Objectives Captured", Field::ObjectivesCaptured),
    ("Objectives Destroyed", Field::ObjectivesDestroyed),
];

/// Fill every numeric field of a record from `document`.
///
/// The summary grid is read once; detail grid counters are accumulated, and a label missing from
/// one grid leaves the running total untouched. Class fields stay at their defaults.
pub fn aggregate_statistics(document: &Html) -> StatisticsRecord {
    let mut record = StatisticsRecord::default();

    if let Some(summary) = document.select(&SIGNATURES.summary_grid).next() {
        read_summary(summary, &mut record);
    } else {
        debug!(target: "perceiver-stats", "summary grid not present");
    }

    let mut grids = 0usize;
    for grid in document.select(&SIGNATURES.detail_grid) {
        accumulate_detail(grid, &mut record);
        grids += 1;
    }
    debug!(target: "perceiver-stats", grids, "detail grids aggregated");

    record.finalize_ratio();
    record
}

fn read_summary(grid: ElementRef<'_>, record: &mut StatisticsRecord) {
    for (label, field) in SUMMARY_FIELDS {
        let raw = find_stat_value(grid, label).unwrap_or_default();
        *field.slot(record) = parse_number(&raw);
    }
}

fn accumulate_detail(grid: ElementRef<'_>, record: &mut StatisticsRecord) {
    trace!(target: "perceiver-stats", tokens = ?stat_tokens(grid), "detail grid");
    for (label, field) in DETAIL_COUNTERS {
        if let Some(raw) = find_stat_value(grid, label) {
            *field.slot(record) += parse_number(&raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_grids_yields_zero_counters() {
        let record = aggregate_statistics(&Html::parse_document("<main></main>"));
        assert_eq!(record, StatisticsRecord::default());
        assert_eq!(record.kill_death, 0.0);
    }

    #[test]
    fn summary_grid_values_are_not_summed() {
        let doc = Html::parse_document(
            r#"<div class="grid grid-cols-2 gap-px">
                 <div class="stat-ver"><span class="stat-name">HS%</span><span class="stat-value">31.5%</span></div>
                 <div class="stat-ver"><span class="stat-name">Objectives Captured</span><span class="stat-value">1.2k</span></div>
               </div>
               <div class="grid grid-cols-2 gap-px">
                 <div class="stat-ver"><span class="stat-name">HS%</span><span class="stat-value">99%</span></div>
               </div>"#,
        );
        let record = aggregate_statistics(&doc);
        assert_eq!(record.hs_percent, 31.5);
        assert_eq!(record.objectives_captured, 1200.0);
        assert_eq!(record.objectives_destroyed, 0.0);
    }
}
