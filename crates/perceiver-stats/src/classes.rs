//! Classes-played card: total playtime and the most played class.

use scraper::Html;
use tracing::debug;

use crate::locator::first_text;
use crate::model::ClassPlaytime;
use crate::signatures::SIGNATURES;
use crate::value::parse_duration_minutes;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassUsage {
    pub best_class: Option<String>,
    pub total_hours: u64,
}

impl ClassUsage {
    /// Build the aggregate from individual class rows. Ties on playtime keep the earlier row.
    pub fn from_playtimes(playtimes: &[ClassPlaytime]) -> Self {
        let mut best: Option<&ClassPlaytime> = None;
        let mut total_minutes = 0u64;

        for entry in playtimes {
            total_minutes = total_minutes.saturating_add(entry.minutes);
            if best.map_or(true, |current| entry.minutes > current.minutes) {
                best = Some(entry);
            }
        }

        Self {
            best_class: best.and_then(|entry| entry.class_name.clone()),
            total_hours: total_minutes / 60,
        }
    }

    pub fn time_played_label(&self) -> String {
        format!("{}h", self.total_hours)
    }
}

/// Read the class rows of the first card whose title mentions "Classes".
///
/// A page without that card yields `ClassUsage::default()`.
pub fn aggregate_class_usage(document: &Html) -> ClassUsage {
    let Some(section) = document.select(&SIGNATURES.card_section).find(|section| {
        first_text(*section, &SIGNATURES.card_title)
            .is_some_and(|title| title.contains(SIGNATURES.classes_title_keyword))
    }) else {
        debug!(target: "perceiver-stats", "classes card not present");
        return ClassUsage::default();
    };

    let playtimes: Vec<ClassPlaytime> = section
        .select(&SIGNATURES.class_block)
        .map(|block| ClassPlaytime {
            class_name: first_text(block, &SIGNATURES.class_name),
            minutes: first_text(block, &SIGNATURES.class_playtime)
                .map(|raw| parse_duration_minutes(&raw))
                .unwrap_or(0),
        })
        .collect();

    debug!(target: "perceiver-stats", classes = playtimes.len(), "classes card parsed");
    ClassUsage::from_playtimes(&playtimes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playtime(name: &str, minutes: u64) -> ClassPlaytime {
        ClassPlaytime {
            class_name: Some(name.into()),
            minutes,
        }
    }

    #[test]
    fn picks_longest_played_class() {
        let usage = ClassUsage::from_playtimes(&[
            playtime("Assault", 90),
            playtime("Recon", 400),
            playtime("Support", 30),
        ]);
        assert_eq!(usage.best_class.as_deref(), Some("Recon"));
        assert_eq!(usage.total_hours, 8);
        assert_eq!(usage.time_played_label(), "8h");
    }

    #[test]
    fn ties_keep_first_class() {
        let usage =
            ClassUsage::from_playtimes(&[playtime("Engineer", 120), playtime("Assault", 120)]);
        assert_eq!(usage.best_class.as_deref(), Some("Engineer"));
    }

    #[test]
    fn zero_minute_rows_still_name_a_class() {
        let usage = ClassUsage::from_playtimes(&[playtime("Support", 0)]);
        assert_eq!(usage.best_class.as_deref(), Some("Support"));
        assert_eq!(usage.total_hours, 0);
    }

    #[test]
    fn hours_are_floored() {
        let usage = ClassUsage::from_playtimes(&[playtime("Recon", 59), playtime("Assault", 60)]);
        assert_eq!(usage.total_hours, 1);
    }

    #[test]
    fn parses_classes_card() {
        let doc = Html::parse_document(
            r#"<section class="v3-card"><h2 class="v3-card__title">Overview</h2></section>
               <section class="v3-card">
                 <h2 class="v3-card__title">Top Classes</h2>
                 <div class="flex items-center gap-4"><span class="text-12">Assault</span>
                   <div class="stat-value"><span>2h 15m</span></div></div>
                 <div class="flex items-center gap-4"><span class="text-12">Recon</span>
                   <div class="stat-value"><span>10h 5m</span></div></div>
               </section>"#,
        );
        let usage = aggregate_class_usage(&doc);
        assert_eq!(usage.best_class.as_deref(), Some("Recon"));
        assert_eq!(usage.total_hours, 12);
    }

    #[test]
    fn title_match_is_case_sensitive() {
        let doc = Html::parse_document(
            r#"<section class="v3-card">
                 <h2 class="v3-card__title">classes</h2>
                 <div class="flex items-center gap-4"><span class="text-12">Assault</span>
                   <div class="stat-value"><span>2h</span></div></div>
               </section>"#,
        );
        assert_eq!(aggregate_class_usage(&doc), ClassUsage::default());
    }
}
