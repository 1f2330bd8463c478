//! CSS signatures of the tracker profile markup.
//!
//! The dashboard exposes no stable ids, so extraction keys off utility class combinations. All of
//! them live here so a markup change on the site is a one-struct update.

use once_cell::sync::Lazy;
use scraper::Selector;

/// Element that only exists once the statistics widgets have rendered.
pub const MARKER_SELECTOR: &str = ".stat-name";

/// Raw selector strings for one revision of the profile page markup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkupSignatures {
    /// Vertical and horizontal stat widget layouts.
    pub stat_widget: &'static str,
    pub stat_label: &'static str,
    pub stat_value: &'static str,
    /// Overview grid holding HS% and objective counters. Read once.
    pub summary_grid: &'static str,
    /// Per-mode grids whose counters are summed.
    pub detail_grid: &'static str,
    pub card_section: &'static str,
    pub card_title: &'static str,
    /// Literal text identifying the classes card title.
    pub classes_title_keyword: &'static str,
    pub class_block: &'static str,
    pub class_name: &'static str,
    pub class_playtime: &'static str,
}

impl MarkupSignatures {
    pub const V3: Self = Self {
        stat_widget: ".stat-ver, .stat-hor",
        stat_label: ".stat-name",
        stat_value: ".stat-value",
        summary_grid: ".grid.grid-cols-2.gap-px",
        detail_grid: ".v3-card__body.grid.grid-cols-2",
        card_section: "section.v3-card",
        card_title: ".v3-card__title",
        classes_title_keyword: "Classes",
        class_block: ".flex.items-center.gap-4",
        class_name: "span.text-12",
        class_playtime: ".stat-value span",
    };
}

/// Compiled selectors for [`MarkupSignatures::V3`].
pub(crate) struct CompiledSignatures {
    pub stat_widget: Selector,
    pub stat_label: Selector,
    pub stat_value: Selector,
    pub summary_grid: Selector,
    pub detail_grid: Selector,
    pub card_section: Selector,
    pub card_title: Selector,
    pub classes_title_keyword: &'static str,
    pub class_block: Selector,
    pub class_name: Selector,
    pub class_playtime: Selector,
}

impl CompiledSignatures {
    fn compile(raw: &MarkupSignatures) -> Self {
        Self {
            stat_widget: selector(raw.stat_widget),
            stat_label: selector(raw.stat_label),
            stat_value: selector(raw.stat_value),
            summary_grid: selector(raw.summary_grid),
            detail_grid: selector(raw.detail_grid),
            card_section: selector(raw.card_section),
            card_title: selector(raw.card_title),
            classes_title_keyword: raw.classes_title_keyword,
            class_block: selector(raw.class_block),
            class_name: selector(raw.class_name),
            class_playtime: selector(raw.class_playtime),
        }
    }
}

fn selector(raw: &str) -> Selector {
    Selector::parse(raw).unwrap_or_else(|err| panic!("invalid markup signature {raw:?}: {err:?}"))
}

pub(crate) static SIGNATURES: Lazy<CompiledSignatures> =
    Lazy::new(|| CompiledSignatures::compile(&MarkupSignatures::V3));
