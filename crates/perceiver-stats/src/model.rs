use serde::{Deserialize, Serialize, Serializer};

use crate::classes::ClassUsage;

/// Label/value text pair read from one stat widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawStatToken {
    pub label: String,
    pub value: String,
}

/// Playtime of a single class in the classes card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassPlaytime {
    pub class_name: Option<String>,
    pub minutes: u64,
}

/// Normalized player statistics for one profile page.
///
/// Counters are sums over every detail grid on the page. `kill_death` is derived from the
/// summed kills and deaths, see [`StatisticsRecord::finalize_ratio`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    #[serde(serialize_with = "serialize_number")]
    pub kills: f64,
    #[serde(serialize_with = "serialize_number")]
    pub deaths: f64,
    #[serde(serialize_with = "serialize_number")]
    pub wins: f64,
    #[serde(serialize_with = "serialize_number")]
    pub losses: f64,
    #[serde(serialize_with = "serialize_number")]
    pub hs_percent: f64,
    #[serde(serialize_with = "serialize_number")]
    pub assists: f64,
    #[serde(serialize_with = "serialize_number")]
    pub revives: f64,
    #[serde(serialize_with = "serialize_number")]
    pub kill_death: f64,
    #[serde(serialize_with = "serialize_number")]
    pub objectives_captured: f64,
    #[serde(serialize_with = "serialize_number")]
    pub objectives_destroyed: f64,
    pub best_class: Option<String>,
    pub time_played: String,
}

impl Default for StatisticsRecord {
    fn default() -> Self {
        Self {
            kills: 0.0,
            deaths: 0.0,
            wins: 0.0,
            losses: 0.0,
            hs_percent: 0.0,
            assists: 0.0,
            revives: 0.0,
            kill_death: 0.0,
            objectives_captured: 0.0,
            objectives_destroyed: 0.0,
            best_class: None,
            time_played: ClassUsage::default().time_played_label(),
        }
    }
}

impl StatisticsRecord {
    /// Recompute `kill_death`: kills/deaths rounded to two decimals, or plain kills when there
    /// are no deaths.
    pub fn finalize_ratio(&mut self) {
        self.kill_death = if self.deaths > 0.0 {
            round2(self.kills / self.deaths)
        } else {
            self.kills
        };
    }

    pub fn with_class_usage(mut self, usage: ClassUsage) -> Self {
        self.time_played = usage.time_played_label();
        self.best_class = usage.best_class;
        self
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whole values go out as JSON integers (`100`, not `100.0`).
fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}
