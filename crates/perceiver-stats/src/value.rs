//! Conversions from raw widget text into numbers.
//!
//! Both parsers are total: malformed input yields zero instead of an error so that a single bad
//! token cannot abort a whole extraction.

use once_cell::sync::Lazy;
use regex::Regex;

static HOURS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*h").unwrap());
static MINUTES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*m").unwrap());
static LEADING_FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap());

/// Parse a displayed statistic such as `1,234`, `45%`, `2.3k` or `0.87`.
///
/// Thousands separators are dropped. A trailing `%` is ignored (the magnitude is returned
/// unscaled) and a trailing `k`/`K` multiplies by 1000. Anything that does not start with a
/// number returns `0.0`.
pub fn parse_number(text: &str) -> f64 {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0.0;
    }

    let value = if let Some(magnitude) = cleaned.strip_suffix('%') {
        leading_float(magnitude)
    } else if let Some(magnitude) = cleaned.strip_suffix(|c: char| c == 'k' || c == 'K') {
        leading_float(magnitude).map(|v| v * 1000.0)
    } else {
        leading_float(&cleaned)
    };

    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Parse a playtime label like `2h 15m` into whole minutes.
///
/// The hour and minute components are matched independently anywhere in the string; a missing
/// component contributes nothing.
pub fn parse_duration_minutes(text: &str) -> u64 {
    let hours = capture_u64(&HOURS_RE, text);
    let minutes = capture_u64(&MINUTES_RE, text);
    hours.saturating_mul(60).saturating_add(minutes)
}

fn capture_u64(re: &Regex, text: &str) -> u64 {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Longest numeric prefix of `text`, ignoring leading whitespace. Trailing garbage is tolerated
/// (`"12 kills"` reads as 12).
fn leading_float(text: &str) -> Option<f64> {
    LEADING_FLOAT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
