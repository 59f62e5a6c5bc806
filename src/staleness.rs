//! Staleness evaluation for the backend's last-update timestamp.
//!
//! Accepted timestamp forms:
//! - RFC 3339 (`2024-01-01T00:00:00Z`)
//! - RFC 2822 (`Mon, 01 Jan 2024 00:00:00 +0000`)
//! - `YYYY-MM-DD HH:MM:SS`, interpreted in the local time zone
//! - Unix seconds, optionally fractional (`1704067200.25`)
//!
//! Anything else is unparsable and therefore stale.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use strum::{AsRefStr, Display};

/// Outcome of one staleness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
}

impl Freshness {
    pub fn from_stale(stale: bool) -> Self {
        if stale { Self::Stale } else { Self::Fresh }
    }

    pub fn is_stale(self) -> bool {
        self == Self::Stale
    }
}

/// Parse a last-update timestamp to Unix milliseconds.
pub fn parse_timestamp_ms(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.timestamp_millis());
    }
    if let Ok(secs) = text.parse::<f64>()
        && secs.is_finite()
    {
        return Some((secs * 1000.0).round() as i64);
    }

    None
}

/// True when the timestamp is unparsable or older than `threshold_ms`.
pub fn is_stale(last_update_text: &str, now_ms: i64, threshold_ms: i64) -> bool {
    match parse_timestamp_ms(last_update_text) {
        Some(parsed_ms) => now_ms.saturating_sub(parsed_ms) > threshold_ms,
        None => true,
    }
}

/// Evaluate a possibly-missing cached timestamp. Never having received one is stale.
pub fn evaluate(last_update_text: Option<&str>, now_ms: i64, threshold_ms: i64) -> Freshness {
    Freshness::from_stale(
        last_update_text.is_none_or(|text| is_stale(text, now_ms, threshold_ms)),
    )
}
