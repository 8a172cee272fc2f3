//! Price candle annotated with the R1/R2 indicator feed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub r1: f64,
    pub r2: f64,
}

impl Candle {
    /// True when either indicator is strictly above `threshold`.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.r1 > threshold || self.r2 > threshold
    }

    /// Close below the previous candle's low.
    pub fn breaks_below(&self, previous: &Candle) -> bool {
        self.close < previous.low
    }

    /// Close above the previous candle's high.
    pub fn breaks_above(&self, previous: &Candle) -> bool {
        self.close > previous.high
    }
}

/// Parse a candle timestamp. Accepts ISO-8601 with `T` or a space separator,
/// and bare dates (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Format a timestamp the way the data adapters store it.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}
