//! Breakout signal detection.
//!
//! A candle is eligible when either indicator is above the threshold. Its
//! direction comes from where it closes relative to the previous candle's
//! range: below the prior low is a buy, above the prior high is a sell.

use serde::{Deserialize, Serialize};

use super::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// A detected signal, borrowing its triggering candle from the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal<'a> {
    pub index: usize,
    pub direction: Direction,
    pub candle: &'a Candle,
}

/// Which signals the engine keeps when more than `signal_limit` exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSelection {
    /// Stop scanning once `signal_limit` signals are found.
    Earliest,
    /// Scan the whole series and keep the last `signal_limit` signals.
    #[default]
    MostRecent,
}

impl std::str::FromStr for SignalSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "earliest" => Ok(SignalSelection::Earliest),
            "most_recent" | "most-recent" | "latest" => Ok(SignalSelection::MostRecent),
            other => Err(format!(
                "unknown signal selection '{other}' (expected earliest or most_recent)"
            )),
        }
    }
}

/// Classify `current` against `previous`. `None` when the close stays inside
/// the previous range.
pub fn signal_direction(current: &Candle, previous: &Candle) -> Option<Direction> {
    if current.breaks_below(previous) {
        Some(Direction::Buy)
    } else if current.breaks_above(previous) {
        Some(Direction::Sell)
    } else {
        None
    }
}

fn scan(candles: &[Candle], threshold: f64) -> impl Iterator<Item = Signal<'_>> {
    candles
        .windows(2)
        .enumerate()
        .filter_map(move |(i, pair)| {
            let (previous, current) = (&pair[0], &pair[1]);
            if !current.exceeds(threshold) {
                return None;
            }
            signal_direction(current, previous).map(|direction| Signal {
                index: i + 1,
                direction,
                candle: current,
            })
        })
}

/// Detect signals in index order, stopping as soon as `limit` are collected.
pub fn detect(candles: &[Candle], threshold: f64, limit: usize) -> Vec<Signal<'_>> {
    scan(candles, threshold).take(limit).collect()
}

/// Detect every signal in the series.
pub fn detect_all(candles: &[Candle], threshold: f64) -> Vec<Signal<'_>> {
    scan(candles, threshold).collect()
}
