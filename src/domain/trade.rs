//! Forward simulation of a single signal.
//!
//! Target and stop come from the triggering candle's range widened by
//! `distance_threshold`. The walk checks each subsequent close against the
//! stop first, then the target; the first hit ends the trade. A trade that
//! never hits either is closed at the last candle and is never a success.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::candle::Candle;
use super::signal::{Direction, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    Neither,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub direction: Direction,
    pub r1: f64,
    pub r2: f64,
    pub profit: f64,
    pub outcome: Outcome,
}

/// Exit levels derived from a signal's triggering candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    pub direction: Direction,
    pub target: f64,
    pub stop: f64,
}

impl ExitLevels {
    pub fn new(direction: Direction, candle: &Candle, distance_threshold: f64) -> Self {
        let (target, stop) = match direction {
            Direction::Buy => (
                candle.high * (1.0 + distance_threshold),
                candle.low * (1.0 - distance_threshold),
            ),
            Direction::Sell => (
                candle.low * (1.0 - distance_threshold),
                candle.high * (1.0 + distance_threshold),
            ),
        };
        Self {
            direction,
            target,
            stop,
        }
    }

    pub fn stop_hit(&self, price: f64) -> bool {
        match self.direction {
            Direction::Buy => price <= self.stop,
            Direction::Sell => price >= self.stop,
        }
    }

    pub fn target_hit(&self, price: f64) -> bool {
        match self.direction {
            Direction::Buy => price >= self.target,
            Direction::Sell => price <= self.target,
        }
    }
}

/// Signed profit for one unit, long for buys and short for sells.
pub fn profit(direction: Direction, entry_price: f64, exit_price: f64) -> f64 {
    match direction {
        Direction::Buy => exit_price - entry_price,
        Direction::Sell => entry_price - exit_price,
    }
}

/// Walk forward from the bar after the signal and close the trade.
///
/// `candles` must be the series the signal was detected in.
pub fn simulate(signal: &Signal<'_>, candles: &[Candle], distance_threshold: f64) -> Trade {
    let entry = signal.candle;
    let levels = ExitLevels::new(signal.direction, entry, distance_threshold);

    let hit = candles
        .iter()
        .skip(signal.index + 1)
        .find_map(|bar| {
            if levels.stop_hit(bar.close) {
                Some((bar, Outcome::Failure))
            } else if levels.target_hit(bar.close) {
                Some((bar, Outcome::Success))
            } else {
                None
            }
        });

    let (exit, outcome) = match hit {
        Some(found) => found,
        None => {
            let last = candles.last().unwrap_or(entry);
            let outcome = if levels.stop_hit(last.close) {
                Outcome::Failure
            } else {
                Outcome::Neither
            };
            tracing::debug!(
                index = signal.index,
                exit_time = %last.timestamp,
                ?outcome,
                "forced exit at end of series"
            );
            (last, outcome)
        }
    };

    Trade {
        entry_time: entry.timestamp,
        entry_price: entry.close,
        exit_time: exit.timestamp,
        exit_price: exit.close,
        direction: signal.direction,
        r1: entry.r1,
        r2: entry.r2,
        profit: profit(signal.direction, entry.close, exit.close),
        outcome,
    }
}
