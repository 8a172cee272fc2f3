//! Backtest engine: detect, simulate, aggregate.

use serde::{Deserialize, Serialize};

use super::candle::Candle;
use super::error::BacktestError;
use super::performance::PerformanceSummary;
use super::signal::{self, SignalSelection};
use super::trade::{self, Trade};

pub const DEFAULT_THRESHOLD: f64 = 350.0;
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.01;
pub const DEFAULT_SIGNAL_LIMIT: usize = 15;

/// Per-run parameters. Nothing outlives a single call to [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestParams {
    pub symbol: String,
    pub threshold: f64,
    pub distance_threshold: f64,
    pub signal_limit: usize,
    pub selection: SignalSelection,
}

impl BacktestParams {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            threshold: DEFAULT_THRESHOLD,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            signal_limit: DEFAULT_SIGNAL_LIMIT,
            selection: SignalSelection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub trades: Vec<Trade>,
    pub performance: PerformanceSummary,
}

pub fn run(candles: &[Candle], params: &BacktestParams) -> Result<BacktestReport, BacktestError> {
    if candles.len() < 2 {
        return Err(BacktestError::InsufficientData {
            candles: candles.len(),
        });
    }

    let signals = match params.selection {
        SignalSelection::Earliest => {
            signal::detect(candles, params.threshold, params.signal_limit)
        }
        SignalSelection::MostRecent => signal::detect_all(candles, params.threshold),
    };

    if signals.is_empty() {
        return Err(BacktestError::NoSignalsFound {
            threshold: params.threshold,
        });
    }

    let skip = signals.len().saturating_sub(params.signal_limit);
    let kept = &signals[skip..];

    tracing::debug!(
        symbol = %params.symbol,
        detected = signals.len(),
        kept = kept.len(),
        "signals selected"
    );

    let trades: Vec<Trade> = kept
        .iter()
        .map(|s| trade::simulate(s, candles, params.distance_threshold))
        .collect();

    let performance = PerformanceSummary::aggregate(&trades, params.threshold);

    Ok(BacktestReport {
        symbol: params.symbol.clone(),
        trades,
        performance,
    })
}
