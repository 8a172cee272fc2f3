//! Domain error types.

/// Failures raised by the backtest core itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("insufficient data for backtesting: have {candles} candles, need at least 2")]
    InsufficientData { candles: usize },

    #[error("no signals found at threshold {threshold}")]
    NoSignalsFound { threshold: f64 },
}

/// Top-level error type for flatland.
#[derive(Debug, thiserror::Error)]
pub enum FlatlandError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("invalid candle data: {reason}")]
    DataFormat { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol} ({timeframe})")]
    NoData { symbol: String, timeframe: String },

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FlatlandError> for std::process::ExitCode {
    fn from(err: &FlatlandError) -> Self {
        let code: u8 = match err {
            FlatlandError::Io(_) | FlatlandError::Report { .. } => 1,
            FlatlandError::ConfigParse { .. }
            | FlatlandError::ConfigMissing { .. }
            | FlatlandError::ConfigInvalid { .. } => 2,
            FlatlandError::Database { .. }
            | FlatlandError::DatabaseQuery { .. }
            | FlatlandError::DataFormat { .. } => 3,
            FlatlandError::NoData { .. } | FlatlandError::Backtest(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
