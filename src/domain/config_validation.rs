//! Configuration validation.
//!
//! Validates all config fields before a backtest runs or the server starts.

use crate::domain::candle::parse_timestamp;
use crate::domain::error::FlatlandError;
use crate::domain::signal::SignalSelection;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDateTime;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    validate_symbols(config)?;
    validate_timeframe(config)?;
    validate_threshold(config)?;
    validate_distance_threshold(config)?;
    validate_signal_limit(config)?;
    validate_signal_selection(config)?;
    validate_time_range(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.trim().to_lowercase().as_str() {
        "csv" => require_non_empty(config, "data", "csv_dir"),
        "sqlite" => require_non_empty(config, "sqlite", "path"),
        other => Err(FlatlandError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown data source '{other}' (expected csv or sqlite)"),
        }),
    }
}

pub fn validate_web_config(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    if config.get_int("web", "rate_limit_max", 100) < 1 {
        return Err(FlatlandError::ConfigInvalid {
            section: "web".to_string(),
            key: "rate_limit_max".to_string(),
            reason: "rate_limit_max must be at least 1".to_string(),
        });
    }
    if config.get_int("web", "rate_limit_window", 3600) < 1 {
        return Err(FlatlandError::ConfigInvalid {
            section: "web".to_string(),
            key: "rate_limit_window".to_string(),
            reason: "rate_limit_window must be at least 1 second".to_string(),
        });
    }
    require_non_empty(config, "auth", "api_key")
}

fn require_non_empty(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), FlatlandError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(FlatlandError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    let symbols = config.get_string("backtest", "symbols");
    let symbol = config.get_string("backtest", "symbol");

    match (symbols, symbol) {
        (Some(s), _) if !s.trim().is_empty() => Ok(()),
        (_, Some(s)) if !s.trim().is_empty() => Ok(()),
        _ => Err(FlatlandError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_timeframe(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    match config.get_string("backtest", "timeframe") {
        Some(s) if s.trim().is_empty() => Err(FlatlandError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "timeframe".to_string(),
            reason: "timeframe must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_threshold(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    let Some(raw) = config.get_string("backtest", "threshold") else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(()),
        _ => Err(FlatlandError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "threshold".to_string(),
            reason: format!("threshold must be a finite number, got '{}'", raw.trim()),
        }),
    }
}

fn validate_distance_threshold(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    let value = config.get_double("backtest", "distance_threshold", 0.01);
    if !(0.0..1.0).contains(&value) {
        return Err(FlatlandError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "distance_threshold".to_string(),
            reason: "distance_threshold must be in [0, 1)".to_string(),
        });
    }
    Ok(())
}

fn validate_signal_limit(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    if config.get_int("backtest", "signal_limit", 15) < 1 {
        return Err(FlatlandError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "signal_limit".to_string(),
            reason: "signal_limit must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_signal_selection(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    if let Some(s) = config.get_string("backtest", "signal_selection") {
        s.parse::<SignalSelection>()
            .map_err(|reason| FlatlandError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "signal_selection".to_string(),
                reason,
            })?;
    }
    Ok(())
}

fn validate_time_range(config: &dyn ConfigPort) -> Result<(), FlatlandError> {
    let start = parse_time(config, "start_time")?;
    let end = parse_time(config, "end_time")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(FlatlandError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start_time".to_string(),
                reason: "start_time must be before end_time".to_string(),
            });
        }
    }
    Ok(())
}

/// Read an optional `[backtest]` timestamp. Missing is fine, malformed is not.
pub fn parse_time(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDateTime>, FlatlandError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| FlatlandError::ConfigInvalid {
                section: "backtest".to_string(),
                key: key.to_string(),
                reason: format!("invalid {key} format, expected YYYY-MM-DD[THH:MM:SS]"),
            }),
    }
}
