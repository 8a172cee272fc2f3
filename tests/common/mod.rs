#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
pub use flatland::domain::candle::Candle;
use flatland::domain::candle::format_timestamp;
use flatland::domain::error::FlatlandError;
use flatland::ports::data_port::{DataPort, in_range};
use std::collections::HashMap;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, FlatlandError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(FlatlandError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|candles| {
                candles
                    .iter()
                    .filter(|c| in_range(c.timestamp, start, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self, _timeframe: &str) -> Result<Vec<String>, FlatlandError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        _timeframe: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, FlatlandError> {
        match self.data.get(symbol) {
            Some(candles) if !candles.is_empty() => {
                let min = candles.iter().map(|c| c.timestamp).min().unwrap();
                let max = candles.iter().map(|c| c.timestamp).max().unwrap();
                Ok(Some((min, max, candles.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Timestamp of the `i`-th 30 minute candle from 2024-01-01 00:00.
pub fn ts(i: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::minutes(30 * i)
}

pub fn candle(i: i64, high: f64, low: f64, close: f64, r1: f64, r2: f64) -> Candle {
    Candle {
        timestamp: ts(i),
        open: close,
        high,
        low,
        close,
        volume: 100.0,
        r1,
        r2,
    }
}

/// Every candle from index 1 breaks the previous range, alternating buy
/// (odd indices) and sell (even indices), with R1 above the default threshold.
pub fn zigzag(n: i64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                candle(i, 110.0, 90.0, 108.0, 400.0, 100.0)
            } else {
                candle(i, 95.0, 70.0, 85.0, 400.0, 100.0)
            }
        })
        .collect()
}

/// Three candles producing one buy signal that exits at the last close.
pub fn single_buy_series() -> Vec<Candle> {
    vec![
        candle(0, 100.0, 90.0, 95.0, 0.0, 0.0),
        candle(1, 88.0, 84.0, 85.0, 360.0, 0.0),
        candle(2, 87.0, 84.0, 86.0, 0.0, 0.0),
    ]
}

pub fn write_csv(dir: &Path, symbol: &str, timeframe: &str, candles: &[Candle]) {
    let mut content = String::from("timestamp,open,high,low,close,volume,r1,r2\n");
    for c in candles {
        content.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            format_timestamp(&c.timestamp),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume,
            c.r1,
            c.r2
        ));
    }
    std::fs::write(dir.join(format!("{}_{}.csv", symbol, timeframe)), content).unwrap();
}
