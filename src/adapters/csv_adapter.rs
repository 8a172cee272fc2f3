//! CSV file data adapter.
//!
//! One file per series, named `{SYMBOL}_{TIMEFRAME}.csv`, with header
//! `timestamp,open,high,low,close,volume,r1,r2`.

use crate::domain::candle::{Candle, parse_timestamp};
use crate::domain::error::FlatlandError;
use crate::ports::data_port::{DataPort, in_range};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    r1: f64,
    r2: f64,
}

impl CandleRow {
    fn into_candle(self) -> Result<Candle, FlatlandError> {
        let timestamp =
            parse_timestamp(&self.timestamp).ok_or_else(|| FlatlandError::DataFormat {
                reason: format!("invalid timestamp '{}'", self.timestamp),
            })?;
        Ok(Candle {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            r1: self.r1,
            r2: self.r2,
        })
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe))
    }

    fn read_all(&self, symbol: &str, timeframe: &str) -> Result<Vec<Candle>, FlatlandError> {
        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| FlatlandError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut candles = Vec::new();
        for row in rdr.deserialize::<CandleRow>() {
            let row = row.map_err(|e| FlatlandError::DataFormat {
                reason: format!("{}: {}", path.display(), e),
            })?;
            candles.push(row.into_candle()?);
        }

        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, FlatlandError> {
        let mut candles = self.read_all(symbol, timeframe)?;
        candles.retain(|c| in_range(c.timestamp, start, end));
        Ok(candles)
    }

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, FlatlandError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FlatlandError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", timeframe);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| FlatlandError::Database {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, FlatlandError> {
        if !self.csv_path(symbol, timeframe).exists() {
            return Ok(None);
        }
        let candles = self.read_all(symbol, timeframe)?;
        Ok(match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, candles.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const HEADER: &str = "timestamp,open,high,low,close,volume,r1,r2\n";

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // Out of order with one duplicate timestamp.
        let btc = format!(
            "{HEADER}\
            2024-01-15T01:00:00,110.0,120.0,105.0,115.0,55.5,360.0,310.0\n\
            2024-01-15T00:00:00,100.0,110.0,90.0,105.0,50.0,340.0,300.0\n\
            2024-01-15T00:30:00,105.0,115.0,100.0,110.0,60.0,420.0,480.0\n\
            2024-01-15T00:30:00,105.0,115.0,100.0,110.0,60.0,420.0,480.0\n"
        );
        fs::write(path.join("BTC_30m.csv"), btc).unwrap();
        fs::write(path.join("ETH_30m.csv"), HEADER).unwrap();
        fs::write(path.join("BTC_1h.csv"), HEADER).unwrap();
        fs::write(
            path.join("BAD_30m.csv"),
            format!("{HEADER}yesterday,1,2,0.5,1.5,10,1,1\n"),
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_candles_sorted_and_deduplicated() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let candles = adapter.fetch_candles("BTC", "30m", None, None).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].timestamp, ts(0, 0));
        assert_eq!(candles[1].timestamp, ts(0, 30));
        assert_eq!(candles[2].timestamp, ts(1, 0));
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].high, 110.0);
        assert_eq!(candles[0].low, 90.0);
        assert_eq!(candles[0].close, 105.0);
        assert_eq!(candles[2].volume, 55.5);
        assert_eq!(candles[1].r1, 420.0);
        assert_eq!(candles[1].r2, 480.0);
    }

    #[test]
    fn fetch_candles_filters_by_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let candles = adapter
            .fetch_candles("BTC", "30m", Some(ts(0, 30)), Some(ts(0, 30)))
            .unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, ts(0, 30));

        let candles = adapter
            .fetch_candles("BTC", "30m", Some(ts(0, 15)), None)
            .unwrap();
        assert_eq!(candles.len(), 2);
    }

    #[test]
    fn fetch_candles_missing_file_is_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_candles("XYZ", "30m", None, None);
        assert!(matches!(result, Err(FlatlandError::Database { .. })));
    }

    #[test]
    fn fetch_candles_bad_timestamp_is_data_format_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_candles("BAD", "30m", None, None);
        assert!(matches!(result, Err(FlatlandError::DataFormat { .. })));
    }

    #[test]
    fn list_symbols_by_timeframe() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(
            adapter.list_symbols("30m").unwrap(),
            vec!["BAD", "BTC", "ETH"]
        );
        assert_eq!(adapter.list_symbols("1h").unwrap(), vec!["BTC"]);
    }

    #[test]
    fn data_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let (min, max, count) = adapter.get_data_range("BTC", "30m").unwrap().unwrap();
        assert_eq!(min, ts(0, 0));
        assert_eq!(max, ts(1, 0));
        assert_eq!(count, 3);

        assert!(adapter.get_data_range("ETH", "30m").unwrap().is_none());
        assert!(adapter.get_data_range("XYZ", "30m").unwrap().is_none());
    }
}
