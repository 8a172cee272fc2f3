//! SQLite data adapter.
//!
//! Stores candle series in `prices` and access keys in `api_keys`.
//! Timestamps are kept as ISO text so lexical order matches time order.

use crate::domain::candle::{Candle, format_timestamp, parse_timestamp};
use crate::domain::error::FlatlandError;
use crate::ports::api_key_port::{ApiKeyPort, ApiKeyRecord};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn query_err(e: rusqlite::Error) -> FlatlandError {
    FlatlandError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn timestamp_from_sql(text: String) -> rusqlite::Result<NaiveDateTime> {
    parse_timestamp(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            text.len(),
            rusqlite::types::Type::Text,
            format!("invalid timestamp '{text}'").into(),
        )
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FlatlandError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| FlatlandError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| FlatlandError::Database {
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %db_path, pool_size, "opened sqlite pool");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, FlatlandError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| FlatlandError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, FlatlandError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| FlatlandError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), FlatlandError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS prices (
                    symbol TEXT NOT NULL,
                    time_frame TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume REAL NOT NULL,
                    r1 REAL NOT NULL,
                    r2 REAL NOT NULL,
                    PRIMARY KEY (symbol, time_frame, timestamp)
                );
                CREATE INDEX IF NOT EXISTS idx_prices_series ON prices(symbol, time_frame);
                CREATE TABLE IF NOT EXISTS api_keys (
                    key TEXT PRIMARY KEY,
                    role TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT ''
                );",
            )
            .map_err(query_err)
    }

    /// Insert or replace a series in one transaction. Returns rows written.
    pub fn insert_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        candles: &[Candle],
    ) -> Result<usize, FlatlandError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for c in candles {
            tx.execute(
                "INSERT OR REPLACE INTO prices
                    (symbol, time_frame, timestamp, open, high, low, close, volume, r1, r2)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    symbol,
                    timeframe,
                    format_timestamp(&c.timestamp),
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    c.volume,
                    c.r1,
                    c.r2
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(candles.len())
    }

    /// Store `key` with the free role unless it already exists.
    pub fn ensure_default_key(&self, key: &str) -> Result<(), FlatlandError> {
        self.conn()?
            .execute(
                "INSERT OR IGNORE INTO api_keys (key, role, description)
                 VALUES (?1, 'free', 'Default free access key')",
                params![key],
            )
            .map_err(query_err)?;
        Ok(())
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, FlatlandError> {
        let conn = self.conn()?;

        // Unbounded ends compare against sentinels that sort outside any ISO timestamp.
        let start_str = start.map(|t| format_timestamp(&t)).unwrap_or_default();
        let end_str = end
            .map(|t| format_timestamp(&t))
            .unwrap_or_else(|| "~".to_string());

        let mut stmt = conn
            .prepare(
                "SELECT timestamp, open, high, low, close, volume, r1, r2
                 FROM prices
                 WHERE symbol = ?1 AND time_frame = ?2 AND timestamp >= ?3 AND timestamp <= ?4
                 ORDER BY timestamp ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![symbol, timeframe, start_str, end_str], |row| {
                Ok(Candle {
                    timestamp: timestamp_from_sql(row.get(0)?)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                    r1: row.get(6)?,
                    r2: row.get(7)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, FlatlandError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM prices WHERE time_frame = ?1 ORDER BY symbol")
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![timeframe], |row| row.get(0))
            .map_err(query_err)?;

        rows.collect::<Result<Vec<String>, _>>().map_err(query_err)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, FlatlandError> {
        let conn = self.conn()?;

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*)
                 FROM prices WHERE symbol = ?1 AND time_frame = ?2",
                params![symbol, timeframe],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = timestamp_from_sql(min_str).map_err(query_err)?;
                let max = timestamp_from_sql(max_str).map_err(query_err)?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl ApiKeyPort for SqliteAdapter {
    fn lookup(&self, key: &str) -> Result<Option<ApiKeyRecord>, FlatlandError> {
        self.conn()?
            .query_row(
                "SELECT key, role, description FROM api_keys WHERE key = ?1",
                params![key],
                |row| {
                    Ok(ApiKeyRecord {
                        key: row.get(0)?,
                        role: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(query_err)
    }
}
