//! Candle data access port trait.

use crate::domain::candle::Candle;
use crate::domain::error::FlatlandError;
use chrono::NaiveDateTime;

/// Source of candle series. Implementations return candles sorted by
/// ascending timestamp with duplicates removed.
pub trait DataPort {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, FlatlandError>;

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, FlatlandError>;

    fn get_data_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, FlatlandError>;
}

/// Inclusive range check shared by adapters that filter in memory.
pub fn in_range(
    ts: NaiveDateTime,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> bool {
    start.is_none_or(|s| ts >= s) && end.is_none_or(|e| ts <= e)
}
