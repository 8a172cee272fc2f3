//! Core domain types and logic.

pub mod candle;
pub mod signal;
pub mod trade;
pub mod performance;
pub mod backtest;
pub mod config_validation;
pub mod error;
