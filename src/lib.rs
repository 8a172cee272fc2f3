//! flatland: R1/R2 breakout signal backtester.
//!
//! Hexagonal architecture: the detector, simulator and aggregator live in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
