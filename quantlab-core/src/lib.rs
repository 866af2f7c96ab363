//! QuantLab Core — deterministic event-driven backtesting engine.
//!
//! This crate contains the engine and its components:
//! - Domain types (market events, order intents, fills, positions, snapshots)
//! - Event feed with strict `(timestamp, symbol)` ordering
//! - Incremental indicator engine
//! - Strategy trait, runtime fault boundary, and built-in strategies
//! - Execution simulator with slippage, commission, and limit order book
//! - Portfolio ledger with average-cost accounting
//! - Backtester orchestrating the per-event pipeline

pub mod backtester;
pub mod config;
pub mod domain;
pub mod error;
pub mod execution;
pub mod feed;
pub mod indicators;
pub mod ledger;
pub mod metrics;
pub mod result;
pub mod strategy;

pub use backtester::{Backtester, StopHandle};
pub use config::{EngineConfig, FillTiming};
pub use error::{BacktestError, OrderError, OrderRejection, RunFault};
pub use result::{BacktestResult, RunState, Termination};
