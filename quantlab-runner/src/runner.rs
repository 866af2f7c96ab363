//! Backtest runner — wires configuration, data, and the engine together.
//!
//! Entry points:
//! - `prepare_backtest()`: builds a ready-to-run `Backtester` (callers may
//!   grab its stop handle before running).
//! - `run_from_config()`: prepare and run in one call. Used by the CLI.
//! - `check_config()`: validate configuration and data without running.

use thiserror::Error;

use quantlab_core::feed::{EventFeed, FeedError};
use quantlab_core::{BacktestError, BacktestResult, Backtester};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{build_source, dataset_hash};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] FeedError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Build a `Backtester` with strategy, indicators, and feed bound.
pub fn prepare_backtest(config: &RunConfig) -> Result<Backtester, RunError> {
    config.validate()?;
    let strategy = config
        .strategy
        .build()
        .map_err(ConfigError::Strategy)?;
    let indicators = config.indicator_specs(strategy.as_ref());
    let source = build_source(&config.data);
    let feed = EventFeed::from_source(source.as_ref())?;

    tracing::info!(
        source = source.name(),
        events = feed.len(),
        strategy = strategy.name(),
        indicators = indicators.len(),
        "backtest prepared"
    );

    Ok(Backtester::new(config.engine.clone())
        .with_boxed_strategy(strategy)
        .with_indicators(indicators)
        .with_feed(feed))
}

/// Run a backtest described by `config`.
///
/// Data and strategy faults during the run are not errors: they come back
/// inside the (partial) result.
pub fn run_from_config(config: &RunConfig) -> Result<BacktestResult, RunError> {
    let mut backtester = prepare_backtest(config)?;
    Ok(backtester.run()?)
}

/// What `check_config` found.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub events: usize,
    pub symbols: Vec<String>,
    pub first: Option<chrono::DateTime<chrono::Utc>>,
    pub last: Option<chrono::DateTime<chrono::Utc>>,
    pub dataset_hash: String,
}

/// Validate configuration, load the data, and verify its ordering.
pub fn check_config(config: &RunConfig) -> Result<CheckReport, RunError> {
    config.validate()?;
    let source = build_source(&config.data);
    let feed = EventFeed::from_source(source.as_ref())?;
    feed.verify()?;

    let events: Vec<_> = feed.collect::<Result<_, _>>()?;
    let mut symbols: Vec<String> = events.iter().map(|e| e.symbol.clone()).collect();
    symbols.sort();
    symbols.dedup();

    Ok(CheckReport {
        events: events.len(),
        symbols,
        first: events.first().map(|e| e.timestamp),
        last: events.last().map(|e| e.timestamp),
        dataset_hash: dataset_hash(&events),
    })
}
