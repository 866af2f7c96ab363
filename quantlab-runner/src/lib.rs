//! QuantLab Runner — configuration, data sources, and result artifacts.
//!
//! This crate builds on `quantlab-core` to provide:
//! - TOML run configuration with built-in strategy selection
//! - CSV and seeded synthetic data sources
//! - A runner that wires configuration, data, and engine together
//! - JSON/CSV/text export of results
//! - Text plot series (equity curve, drawdown)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod plot;
pub mod runner;

pub use config::{ConfigError, CsvFile, DataConfig, RunConfig, StrategyConfig};
pub use data_loader::{CsvSource, LoadError, SyntheticSource};
pub use export::{export_json, import_json, save_artifacts};
pub use plot::{DrawdownPlot, EquityCurvePlot, Plot};
pub use runner::{check_config, prepare_backtest, run_from_config, CheckReport, RunError};
