//! Run configuration loaded from TOML.
//!
//! ```toml
//! [engine]
//! initial_capital = 100000.0
//! commission_bps = 1.0
//! order_fill_timing = "next_open"
//!
//! [data]
//! source = "csv"
//! files = [{ path = "spy.csv", symbol = "SPY" }]
//!
//! [strategy]
//! type = "ma_crossover"
//! fast_period = 10
//! slow_period = 50
//! quantity = 100.0
//!
//! [[indicators]]
//! type = "rsi"
//! period = 14
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quantlab_core::config::EngineConfig;
use quantlab_core::indicators::IndicatorSpec;
use quantlab_core::strategy::builtin::{BuyAndHold, MaCrossover, RsiReversion};
use quantlab_core::strategy::{Strategy, StrategyError};

/// Unique identifier for a run configuration (content hash).
pub type RunId = String;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid engine settings: {0}")]
    Engine(#[from] quantlab_core::config::ConfigError),

    #[error("invalid strategy settings: {0}")]
    Strategy(#[from] StrategyError),

    #[error("invalid data settings: {0}")]
    Data(String),
}

/// Complete, serializable description of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    /// Extra indicators beyond what the strategy requires.
    #[serde(default)]
    pub indicators: Vec<IndicatorSpec>,
}

/// Where market events come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataConfig {
    /// One or more CSV files, merged by `(timestamp, symbol)`.
    Csv { files: Vec<CsvFile> },

    /// Seeded random-walk bars, one series per symbol.
    Synthetic {
        symbols: Vec<String>,
        bars: usize,
        #[serde(default)]
        seed: u64,
        #[serde(default = "default_start")]
        start: NaiveDate,
    },
}

/// A CSV file and the symbol to use when rows carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvFile {
    pub path: PathBuf,
    #[serde(default)]
    pub symbol: Option<String>,
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Built-in strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    BuyAndHold {
        quantity: f64,
    },
    MaCrossover {
        fast_period: usize,
        slow_period: usize,
        quantity: f64,
    },
    RsiReversion {
        #[serde(default = "default_rsi_period")]
        period: usize,
        #[serde(default = "default_oversold")]
        oversold: f64,
        #[serde(default = "default_overbought")]
        overbought: f64,
        quantity: f64,
        #[serde(default)]
        offset_bps: f64,
    },
}

fn default_rsi_period() -> usize {
    14
}

fn default_oversold() -> f64 {
    30.0
}

fn default_overbought() -> f64 {
    70.0
}

impl StrategyConfig {
    pub fn build(&self) -> Result<Box<dyn Strategy>, StrategyError> {
        Ok(match *self {
            StrategyConfig::BuyAndHold { quantity } => Box::new(BuyAndHold::new(quantity)?),
            StrategyConfig::MaCrossover {
                fast_period,
                slow_period,
                quantity,
            } => Box::new(MaCrossover::new(fast_period, slow_period, quantity)?),
            StrategyConfig::RsiReversion {
                period,
                oversold,
                overbought,
                quantity,
                offset_bps,
            } => Box::new(RsiReversion::new(
                period, oversold, overbought, quantity, offset_bps,
            )?),
        })
    }
}

impl RunConfig {
    /// Read and parse a TOML file. Relative data paths resolve against the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Make relative CSV paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let DataConfig::Csv { files } = &mut self.data {
            for file in files {
                if file.path.is_relative() {
                    file.path = base.join(&file.path);
                }
            }
        }
    }

    /// Check everything that can be checked without loading data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.strategy.build()?;
        match &self.data {
            DataConfig::Csv { files } if files.is_empty() => {
                Err(ConfigError::Data("csv source lists no files".into()))
            }
            DataConfig::Synthetic { symbols, .. } if symbols.is_empty() => {
                Err(ConfigError::Data("synthetic source lists no symbols".into()))
            }
            DataConfig::Synthetic { bars: 0, .. } => {
                Err(ConfigError::Data("synthetic source needs bars > 0".into()))
            }
            _ => Ok(()),
        }
    }

    /// Configured indicators plus any the strategy needs, without duplicates.
    pub fn indicator_specs(&self, strategy: &dyn Strategy) -> Vec<IndicatorSpec> {
        let mut specs = Vec::new();
        for spec in self
            .indicators
            .iter()
            .cloned()
            .chain(strategy.required_indicators())
        {
            if !specs.iter().any(|s: &IndicatorSpec| s.name() == spec.name()) {
                specs.push(spec);
            }
        }
        specs
    }

    /// Deterministic hash of the configuration.
    pub fn run_id(&self) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
