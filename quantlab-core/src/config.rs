//! Engine configuration — execution costs, fill timing, short selling.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from engine configuration validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number (got {value})")]
    NegativeOrNonFinite { field: &'static str, value: f64 },

    #[error("initial_capital must be positive (got {0})")]
    NonPositiveCapital(f64),

    #[error("limit_order_ttl_secs must be positive (got {0})")]
    NonPositiveTtl(i64),

    #[error("periods_per_year must be positive (got {0})")]
    NonPositivePeriods(f64),
}

/// When market orders fill relative to the bar on which they were decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillTiming {
    /// Fill at the close of the current bar.
    #[default]
    Close,
    /// Fill at the open of the next bar for the same symbol.
    NextOpen,
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Slippage in basis points, applied directionally to market fills.
    pub slippage_bps: f64,
    /// Commission in basis points of traded value.
    pub commission_bps: f64,
    /// Minimum commission per fill.
    pub fixed_fee: f64,
    pub allow_short: bool,
    pub order_fill_timing: FillTiming,
    /// Pending limit orders older than this are expired. `None` = good till cancelled.
    pub limit_order_ttl_secs: Option<i64>,
    /// Annualisation factor for return-based metrics.
    pub periods_per_year: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            slippage_bps: 0.0,
            commission_bps: 0.0,
            fixed_fee: 0.0,
            allow_short: false,
            order_fill_timing: FillTiming::Close,
            limit_order_ttl_secs: None,
            periods_per_year: 252.0,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    pub fn limit_order_ttl(&self) -> Option<Duration> {
        self.limit_order_ttl_secs.map(Duration::seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        for (field, value) in [
            ("slippage_bps", self.slippage_bps),
            ("commission_bps", self.commission_bps),
            ("fixed_fee", self.fixed_fee),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeOrNonFinite { field, value });
            }
        }
        if let Some(ttl) = self.limit_order_ttl_secs {
            if ttl <= 0 {
                return Err(ConfigError::NonPositiveTtl(ttl));
            }
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(ConfigError::NonPositivePeriods(self.periods_per_year));
        }
        Ok(())
    }
}
