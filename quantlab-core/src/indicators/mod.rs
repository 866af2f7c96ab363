//! Incremental indicators.
//!
//! Every indicator implements [`Indicator`]: it consumes one event at a time
//! and keeps only the state its window needs, so long histories cost O(1) or
//! O(window) per event. Until the warm-up window is satisfied an indicator
//! reports [`IndicatorValue::WarmingUp`] instead of a number.

pub mod ema;
pub mod engine;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod trendflex;
pub mod volatility;

pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorValues};
pub use momentum::Momentum;
pub use rsi::Rsi;
pub use sma::Sma;
pub use trendflex::Trendflex;
pub use volatility::Volatility;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MarketEvent;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("indicator '{name}' needs {remaining} more bars")]
    InsufficientHistory { name: String, remaining: usize },

    #[error("indicator '{0}' is not configured")]
    Unknown(String),

    #[error("{kind} period must be >= 1 (got {period})")]
    InvalidPeriod { kind: &'static str, period: usize },

    #[error("duplicate indicator name '{0}'")]
    DuplicateName(String),
}

/// Current output of an indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Ready(f64),
    /// Not enough history yet; `remaining` more events are needed.
    WarmingUp { remaining: usize },
}

impl IndicatorValue {
    pub fn value(self) -> Option<f64> {
        match self {
            IndicatorValue::Ready(v) => Some(v),
            IndicatorValue::WarmingUp { .. } => None,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, IndicatorValue::Ready(_))
    }

    pub(crate) fn warming(seen: usize, warmup: usize) -> Self {
        IndicatorValue::WarmingUp {
            remaining: warmup.saturating_sub(seen),
        }
    }
}

/// Trait for incremental indicators.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of events needed before the first `Ready` value.
    fn warmup(&self) -> usize;

    /// Fold one event into the indicator state.
    fn update(&mut self, event: &MarketEvent);

    fn current_value(&self) -> IndicatorValue;
}

/// Serializable indicator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Volatility { period: usize },
    Momentum { period: usize },
    Rsi { period: usize },
    Trendflex { period: usize },
}

impl IndicatorSpec {
    fn kind_and_period(&self) -> (&'static str, usize) {
        match *self {
            IndicatorSpec::Sma { period } => ("sma", period),
            IndicatorSpec::Ema { period } => ("ema", period),
            IndicatorSpec::Volatility { period } => ("volatility", period),
            IndicatorSpec::Momentum { period } => ("momentum", period),
            IndicatorSpec::Rsi { period } => ("rsi", period),
            IndicatorSpec::Trendflex { period } => ("trendflex", period),
        }
    }

    /// Name the built indicator will report, e.g. "sma_20".
    pub fn name(&self) -> String {
        let (kind, period) = self.kind_and_period();
        format!("{kind}_{period}")
    }

    /// Build a fresh indicator instance.
    pub fn build(&self) -> Result<Box<dyn Indicator>, IndicatorError> {
        Ok(match *self {
            IndicatorSpec::Sma { period } => Box::new(Sma::new(period)?),
            IndicatorSpec::Ema { period } => Box::new(Ema::new(period)?),
            IndicatorSpec::Volatility { period } => Box::new(Volatility::new(period)?),
            IndicatorSpec::Momentum { period } => Box::new(Momentum::new(period)?),
            IndicatorSpec::Rsi { period } => Box::new(Rsi::new(period)?),
            IndicatorSpec::Trendflex { period } => Box::new(Trendflex::new(period)?),
        })
    }
}

/// Create test events from close prices.
///
/// open = prev_close (or close for the first event),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_events(closes: &[f64]) -> Vec<MarketEvent> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            MarketEvent {
                timestamp: base + chrono::Duration::days(i as i64),
                symbol: "TEST".to_string(),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Feed closes through an indicator, collecting the value after each event.
#[cfg(test)]
pub fn run_indicator(indicator: &mut dyn Indicator, closes: &[f64]) -> Vec<IndicatorValue> {
    make_events(closes)
        .iter()
        .map(|e| {
            indicator.update(e);
            indicator.current_value()
        })
        .collect()
}

/// Assert an indicator value is ready and approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_ready(actual: IndicatorValue, expected: f64, epsilon: f64) {
    match actual {
        IndicatorValue::Ready(v) => assert!(
            (v - expected).abs() < epsilon,
            "assert_ready failed: actual={v}, expected={expected}, epsilon={epsilon}"
        ),
        other => panic!("expected Ready({expected}), got {other:?}"),
    }
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
