//! Moving average crossover — golden cross enters, death cross exits.
//!
//! Goes long `quantity` when the fast SMA crosses above the slow SMA while
//! flat, and sells the whole position when it crosses back below.

use std::collections::BTreeMap;

use crate::domain::OrderIntent;
use crate::indicators::{IndicatorSpec, IndicatorValues};
use crate::strategy::{lookup, MarketState, Strategy, StrategyError};

/// Moving average crossover strategy.
///
/// # Indicator dependencies
/// - Fast: `sma_{fast_period}`
/// - Slow: `sma_{slow_period}`
#[derive(Debug, Clone)]
pub struct MaCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
    pub quantity: f64,
    fast_key: String,
    slow_key: String,
    /// Last (fast, slow) pair seen per symbol.
    previous: BTreeMap<String, (f64, f64)>,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize, quantity: f64) -> Result<Self, StrategyError> {
        if fast_period == 0 || slow_period <= fast_period {
            return Err(StrategyError::InvalidParameters(format!(
                "ma_crossover needs 0 < fast < slow (got fast={fast_period}, slow={slow_period})"
            )));
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(StrategyError::InvalidParameters(format!(
                "ma_crossover quantity must be positive (got {quantity})"
            )));
        }
        Ok(Self {
            fast_period,
            slow_period,
            quantity,
            fast_key: IndicatorSpec::Sma { period: fast_period }.name(),
            slow_key: IndicatorSpec::Sma { period: slow_period }.name(),
            previous: BTreeMap::new(),
        })
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn on_event(
        &mut self,
        state: &MarketState<'_>,
        indicators: &IndicatorValues,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        let fast = lookup(indicators, &self.fast_key)?;
        let slow = lookup(indicators, &self.slow_key)?;
        let (Some(fast), Some(slow)) = (fast, slow) else {
            return Ok(Vec::new());
        };

        let symbol = state.symbol();
        let previous = self.previous.insert(symbol.to_string(), (fast, slow));
        let Some((fast_prev, slow_prev)) = previous else {
            return Ok(Vec::new());
        };

        let held = state.quantity(symbol);
        if fast > slow && fast_prev <= slow_prev && held <= 0.0 {
            return Ok(vec![OrderIntent::market_buy(symbol, self.quantity)]);
        }
        if fast < slow && fast_prev >= slow_prev && held > 0.0 {
            return Ok(vec![OrderIntent::market_sell(symbol, held)]);
        }
        Ok(Vec::new())
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Sma {
                period: self.fast_period,
            },
            IndicatorSpec::Sma {
                period: self.slow_period,
            },
        ]
    }
}
