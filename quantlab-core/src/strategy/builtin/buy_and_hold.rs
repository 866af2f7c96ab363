//! Buy-and-hold — one market buy per symbol on its first event.

use std::collections::BTreeSet;

use crate::domain::OrderIntent;
use crate::indicators::IndicatorValues;
use crate::strategy::{MarketState, Strategy, StrategyError};

#[derive(Debug, Clone)]
pub struct BuyAndHold {
    quantity: f64,
    entered: BTreeSet<String>,
}

impl BuyAndHold {
    pub fn new(quantity: f64) -> Result<Self, StrategyError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(StrategyError::InvalidParameters(format!(
                "buy_and_hold quantity must be positive (got {quantity})"
            )));
        }
        Ok(Self {
            quantity,
            entered: BTreeSet::new(),
        })
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_event(
        &mut self,
        state: &MarketState<'_>,
        _indicators: &IndicatorValues,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        let symbol = state.symbol();
        if self.entered.insert(symbol.to_string()) {
            Ok(vec![OrderIntent::market_buy(symbol, self.quantity)])
        } else {
            Ok(Vec::new())
        }
    }
}
