//! RSI mean reversion with resting limit orders.
//!
//! When RSI drops below `oversold` while flat, rests a buy limit
//! `offset_bps` below the close. When RSI rises above `overbought` while
//! long, rests a sell limit `offset_bps` above the close for the whole
//! position. Unfilled entry orders are cancelled once RSI recovers to 50.

use std::collections::BTreeMap;

use crate::domain::{OrderIntent, OrderRef, OrderSide, OrderType};
use crate::indicators::{IndicatorSpec, IndicatorValues};
use crate::strategy::{lookup, MarketState, Strategy, StrategyError};

#[derive(Debug, Clone)]
pub struct RsiReversion {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub quantity: f64,
    pub offset_bps: f64,
    rsi_key: String,
    last_rsi: BTreeMap<String, f64>,
}

impl RsiReversion {
    pub fn new(
        period: usize,
        oversold: f64,
        overbought: f64,
        quantity: f64,
        offset_bps: f64,
    ) -> Result<Self, StrategyError> {
        if period == 0 {
            return Err(StrategyError::InvalidParameters(
                "rsi_reversion period must be positive".into(),
            ));
        }
        if !(oversold > 0.0 && oversold < overbought && overbought <= 100.0) {
            return Err(StrategyError::InvalidParameters(format!(
                "rsi_reversion needs 0 < oversold < overbought <= 100 (got {oversold}, {overbought})"
            )));
        }
        if !quantity.is_finite() || quantity <= 0.0 || !offset_bps.is_finite() || offset_bps < 0.0 {
            return Err(StrategyError::InvalidParameters(format!(
                "rsi_reversion quantity must be positive and offset non-negative (got {quantity}, {offset_bps})"
            )));
        }
        Ok(Self {
            period,
            oversold,
            overbought,
            quantity,
            offset_bps,
            rsi_key: IndicatorSpec::Rsi { period }.name(),
            last_rsi: BTreeMap::new(),
        })
    }

    fn has_pending(state: &MarketState<'_>, side: OrderSide) -> bool {
        state
            .pending_for(state.symbol())
            .any(|order| order.intent.side == side)
    }
}

impl Strategy for RsiReversion {
    fn name(&self) -> &str {
        "rsi_reversion"
    }

    fn on_event(
        &mut self,
        state: &MarketState<'_>,
        indicators: &IndicatorValues,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        let Some(rsi) = lookup(indicators, &self.rsi_key)? else {
            return Ok(Vec::new());
        };
        let symbol = state.symbol();
        self.last_rsi.insert(symbol.to_string(), rsi);

        let close = state.event().close;
        let held = state.quantity(symbol);
        let offset = self.offset_bps / 10_000.0;

        if rsi < self.oversold && held <= 0.0 && !Self::has_pending(state, OrderSide::Buy) {
            let limit = close * (1.0 - offset);
            return Ok(vec![OrderIntent::limit_buy(symbol, self.quantity, limit)]);
        }
        if rsi > self.overbought && held > 0.0 && !Self::has_pending(state, OrderSide::Sell) {
            let limit = close * (1.0 + offset);
            return Ok(vec![OrderIntent::limit_sell(symbol, held, limit)]);
        }
        Ok(Vec::new())
    }

    fn cancel_requests(&mut self, state: &MarketState<'_>) -> Vec<OrderRef> {
        let recovered = self
            .last_rsi
            .get(state.symbol())
            .is_some_and(|rsi| *rsi >= 50.0);
        if !recovered {
            return Vec::new();
        }
        state
            .pending_for(state.symbol())
            .filter(|order| {
                order.intent.side == OrderSide::Buy
                    && matches!(order.intent.order_type, OrderType::Limit { .. })
            })
            .map(|order| order.order_ref)
            .collect()
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Rsi {
            period: self.period,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PendingOrder;
    use crate::feed::make_event;
    use crate::indicators::IndicatorValue;
    use crate::ledger::PortfolioLedger;

    fn rsi(value: f64) -> IndicatorValues {
        let mut values = IndicatorValues::new("SPY");
        values.insert("rsi_14", IndicatorValue::Ready(value));
        values
    }

    fn strategy() -> RsiReversion {
        RsiReversion::new(14, 30.0, 70.0, 10.0, 100.0).unwrap()
    }

    #[test]
    fn oversold_rests_buy_limit_below_close() {
        let mut strategy = strategy();
        let ledger = PortfolioLedger::new(10_000.0);
        let event = make_event("SPY", 0, 100.0);
        let state = MarketState::new(&event, 0, &ledger, &[]);
        let orders = strategy.on_event(&state, &rsi(25.0)).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert!((orders[0].order_type.limit_price().unwrap() - 99.0).abs() < 1e-9);
    }

    #[test]
    fn no_duplicate_entry_while_pending() {
        let mut strategy = strategy();
        let ledger = PortfolioLedger::new(10_000.0);
        let event = make_event("SPY", 0, 100.0);
        let pending = vec![PendingOrder {
            order_ref: OrderRef(1),
            intent: OrderIntent::limit_buy("SPY", 10.0, 99.0),
            submitted_at: event.timestamp,
            submitted_step: 0,
        }];
        let state = MarketState::new(&event, 1, &ledger, &pending);
        assert!(strategy.on_event(&state, &rsi(20.0)).unwrap().is_empty());
    }

    #[test]
    fn recovery_cancels_pending_entry() {
        let mut strategy = strategy();
        let ledger = PortfolioLedger::new(10_000.0);
        let event = make_event("SPY", 0, 100.0);
        let pending = vec![PendingOrder {
            order_ref: OrderRef(3),
            intent: OrderIntent::limit_buy("SPY", 10.0, 99.0),
            submitted_at: event.timestamp,
            submitted_step: 0,
        }];
        let state = MarketState::new(&event, 1, &ledger, &pending);
        strategy.on_event(&state, &rsi(40.0)).unwrap();
        assert!(strategy.cancel_requests(&state).is_empty());
        strategy.on_event(&state, &rsi(55.0)).unwrap();
        assert_eq!(strategy.cancel_requests(&state), vec![OrderRef(3)]);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        assert!(RsiReversion::new(14, 70.0, 30.0, 1.0, 0.0).is_err());
    }
}
