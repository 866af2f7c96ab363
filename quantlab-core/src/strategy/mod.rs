//! Strategy interface — user logic invoked once per market event.
//!
//! A strategy sees the current [`MarketState`] (event, cash, positions,
//! pending orders) and the indicator values for the event's symbol, and
//! returns the order intents it wants submitted. State persists across
//! events in the single strategy instance owned by the run.

pub mod builtin;
pub mod runtime;

pub use runtime::{StrategyOutput, StrategyRuntime};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{MarketEvent, OrderIntent, OrderRef, PendingOrder, Position};
use crate::indicators::{IndicatorError, IndicatorSpec, IndicatorValues};
use crate::ledger::PortfolioLedger;

/// Errors a strategy may raise. Any of these halts the run as a strategy fault.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("indicator '{0}' is not configured")]
    MissingIndicator(String),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    Fault(String),
}

/// Read-only view of the run at the current event.
#[derive(Clone, Copy)]
pub struct MarketState<'a> {
    event: &'a MarketEvent,
    step: usize,
    ledger: &'a PortfolioLedger,
    pending: &'a [PendingOrder],
}

impl<'a> MarketState<'a> {
    pub fn new(
        event: &'a MarketEvent,
        step: usize,
        ledger: &'a PortfolioLedger,
        pending: &'a [PendingOrder],
    ) -> Self {
        Self {
            event,
            step,
            ledger,
            pending,
        }
    }

    pub fn event(&self) -> &'a MarketEvent {
        self.event
    }

    /// Zero-based index of the current event in the run.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.event.timestamp
    }

    pub fn symbol(&self) -> &'a str {
        &self.event.symbol
    }

    pub fn cash(&self) -> f64 {
        self.ledger.cash()
    }

    pub fn equity(&self) -> f64 {
        self.ledger.equity()
    }

    pub fn position(&self, symbol: &str) -> Option<&'a Position> {
        self.ledger.position(symbol)
    }

    /// Signed quantity held, zero when flat.
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.ledger.quantity(symbol)
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.ledger.mark_price(symbol)
    }

    pub fn pending_orders(&self) -> &'a [PendingOrder] {
        self.pending
    }

    pub fn pending_for(&self, symbol: &'a str) -> impl Iterator<Item = &'a PendingOrder> + 'a {
        self.pending
            .iter()
            .filter(move |order| order.intent.symbol == symbol)
    }
}

/// User strategy logic.
pub trait Strategy: Send {
    /// Name used in fault reports and results.
    fn name(&self) -> &str;

    /// Called exactly once per market event.
    fn on_event(
        &mut self,
        state: &MarketState<'_>,
        indicators: &IndicatorValues,
    ) -> Result<Vec<OrderIntent>, StrategyError>;

    /// Pending orders to cancel, asked right after `on_event`.
    fn cancel_requests(&mut self, _state: &MarketState<'_>) -> Vec<OrderRef> {
        Vec::new()
    }

    /// Indicators this strategy reads. Runners add any that are missing.
    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        Vec::new()
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_event(
        &mut self,
        state: &MarketState<'_>,
        indicators: &IndicatorValues,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        (**self).on_event(state, indicators)
    }

    fn cancel_requests(&mut self, state: &MarketState<'_>) -> Vec<OrderRef> {
        (**self).cancel_requests(state)
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        (**self).required_indicators()
    }
}

/// Look up an indicator the strategy depends on.
///
/// `Ok(None)` while the indicator warms up; `Err` if it was never configured.
pub fn lookup(indicators: &IndicatorValues, name: &str) -> Result<Option<f64>, StrategyError> {
    indicators
        .get(name)
        .map(|value| value.value())
        .ok_or_else(|| StrategyError::MissingIndicator(name.to_string()))
}
