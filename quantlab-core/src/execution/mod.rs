//! Execution simulator — turns order intents into fills.
//!
//! Per event, `apply` runs three phases:
//! 1. Expire pending limit orders older than the configured TTL.
//! 2. Re-evaluate pending orders for the event's symbol that were submitted
//!    on an earlier step (next-open market orders, limit orders).
//! 3. Accept the new intents: close-timed market orders fill immediately,
//!    everything else joins the pending book.
//!
//! Each fill is applied to the ledger as soon as it is produced, so funds and
//! holdings checks for later orders in the same step see the updated state.
//! Rejections are per-order and never abort the run.

pub mod cost_model;

pub use cost_model::CostModel;

use chrono::Duration;

use crate::config::{EngineConfig, FillTiming};
use crate::domain::{
    Fill, IdGen, MarketEvent, OrderIntent, OrderRef, OrderSide, OrderType, PendingOrder,
};
use crate::error::{OrderError, OrderRejection};
use crate::ledger::PortfolioLedger;

/// Tolerance for funds and holdings comparisons.
const EPSILON: f64 = 1e-9;

/// Everything that happened to orders during one `apply` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub fills: Vec<Fill>,
    pub rejections: Vec<OrderRejection>,
    pub expired: Vec<OrderRef>,
}

/// Where a triggered order's raw price came from.
#[derive(Debug, Clone, Copy)]
enum PriceSource {
    /// Market fill: slippage applies.
    Market(f64),
    /// Limit fill: executed at the limit price, no slippage.
    Limit(f64),
}

pub struct ExecutionSimulator {
    cost_model: CostModel,
    timing: FillTiming,
    allow_short: bool,
    ttl: Option<Duration>,
    /// Pending orders in submission order.
    pending: Vec<PendingOrder>,
    ids: IdGen,
}

impl ExecutionSimulator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cost_model: CostModel::from_config(config),
            timing: config.order_fill_timing,
            allow_short: config.allow_short,
            ttl: config.limit_order_ttl(),
            pending: Vec::new(),
            ids: IdGen::default(),
        }
    }

    pub fn pending(&self) -> &[PendingOrder] {
        &self.pending
    }

    /// Remove a pending order. Returns it if it was still pending.
    pub fn cancel(&mut self, order_ref: OrderRef) -> Option<PendingOrder> {
        let idx = self.pending.iter().position(|o| o.order_ref == order_ref)?;
        let order = self.pending.remove(idx);
        tracing::debug!(order = %order_ref, symbol = %order.intent.symbol, "order cancelled");
        Some(order)
    }

    /// Drain the pending book (orders still open at the end of a run).
    pub fn take_pending(&mut self) -> Vec<PendingOrder> {
        std::mem::take(&mut self.pending)
    }

    /// Process one event: expire, re-evaluate pending orders, accept new intents.
    pub fn apply(
        &mut self,
        intents: Vec<OrderIntent>,
        event: &MarketEvent,
        step: usize,
        ledger: &mut PortfolioLedger,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        self.expire(event, &mut report);
        self.process_pending(event, step, ledger, &mut report);
        for intent in intents {
            self.submit(intent, event, step, ledger, &mut report);
        }
        report
    }

    fn expire(&mut self, event: &MarketEvent, report: &mut ExecutionReport) {
        let Some(ttl) = self.ttl else {
            return;
        };
        self.pending.retain(|order| {
            let is_limit = matches!(order.intent.order_type, OrderType::Limit { .. });
            let expired = is_limit && event.timestamp - order.submitted_at > ttl;
            if expired {
                tracing::debug!(order = %order.order_ref, symbol = %order.intent.symbol, "limit order expired");
                report.expired.push(order.order_ref);
            }
            !expired
        });
    }

    fn process_pending(
        &mut self,
        event: &MarketEvent,
        step: usize,
        ledger: &mut PortfolioLedger,
        report: &mut ExecutionReport,
    ) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for order in std::mem::take(&mut self.pending) {
            let eligible = order.intent.symbol == event.symbol && order.submitted_step < step;
            let trigger = if eligible {
                trigger_price(&order.intent, event)
            } else {
                None
            };
            match trigger {
                Some(source) => {
                    self.execute(order.order_ref, &order.intent, source, event, ledger, report);
                }
                None => still_pending.push(order),
            }
        }
        self.pending = still_pending;
    }

    fn submit(
        &mut self,
        intent: OrderIntent,
        event: &MarketEvent,
        step: usize,
        ledger: &mut PortfolioLedger,
        report: &mut ExecutionReport,
    ) {
        let order_ref = self.ids.next_order_ref();

        if let Err(err) = self.validate(&intent, ledger) {
            reject(order_ref, &intent, event, err, report);
            return;
        }

        match (intent.order_type, self.timing) {
            (OrderType::Market, FillTiming::Close) => {
                let source = PriceSource::Market(event.close);
                self.execute(order_ref, &intent, source, event, ledger, report);
            }
            _ => {
                self.pending.push(PendingOrder {
                    order_ref,
                    intent,
                    submitted_at: event.timestamp,
                    submitted_step: step,
                });
            }
        }
    }

    /// Submission-time checks: positive finite quantity and limit price,
    /// and no sell beyond holdings when shorting is disabled.
    fn validate(&self, intent: &OrderIntent, ledger: &PortfolioLedger) -> Result<(), OrderError> {
        if !intent.quantity.is_finite() || intent.quantity <= 0.0 {
            return Err(OrderError::InvalidQuantity {
                quantity: intent.quantity,
            });
        }
        if let OrderType::Limit { limit_price } = intent.order_type {
            if !limit_price.is_finite() || limit_price <= 0.0 {
                return Err(OrderError::InvalidLimitPrice { limit_price });
            }
        }
        self.check_holdings(intent, ledger)
    }

    fn check_holdings(&self, intent: &OrderIntent, ledger: &PortfolioLedger) -> Result<(), OrderError> {
        if intent.side == OrderSide::Sell && !self.allow_short {
            let held = ledger.quantity(&intent.symbol).max(0.0);
            if intent.quantity > held + EPSILON {
                return Err(OrderError::Oversell {
                    requested: intent.quantity,
                    held,
                });
            }
        }
        Ok(())
    }

    /// Price the order, run fill-time checks, and apply the fill to the ledger.
    fn execute(
        &self,
        order_ref: OrderRef,
        intent: &OrderIntent,
        source: PriceSource,
        event: &MarketEvent,
        ledger: &mut PortfolioLedger,
        report: &mut ExecutionReport,
    ) {
        let (fill_price, slippage) = match source {
            PriceSource::Market(raw) => {
                self.cost_model
                    .apply_slippage(raw, intent.side, intent.quantity)
            }
            PriceSource::Limit(price) => (price, 0.0),
        };
        let commission = self.cost_model.compute_commission(fill_price, intent.quantity);

        let check = match intent.side {
            OrderSide::Buy => {
                let required = fill_price * intent.quantity + commission;
                let available = ledger.cash();
                if required > available + EPSILON {
                    Err(OrderError::InsufficientFunds {
                        required,
                        available,
                    })
                } else {
                    Ok(())
                }
            }
            OrderSide::Sell => self.check_holdings(intent, ledger),
        };
        if let Err(err) = check {
            reject(order_ref, intent, event, err, report);
            return;
        }

        let fill = Fill {
            order_ref,
            timestamp: event.timestamp,
            symbol: intent.symbol.clone(),
            side: intent.side,
            fill_price,
            quantity: intent.quantity,
            commission,
            slippage,
        };
        ledger.record_fill(&fill);
        report.fills.push(fill);
    }
}

/// Raw price at which a pending order executes against this bar, if it does.
fn trigger_price(intent: &OrderIntent, event: &MarketEvent) -> Option<PriceSource> {
    match (intent.order_type, intent.side) {
        (OrderType::Market, _) => Some(PriceSource::Market(event.open)),
        (OrderType::Limit { limit_price }, OrderSide::Buy) => {
            (event.low <= limit_price).then_some(PriceSource::Limit(limit_price))
        }
        (OrderType::Limit { limit_price }, OrderSide::Sell) => {
            (event.high >= limit_price).then_some(PriceSource::Limit(limit_price))
        }
    }
}

fn reject(
    order_ref: OrderRef,
    intent: &OrderIntent,
    event: &MarketEvent,
    reason: OrderError,
    report: &mut ExecutionReport,
) {
    tracing::warn!(
        order = %order_ref,
        symbol = %intent.symbol,
        side = %intent.side,
        quantity = intent.quantity,
        timestamp = %event.timestamp,
        reason = %reason,
        "order rejected"
    );
    report.rejections.push(OrderRejection {
        order_ref,
        timestamp: event.timestamp,
        symbol: intent.symbol.clone(),
        side: intent.side,
        quantity: intent.quantity,
        reason,
    });
}
