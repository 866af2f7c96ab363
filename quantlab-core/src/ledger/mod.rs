//! Portfolio ledger — cash, positions, and P&L; the single source of truth
//! for backtest results.
//!
//! Positions use signed quantities. Increasing a position re-averages its
//! cost; reducing it realizes P&L against the average cost; crossing zero
//! closes the old side and opens the remainder at the fill price.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{Fill, MarketEvent, PortfolioSnapshot, Position};

/// Quantities at or below this magnitude are treated as flat.
const QTY_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    initial_capital: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    marks: BTreeMap<String, f64>,
    realized_pnl: f64,
    total_commission: f64,
    total_slippage: f64,
    /// Realized P&L of every position reduction, in fill order.
    closed_pnls: Vec<f64>,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            marks: BTreeMap::new(),
            realized_pnl: 0.0,
            total_commission: 0.0,
            total_slippage: 0.0,
            closed_pnls: Vec::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Open position for a symbol (`None` when flat).
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol).filter(|p| !p.is_flat())
    }

    /// Signed quantity held (0.0 when flat).
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.position(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| !p.is_flat())
    }

    /// Latest close seen for a symbol.
    pub fn mark_price(&self, symbol: &str) -> Option<f64> {
        self.marks.get(symbol).copied()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn total_slippage(&self) -> f64 {
        self.total_slippage
    }

    pub fn closed_pnls(&self) -> &[f64] {
        &self.closed_pnls
    }

    /// Market value of all open positions at their marks.
    /// A position without a mark is valued at its average cost.
    pub fn position_value(&self) -> f64 {
        self.open_positions()
            .map(|p| p.market_value(self.mark_or_cost(p)))
            .sum()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.open_positions()
            .map(|p| p.unrealized_pnl(self.mark_or_cost(p)))
            .sum()
    }

    /// Total equity = cash + sum of all position market values.
    pub fn equity(&self) -> f64 {
        self.cash + self.position_value()
    }

    fn mark_or_cost(&self, pos: &Position) -> f64 {
        self.marks
            .get(&pos.symbol)
            .copied()
            .unwrap_or(pos.average_cost)
    }

    // ── Mutation ──────────────────────────────────────────────────────

    /// Record the event's close as the symbol's mark price. Returns the
    /// previous mark so a faulted step can be rolled back.
    pub fn mark(&mut self, event: &MarketEvent) -> Option<f64> {
        self.marks.insert(event.symbol.clone(), event.close)
    }

    /// Undo a `mark` call.
    pub fn restore_mark(&mut self, symbol: &str, previous: Option<f64>) {
        match previous {
            Some(price) => {
                self.marks.insert(symbol.to_string(), price);
            }
            None => {
                self.marks.remove(symbol);
            }
        }
    }

    /// Apply a fill and return the resulting snapshot.
    pub fn apply(&mut self, fill: &Fill) -> PortfolioSnapshot {
        self.record_fill(fill);
        self.snapshot(fill.timestamp, &fill.symbol)
    }

    /// Apply a fill to cash, positions, and cost totals.
    pub fn record_fill(&mut self, fill: &Fill) {
        self.cash += fill.cash_delta();
        self.total_commission += fill.commission;
        self.total_slippage += fill.slippage;

        let pos = self
            .positions
            .entry(fill.symbol.clone())
            .or_insert_with(|| Position::flat(fill.symbol.clone()));

        let delta = fill.side.sign() * fill.quantity;
        let held = pos.quantity;

        if held.abs() <= QTY_EPSILON || held.signum() == delta.signum() {
            // Opening or adding: weighted average cost
            let new_qty = held + delta;
            pos.average_cost =
                (held.abs() * pos.average_cost + fill.quantity * fill.fill_price) / new_qty.abs();
            pos.quantity = new_qty;
        } else {
            // Reducing, closing, or flipping
            let closing = fill.quantity.min(held.abs());
            let realized = closing * (fill.fill_price - pos.average_cost) * held.signum();
            pos.realized_pnl += realized;
            self.realized_pnl += realized;
            self.closed_pnls.push(realized);

            let new_qty = held + delta;
            if new_qty.abs() <= QTY_EPSILON {
                pos.quantity = 0.0;
                pos.average_cost = 0.0;
            } else if new_qty.signum() != held.signum() {
                // Flipped: the remainder opens at the fill price
                pos.quantity = new_qty;
                pos.average_cost = fill.fill_price;
            } else {
                pos.quantity = new_qty;
            }
        }
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self, timestamp: DateTime<Utc>, symbol: &str) -> PortfolioSnapshot {
        let positions: BTreeMap<String, Position> = self
            .open_positions()
            .map(|p| (p.symbol.clone(), p.clone()))
            .collect();
        let marks = positions
            .values()
            .map(|p| (p.symbol.clone(), self.mark_or_cost(p)))
            .collect();
        PortfolioSnapshot {
            timestamp,
            symbol: symbol.to_string(),
            cash: self.cash,
            positions,
            marks,
            equity: self.equity(),
            realized_pnl: self.realized_pnl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderRef, OrderSide};
    use crate::feed::make_event;
    use chrono::TimeZone;

    fn fill(side: OrderSide, price: f64, qty: f64, commission: f64) -> Fill {
        Fill {
            order_ref: OrderRef(1),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            symbol: "SPY".into(),
            side,
            fill_price: price,
            quantity: qty,
            commission,
            slippage: 0.0,
        }
    }

    #[test]
    fn buy_creates_position_and_debits_cash() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        let snap = ledger.apply(&fill(OrderSide::Buy, 100.0, 10.0, 0.0));
        assert_eq!(snap.cash, 9_000.0);
        let pos = ledger.position("SPY").unwrap();
        assert_eq!(pos.quantity, 10.0);
        assert_eq!(pos.average_cost, 100.0);
    }

    #[test]
    fn averaging_in_updates_cost() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply(&fill(OrderSide::Buy, 100.0, 10.0, 0.0));
        ledger.apply(&fill(OrderSide::Buy, 110.0, 10.0, 0.0));
        let pos = ledger.position("SPY").unwrap();
        assert_eq!(pos.quantity, 20.0);
        assert!((pos.average_cost - 105.0).abs() < 1e-10);
    }

    #[test]
    fn partial_sell_realizes_against_average_cost() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply(&fill(OrderSide::Buy, 100.0, 10.0, 0.0));
        ledger.apply(&fill(OrderSide::Sell, 120.0, 4.0, 0.0));
        let pos = ledger.position("SPY").unwrap();
        assert_eq!(pos.quantity, 6.0);
        assert_eq!(pos.average_cost, 100.0);
        assert!((ledger.realized_pnl() - 80.0).abs() < 1e-10);
        assert_eq!(ledger.closed_pnls(), &[80.0]);
    }

    #[test]
    fn full_close_goes_flat() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply(&fill(OrderSide::Buy, 100.0, 10.0, 1.0));
        let snap = ledger.apply(&fill(OrderSide::Sell, 90.0, 10.0, 1.0));
        assert!(ledger.position("SPY").is_none());
        assert!(snap.positions.is_empty());
        // 10_000 - 1000 - 1 + 900 - 1
        assert!((snap.cash - 9_898.0).abs() < 1e-10);
        assert!((snap.equity - 9_898.0).abs() < 1e-10);
    }

    #[test]
    fn short_then_cover() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply(&fill(OrderSide::Sell, 100.0, 10.0, 0.0));
        assert_eq!(ledger.quantity("SPY"), -10.0);
        assert_eq!(ledger.cash(), 11_000.0);
        ledger.apply(&fill(OrderSide::Buy, 90.0, 10.0, 0.0));
        assert!(ledger.position("SPY").is_none());
        assert!((ledger.realized_pnl() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn flip_opens_remainder_at_fill_price() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply(&fill(OrderSide::Buy, 100.0, 5.0, 0.0));
        ledger.apply(&fill(OrderSide::Sell, 110.0, 8.0, 0.0));
        let pos = ledger.position("SPY").unwrap();
        assert_eq!(pos.quantity, -3.0);
        assert_eq!(pos.average_cost, 110.0);
        assert!((ledger.realized_pnl() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn record_fill_matches_apply() {
        let mut recorded = PortfolioLedger::new(10_000.0);
        let mut applied = PortfolioLedger::new(10_000.0);
        let buy = fill(OrderSide::Buy, 100.0, 10.0, 2.0);
        recorded.record_fill(&buy);
        let snap = applied.apply(&buy);
        assert_eq!(recorded.cash(), 8_998.0);
        assert_eq!(recorded.snapshot(buy.timestamp, "SPY"), snap);
        assert_eq!(recorded.total_commission(), 2.0);
    }

    #[test]
    fn equity_reconciles_with_marks() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply(&fill(OrderSide::Buy, 100.0, 10.0, 0.0));
        ledger.mark(&make_event("SPY", 1, 102.0));
        let snap = ledger.snapshot(Utc::now(), "SPY");
        assert_eq!(snap.equity, 9_000.0 + 10.0 * 102.0);
        assert!((snap.cash + snap.position_value() - snap.equity).abs() < 1e-9);
    }

    #[test]
    fn restore_mark_rolls_back() {
        let mut ledger = PortfolioLedger::new(10_000.0);
        ledger.apply(&fill(OrderSide::Buy, 100.0, 10.0, 0.0));
        let first = ledger.mark(&make_event("SPY", 1, 101.0));
        assert_eq!(first, None);
        let previous = ledger.mark(&make_event("SPY", 2, 120.0));
        ledger.restore_mark("SPY", previous);
        assert_eq!(ledger.mark_price("SPY"), Some(101.0));
        ledger.restore_mark("SPY", None);
        assert_eq!(ledger.mark_price("SPY"), None);
    }
}
