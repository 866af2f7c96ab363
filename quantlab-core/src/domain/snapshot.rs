//! PortfolioSnapshot — one point on the equity curve.

use super::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portfolio state at the end of one event step.
///
/// `equity == cash + Σ quantity × mark price` holds for every snapshot the
/// ledger produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Symbol of the event that closed this step.
    pub symbol: String,
    pub cash: f64,
    /// Open (non-flat) positions only.
    pub positions: BTreeMap<String, Position>,
    /// Mark prices used for `equity`, one per open position.
    pub marks: BTreeMap<String, f64>,
    pub equity: f64,
    pub realized_pnl: f64,
}

impl PortfolioSnapshot {
    /// Sum of position market values at the snapshot's marks.
    pub fn position_value(&self) -> f64 {
        self.positions
            .iter()
            .map(|(sym, pos)| {
                let mark = self.marks.get(sym).copied().unwrap_or(pos.average_cost);
                pos.market_value(mark)
            })
            .sum()
    }
}
