use crate::domain::ids::OrderRef;
use crate::domain::order::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fill record. Created by the execution simulator, appended to the
/// execution log, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_ref: OrderRef,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub fill_price: f64,
    pub quantity: f64,
    pub commission: f64,
    /// Dollar cost of slippage already embedded in `fill_price`.
    pub slippage: f64,
}

impl Fill {
    /// Gross traded value (price × quantity).
    pub fn notional(&self) -> f64 {
        self.fill_price * self.quantity
    }

    /// Signed cash impact: negative for buys, positive for sells,
    /// commission always reduces cash.
    pub fn cash_delta(&self) -> f64 {
        -self.side.sign() * self.notional() - self.commission
    }
}
