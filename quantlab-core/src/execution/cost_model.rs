//! Cost model — slippage and commission calculation.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive less (lower price).
//! Commission is `max(fixed_fee, notional × commission_bps)`.

use crate::config::EngineConfig;
use crate::domain::OrderSide;

/// Cost model for execution friction (slippage + commission).
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    /// Slippage in basis points, applied directionally.
    pub slippage_bps: f64,
    /// Commission in basis points of traded value.
    pub commission_bps: f64,
    /// Minimum commission per fill.
    pub fixed_fee: f64,
}

impl CostModel {
    pub fn new(slippage_bps: f64, commission_bps: f64, fixed_fee: f64) -> Self {
        Self {
            slippage_bps,
            commission_bps,
            fixed_fee,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.slippage_bps, config.commission_bps, config.fixed_fee)
    }

    /// Apply slippage to a raw fill price.
    ///
    /// Returns `(slipped_price, slippage_dollar_amount)`.
    pub fn apply_slippage(&self, raw_price: f64, side: OrderSide, quantity: f64) -> (f64, f64) {
        if self.slippage_bps == 0.0 {
            return (raw_price, 0.0);
        }
        let slip_fraction = self.slippage_bps / 10_000.0;
        match side {
            OrderSide::Buy => {
                let slipped = raw_price * (1.0 + slip_fraction);
                (slipped, (slipped - raw_price) * quantity)
            }
            OrderSide::Sell => {
                let slipped = raw_price * (1.0 - slip_fraction);
                (slipped, (raw_price - slipped) * quantity)
            }
        }
    }

    /// Compute commission for a fill.
    pub fn compute_commission(&self, fill_price: f64, quantity: f64) -> f64 {
        let variable = fill_price * quantity * (self.commission_bps / 10_000.0);
        variable.max(self.fixed_fee)
    }
}
