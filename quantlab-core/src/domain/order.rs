//! Order intents emitted by strategies and the pending orders they become.

use super::ids::OrderRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderType {
    /// Fill at the configured market timing (bar close or next open).
    Market,
    /// Fill at limit price or better.
    Limit { limit_price: f64 },
}

impl OrderType {
    pub fn limit_price(&self) -> Option<f64> {
        match self {
            OrderType::Market => None,
            OrderType::Limit { limit_price } => Some(*limit_price),
        }
    }
}

/// An order a strategy wants placed. Consumed by the execution simulator in
/// the same step it is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub order_type: OrderType,
}

impl OrderIntent {
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Market,
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        limit_price: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Limit { limit_price },
        }
    }

    pub fn market_buy(symbol: impl Into<String>, quantity: f64) -> Self {
        Self::market(symbol, OrderSide::Buy, quantity)
    }

    pub fn market_sell(symbol: impl Into<String>, quantity: f64) -> Self {
        Self::market(symbol, OrderSide::Sell, quantity)
    }

    pub fn limit_buy(symbol: impl Into<String>, quantity: f64, limit_price: f64) -> Self {
        Self::limit(symbol, OrderSide::Buy, quantity, limit_price)
    }

    pub fn limit_sell(symbol: impl Into<String>, quantity: f64, limit_price: f64) -> Self {
        Self::limit(symbol, OrderSide::Sell, quantity, limit_price)
    }
}

/// An accepted intent waiting in the simulator's book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_ref: OrderRef,
    pub intent: OrderIntent,
    pub submitted_at: DateTime<Utc>,
    /// Feed step in which the order was submitted. Orders are only
    /// eligible to fill on later steps.
    pub submitted_step: usize,
}
