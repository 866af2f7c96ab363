//! Error taxonomy for the engine.
//!
//! Pre-run errors are returned as `Err(BacktestError)`. Runtime faults end
//! the run but are reported inside the (partial) result as a [`RunFault`].
//! Per-order errors ([`OrderError`]) are recovered locally: the order is
//! rejected and the run continues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{OrderRef, OrderSide};
use crate::feed::FeedError;
use crate::indicators::IndicatorError;

/// Errors returned by [`crate::backtester::Backtester::run`] before any event is processed.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("backtest already ran (state: {0})")]
    AlreadyRun(String),
}

impl From<ConfigError> for BacktestError {
    fn from(err: ConfigError) -> Self {
        BacktestError::Configuration(err.to_string())
    }
}

impl From<IndicatorError> for BacktestError {
    fn from(err: IndicatorError) -> Self {
        BacktestError::Configuration(err.to_string())
    }
}

/// Per-order rejection reasons. Never fatal to the run.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderError {
    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("oversell: requested {requested}, holding {held} (short selling disabled)")]
    Oversell { requested: f64, held: f64 },

    #[error("invalid quantity {quantity}")]
    InvalidQuantity { quantity: f64 },

    #[error("invalid limit price {limit_price}")]
    InvalidLimitPrice { limit_price: f64 },
}

/// A rejected order, as recorded in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRejection {
    pub order_ref: OrderRef,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub reason: OrderError,
}

/// The fault that terminated a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFault {
    /// The feed violated ordering or produced a malformed bar.
    Data {
        /// Feed position of the offending event.
        index: usize,
        timestamp: Option<DateTime<Utc>>,
        symbol: Option<String>,
        message: String,
    },
    /// The strategy returned an error or panicked.
    Strategy {
        strategy: String,
        timestamp: DateTime<Utc>,
        symbol: String,
        message: String,
    },
}

impl RunFault {
    /// Data fault for a feed error raised at feed position `position`.
    pub fn from_feed(err: &FeedError, position: usize) -> Self {
        let (index, timestamp, symbol) = match err {
            FeedError::DataOrder {
                index,
                timestamp,
                symbol,
                ..
            }
            | FeedError::MalformedBar {
                index,
                timestamp,
                symbol,
            } => (*index, Some(*timestamp), Some(symbol.clone())),
            FeedError::Source { .. } => (position, None, None),
        };
        RunFault::Data {
            index,
            timestamp,
            symbol,
            message: err.to_string(),
        }
    }

    /// Timestamp of the event that triggered the fault, if known.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            RunFault::Data { timestamp, .. } => *timestamp,
            RunFault::Strategy { timestamp, .. } => Some(*timestamp),
        }
    }
}

impl std::fmt::Display for RunFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunFault::Data { index, message, .. } => {
                write!(f, "data fault at event {index}: {message}")
            }
            RunFault::Strategy {
                strategy,
                timestamp,
                symbol,
                message,
            } => write!(
                f,
                "strategy '{strategy}' faulted at {timestamp} on {symbol}: {message}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_error_messages() {
        let err = OrderError::InsufficientFunds {
            required: 1010.0,
            available: 1000.0,
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: need 1010.00, have 1000.00"
        );
    }

    #[test]
    fn config_error_converts_to_configuration() {
        let err: BacktestError = ConfigError::NonPositiveCapital(0.0).into();
        assert!(matches!(err, BacktestError::Configuration(_)));
    }

    #[test]
    fn data_fault_locates_offending_event() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let err = FeedError::DataOrder {
            index: 7,
            symbol: "SPY".into(),
            timestamp: ts,
            prev_symbol: "SPY".into(),
            prev_timestamp: ts,
        };
        let fault = RunFault::from_feed(&err, 7);
        assert_eq!(fault.timestamp(), Some(ts));
        assert!(matches!(
            &fault,
            RunFault::Data { index: 7, symbol: Some(s), .. } if s == "SPY"
        ));
        assert!(fault.to_string().starts_with("data fault at event 7:"));

        let source = FeedError::Source {
            source_name: "csv".into(),
            message: "gone".into(),
        };
        let fault = RunFault::from_feed(&source, 3);
        assert!(matches!(
            fault,
            RunFault::Data { index: 3, timestamp: None, symbol: None, .. }
        ));
    }

    #[test]
    fn order_error_serializes_tagged() {
        let json = serde_json::to_string(&OrderError::InvalidQuantity { quantity: 0.0 }).unwrap();
        assert!(json.contains("\"kind\":\"invalid_quantity\""));
    }
}
