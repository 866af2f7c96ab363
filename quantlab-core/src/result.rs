//! Backtest result — the immutable record a run produces.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::{Fill, OrderRef, PendingOrder, PortfolioSnapshot};
use crate::error::{OrderRejection, RunFault};
use crate::metrics::{self, PerformanceMetrics};

/// Version of the serialized result layout. Bump on breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Lifecycle of a [`crate::backtester::Backtester`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Faulted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Faulted => "faulted",
        };
        f.write_str(s)
    }
}

/// Why the event loop ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    /// Every event was processed.
    Exhausted,
    /// A stop signal was observed at an event boundary.
    Stopped,
    /// A data or strategy fault halted the run; results are partial.
    Faulted { fault: RunFault },
}

impl Termination {
    pub fn run_state(&self) -> RunState {
        match self {
            Termination::Exhausted | Termination::Stopped => RunState::Completed,
            Termination::Faulted { .. } => RunState::Faulted,
        }
    }
}

/// Complete (or partial, after a fault) result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub schema_version: u32,
    pub strategy: String,
    pub config: EngineConfig,
    /// One snapshot per successfully processed event, in processing order.
    pub snapshots: Vec<PortfolioSnapshot>,
    pub fills: Vec<Fill>,
    pub rejections: Vec<OrderRejection>,
    pub expired: Vec<OrderRef>,
    pub cancelled: Vec<OrderRef>,
    /// Orders still pending when the run ended.
    pub open_orders: Vec<PendingOrder>,
    pub final_equity: f64,
    pub metrics: PerformanceMetrics,
    pub termination: Termination,
}

impl BacktestResult {
    pub fn state(&self) -> RunState {
        self.termination.run_state()
    }

    pub fn fault(&self) -> Option<&RunFault> {
        match &self.termination {
            Termination::Faulted { fault } => Some(fault),
            _ => None,
        }
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        metrics::equity_curve(self.config.initial_capital, &self.snapshots)
    }

    /// BLAKE3 hex digest of the canonical JSON form. Identical runs hash equal.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn empty_result(termination: Termination) -> BacktestResult {
        BacktestResult {
            schema_version: SCHEMA_VERSION,
            strategy: "test".into(),
            config: EngineConfig::default(),
            snapshots: Vec::new(),
            fills: Vec::new(),
            rejections: Vec::new(),
            expired: Vec::new(),
            cancelled: Vec::new(),
            open_orders: Vec::new(),
            final_equity: 100_000.0,
            metrics: PerformanceMetrics::default(),
            termination,
        }
    }

    #[test]
    fn termination_maps_to_state() {
        assert_eq!(empty_result(Termination::Exhausted).state(), RunState::Completed);
        assert_eq!(empty_result(Termination::Stopped).state(), RunState::Completed);
        let fault = RunFault::Strategy {
            strategy: "s".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            symbol: "SPY".into(),
            message: "boom".into(),
        };
        let result = empty_result(Termination::Faulted { fault });
        assert_eq!(result.state(), RunState::Faulted);
        assert!(result.fault().is_some());
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = empty_result(Termination::Exhausted);
        let mut b = a.clone();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.final_equity += 1.0;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn termination_serializes_tagged() {
        let json = serde_json::to_string(&Termination::Stopped).unwrap();
        assert_eq!(json, r#"{"status":"stopped"}"#);
    }
}
