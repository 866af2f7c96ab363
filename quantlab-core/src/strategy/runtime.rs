//! Strategy runtime — the fault boundary around user strategy code.
//!
//! Returned errors and panics are both converted into a [`RunFault::Strategy`]
//! carrying the strategy name and the triggering event.

use std::panic::{self, AssertUnwindSafe};

use crate::domain::{OrderIntent, OrderRef};
use crate::error::RunFault;
use crate::indicators::IndicatorValues;

use super::{MarketState, Strategy, StrategyError};

/// What the strategy asked for on one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub intents: Vec<OrderIntent>,
    pub cancels: Vec<OrderRef>,
}

pub struct StrategyRuntime {
    strategy: Box<dyn Strategy>,
}

impl StrategyRuntime {
    pub fn new(strategy: Box<dyn Strategy>) -> Self {
        Self {
            strategy,
        }
    }

    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    /// Invoke the strategy for one event.
    pub fn invoke(
        &mut self,
        state: &MarketState<'_>,
        indicators: &IndicatorValues,
    ) -> Result<StrategyOutput, RunFault> {
        let strategy = &mut self.strategy;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<StrategyOutput, StrategyError> {
            let intents = strategy.on_event(state, indicators)?;
            let cancels = strategy.cancel_requests(state);
            Ok(StrategyOutput { intents, cancels })
        }));

        let message = match outcome {
            Ok(Ok(output)) => return Ok(output),
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        Err(RunFault::Strategy {
            strategy: self.strategy.name().to_string(),
            timestamp: state.timestamp(),
            symbol: state.symbol().to_string(),
            message,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::make_event;
    use crate::ledger::PortfolioLedger;

    struct Scripted {
        mode: &'static str,
    }

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn on_event(
            &mut self,
            state: &MarketState<'_>,
            _indicators: &IndicatorValues,
        ) -> Result<Vec<OrderIntent>, StrategyError> {
            match self.mode {
                "error" => Err(StrategyError::Fault("bad signal".into())),
                "panic" => panic!("boom"),
                _ => Ok(vec![OrderIntent::market_buy(state.symbol(), 1.0)]),
            }
        }
    }

    fn invoke(mode: &'static str) -> Result<StrategyOutput, RunFault> {
        let ledger = PortfolioLedger::new(1_000.0);
        let event = make_event("SPY", 4, 100.0);
        let state = MarketState::new(&event, 4, &ledger, &[]);
        let mut runtime = StrategyRuntime::new(Box::new(Scripted { mode }));
        runtime.invoke(&state, &IndicatorValues::new("SPY"))
    }

    #[test]
    fn ok_output_passes_through() {
        let output = invoke("ok").unwrap();
        assert_eq!(output.intents.len(), 1);
        assert!(output.cancels.is_empty());
    }

    #[test]
    fn returned_error_becomes_fault() {
        let fault = invoke("error").unwrap_err();
        match fault {
            RunFault::Strategy {
                strategy,
                symbol,
                message,
                timestamp,
            } => {
                assert_eq!(strategy, "scripted");
                assert_eq!(symbol, "SPY");
                assert_eq!(message, "bad signal");
                assert_eq!(timestamp, make_event("SPY", 4, 100.0).timestamp);
            }
            other => panic!("unexpected fault {other:?}"),
        }
    }

    #[test]
    fn panic_becomes_fault() {
        let fault = invoke("panic").unwrap_err();
        assert!(fault.to_string().contains("panic: boom"));
    }
}
