//! Backtester — drives the per-event pipeline.
//!
//! Each event fully traverses the pipeline before the next is pulled:
//!
//! 1. Pull the next event from the feed (ordering violations fault the run)
//! 2. Mark the ledger and update indicators for the event's symbol
//! 3. Invoke the strategy (errors and panics fault the run)
//! 4. Apply cancellations and order intents through the execution simulator
//! 5. Record a portfolio snapshot
//!
//! A fault at step k rolls back the step's mark, so the partial result holds
//! exactly the snapshots of steps 0..k.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{BacktestError, RunFault};
use crate::execution::ExecutionSimulator;
use crate::feed::EventFeed;
use crate::indicators::{IndicatorEngine, IndicatorSpec};
use crate::ledger::PortfolioLedger;
use crate::metrics::PerformanceMetrics;
use crate::result::{BacktestResult, RunState, Termination, SCHEMA_VERSION};
use crate::strategy::{MarketState, Strategy, StrategyRuntime};

/// Cooperative stop signal, checked once per event boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Backtester {
    config: EngineConfig,
    strategy: Option<Box<dyn Strategy>>,
    feed: Option<EventFeed>,
    indicators: Vec<IndicatorSpec>,
    stop: StopHandle,
    state: RunState,
}

impl Backtester {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            strategy: None,
            feed: None,
            indicators: Vec::new(),
            stop: StopHandle::default(),
            state: RunState::Idle,
        }
    }

    pub fn with_strategy(self, strategy: impl Strategy + 'static) -> Self {
        self.with_boxed_strategy(Box::new(strategy))
    }

    pub fn with_boxed_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_feed(mut self, feed: EventFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_indicators(mut self, specs: Vec<IndicatorSpec>) -> Self {
        self.indicators = specs;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Handle that stops the run at the next event boundary, from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the backtest.
    ///
    /// Only pre-run problems are `Err`. Data and strategy faults produce
    /// `Ok` with a partial result whose `termination` carries the fault.
    pub fn run(&mut self) -> Result<BacktestResult, BacktestError> {
        if self.state != RunState::Idle {
            return Err(BacktestError::AlreadyRun(self.state.to_string()));
        }
        self.config.validate()?;
        if self.strategy.is_none() {
            return Err(BacktestError::Configuration(
                "no strategy bound before run()".into(),
            ));
        }
        if self.feed.is_none() {
            return Err(BacktestError::Configuration(
                "no event feed bound before run()".into(),
            ));
        }
        let mut indicators = IndicatorEngine::new(self.indicators.clone())?;
        let (Some(strategy), Some(mut feed)) = (self.strategy.take(), self.feed.take()) else {
            return Err(BacktestError::Configuration(
                "strategy and feed must both be bound".into(),
            ));
        };

        self.state = RunState::Running;
        let mut runtime = StrategyRuntime::new(strategy);
        let mut simulator = ExecutionSimulator::new(&self.config);
        let mut ledger = PortfolioLedger::new(self.config.initial_capital);

        tracing::info!(
            strategy = runtime.name(),
            events = feed.len(),
            indicators = self.indicators.len(),
            warmup = indicators.max_warmup(),
            "backtest started"
        );

        let mut snapshots = Vec::with_capacity(feed.len());
        let mut fills = Vec::new();
        let mut rejections = Vec::new();
        let mut expired = Vec::new();
        let mut cancelled = Vec::new();
        let mut step = 0usize;

        let termination = loop {
            if self.stop.is_stopped() {
                tracing::info!(step, "stop signal received");
                break Termination::Stopped;
            }
            let event = match feed.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => break Termination::Exhausted,
                Err(err) => {
                    break Termination::Faulted {
                        fault: RunFault::from_feed(&err, feed.position()),
                    }
                }
            };

            let previous_mark = ledger.mark(&event);
            let values = indicators.update(&event);

            let state = MarketState::new(&event, step, &ledger, simulator.pending());
            let output = match runtime.invoke(&state, &values) {
                Ok(output) => output,
                Err(fault) => {
                    ledger.restore_mark(&event.symbol, previous_mark);
                    break Termination::Faulted { fault };
                }
            };

            for order_ref in output.cancels {
                if simulator.cancel(order_ref).is_some() {
                    cancelled.push(order_ref);
                } else {
                    tracing::debug!(order = %order_ref, "cancel ignored: order not pending");
                }
            }

            let report = simulator.apply(output.intents, &event, step, &mut ledger);
            fills.extend(report.fills);
            rejections.extend(report.rejections);
            expired.extend(report.expired);

            snapshots.push(ledger.snapshot(event.timestamp, &event.symbol));
            step += 1;
        };

        let metrics = PerformanceMetrics::compute(
            &snapshots,
            &ledger,
            fills.len(),
            rejections.len(),
            self.config.periods_per_year,
        );
        let result = BacktestResult {
            schema_version: SCHEMA_VERSION,
            strategy: runtime.name().to_string(),
            config: self.config.clone(),
            final_equity: ledger.equity(),
            snapshots,
            fills,
            rejections,
            expired,
            cancelled,
            open_orders: simulator.take_pending(),
            metrics,
            termination,
        };
        self.state = result.state();

        match result.fault() {
            Some(fault) => tracing::error!(
                steps = result.snapshots.len(),
                fault = %fault,
                "backtest faulted; returning partial result"
            ),
            None => tracing::info!(
                steps = result.snapshots.len(),
                fills = result.fills.len(),
                rejected = result.rejections.len(),
                final_equity = result.final_equity,
                total_return = result.metrics.total_return,
                "backtest completed"
            ),
        }
        Ok(result)
    }
}
