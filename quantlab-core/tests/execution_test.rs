//! Integration tests for order execution through the full pipeline.
//!
//! Tests:
//! 1. Resting limit sell fills only once a bar's high reaches the limit
//! 2. Next-open timing fills at the following bar's open
//! 3. Insufficient funds: rejected, portfolio unchanged, run continues
//! 4. Limit TTL expiry and strategy-driven cancellation
//! 5. Oversell rejection with short selling disabled

use chrono::{DateTime, Duration, TimeZone, Utc};
use quantlab_core::domain::{MarketEvent, OrderIntent, OrderRef};
use quantlab_core::feed::EventFeed;
use quantlab_core::indicators::IndicatorValues;
use quantlab_core::strategy::{MarketState, Strategy, StrategyError};
use quantlab_core::{Backtester, EngineConfig, FillTiming, OrderError, Termination};

fn ts(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(day)
}

fn ohlc(day: i64, open: f64, high: f64, low: f64, close: f64) -> MarketEvent {
    MarketEvent {
        timestamp: ts(day),
        symbol: "SPY".into(),
        open,
        high,
        low,
        close,
        volume: 500.0,
    }
}

/// Replays a script of per-step intents and cancellations.
struct Script {
    intents: Vec<(usize, OrderIntent)>,
    cancels: Vec<(usize, OrderRef)>,
}

impl Script {
    fn orders(intents: Vec<(usize, OrderIntent)>) -> Self {
        Self {
            intents,
            cancels: Vec::new(),
        }
    }
}

impl Strategy for Script {
    fn name(&self) -> &str {
        "script"
    }

    fn on_event(
        &mut self,
        state: &MarketState<'_>,
        _indicators: &IndicatorValues,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        Ok(self
            .intents
            .iter()
            .filter(|(step, _)| *step == state.step())
            .map(|(_, intent)| intent.clone())
            .collect())
    }

    fn cancel_requests(&mut self, state: &MarketState<'_>) -> Vec<OrderRef> {
        self.cancels
            .iter()
            .filter(|(step, _)| *step == state.step())
            .map(|(_, order_ref)| *order_ref)
            .collect()
    }
}

fn run(config: EngineConfig, strategy: Script, events: Vec<MarketEvent>) -> quantlab_core::BacktestResult {
    Backtester::new(config)
        .with_strategy(strategy)
        .with_feed(EventFeed::from_events(events))
        .run()
        .unwrap()
}

// ── 1. Limit sell at 105 ─────────────────────────────────────────────

#[test]
fn limit_sell_fills_exactly_when_high_reaches_105() {
    let events = vec![
        ohlc(0, 100.0, 101.0, 99.0, 100.0),
        ohlc(1, 100.0, 104.0, 95.0, 103.0),
        ohlc(2, 103.0, 104.0, 96.0, 97.0),
        ohlc(3, 97.0, 103.5, 95.0, 103.0),
        ohlc(4, 103.0, 106.0, 102.0, 105.5),
        ohlc(5, 105.5, 107.0, 104.0, 106.0),
    ];
    let strategy = Script::orders(vec![
        (0, OrderIntent::market_buy("SPY", 10.0)),
        (0, OrderIntent::limit_sell("SPY", 10.0, 105.0)),
    ]);
    let result = run(EngineConfig::new(10_000.0), strategy, events);

    assert_eq!(result.fills.len(), 2);
    let sell = &result.fills[1];
    assert_eq!(sell.timestamp, ts(4));
    assert_eq!(sell.fill_price, 105.0);
    assert_eq!(sell.slippage, 0.0);
    assert!(result.open_orders.is_empty());
    assert!((result.metrics.realized_pnl - 50.0).abs() < 1e-9);
}

#[test]
fn limit_sell_gapping_above_fills_at_limit() {
    let events = vec![
        ohlc(0, 100.0, 101.0, 99.0, 100.0),
        ohlc(1, 108.0, 109.0, 107.0, 108.5),
    ];
    let strategy = Script::orders(vec![
        (0, OrderIntent::market_buy("SPY", 1.0)),
        (0, OrderIntent::limit_sell("SPY", 1.0, 105.0)),
    ]);
    let result = run(EngineConfig::new(10_000.0), strategy, events);
    assert_eq!(result.fills.len(), 2);
    assert_eq!(result.fills[1].fill_price, 105.0);
    assert!((result.metrics.realized_pnl - 5.0).abs() < 1e-9);
}

#[test]
fn limit_buy_gapping_below_fills_at_limit() {
    let events = vec![
        ohlc(0, 100.0, 101.0, 99.0, 100.0),
        ohlc(1, 92.0, 93.0, 91.0, 92.5),
    ];
    let strategy = Script::orders(vec![(0, OrderIntent::limit_buy("SPY", 2.0, 95.0))]);
    let result = run(EngineConfig::new(10_000.0), strategy, events);
    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].timestamp, ts(1));
    assert_eq!(result.fills[0].fill_price, 95.0);
    assert_eq!(result.final_equity, 10_000.0 - 190.0 + 2.0 * 92.5);
}

// ── 2. Next-open timing ──────────────────────────────────────────────

#[test]
fn next_open_fills_at_following_open_with_slippage() {
    let config = EngineConfig {
        order_fill_timing: FillTiming::NextOpen,
        slippage_bps: 100.0,
        ..EngineConfig::new(10_000.0)
    };
    let events = vec![
        ohlc(0, 100.0, 101.0, 99.0, 100.0),
        ohlc(1, 102.0, 103.0, 101.0, 102.5),
    ];
    let strategy = Script::orders(vec![(0, OrderIntent::market_buy("SPY", 10.0))]);
    let result = run(config, strategy, events);

    assert_eq!(result.fills.len(), 1);
    let fill = &result.fills[0];
    assert_eq!(fill.timestamp, ts(1));
    assert!((fill.fill_price - 103.02).abs() < 1e-9);
    assert!(result.snapshots[0].positions.is_empty());
}

#[test]
fn next_open_order_left_open_at_end_of_feed() {
    let config = EngineConfig {
        order_fill_timing: FillTiming::NextOpen,
        ..EngineConfig::new(10_000.0)
    };
    let strategy = Script::orders(vec![(0, OrderIntent::market_buy("SPY", 1.0))]);
    let result = run(config, strategy, vec![ohlc(0, 100.0, 101.0, 99.0, 100.0)]);
    assert!(result.fills.is_empty());
    assert_eq!(result.open_orders.len(), 1);
}

// ── 3. Insufficient funds ────────────────────────────────────────────

#[test]
fn unaffordable_buy_rejected_and_run_continues() {
    let config = EngineConfig {
        commission_bps: 10.0,
        ..EngineConfig::new(1_000.0)
    };
    let events = vec![
        ohlc(0, 100.0, 101.0, 99.0, 100.0),
        ohlc(1, 100.0, 101.0, 99.0, 100.0),
    ];
    let strategy = Script::orders(vec![
        (0, OrderIntent::market_buy("SPY", 10.0)),
        (1, OrderIntent::market_buy("SPY", 5.0)),
    ]);
    let result = run(config, strategy, events);

    assert_eq!(result.termination, Termination::Exhausted);
    assert_eq!(result.rejections.len(), 1);
    assert!(matches!(
        result.rejections[0].reason,
        OrderError::InsufficientFunds { .. }
    ));
    assert_eq!(result.snapshots[0].cash, 1_000.0);
    assert!(result.snapshots[0].positions.is_empty());
    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.metrics.rejected_orders, 1);
}

// ── 4. TTL and cancellation ──────────────────────────────────────────

#[test]
fn resting_limit_expires_after_ttl() {
    let config = EngineConfig {
        limit_order_ttl_secs: Some(2 * 86_400),
        ..EngineConfig::new(10_000.0)
    };
    let events: Vec<_> = (0..5).map(|d| ohlc(d, 100.0, 101.0, 99.0, 100.0)).collect();
    let strategy = Script::orders(vec![(0, OrderIntent::limit_buy("SPY", 1.0, 90.0))]);
    let result = run(config, strategy, events);

    assert_eq!(result.expired, vec![OrderRef(1)]);
    assert!(result.fills.is_empty());
    assert!(result.open_orders.is_empty());
}

#[test]
fn strategy_cancels_resting_limit() {
    let events: Vec<_> = (0..4).map(|d| ohlc(d, 100.0, 101.0, 99.0, 100.0)).collect();
    let strategy = Script {
        intents: vec![(0, OrderIntent::limit_buy("SPY", 1.0, 90.0))],
        cancels: vec![(2, OrderRef(1)), (3, OrderRef(99))],
    };
    let result = run(EngineConfig::new(10_000.0), strategy, events);
    assert_eq!(result.cancelled, vec![OrderRef(1)]);
    assert!(result.open_orders.is_empty());
}

// ── 5. Oversell ──────────────────────────────────────────────────────

#[test]
fn sell_without_holdings_rejected_when_short_disabled() {
    let strategy = Script::orders(vec![(0, OrderIntent::market_sell("SPY", 1.0))]);
    let result = run(
        EngineConfig::new(10_000.0),
        strategy,
        vec![ohlc(0, 100.0, 101.0, 99.0, 100.0)],
    );
    assert!(matches!(
        result.rejections[0].reason,
        OrderError::Oversell { .. }
    ));
    assert!(result.snapshots[0].positions.is_empty());
}
