//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Warm-up: `period + 1` events.
//! Edge cases: avg_loss == 0 → RSI = 100 (or 50 when both are zero).

use super::{Indicator, IndicatorError, IndicatorValue};
use crate::domain::MarketEvent;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    changes_seen: usize,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod { kind: "rsi", period });
        }
        Ok(Self {
            period,
            name: format!("rsi_{period}"),
            prev_close: None,
            changes_seen: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        })
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return 50.0;
        }
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, event: &MarketEvent) {
        let Some(prev) = self.prev_close.replace(event.close) else {
            return;
        };
        let change = event.close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.changes_seen += 1;

        let n = self.period as f64;
        if self.changes_seen <= self.period {
            // Seed: simple average of the first `period` changes
            self.avg_gain += gain / n;
            self.avg_loss += loss / n;
        } else {
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }
    }

    fn current_value(&self) -> IndicatorValue {
        if self.changes_seen < self.period {
            let seen = self.changes_seen + usize::from(self.prev_close.is_some());
            return IndicatorValue::warming(seen, self.warmup());
        }
        IndicatorValue::Ready(compute_rsi(self.avg_gain, self.avg_loss))
    }
}
