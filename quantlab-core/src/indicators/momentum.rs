//! Momentum — lookback difference (not percentage).
//!
//! momentum[t] = close[t] - close[t-period]
//! Warm-up: `period + 1` events.

use std::collections::VecDeque;

use super::{Indicator, IndicatorError, IndicatorValue};
use crate::domain::MarketEvent;

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
    closes: VecDeque<f64>,
}

impl Momentum {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod { kind: "momentum", period });
        }
        Ok(Self {
            period,
            name: format!("momentum_{period}"),
            closes: VecDeque::with_capacity(period + 2),
        })
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, event: &MarketEvent) {
        self.closes.push_back(event.close);
        if self.closes.len() > self.period + 1 {
            self.closes.pop_front();
        }
    }

    fn current_value(&self) -> IndicatorValue {
        match (self.closes.front(), self.closes.back()) {
            (Some(oldest), Some(latest)) if self.closes.len() == self.period + 1 => {
                IndicatorValue::Ready(latest - oldest)
            }
            _ => IndicatorValue::warming(self.closes.len(), self.warmup()),
        }
    }
}
