//! Volatility — rolling sample standard deviation of close-to-close returns.
//!
//! Returns are simple: close[t] / close[t-1] - 1. Not annualised.
//! Warm-up: `period + 1` events (`period` returns).

use std::collections::VecDeque;

use super::{Indicator, IndicatorError, IndicatorValue};
use crate::domain::MarketEvent;

#[derive(Debug, Clone)]
pub struct Volatility {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    returns: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
    seen: usize,
}

impl Volatility {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod { kind: "volatility", period });
        }
        Ok(Self {
            period,
            name: format!("volatility_{period}"),
            prev_close: None,
            returns: VecDeque::with_capacity(period + 1),
            sum: 0.0,
            sum_sq: 0.0,
            seen: 0,
        })
    }
}

impl Indicator for Volatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, event: &MarketEvent) {
        self.seen += 1;
        if let Some(prev) = self.prev_close {
            let ret = event.close / prev - 1.0;
            self.returns.push_back(ret);
            self.sum += ret;
            self.sum_sq += ret * ret;
            if self.returns.len() > self.period {
                if let Some(leaving) = self.returns.pop_front() {
                    self.sum -= leaving;
                    self.sum_sq -= leaving * leaving;
                }
            }
        }
        self.prev_close = Some(event.close);
    }

    fn current_value(&self) -> IndicatorValue {
        if self.returns.len() < self.period {
            return IndicatorValue::warming(self.seen, self.warmup());
        }
        if self.period == 1 {
            return IndicatorValue::Ready(0.0);
        }
        let n = self.period as f64;
        // Running sums can drift slightly below zero on flat series.
        let variance = ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0);
        IndicatorValue::Ready(variance.sqrt())
    }
}
