//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a window, kept as a running sum.
//! Warm-up: `period` events.

use std::collections::VecDeque;

use super::{Indicator, IndicatorError, IndicatorValue};
use crate::domain::MarketEvent;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod { kind: "sma", period });
        }
        Ok(Self {
            period,
            name: format!("sma_{period}"),
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        })
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn update(&mut self, event: &MarketEvent) {
        self.window.push_back(event.close);
        self.sum += event.close;
        if self.window.len() > self.period {
            if let Some(leaving) = self.window.pop_front() {
                self.sum -= leaving;
            }
        }
    }

    fn current_value(&self) -> IndicatorValue {
        if self.window.len() < self.period {
            return IndicatorValue::warming(self.window.len(), self.period);
        }
        IndicatorValue::Ready(self.sum / self.period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_ready, run_indicator, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let mut sma = Sma::new(5).unwrap();
        let values = run_indicator(&mut sma, &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);

        for (i, v) in values.iter().take(4).enumerate() {
            assert_eq!(*v, IndicatorValue::WarmingUp { remaining: 4 - i });
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_ready(values[4], 12.0, DEFAULT_EPSILON);
        assert_ready(values[5], 13.0, DEFAULT_EPSILON);
        assert_ready(values[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let mut sma = Sma::new(1).unwrap();
        let values = run_indicator(&mut sma, &[100.0, 200.0, 300.0]);
        assert_ready(values[0], 100.0, DEFAULT_EPSILON);
        assert_ready(values[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_few_events() {
        let mut sma = Sma::new(5).unwrap();
        let values = run_indicator(&mut sma, &[10.0, 11.0]);
        assert!(values.iter().all(|v| !v.is_ready()));
    }
}
