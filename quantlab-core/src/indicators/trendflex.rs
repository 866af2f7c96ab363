//! Trendflex (John Ehlers, S&C February 2020).
//!
//! Closes are smoothed with a two-pole super-smoother. The mean difference
//! between the current filter value and each of the previous `period` filter
//! values is normalised by the root of an exponential average of its square.
//! The filter is held at zero for the first `period + 2` events and the first
//! value is reported on the next one. Warm-up: `period + 3` events.
//! Cost per event: O(period).

use std::collections::VecDeque;
use std::f64::consts::PI;

use super::{Indicator, IndicatorError, IndicatorValue};
use crate::domain::MarketEvent;

#[derive(Debug, Clone)]
pub struct Trendflex {
    period: usize,
    name: String,
    c1: f64,
    c2: f64,
    c3: f64,
    prev_close: f64,
    /// Last `period + 1` filter values, newest at the back.
    filt: VecDeque<f64>,
    mean_square: f64,
    value: f64,
    seen: usize,
}

impl Trendflex {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod { kind: "trendflex", period });
        }
        let half = 0.5 * period as f64;
        let a1 = (-1.414 * PI / half).exp();
        let b1 = 2.0 * a1 * (1.414 * PI / half).cos();
        let c2 = b1;
        let c3 = -a1 * a1;
        Ok(Self {
            period,
            name: format!("trendflex_{period}"),
            c1: 1.0 - c2 - c3,
            c2,
            c3,
            prev_close: 0.0,
            filt: VecDeque::with_capacity(period + 2),
            mean_square: 0.0,
            value: 0.0,
            seen: 0,
        })
    }

    fn push_filt(&mut self, value: f64) {
        self.filt.push_back(value);
        if self.filt.len() > self.period + 1 {
            self.filt.pop_front();
        }
    }
}

impl Indicator for Trendflex {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period + 3
    }

    fn update(&mut self, event: &MarketEvent) {
        let index = self.seen;
        self.seen += 1;

        if index < self.period + 2 {
            self.push_filt(0.0);
            self.prev_close = event.close;
            return;
        }

        let len = self.filt.len();
        let f1 = self.filt[len - 1];
        let f2 = self.filt[len - 2];
        let current =
            self.c1 * (event.close + self.prev_close) / 2.0 + self.c2 * f1 + self.c3 * f2;
        self.push_filt(current);
        self.prev_close = event.close;

        let len = self.filt.len();
        let sum: f64 = (1..=self.period)
            .map(|k| current - self.filt[len - 1 - k])
            .sum::<f64>()
            / self.period as f64;

        self.mean_square = 0.04 * sum * sum + 0.96 * self.mean_square;
        self.value = if self.mean_square != 0.0 {
            sum / self.mean_square.sqrt()
        } else {
            0.0
        };
    }

    fn current_value(&self) -> IndicatorValue {
        if self.seen < self.warmup() {
            return IndicatorValue::warming(self.seen, self.warmup());
        }
        IndicatorValue::Ready(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::run_indicator;

    #[test]
    fn warmup_is_period_plus_three() {
        let mut tf = Trendflex::new(4).unwrap();
        let values = run_indicator(&mut tf, &[100.0; 10]);
        assert!(values[..6].iter().all(|v| !v.is_ready()));
        assert!(values[6].is_ready());
    }

    #[test]
    fn uptrend_is_positive() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let mut tf = Trendflex::new(10).unwrap();
        let values = run_indicator(&mut tf, &closes);
        let last = values.last().and_then(|v| v.value()).unwrap();
        assert!(last > 0.0, "trendflex on a rising series should be positive, got {last}");
    }

    #[test]
    fn downtrend_is_negative() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let mut tf = Trendflex::new(10).unwrap();
        let values = run_indicator(&mut tf, &closes);
        let last = values.last().and_then(|v| v.value()).unwrap();
        assert!(last < 0.0);
    }

    #[test]
    fn bounded_by_normalisation() {
        // |sum / sqrt(0.04 sum^2 + ...)| <= 1 / sqrt(0.04) = 5
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + (i as f64 * 0.2).sin() * 10.0).collect();
        let mut tf = Trendflex::new(8).unwrap();
        for v in run_indicator(&mut tf, &closes).into_iter().filter_map(|v| v.value()) {
            assert!(v.abs() <= 5.0 + 1e-9);
        }
    }
}
