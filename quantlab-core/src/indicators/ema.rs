//! Exponential Moving Average (EMA).
//!
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seeded with the SMA of the first `period` closes. Warm-up: `period` events.

use super::{Indicator, IndicatorError, IndicatorValue};
use crate::domain::MarketEvent;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
    alpha: f64,
    seen: usize,
    seed_sum: f64,
    value: f64,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod { kind: "ema", period });
        }
        Ok(Self {
            period,
            name: format!("ema_{period}"),
            alpha: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            value: 0.0,
        })
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn update(&mut self, event: &MarketEvent) {
        self.seen += 1;
        if self.seen < self.period {
            self.seed_sum += event.close;
        } else if self.seen == self.period {
            self.seed_sum += event.close;
            self.value = self.seed_sum / self.period as f64;
        } else {
            self.value += self.alpha * (event.close - self.value);
        }
    }

    fn current_value(&self) -> IndicatorValue {
        if self.seen < self.period {
            return IndicatorValue::warming(self.seen, self.period);
        }
        IndicatorValue::Ready(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_ready, run_indicator, DEFAULT_EPSILON};

    #[test]
    fn ema_seeded_with_sma() {
        let mut ema = Ema::new(3).unwrap();
        let values = run_indicator(&mut ema, &[2.0, 4.0, 6.0, 8.0]);
        assert!(!values[1].is_ready());
        // seed = mean(2,4,6) = 4
        assert_ready(values[2], 4.0, DEFAULT_EPSILON);
        // alpha = 0.5 → 4 + 0.5 * (8 - 4) = 6
        assert_ready(values[3], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_constant_series_is_constant() {
        let mut ema = Ema::new(4).unwrap();
        let values = run_indicator(&mut ema, &[50.0; 10]);
        for v in &values[3..] {
            assert_ready(*v, 50.0, DEFAULT_EPSILON);
        }
    }
}
