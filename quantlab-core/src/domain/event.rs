//! MarketEvent — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol at a single timestamp.
///
/// Events are handed out by shared reference once produced; nothing in the
/// engine mutates an event after the feed has validated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl MarketEvent {
    /// Ordering key used by the feed: timestamp first, then symbol.
    pub fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.timestamp, self.symbol.as_str())
    }

    /// Basic OHLC sanity check: all prices finite, high >= low,
    /// open/close inside the range, close strictly positive.
    pub fn is_sane(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> MarketEvent {
        MarketEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            symbol: "SPY".into(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn event_is_sane() {
        assert!(sample_event().is_sane());
    }

    #[test]
    fn event_detects_nan() {
        let mut event = sample_event();
        event.open = f64::NAN;
        assert!(!event.is_sane());
    }

    #[test]
    fn event_detects_insane_high_low() {
        let mut event = sample_event();
        event.high = 97.0; // below low
        assert!(!event.is_sane());
    }

    #[test]
    fn sort_key_breaks_ties_by_symbol() {
        let a = sample_event();
        let mut b = sample_event();
        b.symbol = "QQQ".into();
        assert!(b.sort_key() < a.sort_key());
    }
}
