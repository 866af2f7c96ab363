//! Event feed — a validated, replayable sequence of market events.
//!
//! A [`DataSource`] performs all I/O up front in `load()`. The [`EventFeed`]
//! then hands events out one at a time, enforcing that the ordering key
//! `(timestamp, symbol)` strictly increases. A violation is reported as
//! [`FeedError::DataOrder`] at the offending event; everything before it has
//! already been delivered.

pub mod memory;

pub use memory::MemorySource;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::MarketEvent;

/// Errors from data sources and the event feed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error("data source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error(
        "data order violation at index {index}: {symbol}@{timestamp} does not follow {prev_symbol}@{prev_timestamp}"
    )]
    DataOrder {
        index: usize,
        symbol: String,
        timestamp: DateTime<Utc>,
        prev_symbol: String,
        prev_timestamp: DateTime<Utc>,
    },

    #[error("malformed bar at index {index}: {symbol}@{timestamp}")]
    MalformedBar {
        index: usize,
        symbol: String,
        timestamp: DateTime<Utc>,
    },
}

/// Supplier of raw bars. External collaborator; the feed adapts it.
pub trait DataSource {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Load every event this source holds, in source order.
    fn load(&self) -> Result<Vec<MarketEvent>, FeedError>;
}

/// Lazy, ordered, restartable sequence of market events.
#[derive(Debug, Clone)]
pub struct EventFeed {
    events: Vec<MarketEvent>,
    cursor: usize,
    last: Option<(DateTime<Utc>, String)>,
}

impl EventFeed {
    /// Build a fresh feed from a source snapshot. Every feed built from the
    /// same snapshot replays identically.
    pub fn from_source(source: &dyn DataSource) -> Result<Self, FeedError> {
        let events = source.load()?;
        tracing::debug!(source = source.name(), events = events.len(), "feed loaded");
        Ok(Self::from_events(events))
    }

    pub fn from_events(events: Vec<MarketEvent>) -> Self {
        Self {
            events,
            cursor: 0,
            last: None,
        }
    }

    /// Pull the next event. `Ok(None)` is end-of-stream.
    ///
    /// On error the cursor does not advance, so the same error repeats.
    pub fn next_event(&mut self) -> Result<Option<MarketEvent>, FeedError> {
        let Some(event) = self.events.get(self.cursor) else {
            return Ok(None);
        };
        check_event(self.cursor, event, self.last.as_ref())?;
        self.last = Some((event.timestamp, event.symbol.clone()));
        self.cursor += 1;
        Ok(Some(event.clone()))
    }

    /// Restart from the first event.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.last = None;
    }

    /// Total events held (delivered or not).
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events delivered so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Validate the whole feed without consuming it.
    pub fn verify(&self) -> Result<(), FeedError> {
        verify_events(&self.events)
    }
}

impl Iterator for EventFeed {
    type Item = Result<MarketEvent, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Validate ordering and bar sanity of a full event sequence.
pub fn verify_events(events: &[MarketEvent]) -> Result<(), FeedError> {
    let mut last: Option<(DateTime<Utc>, String)> = None;
    for (index, event) in events.iter().enumerate() {
        check_event(index, event, last.as_ref())?;
        last = Some((event.timestamp, event.symbol.clone()));
    }
    Ok(())
}

fn check_event(
    index: usize,
    event: &MarketEvent,
    last: Option<&(DateTime<Utc>, String)>,
) -> Result<(), FeedError> {
    if !event.is_sane() {
        return Err(FeedError::MalformedBar {
            index,
            symbol: event.symbol.clone(),
            timestamp: event.timestamp,
        });
    }
    if let Some((prev_ts, prev_sym)) = last {
        if event.sort_key() <= (*prev_ts, prev_sym.as_str()) {
            return Err(FeedError::DataOrder {
                index,
                symbol: event.symbol.clone(),
                timestamp: event.timestamp,
                prev_symbol: prev_sym.clone(),
                prev_timestamp: *prev_ts,
            });
        }
    }
    Ok(())
}

/// Build a daily test event: `open = close - 0.5`, `high/low = close ± 1`.
#[cfg(test)]
pub(crate) fn make_event(symbol: &str, day: i64, close: f64) -> MarketEvent {
    use chrono::TimeZone;
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    MarketEvent {
        timestamp: base + chrono::Duration::days(day),
        symbol: symbol.to_string(),
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_events_in_order() {
        let mut feed = EventFeed::from_events(vec![
            make_event("SPY", 0, 100.0),
            make_event("SPY", 1, 101.0),
        ]);
        assert_eq!(feed.next_event().unwrap().unwrap().close, 100.0);
        assert_eq!(feed.next_event().unwrap().unwrap().close, 101.0);
        assert_eq!(feed.next_event().unwrap(), None);
    }

    #[test]
    fn same_timestamp_ordered_by_symbol() {
        let mut feed = EventFeed::from_events(vec![
            make_event("QQQ", 0, 100.0),
            make_event("SPY", 0, 200.0),
        ]);
        assert!(feed.next_event().is_ok());
        assert!(feed.next_event().is_ok());
    }

    #[test]
    fn out_of_order_timestamp_is_data_order_error() {
        let mut feed = EventFeed::from_events(vec![
            make_event("SPY", 1, 100.0),
            make_event("SPY", 0, 101.0),
        ]);
        assert!(feed.next_event().is_ok());
        let err = feed.next_event().unwrap_err();
        assert!(matches!(err, FeedError::DataOrder { index: 1, .. }));
        // cursor did not advance
        assert_eq!(feed.position(), 1);
    }

    #[test]
    fn duplicate_key_is_data_order_error() {
        let feed = EventFeed::from_events(vec![
            make_event("SPY", 0, 100.0),
            make_event("SPY", 0, 100.0),
        ]);
        assert!(matches!(
            feed.verify(),
            Err(FeedError::DataOrder { index: 1, .. })
        ));
    }

    #[test]
    fn tie_with_descending_symbol_is_data_order_error() {
        let events = vec![make_event("SPY", 0, 100.0), make_event("QQQ", 0, 100.0)];
        assert!(verify_events(&events).is_err());
    }

    #[test]
    fn malformed_bar_rejected() {
        let mut bad = make_event("SPY", 0, 100.0);
        bad.high = 50.0;
        let mut feed = EventFeed::from_events(vec![bad]);
        assert!(matches!(
            feed.next_event(),
            Err(FeedError::MalformedBar { index: 0, .. })
        ));
    }

    #[test]
    fn rewind_replays_identically() {
        let mut feed = EventFeed::from_events(vec![
            make_event("SPY", 0, 100.0),
            make_event("SPY", 1, 101.0),
        ]);
        let first: Vec<_> = feed.by_ref().collect::<Result<_, _>>().unwrap();
        feed.rewind();
        let second: Vec<_> = feed.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(first, second);
    }
}
