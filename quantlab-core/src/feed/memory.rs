//! In-memory data source.

use super::{DataSource, FeedError};
use crate::domain::MarketEvent;

/// Data source backed by a vector of events, returned as-is.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    events: Vec<MarketEvent>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, events: Vec<MarketEvent>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }

    /// Merge several per-symbol series into one stream ordered by
    /// `(timestamp, symbol)`.
    ///
    /// Each series keeps its own order: the merge always takes the smallest
    /// head, so a series that is itself out of order stays out of order and
    /// the feed still reports it.
    pub fn merged(name: impl Into<String>, series: Vec<Vec<MarketEvent>>) -> Self {
        let total = series.iter().map(Vec::len).sum();
        let mut cursors = vec![0usize; series.len()];
        let mut events = Vec::with_capacity(total);
        loop {
            let next = series
                .iter()
                .zip(&cursors)
                .enumerate()
                .filter_map(|(i, (s, &c))| s.get(c).map(|e| (i, e.sort_key())))
                .min_by(|(_, a), (_, b)| a.cmp(b))
                .map(|(i, _)| i);
            let Some(i) = next else {
                break;
            };
            events.push(series[i][cursors[i]].clone());
            cursors[i] += 1;
        }
        Self::new(name, events)
    }

    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<MarketEvent>, FeedError> {
        Ok(self.events.clone())
    }
}
