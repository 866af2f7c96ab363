//! Data sources for the runner: CSV files and seeded synthetic bars.
//!
//! CSV files carry `timestamp,open,high,low,close,volume` plus an optional
//! `symbol` column. Timestamps are RFC 3339 or plain `YYYY-MM-DD` (midnight
//! UTC). Rows keep file order; the feed reports any ordering violation.
//!
//! Synthetic data is a seeded random walk per symbol, for demos and tests.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;

use quantlab_core::domain::MarketEvent;
use quantlab_core::feed::{DataSource, FeedError, MemorySource};

use crate::config::{CsvFile, DataConfig};

/// Errors from reading market data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed CSV in {origin}: {source}")]
    Csv { origin: String, source: csv::Error },

    #[error("{origin} line {line}: unrecognised timestamp '{value}'")]
    Timestamp {
        origin: String,
        line: usize,
        value: String,
    },

    #[error("{origin} line {line}: row has no symbol and none was configured")]
    MissingSymbol { origin: String, line: usize },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    #[serde(default)]
    symbol: Option<String>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Parse an RFC 3339 timestamp, `YYYY-MM-DD HH:MM:SS` (UTC), or `YYYY-MM-DD`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Read events from CSV. `origin` names the input in error messages.
pub fn read_events_csv<R: Read>(
    reader: R,
    default_symbol: Option<&str>,
    origin: &str,
) -> Result<Vec<MarketEvent>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut events = Vec::new();
    for (i, row) in rdr.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.map_err(|source| LoadError::Csv {
            origin: origin.to_string(),
            source,
        })?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            origin: origin.to_string(),
            line,
            value: row.timestamp.clone(),
        })?;
        let symbol = row
            .symbol
            .filter(|s| !s.is_empty())
            .or_else(|| default_symbol.map(str::to_string))
            .ok_or_else(|| LoadError::MissingSymbol {
                origin: origin.to_string(),
                line,
            })?;
        events.push(MarketEvent {
            timestamp,
            symbol,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(events)
}

pub fn read_events_file(path: &Path, default_symbol: Option<&str>) -> Result<Vec<MarketEvent>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_events_csv(file, default_symbol, &path.display().to_string())
}

// ─── Sources ────────────────────────────────────────────────────────

/// One or more CSV files merged by `(timestamp, symbol)`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    name: String,
    files: Vec<CsvFile>,
}

impl CsvSource {
    pub fn new(files: Vec<CsvFile>) -> Self {
        let name = files
            .iter()
            .map(|f| f.path.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self { name, files }
    }

    pub fn load_events(&self) -> Result<Vec<MarketEvent>, LoadError> {
        let mut series = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let events = read_events_file(&file.path, file.symbol.as_deref())?;
            tracing::debug!(path = %file.path.display(), events = events.len(), "csv loaded");
            series.push(events);
        }
        Ok(MemorySource::merged(self.name.clone(), series).events().to_vec())
    }
}

impl DataSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<MarketEvent>, FeedError> {
        self.load_events().map_err(|err| FeedError::Source {
            source_name: self.name.clone(),
            message: err.to_string(),
        })
    }
}

/// Deterministic random-walk bars.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    symbols: Vec<String>,
    bars: usize,
    seed: u64,
    start: NaiveDate,
}

impl SyntheticSource {
    pub fn new(symbols: Vec<String>, bars: usize, seed: u64, start: NaiveDate) -> Self {
        Self {
            symbols,
            bars,
            seed,
            start,
        }
    }
}

impl DataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self) -> Result<Vec<MarketEvent>, FeedError> {
        let series = self
            .symbols
            .iter()
            .map(|symbol| generate_synthetic_events(symbol, self.bars, self.seed, self.start))
            .collect();
        Ok(MemorySource::merged("synthetic", series).events().to_vec())
    }
}

/// Build the source a data configuration describes.
pub fn build_source(config: &DataConfig) -> Box<dyn DataSource> {
    match config {
        DataConfig::Csv { files } => Box::new(CsvSource::new(files.clone())),
        DataConfig::Synthetic {
            symbols,
            bars,
            seed,
            start,
        } => Box::new(SyntheticSource::new(symbols.clone(), *bars, *seed, *start)),
    }
}

/// Generate `bars` weekday bars for `symbol`, starting at `start`.
///
/// Random walk from 100.0 with ±3% daily moves. The RNG is seeded from
/// BLAKE3 of the symbol and `seed`, so output is reproducible.
pub fn generate_synthetic_events(symbol: &str, bars: usize, seed: u64, start: NaiveDate) -> Vec<MarketEvent> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let mut events = Vec::with_capacity(bars);
    let mut price = 100.0_f64;
    let mut current = start;

    while events.len() < bars {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        let Some(timestamp) = Utc
            .with_ymd_and_hms(current.year(), current.month(), current.day(), 0, 0, 0)
            .single()
        else {
            break;
        };
        events.push(MarketEvent {
            timestamp,
            symbol: symbol.to_string(),
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    events
}

/// Deterministic BLAKE3 hash over all event data, in feed order.
pub fn dataset_hash(events: &[MarketEvent]) -> String {
    let mut hasher = blake3::Hasher::new();
    for event in events {
        hasher.update(event.symbol.as_bytes());
        hasher.update(&event.timestamp.timestamp().to_le_bytes());
        hasher.update(&event.open.to_le_bytes());
        hasher.update(&event.high.to_le_bytes());
        hasher.update(&event.low.to_le_bytes());
        hasher.update(&event.close.to_le_bytes());
        hasher.update(&event.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantlab_core::feed::verify_events;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        let day = Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-02-03"), Some(day));
        assert_eq!(parse_timestamp("2024-02-03T00:00:00Z"), Some(day));
        assert_eq!(parse_timestamp("2024-02-03T01:00:00+01:00"), Some(day));
        assert_eq!(
            parse_timestamp("2024-02-03 14:30:00"),
            Some(Utc.with_ymd_and_hms(2024, 2, 3, 14, 30, 0).unwrap())
        );
        assert_eq!(parse_timestamp("03/02/2024"), None);
    }

    #[test]
    fn reads_rows_with_symbol_column() {
        let csv = "timestamp,symbol,open,high,low,close,volume\n\
                   2024-01-02,SPY,100,101,99,100.5,1000\n\
                   2024-01-02,TLT,90,91,89,90.5,500\n";
        let events = read_events_csv(csv.as_bytes(), None, "inline").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].symbol, "TLT");
        assert_eq!(events[0].close, 100.5);
    }

    #[test]
    fn falls_back_to_configured_symbol() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,2,0.5,1.5\n";
        let events = read_events_csv(csv.as_bytes(), Some("BTC"), "inline").unwrap();
        assert_eq!(events[0].symbol, "BTC");
        assert_eq!(events[0].volume, 0.0);
    }

    #[test]
    fn missing_symbol_is_an_error() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,2,0.5,1.5\n";
        let err = read_events_csv(csv.as_bytes(), None, "inline").unwrap_err();
        assert!(matches!(err, LoadError::MissingSymbol { line: 2, .. }));
    }

    #[test]
    fn bad_timestamp_reports_line() {
        let csv = "timestamp,open,high,low,close\n2024-01-02,1,2,0.5,1.5\nyesterday,1,2,0.5,1.5\n";
        let err = read_events_csv(csv.as_bytes(), Some("X"), "inline").unwrap_err();
        assert!(matches!(err, LoadError::Timestamp { line: 3, .. }));
    }

    #[test]
    fn csv_source_maps_errors_to_feed_source_errors() {
        let source = CsvSource::new(vec![CsvFile {
            path: PathBuf::from("/definitely/not/here.csv"),
            symbol: Some("SPY".into()),
        }]);
        assert!(matches!(source.load(), Err(FeedError::Source { .. })));
    }

    #[test]
    fn synthetic_is_deterministic_per_seed() {
        let a = generate_synthetic_events("SPY", 50, 1, start());
        let b = generate_synthetic_events("SPY", 50, 1, start());
        let c = generate_synthetic_events("SPY", 50, 2, start());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(dataset_hash(&a), dataset_hash(&b));
        assert_ne!(dataset_hash(&a), dataset_hash(&c));
    }

    #[test]
    fn synthetic_bars_are_sane_weekdays() {
        let events = generate_synthetic_events("QQQ", 30, 0, start());
        assert_eq!(events.len(), 30);
        assert!(events.iter().all(MarketEvent::is_sane));
        assert!(events.iter().all(|e| {
            let wd = e.timestamp.weekday();
            wd != chrono::Weekday::Sat && wd != chrono::Weekday::Sun
        }));
        verify_events(&events).unwrap();
    }

    #[test]
    fn synthetic_source_merges_symbols_in_order() {
        let source = SyntheticSource::new(vec!["B".into(), "A".into()], 5, 3, start());
        let events = source.load().unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(events[0].symbol, "A");
        verify_events(&events).unwrap();
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn synthetic_series_always_verifies(
                bars in 1usize..200,
                seed in any::<u64>(),
                symbols in prop::collection::btree_set("[A-Z]{1,4}", 1..4),
            ) {
                let symbols: Vec<String> = symbols.into_iter().collect();
                let source = SyntheticSource::new(symbols.clone(), bars, seed, start());
                let events = source.load().unwrap();
                prop_assert_eq!(events.len(), bars * symbols.len());
                prop_assert!(events.iter().all(|e| e.is_sane() && e.low > 0.0));
                prop_assert!(verify_events(&events).is_ok());
            }
        }
    }
}
