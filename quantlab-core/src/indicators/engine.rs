//! Indicator engine — one indicator set per symbol, updated per event.

use std::collections::BTreeMap;

use super::{Indicator, IndicatorError, IndicatorSpec, IndicatorValue};
use crate::domain::MarketEvent;

/// Indicator values for one symbol after one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorValues {
    symbol: String,
    values: BTreeMap<String, IndicatorValue>,
}

impl IndicatorValues {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: IndicatorValue) {
        self.values.insert(name.into(), value);
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Raw indicator value, `None` if no indicator has that name.
    pub fn get(&self, name: &str) -> Option<IndicatorValue> {
        self.values.get(name).copied()
    }

    /// Numeric value if the indicator exists and is warmed up.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(IndicatorValue::value)
    }

    /// Numeric value, or the reason it is unavailable.
    pub fn require(&self, name: &str) -> Result<f64, IndicatorError> {
        match self.get(name) {
            Some(IndicatorValue::Ready(v)) => Ok(v),
            Some(IndicatorValue::WarmingUp { remaining }) => {
                Err(IndicatorError::InsufficientHistory {
                    name: name.to_string(),
                    remaining,
                })
            }
            None => Err(IndicatorError::Unknown(name.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IndicatorValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Maintains per-symbol indicator instances built from a list of specs.
pub struct IndicatorEngine {
    specs: Vec<IndicatorSpec>,
    by_symbol: BTreeMap<String, Vec<Box<dyn Indicator>>>,
}

impl IndicatorEngine {
    /// Validate specs up front so a bad period fails before the run starts.
    pub fn new(specs: Vec<IndicatorSpec>) -> Result<Self, IndicatorError> {
        let mut seen = std::collections::BTreeSet::new();
        for spec in &specs {
            spec.build()?;
            if !seen.insert(spec.name()) {
                return Err(IndicatorError::DuplicateName(spec.name()));
            }
        }
        Ok(Self {
            specs,
            by_symbol: BTreeMap::new(),
        })
    }

    /// Largest warm-up across configured indicators.
    pub fn max_warmup(&self) -> usize {
        self.specs
            .iter()
            .filter_map(|s| s.build().ok())
            .map(|i| i.warmup())
            .max()
            .unwrap_or(0)
    }

    /// Fold an event into the indicators of its symbol and return their values.
    pub fn update(&mut self, event: &MarketEvent) -> IndicatorValues {
        let specs = &self.specs;
        let indicators = self
            .by_symbol
            .entry(event.symbol.clone())
            .or_insert_with(|| specs.iter().filter_map(|s| s.build().ok()).collect());

        let mut values = IndicatorValues::new(event.symbol.clone());
        for indicator in indicators.iter_mut() {
            indicator.update(event);
            values.insert(indicator.name(), indicator.current_value());
        }
        values
    }
}
