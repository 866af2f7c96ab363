//! Plot series for backtest results, rendered as text sparklines.
//!
//! A [`Plot`] owns a named numeric series and knows how to draw itself to
//! any writer. Rendering is plain text so reports stay terminal-friendly.

use std::io::{self, Write};

use quantlab_core::metrics::drawdown_series;
use quantlab_core::result::BacktestResult;

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Default number of columns a sparkline is resampled to.
pub const DEFAULT_WIDTH: usize = 60;

pub trait Plot {
    fn name(&self) -> &str;

    fn data(&self) -> &[f64];

    fn draw(&self, out: &mut dyn Write) -> io::Result<()> {
        draw_series(self.name(), self.data(), DEFAULT_WIDTH, out)
    }
}

/// Equity curve: initial capital followed by closing equity per timestamp.
#[derive(Debug, Clone)]
pub struct EquityCurvePlot {
    data: Vec<f64>,
}

impl EquityCurvePlot {
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    pub fn from_result(result: &BacktestResult) -> Self {
        Self::new(result.equity_curve())
    }
}

impl Plot for EquityCurvePlot {
    fn name(&self) -> &str {
        "equity"
    }

    fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Drawdown from running peak, as a negative fraction.
#[derive(Debug, Clone)]
pub struct DrawdownPlot {
    data: Vec<f64>,
}

impl DrawdownPlot {
    pub fn from_equity(equity_curve: &[f64]) -> Self {
        Self {
            data: drawdown_series(equity_curve),
        }
    }

    pub fn from_result(result: &BacktestResult) -> Self {
        Self::from_equity(&result.equity_curve())
    }
}

impl Plot for DrawdownPlot {
    fn name(&self) -> &str {
        "drawdown"
    }

    fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Write `name  [min .. max]` followed by the sparkline on its own line.
pub fn draw_series(name: &str, data: &[f64], width: usize, out: &mut dyn Write) -> io::Result<()> {
    if data.is_empty() {
        return writeln!(out, "{name}  (no data)");
    }
    let (min, max) = bounds(data);
    writeln!(out, "{name}  [{min:.4} .. {max:.4}]")?;
    writeln!(out, "{}", sparkline(&resample(data, width)))
}

/// Map each value onto eight block heights. A flat series draws mid-height.
pub fn sparkline(data: &[f64]) -> String {
    let (min, max) = bounds(data);
    let range = max - min;
    data.iter()
        .map(|&v| {
            let normalized = if range > 1e-10 { (v - min) / range } else { 0.5 };
            let idx = (normalized * (SPARK_CHARS.len() - 1) as f64).round() as usize;
            SPARK_CHARS[idx.min(SPARK_CHARS.len() - 1)]
        })
        .collect()
}

/// Downsample to at most `width` points, keeping the last value of each bucket.
pub fn resample(data: &[f64], width: usize) -> Vec<f64> {
    if width == 0 || data.len() <= width {
        return data.to_vec();
    }
    (1..=width)
        .map(|bucket| {
            let end = bucket * data.len() / width;
            data[end - 1]
        })
        .collect()
}

fn bounds(data: &[f64]) -> (f64, f64) {
    data.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
