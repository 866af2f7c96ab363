//! Result export — JSON, CSV, and text summary artifacts.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: fill tape, per-step equity, and raw market events
//! - **Text**: human-readable summary with equity and drawdown sparklines
//!
//! Results newer than this build's `SCHEMA_VERSION` are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use quantlab_core::domain::{Fill, MarketEvent, PortfolioSnapshot};
use quantlab_core::result::{BacktestResult, Termination, SCHEMA_VERSION};

use crate::plot::{DrawdownPlot, EquityCurvePlot, Plot};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Fill tape.
///
/// Columns: order_ref, timestamp, symbol, side, quantity, fill_price,
/// commission, slippage, cash_delta
pub fn export_fills_csv(fills: &[Fill]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "order_ref",
        "timestamp",
        "symbol",
        "side",
        "quantity",
        "fill_price",
        "commission",
        "slippage",
        "cash_delta",
    ])?;
    for f in fills {
        wtr.write_record([
            &f.order_ref.0.to_string(),
            &f.timestamp.to_rfc3339(),
            &f.symbol,
            &f.side.to_string(),
            &format!("{:.6}", f.quantity),
            &format!("{:.6}", f.fill_price),
            &format!("{:.2}", f.commission),
            &format!("{:.2}", f.slippage),
            &format!("{:.2}", f.cash_delta()),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per snapshot.
///
/// Columns: step, timestamp, symbol, cash, position_value, equity, realized_pnl
pub fn export_snapshots_csv(snapshots: &[PortfolioSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "step",
        "timestamp",
        "symbol",
        "cash",
        "position_value",
        "equity",
        "realized_pnl",
    ])?;
    for (i, s) in snapshots.iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &s.timestamp.to_rfc3339(),
            &s.symbol,
            &format!("{:.2}", s.cash),
            &format!("{:.2}", s.position_value()),
            &format!("{:.2}", s.equity),
            &format!("{:.2}", s.realized_pnl),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Market events in the layout the CSV loader reads back.
pub fn export_events_csv(events: &[MarketEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "symbol", "open", "high", "low", "close", "volume"])?;
    for e in events {
        wtr.write_record([
            &e.timestamp.to_rfc3339(),
            &e.symbol,
            &format!("{:.6}", e.open),
            &format!("{:.6}", e.high),
            &format!("{:.6}", e.low),
            &format!("{:.6}", e.close),
            &format!("{:.0}", e.volume),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Text summary ───────────────────────────────────────────────────

pub fn summary_text(result: &BacktestResult) -> Result<String> {
    let m = &result.metrics;
    let mut out = String::with_capacity(1024);

    writeln!(out, "strategy         {}", result.strategy)?;
    let status = match &result.termination {
        Termination::Exhausted => "completed".to_string(),
        Termination::Stopped => "stopped early".to_string(),
        Termination::Faulted { fault } => format!("FAULTED ({fault})"),
    };
    writeln!(out, "status           {status}")?;
    writeln!(out, "steps            {}", result.snapshots.len())?;
    writeln!(out, "initial capital  {:.2}", result.config.initial_capital)?;
    writeln!(out, "final equity     {:.2}", result.final_equity)?;
    writeln!(out, "total return     {:.2}%", m.total_return * 100.0)?;
    writeln!(out, "max drawdown     {:.2}%", m.max_drawdown * 100.0)?;
    writeln!(out, "sharpe           {:.3}", m.sharpe_ratio)?;
    writeln!(out, "sortino          {:.3}", m.sortino_ratio)?;
    writeln!(out, "volatility (ann) {:.2}%", m.annualized_volatility * 100.0)?;
    writeln!(out, "fills            {}", m.fill_count)?;
    writeln!(out, "rejected orders  {}", m.rejected_orders)?;
    writeln!(out, "closed trades    {}", m.closed_trades)?;
    writeln!(out, "win rate         {:.1}%", m.win_rate * 100.0)?;
    writeln!(out, "profit factor    {:.2}", m.profit_factor)?;
    writeln!(out, "expired orders   {}", result.expired.len())?;
    writeln!(out, "cancelled orders {}", result.cancelled.len())?;
    writeln!(out, "open orders      {}", result.open_orders.len())?;
    writeln!(out, "commission       {:.2}", m.total_commission)?;
    writeln!(out, "slippage         {:.2}", m.total_slippage)?;
    writeln!(out, "realized pnl     {:.2}", m.realized_pnl)?;
    writeln!(out, "unrealized pnl   {:.2}", m.unrealized_pnl)?;
    writeln!(out, "fingerprint      {}", result.fingerprint()?)?;
    out.push('\n');

    let mut charts = Vec::new();
    EquityCurvePlot::from_result(result).draw(&mut charts)?;
    DrawdownPlot::from_result(result).draw(&mut charts)?;
    out.push_str(&String::from_utf8(charts).context("plot output is not valid UTF-8")?);
    Ok(out)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifact set for one run into `output_dir` (created if needed):
/// - `result.json` — the full `BacktestResult`
/// - `fills.csv` — fill tape
/// - `equity.csv` — per-step equity
/// - `summary.txt` — metrics and charts
///
/// Returns `output_dir`.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    let write = |name: &str, content: String| -> Result<()> {
        let path = output_dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
    };
    write("result.json", export_json(result)?)?;
    write("fills.csv", export_fills_csv(&result.fills)?)?;
    write("equity.csv", export_snapshots_csv(&result.snapshots)?)?;
    write("summary.txt", summary_text(result)?)?;

    tracing::info!(dir = %output_dir.display(), "artifacts saved");
    Ok(output_dir.to_path_buf())
}

/// Load a `BacktestResult` from an artifact directory's `result.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
