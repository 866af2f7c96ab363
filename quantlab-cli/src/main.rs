//! QuantLab CLI — run, check, and synthetic-data commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config and save artifacts
//! - `check` — validate a config and its data without running
//! - `report` — print the summary of a saved run
//! - `synth` — write seeded synthetic bars to CSV

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use quantlab_runner::config::RunConfig;
use quantlab_runner::data_loader::generate_synthetic_events;
use quantlab_runner::export::{export_events_csv, load_artifacts, save_artifacts, summary_text};
use quantlab_runner::runner::{check_config, prepare_backtest};

#[derive(Parser)]
#[command(name = "quantlab", about = "QuantLab CLI — event-driven backtesting engine")]
struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. info, debug, quantlab_core=trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts. Defaults to results/<run id>.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Validate a config and its data without running.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Print the summary of a run saved by `run`.
    Report {
        /// Artifact directory containing result.json.
        #[arg(long)]
        dir: PathBuf,
    },
    /// Write seeded synthetic daily bars to a CSV file.
    Synth {
        #[arg(long)]
        symbol: String,

        #[arg(long, default_value_t = 252)]
        bars: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// First bar date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Run { config, output_dir } => run_backtest_cmd(config, output_dir),
        Commands::Check { config } => run_check(config),
        Commands::Report { dir } => run_report(dir),
        Commands::Synth {
            symbol,
            bars,
            seed,
            start,
            out,
        } => run_synth(&symbol, bars, seed, &start, out),
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_backtest_cmd(config_path: PathBuf, output_dir: Option<PathBuf>) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let run_id = config.run_id()?;

    let mut backtester = prepare_backtest(&config)?;
    let result = backtester.run()?;

    println!("{}", summary_text(&result)?);

    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("results").join(&run_id[..12]));
    let run_dir = save_artifacts(&result, &output_dir)?;
    let config_path = run_dir.join("config.toml");
    std::fs::write(&config_path, config.to_toml()?)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    println!("Artifacts saved to: {}", run_dir.display());

    if let Some(fault) = result.fault() {
        eprintln!("Run faulted: {fault}");
        std::process::exit(2);
    }
    Ok(())
}

fn run_check(config_path: PathBuf) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let report = check_config(&config)?;

    println!("config      {}", config_path.display());
    println!("strategy    {}", config.strategy.build()?.name());
    println!("events      {}", report.events);
    println!("symbols     {}", report.symbols.join(", "));
    if let (Some(first), Some(last)) = (report.first, report.last) {
        println!("range       {} .. {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d"));
    }
    println!("dataset     {}", report.dataset_hash);
    println!("run id      {}", config.run_id()?);
    Ok(())
}

fn run_report(dir: PathBuf) -> Result<()> {
    let result = load_artifacts(&dir)?;
    println!("{}", summary_text(&result)?);
    Ok(())
}

fn run_synth(symbol: &str, bars: usize, seed: u64, start: &str, out: PathBuf) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start date '{start}'"))?;
    let events = generate_synthetic_events(symbol, bars, seed, start);
    let csv = export_events_csv(&events)?;
    std::fs::write(&out, csv).with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(symbol, bars = events.len(), path = %out.display(), "synthetic data written");
    Ok(())
}
