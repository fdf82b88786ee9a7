//! fractallab CLI — layered fractal bias reports.
//!
//! Commands:
//! - `report` — evaluate instruments from a CSV directory (or synthetic bars)
//!   and print or save the batch as a summary, JSON or CSV
//! - `check-config` — parse and validate a table file, print its fingerprint

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use fractallab_core::domain::{Cadence, LayerReport, LayerStatus};
use fractallab_core::SignalConfig;
use fractallab_runner::{
    render, run_batch, write_report, BarProvider, BatchReport, CsvProvider, ExportFormat,
    SyntheticProvider,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fractallab", about = "fractallab CLI — monthly/weekly/daily fractal bias reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate instruments and emit a layered report.
    Report {
        /// Instruments to evaluate (e.g., NQ ES YM GC).
        #[arg(required = true)]
        instruments: Vec<String>,

        /// Path to the probability table TOML. Defaults to built-in cadence
        /// parameters with empty tables.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding `<INSTRUMENT>.csv` files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Use deterministic synthetic bars instead of CSV files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// First synthetic date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-01")]
        start: String,

        /// Last synthetic date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-12-31")]
        end: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Summary)]
        format: Format,

        /// Write to this file instead of stdout (json or csv only).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse and validate a table file.
    CheckConfig {
        /// Path to the probability table TOML.
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Summary,
    Json,
    Csv,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            instruments,
            config,
            data_dir,
            synthetic,
            start,
            end,
            format,
            output,
        } => run_report(instruments, config, data_dir, synthetic, &start, &end, format, output),
        Commands::CheckConfig { config } => run_check_config(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<SignalConfig> {
    match path {
        Some(path) => SignalConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(SignalConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_report(
    instruments: Vec<String>,
    config_path: Option<PathBuf>,
    data_dir: PathBuf,
    synthetic: bool,
    start: &str,
    end: &str,
    format: Format,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let provider: Box<dyn BarProvider> = if synthetic {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .with_context(|| format!("invalid --start '{start}'"))?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
            .with_context(|| format!("invalid --end '{end}'"))?;
        Box::new(SyntheticProvider::new(start, end))
    } else {
        Box::new(CsvProvider::new(data_dir))
    };

    let batch = run_batch(provider.as_ref(), &instruments, &config)?;

    let export = match format {
        Format::Summary => None,
        Format::Json => Some(ExportFormat::Json),
        Format::Csv => Some(ExportFormat::Csv),
    };

    match (export, output) {
        (None, Some(_)) => bail!("--output requires --format json or --format csv"),
        (None, None) => print_summary(&batch),
        (Some(fmt), Some(path)) => {
            write_report(&batch, fmt, &path)?;
            info!(path = %path.display(), "report written");
        }
        (Some(fmt), None) => println!("{}", render(&batch, fmt)?),
    }

    if batch.failed() > 0 {
        bail!("{} of {} instruments failed", batch.failed(), batch.results.len());
    }
    Ok(())
}

fn run_check_config(path: PathBuf) -> Result<()> {
    let config = load_config(Some(path))?;
    let fingerprint = config.fingerprint()?;

    println!("version:     {}", config.version);
    println!("fingerprint: {fingerprint}");
    println!("grades:      {} steps", config.grades.steps.len());
    for (id, tables) in &config.instruments {
        println!(
            "  {id:<4} {:<22} monthly {:>2} seasonal, weekly {:>2} seasonal",
            tables.name.as_deref().unwrap_or("-"),
            tables.monthly.seasonal.len(),
            tables.weekly.seasonal.len(),
        );
    }
    Ok(())
}

fn print_summary(batch: &BatchReport) {
    let short = batch.config_fingerprint.get(..12).unwrap_or(&batch.config_fingerprint);
    println!("config {} ({short})", batch.config_version);

    for outcome in &batch.results {
        println!();
        let Some(report) = &outcome.report else {
            println!("{}  ERROR: {}", outcome.instrument_id, outcome.error.as_deref().unwrap_or("unknown"));
            continue;
        };
        println!(
            "{}  {}  last {:.2} @ {}",
            report.instrument_id,
            report.name.as_deref().unwrap_or(""),
            report.current_price,
            report.as_of
        );
        for layer in Cadence::ALL.map(|c| report.layers.get(c)) {
            println!("  {}", layer_line(layer));
            for t in &layer.targets {
                println!(
                    "      {:<18} {:<9} {:>5.1}%  {:<9} {:<8}{}",
                    format!("{:?}", t.kind),
                    format!("{:?}", t.status),
                    t.probability,
                    format!("{:?}", t.grade),
                    format!("{:?}", t.tier),
                    t.tag.as_deref().map(|tag| format!("  [{tag}]")).unwrap_or_default(),
                );
            }
        }
    }

    println!();
    println!("{} succeeded, {} failed", batch.succeeded(), batch.failed());
}

fn layer_line(layer: &LayerReport) -> String {
    let cadence = layer.cadence.label();
    match layer.status {
        LayerStatus::Forming => {
            format!("{cadence:<8} FORMING    {}", layer.detail.as_deref().unwrap_or(""))
        }
        LayerStatus::Undefined => {
            format!("{cadence:<8} UNDEFINED  {}", layer.detail.as_deref().unwrap_or(""))
        }
        LayerStatus::Locked => {
            let bias = layer.bias.map(|b| format!("{b:?}")).unwrap_or_default();
            let position = layer
                .signal
                .as_ref()
                .and_then(|s| s.position)
                .map(|p| format!("{:.1}%", p * 100.0))
                .unwrap_or_default();
            let edge = layer
                .sigma_edge
                .as_ref()
                .map(|e| {
                    let outlook = e
                        .outlook
                        .as_ref()
                        .map(|o| {
                            let setup = o.setup.as_deref().map(|s| format!(" {s}")).unwrap_or_default();
                            format!(" {:.1}% {:?}{setup}", o.probability, o.grade)
                        })
                        .unwrap_or_default();
                    format!("  sigma {:+.2}x ({:?}){outlook}", e.multiple, e.state)
                })
                .unwrap_or_default();
            format!("{cadence:<8} {bias:<10} pos {position}{edge}")
        }
    }
}
