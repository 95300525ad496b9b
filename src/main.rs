//! Cannoli Insights - multi-period analytics export
//!
//! A CLI tool that runs the analytics scripts once per reporting period,
//! merges their structured output and exports it as CSV, XLSX or PDF.
//!
//! Exit codes:
//!   0 - Success (a report is written even when some periods are missing)
//!   1 - Runtime error (script failure on a single-period command, I/O, config)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod runner;

use analysis::{InsightAggregator, InsightFilter};
use anyhow::{Context, Result};
use cli::{Args, Command};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ExportFormat, PeriodKey, Role};
use serde::Serialize;
use report::RenderOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Where the active configuration came from.
enum ConfigOrigin {
    Explicit(PathBuf),
    Default,
    Builtin,
    Unreadable(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, config.general.verbose);

    info!("Cannoli Insights v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    log_config_origin(&origin);

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .cannoli.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to point at your scripts directory and interpreter.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Log lines go to stderr so stdout stays clean for JSON output.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::Default)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Builtin)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(format!("{:#}", e)))),
    }
}

fn log_config_origin(origin: &ConfigOrigin) {
    match origin {
        ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigOrigin::Default => info!("Loaded default config from {}", CONFIG_FILE),
        ConfigOrigin::Builtin => debug!("No config file found, using defaults"),
        ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {}", e),
    }
}

async fn run(args: Args, config: Config) -> Result<()> {
    let aggregator =
        InsightAggregator::new(config.runner.clone()).with_concurrency(config.export.concurrent);

    match args.command {
        Command::Export {
            kind,
            output,
            periods,
            role,
        } => {
            let periods = periods.unwrap_or_else(|| config.export.periods.clone());
            let format = resolve_format(kind.as_deref());
            let options = RenderOptions {
                top_n: config.export.top_n,
                generated_at: None,
            };
            run_export(&aggregator, &periods, role, format, &options, output, args.quiet).await
        }
        Command::Insights {
            period,
            role,
            channel,
            region,
        } => {
            let filter = InsightFilter::new(channel, region);
            let record = aggregator.fetch_filtered(period, role, &filter).await?;
            print_json(&record)
        }
        Command::Alerts { period } => {
            let alerts = aggregator.alerts(period).await?;
            print_json(&alerts)
        }
        Command::InitConfig => handle_init_config(),
    }
}

fn resolve_format(selector: Option<&str>) -> ExportFormat {
    let format = ExportFormat::from_selector(selector);
    if let Some(raw) = selector {
        if !raw.trim().eq_ignore_ascii_case(format.extension()) {
            warn!("Unknown export type '{}', falling back to {}", raw, format);
        }
    }
    format
}

/// Run the multi-period export and write the rendered report to disk.
async fn run_export(
    aggregator: &InsightAggregator,
    periods: &[PeriodKey],
    role: Role,
    format: ExportFormat,
    options: &RenderOptions,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let labels: Vec<String> = periods.iter().map(PeriodKey::to_string).collect();

    if !quiet {
        println!("📥 Collecting insights for: {}", labels.join(", "));
    }

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };
    spinner.set_message(format!("Running {} script(s)", labels.len()));

    let dataset = aggregator.collect(periods, role).await?;
    spinner.finish_and_clear();

    let report = report::render(&dataset, format, options)?;
    let path = output.unwrap_or_else(|| PathBuf::from(report.filename));
    report
        .write_to(&path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    if !quiet {
        println!("\n📊 Export Summary:");
        println!(
            "   Periods with data: {} of {}",
            dataset.present().count(),
            dataset.len()
        );
        for entry in dataset.entries() {
            let status = if entry.record.is_some() {
                "✅ data"
            } else {
                "⚠️  missing"
            };
            println!("   - {}: {}", entry.period, status);
        }
        println!("   Content-Type: {}", report.content_type);
        println!("   Content-Disposition: {}", report.content_disposition());
        println!("   Size: {} bytes", report.bytes.len());
        println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
        println!("\n✅ Report saved to: {}", path.display());
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
