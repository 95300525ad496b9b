//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{PeriodKey, Role};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cannoli Insights - multi-period analytics export
///
/// Runs the analytics scripts for each reporting period and exports the
/// combined results as CSV, XLSX or PDF.
///
/// Examples:
///   cannoli-insights export --type xlsx
///   cannoli-insights export --type pdf --periods 30d,90d -o resumo.pdf
///   cannoli-insights insights 30d --channel ifood
///   cannoli-insights alerts 60d
///   cannoli-insights init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .cannoli.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Program used to run the analytics scripts
    #[arg(long, value_name = "PROGRAM", env = "CANNOLI_PROGRAM", global = true)]
    pub program: Option<String>,

    /// Directory holding the analytics scripts
    #[arg(long, value_name = "DIR", env = "CANNOLI_SCRIPTS_DIR", global = true)]
    pub scripts_dir: Option<PathBuf>,

    /// Seconds before a script is killed (0 disables the limit)
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Run the per-period scripts one after another instead of concurrently
    #[arg(long, global = true)]
    pub sequential: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Export the consolidated report for every configured period
    Export {
        /// Output encoding: csv, xlsx or pdf (anything else falls back to csv)
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        kind: Option<String>,

        /// Output file path (defaults to the suggested report filename)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Periods to include (comma-separated)
        ///
        /// Example: --periods 30d,90d
        #[arg(long, value_name = "PERIODS", value_delimiter = ',')]
        periods: Option<Vec<PeriodKey>>,

        /// Script variant to run
        #[arg(long, default_value = "admin")]
        role: Role,
    },

    /// Print one period's insights as JSON
    Insights {
        /// Period to fetch: 30d, 60d or 90d
        period: PeriodKey,

        /// Script variant to run
        #[arg(long, default_value = "admin")]
        role: Role,

        /// Keep only stores of this sales channel ("all" disables)
        #[arg(long)]
        channel: Option<String>,

        /// Keep only stores of this delivery region ("all" disables)
        #[arg(long)]
        region: Option<String>,
    },

    /// Print one period's alerts as JSON
    Alerts {
        /// Period to fetch: 30d, 60d or 90d
        period: PeriodKey,
    },

    /// Generate a default .cannoli.toml configuration file
    InitConfig,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref program) = self.program {
            if program.trim().is_empty() {
                return Err("Program must not be empty".to_string());
            }
        }

        if let Command::Export {
            output: Some(ref output),
            ..
        } = self.command
        {
            if output.is_dir() {
                return Err(format!(
                    "Output path is a directory: {}",
                    output.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
