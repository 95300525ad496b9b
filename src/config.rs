//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cannoli.toml` files. The loaded [`Config`] is passed explicitly into
//! the pipeline; nothing below reads process-wide state on its own.

use crate::error::{InsightError, Result as InsightResult};
use crate::models::{PeriodKey, Role};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".cannoli.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// External analytics process settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Report export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// How the analytics scripts are located and run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Interpreter or program used to run the scripts.
    #[serde(default = "default_program")]
    pub program: String,

    /// Directory holding the analytics scripts.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Script for the administrative dashboard.
    #[serde(default = "default_admin_script")]
    pub admin_script: String,

    /// Script for the restricted client dashboard.
    #[serde(default = "default_client_script")]
    pub client_script: String,

    /// Script producing alerts for a single period.
    #[serde(default = "default_alerts_script")]
    pub alerts_script: String,

    /// Seconds before a script is killed. 0 disables the limit.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Arguments appended after the period argument.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Variables added on top of the inherited environment.
    #[serde(default = "default_env")]
    pub env: BTreeMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            scripts_dir: default_scripts_dir(),
            admin_script: default_admin_script(),
            client_script: default_client_script(),
            alerts_script: default_alerts_script(),
            timeout_seconds: default_timeout(),
            extra_args: Vec::new(),
            env: default_env(),
        }
    }
}

fn default_program() -> String {
    "python".to_string()
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("src/python")
}

fn default_admin_script() -> String {
    "insights_admin.py".to_string()
}

fn default_client_script() -> String {
    "insights_from_json.py".to_string()
}

fn default_alerts_script() -> String {
    "alerts.py".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_env() -> BTreeMap<String, String> {
    BTreeMap::from([("PYTHONIOENCODING".to_string(), "utf-8".to_string())])
}

impl RunnerConfig {
    /// Script file name for a role.
    pub fn script_for(&self, role: Role) -> &str {
        match role {
            Role::Admin => &self.admin_script,
            Role::Client => &self.client_script,
        }
    }

    /// Absolute path of a script inside `scripts_dir`.
    ///
    /// Scripts run with their own directory as working directory, so a
    /// relative path would no longer resolve once the child starts.
    pub fn script_path(&self, script: &str) -> InsightResult<PathBuf> {
        let path = self.scripts_dir.join(script);
        std::path::absolute(&path).map_err(|e| InsightError::ProcessExecution {
            program: self.program.clone(),
            status: None,
            stderr: format!("cannot resolve script path {}: {}", path.display(), e),
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

/// Report export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Periods collected for an export, in report order.
    #[serde(default = "default_periods")]
    pub periods: Vec<PeriodKey>,

    /// Run the per-period scripts concurrently.
    #[serde(default = "default_true")]
    pub concurrent: bool,

    /// Maximum ranked entries listed per period in the document encoding.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            periods: default_periods(),
            concurrent: true,
            top_n: default_top_n(),
        }
    }
}

fn default_periods() -> Vec<PeriodKey> {
    PeriodKey::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

fn default_top_n() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref program) = args.program {
            self.runner.program = program.clone();
        }
        if let Some(ref dir) = args.scripts_dir {
            self.runner.scripts_dir = dir.clone();
        }
        if let Some(timeout) = args.timeout {
            self.runner.timeout_seconds = timeout;
        }
        if args.sequential {
            self.export.concurrent = false;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
