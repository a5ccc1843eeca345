//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.plastiscope.toml` files.

use crate::analysis::{RuleSetting, DEFAULT_TOLERANCE, DEFAULT_TOP_N};
use crate::cli::{Args, OutputFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".plastiscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data source settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Default selection.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where the table comes from and how rows are classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the CSV file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Classification rule: auto, positional or flag-column.
    #[serde(default)]
    pub rule: RuleSetting,

    /// Treat groups without a plausible total row as fatal.
    #[serde(default)]
    pub strict: bool,

    /// Absolute tolerance for breakdown checks.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            rule: RuleSetting::default(),
            strict: false,
            tolerance: default_tolerance(),
        }
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// Selection used when the command line gives none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Year; earliest year in the data when unset.
    #[serde(default)]
    pub year: Option<i32>,

    /// Country; first country in the data when unset.
    #[serde(default)]
    pub country: Option<String>,

    /// Parent company or "All".
    #[serde(default = "default_company")]
    pub company: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            year: None,
            country: None,
            company: default_company(),
        }
    }
}

fn default_company() -> String {
    "All".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file; stdout when unset.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Number of companies in the ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output: None,
            top_n: default_top_n(),
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.plastiscope.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given on the command line override.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref path) = args.data {
            self.data.path = Some(path.clone());
        }
        if let Some(rule) = args.rule {
            self.data.rule = rule.into();
        }
        if args.strict {
            self.data.strict = true;
        }
        if let Some(tolerance) = args.tolerance {
            self.data.tolerance = tolerance;
        }

        if let Some(year) = args.year {
            self.selection.year = Some(year);
        }
        if let Some(ref country) = args.country {
            self.selection.country = Some(country.clone());
        }
        if let Some(ref company) = args.company {
            self.selection.company = company.clone();
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref output) = args.output {
            self.report.output = Some(output.clone());
        }
        if let Some(top_n) = args.top {
            self.report.top_n = top_n;
        }
    }

    /// Check values that may come from either the file or the command line.
    pub fn validate(&self) -> Result<()> {
        if self.report.top_n == 0 {
            anyhow::bail!("[report].top_n must be at least 1");
        }
        if !self.data.tolerance.is_finite() || self.data.tolerance < 0.0 {
            anyhow::bail!("[data].tolerance must be a non-negative number");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
