//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::RuleSetting;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Plastiscope - plastic-pollution cleanup reports
///
/// Load a CSV of cleanup records, pick a year, country and parent company,
/// and get the key indicators, plastic composition, trends and top
/// companies as a Markdown or JSON report.
///
/// Examples:
///   plastiscope --data plastics.csv
///   plastiscope --data plastics.csv --year 2020 --country Kenya
///   plastiscope --data plastics.csv --company "The Coca-Cola Company" --format json
///   plastiscope --data plastics.csv --list
///   plastiscope --data plastics.csv --check
///   plastiscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV file with cleanup records
    ///
    /// Can also be set via PLASTISCOPE_DATA or [data].path in .plastiscope.toml.
    #[arg(short, long, value_name = "FILE", env = "PLASTISCOPE_DATA")]
    pub data: Option<PathBuf>,

    /// Year to report on (default: earliest year in the data)
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Country to report on (default: first country in the data)
    #[arg(short = 'C', long, value_name = "NAME")]
    pub country: Option<String>,

    /// Parent company for the composition breakdown, or "All"
    #[arg(short = 'p', long, value_name = "NAME")]
    pub company: Option<String>,

    /// Number of companies in the ranking
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .plastiscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How total rows are told apart from company rows
    ///
    /// auto uses the row_kind column when present, otherwise the first
    /// row of each country/year group.
    #[arg(long, value_name = "RULE")]
    pub rule: Option<RuleArg>,

    /// Fail when a country/year group has no plausible total row
    #[arg(long)]
    pub strict: bool,

    /// Absolute tolerance for --check breakdown comparisons
    #[arg(long, value_name = "AMOUNT")]
    pub tolerance: Option<f64>,

    /// Print the available years, countries and companies, then exit
    #[arg(long, conflicts_with = "check")]
    pub list: bool,

    /// Check total rows against their company breakdowns
    ///
    /// Exit code 2 when any group is implausible or does not add up.
    #[arg(long)]
    pub check: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .plastiscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Classification rule for --rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RuleArg {
    Auto,
    Positional,
    FlagColumn,
}

impl From<RuleArg> for RuleSetting {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::Auto => RuleSetting::Auto,
            RuleArg::Positional => RuleSetting::Positional,
            RuleArg::FlagColumn => RuleSetting::FlagColumn,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(top) = self.top {
            if top == 0 {
                return Err("Top company count must be at least 1".to_string());
            }
        }

        if let Some(tolerance) = self.tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err("Tolerance must be a non-negative number".to_string());
            }
        }

        if let Some(ref country) = self.country {
            if country.trim().is_empty() {
                return Err("Country must not be empty".to_string());
            }
        }

        // Validate data file if provided
        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Data file does not exist: {}", data.display()));
            }
            if !data.is_file() {
                return Err(format!("Data path is not a file: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
