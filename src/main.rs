//! Plastiscope - plastic-pollution cleanup reports
//!
//! A CLI tool that loads a pre-aggregated CSV of cleanup records,
//! classifies total and company rows, and renders the dashboard
//! aggregates for one selection as Markdown or JSON.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing columns, unreadable file, bad selection, etc.)
//!   2 - Data-quality issues found by --check

mod analysis;
mod cli;
mod config;
mod data;
mod error;
mod models;
mod report;

use analysis::{Classification, ClassifiedTable};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use models::{CompanyFilter, Selection};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Plastiscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .plastiscope.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to set the data path, default selection and report format.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over the verbosity flags when set.
fn init_logging(args: &Args) {
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        let subscriber = builder.with_env_filter(EnvFilter::from_default_env()).finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    } else {
        let subscriber = builder.with_max_level(args.log_level()).finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}

/// Run the complete load-classify-report workflow. Returns exit code (0 or 2).
fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let data_path = config
        .data
        .path
        .clone()
        .context("No data file given: use --data, PLASTISCOPE_DATA or [data].path")?;

    // Step 1: Load and classify the table
    let classification = load_and_classify(&data_path, &config)?;
    let table = &classification.table;

    // Handle --check: verify breakdowns and exit
    if args.check {
        return handle_check(&classification, config.data.tolerance);
    }

    if config.data.strict {
        classification.ensure_plausible()?;
    }

    // Step 2: Resolve the selection
    let selection = resolve_selection(table, &config)?;

    // Handle --list: print selector options and exit
    if args.list {
        return handle_list(table, selection.year);
    }

    let options = analysis::selector_options(table, selection.year);
    selection.validate(&options)?;
    info!(
        "Selection: {} / {} / {}",
        selection.country, selection.year, selection.company
    );

    // Step 3: Aggregate
    let dashboard = analysis::build_dashboard(
        &classification,
        &selection,
        config.report.top_n,
        &data_path.display().to_string(),
    );

    if dashboard.kpi.is_none() {
        warn!(
            "No total row for {} in {}",
            selection.country, selection.year
        );
    }

    // Step 4: Render and write the report
    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(&dashboard),
    };

    match config.report.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }

    Ok(0)
}

/// Load the CSV and tag total and company rows.
fn load_and_classify(path: &Path, config: &Config) -> Result<Classification> {
    let loaded = data::load_csv(path)?;
    let rule = config.data.rule.resolve(loaded.has_row_kind)?;
    info!("Classifying rows using the {} rule", rule);

    let classification = analysis::classify(loaded.records, rule);
    info!(
        "{} total rows, {} company rows",
        classification.table.total_count(),
        classification.table.company_count()
    );

    let mismatches = analysis::verify_breakdowns(&classification.table, config.data.tolerance);
    for mismatch in &mismatches {
        debug!("Breakdown mismatch: {}", mismatch);
    }

    Ok(classification)
}

/// Build the selection from config, filling gaps with the data's defaults.
fn resolve_selection(table: &ClassifiedTable, config: &Config) -> Result<Selection> {
    let fallback = analysis::default_selection(table).context("Data has no total rows")?;

    Ok(Selection::new(
        config.selection.year.unwrap_or(fallback.year),
        config
            .selection
            .country
            .clone()
            .unwrap_or(fallback.country),
        CompanyFilter::from(config.selection.company.as_str()),
    ))
}

/// Handle --list: print the values each selector accepts.
fn handle_list(table: &ClassifiedTable, year: i32) -> Result<i32> {
    let options = analysis::selector_options(table, year);

    println!("Years:");
    for year in &options.years {
        println!("  {}", year);
    }

    println!("\nCountries:");
    for country in &options.countries {
        println!("  {}", country);
    }

    println!("\nParent companies ({}):", year);
    println!("  {}", CompanyFilter::ALL_LABEL);
    for company in &options.companies {
        println!("  {}", company);
    }

    Ok(0)
}

/// Handle --check: report implausible groups and breakdown mismatches.
fn handle_check(classification: &Classification, tolerance: f64) -> Result<i32> {
    let mismatches = analysis::verify_breakdowns(&classification.table, tolerance);
    let anomalies = &classification.anomalies;

    println!("🔍 Checked {} groups", classification.table.groups().count());

    if !anomalies.is_empty() {
        println!("\n⚠️  {} implausible group(s):", anomalies.len());
        for anomaly in anomalies {
            println!("   - {}", anomaly);
        }
    }

    if !mismatches.is_empty() {
        println!(
            "\n⚠️  {} breakdown mismatch(es) (tolerance {}):",
            mismatches.len(),
            tolerance
        );
        for mismatch in &mismatches {
            println!("   - {}", mismatch);
        }
    }

    if anomalies.is_empty() && mismatches.is_empty() {
        println!("\n✅ Every total row matches its company breakdown.");
        Ok(0)
    } else {
        Ok(2)
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
