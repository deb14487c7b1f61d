//! Wealthstat - tick-cycle summaries for wealth simulation logs
//!
//! Folds per-tick simulation logs onto the simulation's run length,
//! writes one summary CSV per log and renders the summaries as charts.
//!
//! Exit codes:
//!   0 - Every pair was aggregated (and plotted, unless disabled)
//!   1 - Invalid arguments, bad config, or at least one failed pair

mod analysis;
mod cli;
mod config;
mod driver;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use std::path::PathBuf;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
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

    // Config is read before logging so `[general] verbose` can set the level
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("Wealthstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run(&args, &config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default config file.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    println!("Edit it to set the data directory, cycle length and file pairs.");
    Ok(())
}

/// Initialize logging. `RUST_LOG`, when set, overrides `level`.
fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run every pair. Returns the process exit code.
fn run(args: &Args, config: &Config) -> Result<i32> {
    config.validate().context("Invalid configuration")?;

    if args.dry_run {
        return handle_dry_run(config);
    }

    info!(
        "Processing {} pairs with cycle length {}",
        config.pairs.len(),
        config.aggregation.cycle_length
    );

    let report = driver::run_pairs(config, !args.quiet);

    if let Some(ref path) = args.report {
        report::write_json_report(&report, path)?;
        info!("Run report saved to {}", path.display());
    }

    if !args.quiet || report.failures() > 0 {
        println!("\n{}", report::generate_summary_text(&report));
    }

    if report.failures() > 0 {
        for pair in report.pairs.iter().filter(|p| !p.succeeded()) {
            error!(
                "{} failed: {}",
                pair.label,
                pair.error.as_deref().unwrap_or("unknown error")
            );
        }
        return Ok(1);
    }

    Ok(0)
}

/// Handle --dry-run: print the resolved pairs, touch nothing.
fn handle_dry_run(config: &Config) -> Result<i32> {
    println!("Dry run: {} pairs would be processed\n", config.pairs.len());

    for (label, schema, input, output) in driver::describe_pairs(config) {
        let status = if input.is_file() { "" } else { " (missing)" };
        println!(
            "  {} [{}]: {}{} -> {}",
            label,
            schema,
            input.display(),
            status,
            output.display()
        );
    }

    println!("\nCycle length: {}", config.aggregation.cycle_length);
    if config.plot.enabled {
        println!("Plots: {}", config.plot.output_dir.display());
    } else {
        println!("Plots: disabled");
    }
    Ok(0)
}

/// Where the configuration came from, logged once logging is up.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    BuiltIn,
    Fallback(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::BuiltIn)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(e))),
    }
}
