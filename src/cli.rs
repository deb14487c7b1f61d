//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{FilePair, Schema};
use clap::Parser;
use std::path::PathBuf;

/// Wealthstat - tick-cycle summaries and charts for simulation logs
///
/// Folds per-tick wealth logs onto the simulation's run length, writes
/// one summary CSV per log and renders the summaries as PNG charts.
///
/// Examples:
///   wealthstat
///   wealthstat --data-dir stat --plot-dir stat/plots
///   wealthstat --pair Tax.csv=Tax_Processed.csv --schema class
///   wealthstat --cycle-length 7000 --keep-going --report run.json
///   wealthstat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .wealthstat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Input log and summary output, as INPUT=OUTPUT (repeatable)
    ///
    /// Replaces the configured pair list.
    #[arg(long, value_name = "INPUT=OUTPUT", value_parser = parse_pair)]
    pub pair: Vec<FilePair>,

    /// Schema for pairs that don't name one
    #[arg(long, value_name = "SCHEMA")]
    pub schema: Option<Schema>,

    /// Tick modulus; must match the simulation's run length
    #[arg(long, value_name = "TICKS", env = "WEALTHSTAT_CYCLE_LENGTH")]
    pub cycle_length: Option<u64>,

    /// Directory that pair paths are resolved against
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory the chart images are written to
    #[arg(long, value_name = "DIR")]
    pub plot_dir: Option<PathBuf>,

    /// Aggregate only, skip chart rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Keep processing the remaining pairs after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Write a JSON run report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Dry run: print the resolved pairs without reading or writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .wealthstat.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Parse an `INPUT=OUTPUT` pair.
fn parse_pair(s: &str) -> Result<FilePair, String> {
    let (input, output) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INPUT=OUTPUT, got '{}'", s))?;

    let (input, output) = (input.trim(), output.trim());
    if input.is_empty() || output.is_empty() {
        return Err(format!("expected INPUT=OUTPUT, got '{}'", s));
    }

    Ok(FilePair::new(input, output))
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

        if self.cycle_length == Some(0) {
            return Err("Cycle length must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        if let Some(ref data_dir) = self.data_dir {
            if !data_dir.is_dir() {
                return Err(format!(
                    "Data directory does not exist: {}",
                    data_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the config file;
    /// `--quiet` wins over both.
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
