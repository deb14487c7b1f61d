//! Pair-by-pair orchestration.
//!
//! Each configured pair is aggregated and then plotted, strictly in list
//! order. The first failure stops the run unless `keep_going` is set.

use crate::analysis::aggregate_file;
use crate::config::Config;
use crate::models::{FilePair, PairOutcome, RunReport};
use crate::report::plot_summary;
use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run every configured pair and collect the outcomes.
pub fn run_pairs(config: &Config, show_progress: bool) -> RunReport {
    let started_at = Utc::now();
    let start_time = Instant::now();

    let pb = if show_progress {
        let pb = ProgressBar::new(config.pairs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut outcomes = Vec::with_capacity(config.pairs.len());

    for pair in &config.pairs {
        let label = pair.label();
        pb.set_message(label.clone());

        let mut announce =
            |path: &Path| pb.suspend(|| println!("Saved plot to {}", path.display()));

        match process_pair(config, pair, &mut announce) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                let message = format!("{:#}", e);
                outcomes.push(failed_outcome(config, pair, message.clone()));

                if config.general.keep_going {
                    warn!("Skipping {}: {}", label, message);
                } else {
                    pb.abandon_with_message(format!("{} failed", label));
                    break;
                }
            }
        }

        pb.inc(1);
    }

    if !pb.is_finished() {
        pb.finish_with_message("done");
    }

    RunReport {
        started_at,
        cycle_length: config.aggregation.cycle_length,
        duration_seconds: start_time.elapsed().as_secs_f64(),
        pairs: outcomes,
    }
}

/// Aggregate one pair, then plot its summary.
///
/// `on_saved` sees each chart image as it is written.
pub fn process_pair(
    config: &Config,
    pair: &FilePair,
    on_saved: &mut dyn FnMut(&Path),
) -> Result<PairOutcome> {
    let label = pair.label();
    let schema = pair.schema_or(config.aggregation.default_schema);
    let input = config.resolve(&pair.input);
    let output = config.resolve(&pair.output);

    info!(
        "Aggregating {} -> {} ({} schema)",
        input.display(),
        output.display(),
        schema
    );

    let aggregated = aggregate_file(&input, &output, schema, config.aggregation.cycle_length)
        .map_err(|e| {
            if e.is_parse_error() {
                warn!("{}: malformed row in {}", label, input.display());
            }
            e
        })
        .with_context(|| format!("Failed to aggregate {}", label))?;

    debug!(
        "{}: {} rows folded into {} {} buckets",
        label, aggregated.rows_read, aggregated.buckets, aggregated.schema
    );

    let plots = if config.plot.enabled {
        plot_summary(&output, &label, schema, &config.plot_settings(), on_saved)
            .with_context(|| format!("Failed to plot {}", label))?
    } else {
        Vec::new()
    };

    info!("Finished {} ({} plots)", label, plots.len());

    Ok(PairOutcome {
        label,
        input,
        output,
        schema,
        rows_read: aggregated.rows_read,
        buckets: aggregated.buckets,
        plots,
        error: None,
    })
}

fn failed_outcome(config: &Config, pair: &FilePair, error: String) -> PairOutcome {
    PairOutcome {
        label: pair.label(),
        input: config.resolve(&pair.input),
        output: config.resolve(&pair.output),
        schema: pair.schema_or(config.aggregation.default_schema),
        rows_read: 0,
        buckets: 0,
        plots: Vec::new(),
        error: Some(error),
    }
}

/// Resolved (label, schema, input, output) for each pair, for dry runs.
pub fn describe_pairs(config: &Config) -> Vec<(String, String, PathBuf, PathBuf)> {
    config
        .pairs
        .iter()
        .map(|pair| {
            (
                pair.label(),
                pair.schema_or(config.aggregation.default_schema).to_string(),
                config.resolve(&pair.input),
                config.resolve(&pair.output),
            )
        })
        .collect()
}
