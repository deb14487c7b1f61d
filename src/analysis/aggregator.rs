//! Tick-cycle aggregation of raw simulation logs.
//!
//! Raw rows are folded onto `tick mod cycle_length`, and every populated
//! bucket becomes one summary row. Buckets are kept in a `BTreeMap` so the
//! summary comes out in ascending tick order.

use super::error::AggregateError;
use crate::models::{
    AggregateOutcome, ClassSummary, RawRecord, Schema, Summary, WealthSummary,
};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Run length of the upstream simulation.
pub const DEFAULT_CYCLE_LENGTH: u64 = 10_000;

/// Rows sharing a bucket key.
pub type Buckets<'a> = BTreeMap<u64, Vec<&'a RawRecord>>;

/// Read a headerless log into memory.
///
/// Every column after the tick is parsed as a float. Rows with fewer
/// metric columns than `schema` requires are rejected.
pub fn read_raw_records(path: &Path, schema: Schema) -> Result<Vec<RawRecord>, AggregateError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| AggregateError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let expected = schema.metric_columns();
    let mut records = Vec::new();

    for result in reader.records() {
        let row = result.map_err(|source| AggregateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let raw_tick = row.get(0).unwrap_or("");
        let tick = raw_tick
            .parse::<i64>()
            .map_err(|_| AggregateError::InvalidTick {
                path: path.to_path_buf(),
                line,
                value: raw_tick.to_string(),
            })?;

        let values = row
            .iter()
            .enumerate()
            .skip(1)
            .map(|(column, field)| {
                field.parse::<f64>().map_err(|_| AggregateError::InvalidValue {
                    path: path.to_path_buf(),
                    line,
                    column,
                    value: field.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if values.len() < expected {
            return Err(AggregateError::MissingColumns {
                path: path.to_path_buf(),
                line,
                expected,
                found: values.len(),
            });
        }

        records.push(RawRecord { tick, values });
    }

    Ok(records)
}

/// Bucket key for a tick; always in `[0, cycle_length)`.
pub fn bucket_key(tick: i64, cycle_length: u64) -> u64 {
    tick.rem_euclid(cycle_length as i64) as u64
}

/// Group records by bucket key.
pub fn bucket_by_tick(records: &[RawRecord], cycle_length: u64) -> Buckets<'_> {
    let mut buckets: Buckets<'_> = BTreeMap::new();

    for record in records {
        buckets
            .entry(bucket_key(record.tick, cycle_length))
            .or_default()
            .push(record);
    }

    buckets
}

fn column<'a>(rows: &'a [&'a RawRecord], index: usize) -> impl Iterator<Item = f64> + 'a {
    rows.iter().map(move |r| r.values[index])
}

fn mean(rows: &[&RawRecord], index: usize) -> f64 {
    column(rows, index).sum::<f64>() / rows.len() as f64
}

/// Floor of the mean, for count columns.
fn floor_mean(rows: &[&RawRecord], index: usize) -> i64 {
    (column(rows, index).sum::<f64>() / rows.len() as f64).floor() as i64
}

/// Wealth-distribution summary.
///
/// Bucket extrema are divided by the bucket size, matching the log
/// writer's historical output.
pub fn summarize_wealth(buckets: &Buckets<'_>) -> Vec<WealthSummary> {
    buckets
        .iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(&tick, rows)| {
            let n = rows.len() as f64;
            let min = column(rows, 1).fold(f64::INFINITY, f64::min);
            let max = column(rows, 2).fold(f64::NEG_INFINITY, f64::max);

            WealthSummary {
                tick,
                total_wealth: mean(rows, 0),
                min_wealth: min / n,
                max_wealth: max / n,
                avg_wealth: mean(rows, 3),
                gini: mean(rows, 4),
            }
        })
        .collect()
}

/// Class-distribution summary.
pub fn summarize_class(buckets: &Buckets<'_>) -> Vec<ClassSummary> {
    buckets
        .iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(&tick, rows)| ClassSummary {
            tick,
            total_wealth: mean(rows, 0),
            gini: mean(rows, 1),
            num_lower_class: floor_mean(rows, 2),
            num_middle_class: floor_mean(rows, 3),
            num_upper_class: floor_mean(rows, 4),
        })
        .collect()
}

/// Summarize records under the given schema.
pub fn summarize(records: &[RawRecord], schema: Schema, cycle_length: u64) -> Summary {
    let buckets = bucket_by_tick(records, cycle_length);
    debug!(
        "{} records folded into {} buckets (cycle length {})",
        records.len(),
        buckets.len(),
        cycle_length
    );

    match schema {
        Schema::Wealth => Summary::Wealth(summarize_wealth(&buckets)),
        Schema::Class => Summary::Class(summarize_class(&buckets)),
    }
}

/// Write a summary CSV, header first.
pub fn write_summary(path: &Path, summary: &Summary) -> Result<(), AggregateError> {
    let write_err = |source| AggregateError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    writer
        .write_record(summary.schema().summary_header())
        .map_err(write_err)?;

    match summary {
        Summary::Wealth(rows) => {
            for row in rows {
                writer.write_record(row.to_record()).map_err(write_err)?;
            }
        }
        Summary::Class(rows) => {
            for row in rows {
                writer.write_record(row.to_record()).map_err(write_err)?;
            }
        }
    }

    writer.flush().map_err(|source| AggregateError::Flush {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a summary CSV written by [`write_summary`].
pub fn read_summary(path: &Path, schema: Schema) -> Result<Summary> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open summary: {}", path.display()))?;

    let summary = match schema {
        Schema::Wealth => Summary::Wealth(
            reader
                .deserialize()
                .collect::<Result<Vec<WealthSummary>, _>>()
                .with_context(|| format!("Failed to parse summary: {}", path.display()))?,
        ),
        Schema::Class => Summary::Class(
            reader
                .deserialize()
                .collect::<Result<Vec<ClassSummary>, _>>()
                .with_context(|| format!("Failed to parse summary: {}", path.display()))?,
        ),
    };

    Ok(summary)
}

/// Aggregate one raw log into a summary CSV.
pub fn aggregate_file(
    input: &Path,
    output: &Path,
    schema: Schema,
    cycle_length: u64,
) -> Result<AggregateOutcome, AggregateError> {
    let records = read_raw_records(input, schema)?;
    let summary = summarize(&records, schema, cycle_length);
    write_summary(output, &summary)?;

    Ok(AggregateOutcome {
        schema,
        rows_read: records.len(),
        buckets: summary.len(),
    })
}
