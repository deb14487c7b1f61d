//! Data models for the report pipeline.
//!
//! This module contains the core data structures shared by the
//! aggregator, the plotter and the run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Layout of a raw simulation log and of the summary derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// Wealth-distribution log: total, min, max, avg wealth and gini.
    #[default]
    Wealth,
    /// Class-distribution log: total wealth, gini and three class counts.
    Class,
}

impl Schema {
    /// Number of metric columns (after the tick) a raw row must carry.
    pub fn metric_columns(&self) -> usize {
        5
    }

    /// Header row of the summary CSV.
    pub fn summary_header(&self) -> &'static [&'static str] {
        match self {
            Schema::Wealth => &[
                "tick",
                "totalWealth",
                "minWealth",
                "maxWealth",
                "avgWealth",
                "gini",
            ],
            Schema::Class => &[
                "tick",
                "totalWealth",
                "gini",
                "numLowerClass",
                "numMiddleClass",
                "numUpperClass",
            ],
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Wealth => write!(f, "wealth"),
            Schema::Class => write!(f, "class"),
        }
    }
}

/// One row of a raw per-tick log.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Simulation tick as written by the simulation.
    pub tick: i64,
    /// Metric values in column order.
    pub values: Vec<f64>,
}

/// Summary row for a wealth-distribution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthSummary {
    pub tick: u64,
    pub total_wealth: f64,
    pub min_wealth: f64,
    pub max_wealth: f64,
    pub avg_wealth: f64,
    pub gini: f64,
}

impl WealthSummary {
    /// Render the row with the fixed output precision.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.tick.to_string(),
            format!("{:.2}", self.total_wealth),
            format!("{:.2}", self.min_wealth),
            format!("{:.2}", self.max_wealth),
            format!("{:.2}", self.avg_wealth),
            format!("{:.4}", self.gini),
        ]
    }
}

/// Summary row for a class-distribution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub tick: u64,
    pub total_wealth: f64,
    pub gini: f64,
    pub num_lower_class: i64,
    pub num_middle_class: i64,
    pub num_upper_class: i64,
}

impl ClassSummary {
    /// Render the row; gini keeps its full precision.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.tick.to_string(),
            format!("{:.2}", self.total_wealth),
            self.gini.to_string(),
            self.num_lower_class.to_string(),
            self.num_middle_class.to_string(),
            self.num_upper_class.to_string(),
        ]
    }
}

/// Summary rows of either schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Wealth(Vec<WealthSummary>),
    Class(Vec<ClassSummary>),
}

impl Summary {
    /// Number of summary rows.
    pub fn len(&self) -> usize {
        match self {
            Summary::Wealth(rows) => rows.len(),
            Summary::Class(rows) => rows.len(),
        }
    }

    /// Returns true if no bucket was populated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket keys in output order.
    pub fn ticks(&self) -> Vec<u64> {
        match self {
            Summary::Wealth(rows) => rows.iter().map(|r| r.tick).collect(),
            Summary::Class(rows) => rows.iter().map(|r| r.tick).collect(),
        }
    }

    pub fn schema(&self) -> Schema {
        match self {
            Summary::Wealth(_) => Schema::Wealth,
            Summary::Class(_) => Schema::Class,
        }
    }
}

/// An input log and the summary file produced from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePair {
    /// Raw log file, relative to the data directory.
    pub input: PathBuf,
    /// Summary CSV, relative to the data directory.
    pub output: PathBuf,
    /// Schema override for this pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Label used in chart titles and image names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FilePair {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            schema: None,
            label: None,
        }
    }

    /// Explicit label, or the input file stem.
    pub fn label(&self) -> String {
        if let Some(ref label) = self.label {
            return label.clone();
        }
        label_from_path(&self.input)
    }

    /// Schema for this pair, falling back to `default`.
    pub fn schema_or(&self, default: Schema) -> Schema {
        self.schema.unwrap_or(default)
    }
}

/// File stem without directory or extension.
pub fn label_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Counts produced by a single aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOutcome {
    pub schema: Schema,
    /// Raw rows read from the input.
    pub rows_read: usize,
    /// Summary rows written (populated buckets).
    pub buckets: usize,
}

/// Result of processing one file pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairOutcome {
    pub label: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub schema: Schema,
    pub rows_read: usize,
    pub buckets: usize,
    /// Images written for this pair.
    pub plots: Vec<PathBuf>,
    /// Failure message, if the pair did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PairOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Machine-readable record of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub cycle_length: u64,
    pub duration_seconds: f64,
    pub pairs: Vec<PairOutcome>,
}

impl RunReport {
    /// Number of pairs that failed.
    pub fn failures(&self) -> usize {
        self.pairs.iter().filter(|p| !p.succeeded()).count()
    }

    /// Total images written across all pairs.
    pub fn plots_written(&self) -> usize {
        self.pairs.iter().map(|p| p.plots.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_input_stem() {
        let pair = FilePair::new("stat/GrowthRate_10.csv", "GrowthRate_10_Processed.csv");
        assert_eq!(pair.label(), "GrowthRate_10");

        let labelled = FilePair {
            label: Some("growth-10".to_string()),
            ..pair
        };
        assert_eq!(labelled.label(), "growth-10");
    }

    #[test]
    fn test_schema_fallback() {
        let mut pair = FilePair::new("a.csv", "b.csv");
        assert_eq!(pair.schema_or(Schema::Class), Schema::Class);
        pair.schema = Some(Schema::Wealth);
        assert_eq!(pair.schema_or(Schema::Class), Schema::Wealth);
    }

    #[test]
    fn test_wealth_record_precision() {
        let row = WealthSummary {
            tick: 7,
            total_wealth: 1234.5,
            min_wealth: 0.126,
            max_wealth: 99.999,
            avg_wealth: 12.0,
            gini: 0.123456,
        };
        assert_eq!(
            row.to_record(),
            vec!["7", "1234.50", "0.13", "100.00", "12.00", "0.1235"]
        );
    }

    #[test]
    fn test_class_record_keeps_gini() {
        let row = ClassSummary {
            tick: 0,
            total_wealth: 150.0,
            gini: 0.4,
            num_lower_class: 6,
            num_middle_class: 3,
            num_upper_class: 1,
        };
        assert_eq!(row.to_record().join(","), "0,150.00,0.4,6,3,1");
    }

    #[test]
    fn test_schema_display_and_header() {
        assert_eq!(Schema::Wealth.to_string(), "wealth");
        assert_eq!(Schema::Class.to_string(), "class");
        assert_eq!(Schema::Class.summary_header()[3], "numLowerClass");
        assert_eq!(Schema::Wealth.summary_header().len(), 6);
    }
}
