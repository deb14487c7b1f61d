//! Run report generation.
//!
//! Renders the outcome of a run as a JSON document or as the short
//! text summary printed at the end of a run.

use crate::models::RunReport;
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &RunReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write run report to {}", path.display()))
}

/// Generate the end-of-run summary lines.
pub fn generate_summary_text(report: &RunReport) -> String {
    let mut lines = Vec::new();

    let succeeded = report.pairs.len() - report.failures();
    lines.push(format!(
        "Pairs processed: {} ({} failed)",
        succeeded,
        report.failures()
    ));
    lines.push(format!(
        "Rows read: {} | Buckets written: {} | Plots saved: {}",
        report.pairs.iter().map(|p| p.rows_read).sum::<usize>(),
        report.pairs.iter().map(|p| p.buckets).sum::<usize>(),
        report.plots_written()
    ));
    lines.push(format!("Cycle length: {}", report.cycle_length));
    lines.push(format!("Duration: {:.1}s", report.duration_seconds));

    for pair in report.pairs.iter().filter(|p| !p.succeeded()) {
        lines.push(format!(
            "  - {}: {}",
            pair.label,
            pair.error.as_deref().unwrap_or("unknown error")
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PairOutcome, Schema};
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_report() -> RunReport {
        RunReport {
            started_at: Utc::now(),
            cycle_length: 10_000,
            duration_seconds: 1.25,
            pairs: vec![
                PairOutcome {
                    label: "Default".to_string(),
                    input: PathBuf::from("Default.csv"),
                    output: PathBuf::from("Default_Processed.csv"),
                    schema: Schema::Wealth,
                    rows_read: 70,
                    buckets: 70,
                    plots: vec![PathBuf::from("plots/Default_plot.png")],
                    error: None,
                },
                PairOutcome {
                    label: "Inheritance".to_string(),
                    input: PathBuf::from("Inheritance.csv"),
                    output: PathBuf::from("Inheritance_Processed.csv"),
                    schema: Schema::Class,
                    rows_read: 0,
                    buckets: 0,
                    plots: Vec::new(),
                    error: Some("failed to open Inheritance.csv".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"cycle_length\": 10000"));
        assert!(json.contains("\"schema\": \"class\""));
        assert!(json.contains("Default_plot.png"));
        // Successful pairs carry no error field.
        assert_eq!(json.matches("\"error\"").count(), 1);
    }

    #[test]
    fn test_write_json_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");

        write_json_report(&create_test_report(), &path).unwrap();

        let parsed: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.pairs.len(), 2);
        assert_eq!(parsed.failures(), 1);
    }

    #[test]
    fn test_generate_summary_text() {
        let text = generate_summary_text(&create_test_report());

        assert!(text.contains("Pairs processed: 1 (1 failed)"));
        assert!(text.contains("Rows read: 70 | Buckets written: 70 | Plots saved: 1"));
        assert!(text.contains("Inheritance: failed to open Inheritance.csv"));
    }
}
