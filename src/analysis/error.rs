//! Errors raised while turning a raw log into a summary.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading, parsing or writing a log file.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: tick '{value}' is not an integer")]
    InvalidTick {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{path}:{line}: column {column} value '{value}' is not a number")]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: usize,
        value: String,
    },

    #[error("{path}:{line}: expected at least {expected} metric columns, found {found}")]
    MissingColumns {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AggregateError {
    /// Returns true for malformed input rows, as opposed to I/O failures.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            AggregateError::InvalidTick { .. }
                | AggregateError::InvalidValue { .. }
                | AggregateError::MissingColumns { .. }
        )
    }
}
