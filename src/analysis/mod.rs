//! Analysis modules.
//!
//! Folding raw per-tick logs into cycle summaries.

pub mod aggregator;
pub mod error;

pub use aggregator::*;
