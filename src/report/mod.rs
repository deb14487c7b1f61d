//! Report output: summary charts and the run report.

pub mod generator;
pub mod plotter;

pub use generator::{generate_summary_text, write_json_report};
pub use plotter::{plot_summary, PlotSettings};
