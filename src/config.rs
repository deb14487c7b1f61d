//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.wealthstat.toml` files.

use crate::analysis::DEFAULT_CYCLE_LENGTH;
use crate::models::{FilePair, Schema};
use crate::report::PlotSettings;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".wealthstat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Plot settings.
    #[serde(default)]
    pub plot: PlotConfig,

    /// Ordered list of (input, output) files to process.
    #[serde(default = "default_pairs")]
    pub pairs: Vec<FilePair>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            aggregation: AggregationConfig::default(),
            plot: PlotConfig::default(),
            pairs: default_pairs(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory that pair paths are resolved against.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Continue with the remaining pairs after a failure.
    #[serde(default)]
    pub keep_going: bool,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            keep_going: false,
            verbose: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Modulus for folding ticks. Must match the simulation's run length.
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u64,

    /// Schema for pairs that don't name one.
    #[serde(default)]
    pub default_schema: Schema,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            cycle_length: default_cycle_length(),
            default_schema: Schema::default(),
        }
    }
}

fn default_cycle_length() -> u64 {
    DEFAULT_CYCLE_LENGTH
}

/// Chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Render charts after aggregating.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory the images are written to.
    #[serde(default = "default_plot_dir")]
    pub output_dir: PathBuf,

    /// Image width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: default_plot_dir(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_plot_dir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    768
}

/// The scenario logs written by the simulation's batch runs.
fn default_pairs() -> Vec<FilePair> {
    [
        "Default",
        "RandomSpawn",
        "Inheritance",
        "GrowthRate_1",
        "GrowthRate_10",
        "GrowthRate_50",
        "GrowthRate_100",
        "Population_100",
        "Population_250",
        "Population_500",
        "Population_1000",
    ]
    .into_iter()
    .map(|name| FilePair::new(format!("{}.csv", name), format!("{}_Processed.csv", name)))
    .collect()
}

impl From<&PlotConfig> for PlotSettings {
    fn from(config: &PlotConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            width: config.width,
            height: config.height,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(cycle_length) = args.cycle_length {
            self.aggregation.cycle_length = cycle_length;
        }
        if let Some(schema) = args.schema {
            self.aggregation.default_schema = schema;
        }

        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.clone();
        }
        if let Some(ref plot_dir) = args.plot_dir {
            self.plot.output_dir = plot_dir.clone();
        }

        // A pair list on the command line replaces the configured one
        if !args.pair.is_empty() {
            self.pairs = args.pair.clone();
        }

        // Flags always override
        if args.no_plots {
            self.plot.enabled = false;
        }
        if args.keep_going {
            self.general.keep_going = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that serde can't.
    pub fn validate(&self) -> Result<()> {
        if self.aggregation.cycle_length == 0 {
            bail!("cycle_length must be at least 1");
        }
        if self.aggregation.cycle_length > i64::MAX as u64 {
            bail!("cycle_length is too large: {}", self.aggregation.cycle_length);
        }
        if self.plot.width == 0 || self.plot.height == 0 {
            bail!(
                "plot size must be non-zero, got {}x{}",
                self.plot.width,
                self.plot.height
            );
        }
        for pair in &self.pairs {
            if pair.input.as_os_str().is_empty() || pair.output.as_os_str().is_empty() {
                bail!("every pair needs both an input and an output path");
            }
        }
        Ok(())
    }

    /// Resolve a pair path against the data directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.general.data_dir.join(path)
    }

    /// Plot settings derived from the `[plot]` section.
    pub fn plot_settings(&self) -> PlotSettings {
        PlotSettings::from(&self.plot)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.aggregation.cycle_length, 10_000);
        assert_eq!(config.aggregation.default_schema, Schema::Wealth);
        assert_eq!(config.plot.output_dir, PathBuf::from("plots"));
        assert_eq!(config.pairs.len(), 11);
        assert_eq!(config.pairs[0].input, PathBuf::from("Default.csv"));
        assert_eq!(
            config.pairs[10].output,
            PathBuf::from("Population_1000_Processed.csv")
        );
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_dir = "stat"
keep_going = true

[aggregation]
cycle_length = 7000
default_schema = "class"

[plot]
output_dir = "charts"

[[pairs]]
input = "Tax.csv"
output = "Tax_Processed.csv"

[[pairs]]
input = "Legacy.csv"
output = "Legacy_Processed.csv"
schema = "wealth"
label = "legacy-run"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_dir, PathBuf::from("stat"));
        assert!(config.general.keep_going);
        assert_eq!(config.aggregation.cycle_length, 7000);
        assert_eq!(config.aggregation.default_schema, Schema::Class);
        assert_eq!(config.plot.output_dir, PathBuf::from("charts"));
        assert!(config.plot.enabled);
        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.pairs[0].schema, None);
        assert_eq!(config.pairs[1].schema, Some(Schema::Wealth));
        assert_eq!(config.pairs[1].label(), "legacy-run");
    }

    #[test]
    fn test_missing_pairs_use_defaults() {
        let config: Config = toml::from_str("[aggregation]\ncycle_length = 500\n").unwrap();
        assert_eq!(config.aggregation.cycle_length, 500);
        assert_eq!(config.pairs.len(), 11);
    }

    #[test]
    fn test_validate_rejects_zero_cycle() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.aggregation.cycle_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_against_data_dir() {
        let mut config = Config::default();
        config.general.data_dir = PathBuf::from("stat");
        assert_eq!(
            config.resolve(Path::new("Default.csv")),
            PathBuf::from("stat/Default.csv")
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[aggregation]"));
        assert!(toml_str.contains("[plot]"));
        assert!(toml_str.contains("[[pairs]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.pairs, Config::default().pairs);
    }
}
