//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.signalsift.toml` files.

use crate::analysis::DEFAULT_TOP_N;
use crate::capture::CaptureSchema;
use crate::cli::OutputFormat;
use crate::models::DisplayZone;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".signalsift.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Capture table and column names.
    #[serde(default)]
    pub schema: CaptureSchema,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output file; stdout when unset.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Debug-level logging, same as `-v`.
    #[serde(default)]
    pub verbose: bool,

    /// Directory for transient capture copies; system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rows in each most-active table.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Time zone for displayed timestamps.
    #[serde(default)]
    pub timezone: DisplayZone,

    /// Exit with code 2 when devices appeared or disappeared.
    #[serde(default)]
    pub fail_on_change: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            format: OutputFormat::default(),
            timezone: DisplayZone::default(),
            fail_on_change: false,
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
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
        let default_path = Path::new(CONFIG_FILE);

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
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }
        if let Some(ref temp_dir) = args.temp_dir {
            self.general.temp_dir = Some(temp_dir.clone());
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(top) = args.top {
            self.report.top_n = top;
        }
        if let Some(timezone) = args.timezone {
            self.report.timezone = timezone;
        }

        // Flags only ever turn settings on
        if args.verbose {
            self.general.verbose = true;
        }
        if args.fail_on_change {
            self.report.fail_on_change = true;
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.report.top_n == 0 {
            anyhow::bail!("report.top_n must be at least 1");
        }
        self.schema.validate().map_err(anyhow::Error::msg)?;
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
