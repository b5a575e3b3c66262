//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::DisplayZone;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SignalSift - compare two Kismet capture databases
///
/// Reports the devices that appeared, disappeared, or were most active
/// between a baseline capture and a follow-up capture.
///
/// Examples:
///   signalsift --baseline monday.kismet --followup friday.kismet
///   signalsift -b monday.kismet -f friday.kismet --format json -o diff.json
///   signalsift -b monday.kismet -f friday.kismet --top 25 --timezone utc
///   signalsift -b monday.kismet -f friday.kismet --fail-on-change
///   signalsift --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Baseline capture database (.kismet)
    #[arg(short, long, value_name = "FILE")]
    pub baseline: Option<PathBuf>,

    /// Follow-up capture database (.kismet)
    #[arg(short, long, value_name = "FILE")]
    pub followup: Option<PathBuf>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Number of devices in the most-active tables
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Time zone for displayed timestamps (local, utc)
    #[arg(long, value_name = "ZONE", env = "SIGNALSIFT_TIMEZONE")]
    pub timezone: Option<DisplayZone>,

    /// Directory for the transient copies of the captures
    ///
    /// Defaults to the system temporary directory.
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .signalsift.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit with code 2 when new or missing devices are found
    ///
    /// Useful for scheduled survey jobs.
    #[arg(long)]
    pub fail_on_change: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .signalsift.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Both capture paths, or `None` while either is still missing.
    pub fn capture_pair(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.baseline, &self.followup) {
            (Some(baseline), Some(followup)) => Some((baseline.clone(), followup.clone())),
            _ => None,
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        for (flag, path) in [("--baseline", &self.baseline), ("--followup", &self.followup)] {
            if let Some(path) = path {
                if !path.exists() {
                    return Err(format!("{} file does not exist: {}", flag, path.display()));
                }
                if !path.is_file() {
                    return Err(format!("{} path is not a file: {}", flag, path.display()));
                }
            }
        }

        if let Some(ref dir) = self.temp_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "Temporary directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `general.verbose` from the config file; `-q`
    /// still wins over it.
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
