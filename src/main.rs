//! SignalSift - Kismet capture comparison
//!
//! A CLI tool that compares a baseline and a follow-up Kismet capture
//! database and reports new, missing and most active devices.
//!
//! Exit codes:
//!   0 - Success (or nothing to compare yet)
//!   1 - Runtime error (invalid capture, empty capture, config, I/O)
//!   2 - Devices changed and --fail-on-change is set

mod analysis;
mod capture;
mod cli;
mod config;
mod error;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use error::CaptureError;
use indicatif::{ProgressBar, ProgressStyle};
use models::Report;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config can turn on verbose logging, so it loads first
    let loaded = load_config(&args);
    let config_verbose = matches!(&loaded, Ok((config, _)) if config.general.verbose);

    // Initialize logging
    init_logging(&args, config_verbose);

    info!("SignalSift v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_comparison(args, loaded).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Comparison failed: {:#}", e);
            match e.downcast_ref::<CaptureError>() {
                Some(capture_err) if capture_err.is_capture_problem() => {
                    eprintln!("\n❌ Capture rejected: {}", capture_err);
                }
                _ => eprintln!("\n❌ Error: {:#}", e),
            }
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .signalsift.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the report and the capture table names.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a report on stdout stays clean. `RUST_LOG`
/// overrides the level chosen by -v / -q and `general.verbose`.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete comparison. Returns exit code (0 or 2).
async fn run_comparison(args: Args, loaded: Result<(Config, ConfigSource)>) -> Result<i32> {
    let start_time = Instant::now();

    // Configuration was read before logging started
    let (mut config, source) = loaded?;
    source.log();
    config.merge_with_args(&args);
    config.validate()?;

    // Nothing runs until both captures are supplied.
    let Some((baseline_path, followup_path)) = args.capture_pair() else {
        println!("⏳ Waiting for captures: provide both --baseline and --followup to compare.");
        return Ok(0);
    };

    let spinner = start_spinner(&args);

    let analyzed =
        analysis::analyze_pair(baseline_path, followup_path, &config).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let (baseline, followup) = analyzed?;

    let comparison = analysis::compare_captures(&baseline.devices, &followup.devices);
    info!(
        "{} new, {} missing, {} common devices",
        comparison.new_devices.len(),
        comparison.missing_devices.len(),
        comparison.common_devices
    );

    let report = Report::build(
        &baseline,
        &followup,
        &comparison,
        config.report.top_n,
        config.report.timezone,
    );

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                eprintln!("✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    info!(
        "Comparison finished in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    if config.report.fail_on_change && comparison.has_changes() {
        eprintln!(
            "\n⛔ {} new and {} missing devices. Failing (exit code 2).",
            comparison.new_devices.len(),
            comparison.missing_devices.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Spinner on stderr while the captures load, unless --quiet.
fn start_spinner(args: &Args) -> Option<ProgressBar> {
    if args.quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    match ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        Ok(style) => pb.set_style(style),
        Err(e) => warn!("Invalid progress template: {}", e),
    }
    pb.set_message("Analyzing baseline and follow-up captures...");
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

/// Where the configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    BuiltIn,
    DefaultUnreadable(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE),
            ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
            ConfigSource::DefaultUnreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so nothing is logged here.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::BuiltIn)),
        Err(e) => Ok((Config::default(), ConfigSource::DefaultUnreadable(e))),
    }
}
