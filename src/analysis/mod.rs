//! Capture analysis.
//!
//! Each capture goes through the store, the summary extractor and the
//! device aggregator; the two resulting tables are then compared.

pub mod aggregator;
pub mod comparator;
pub mod summary;

pub use aggregator::{aggregate_devices, DEFAULT_TOP_N};
pub use comparator::compare_captures;
pub use summary::extract_summary;

use crate::capture::CaptureStore;
use crate::config::Config;
use crate::error::CaptureError;
use crate::models::CaptureAnalysis;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const BASELINE: &str = "baseline";
pub const FOLLOWUP: &str = "follow-up";

/// Load and analyze one capture file.
///
/// The transient copy of the capture is released before this returns,
/// whether or not the analysis succeeded.
pub fn analyze_capture(
    label: &str,
    path: &Path,
    config: &Config,
) -> Result<CaptureAnalysis, CaptureError> {
    let store = CaptureStore::open(
        label,
        path,
        &config.schema,
        config.general.temp_dir.as_deref(),
    )?;

    let summary = extract_summary(&store)?;
    let devices = aggregate_devices(&store)?;
    if devices.is_empty() {
        warn!("{} capture has no device records", label);
    }

    info!(
        "{} capture: {} packets, {} devices over {:.2} hours",
        label,
        summary.packet_count,
        devices.len(),
        summary.duration_hours
    );

    Ok(CaptureAnalysis {
        label: label.to_string(),
        source: path.display().to_string(),
        summary,
        devices,
    })
}

/// Analyze the baseline and follow-up captures on separate blocking
/// workers. Returns `(baseline, follow-up)`.
pub async fn analyze_pair(
    baseline: PathBuf,
    followup: PathBuf,
    config: &Config,
) -> Result<(CaptureAnalysis, CaptureAnalysis)> {
    let config = Arc::new(config.clone());

    let baseline_task = {
        let config = Arc::clone(&config);
        tokio::task::spawn_blocking(move || analyze_capture(BASELINE, &baseline, &config))
    };
    let followup_task = {
        let config = Arc::clone(&config);
        tokio::task::spawn_blocking(move || analyze_capture(FOLLOWUP, &followup, &config))
    };

    let (baseline, followup) = tokio::join!(baseline_task, followup_task);

    let baseline = baseline.context("Baseline analysis worker failed")??;
    let followup = followup.context("Follow-up analysis worker failed")??;

    Ok((baseline, followup))
}
