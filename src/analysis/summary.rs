//! Per-capture summary statistics.

use crate::capture::CaptureStore;
use crate::error::CaptureError;
use crate::models::CaptureSummary;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Compute time range, duration and counts for one capture.
///
/// An empty packet table is reported as `EmptyCapture` before any
/// timestamp is queried.
pub fn extract_summary(store: &CaptureStore) -> Result<CaptureSummary, CaptureError> {
    let packet_count = store.packet_count()?;
    if packet_count == 0 {
        return Err(CaptureError::EmptyCapture {
            label: store.label().to_string(),
        });
    }

    let (start_ts, end_ts) = store.time_range()?;
    let device_count = store.device_count()?;
    let unique_device_ids = store.unique_device_ids()?;

    let summary = CaptureSummary {
        start: timestamp_of(store, start_ts)?,
        end: timestamp_of(store, end_ts)?,
        duration_hours: duration_hours(start_ts, end_ts),
        device_count,
        packet_count,
        unique_device_ids,
    };

    if summary.has_identifier_mismatch() {
        warn!(
            "{} capture: {} device rows but {} unique MACs",
            store.label(),
            device_count,
            unique_device_ids
        );
    }

    debug!("{} summary: {:?}", store.label(), summary);
    Ok(summary)
}

/// Hours between two epoch-second timestamps.
pub fn duration_hours(start: f64, end: f64) -> f64 {
    (end - start) / SECONDS_PER_HOUR
}

/// Convert epoch seconds (possibly fractional) to a UTC timestamp.
///
/// Returns `None` for values chrono cannot represent, such as epochs
/// recorded in micro- or nanoseconds.
fn epoch_to_utc(ts: f64) -> Option<DateTime<Utc>> {
    let millis = (ts * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn timestamp_of(store: &CaptureStore, ts: f64) -> Result<DateTime<Utc>, CaptureError> {
    epoch_to_utc(ts).ok_or_else(|| {
        let schema = store.schema();
        CaptureError::InvalidCaptureFormat {
            label: store.label().to_string(),
            reason: format!(
                "{}.{} value {} is not an epoch timestamp in seconds",
                schema.packets_table, schema.packet_timestamp, ts
            ),
        }
    })
}
