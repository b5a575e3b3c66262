//! Baseline vs. follow-up comparison.

use crate::models::{ComparisonResult, DeviceTable};

/// Find devices that appeared or disappeared between two captures.
///
/// Identifiers are compared for exact equality only.
pub fn compare_captures(baseline: &DeviceTable, followup: &DeviceTable) -> ComparisonResult {
    let new_devices: Vec<String> = followup
        .ids()
        .filter(|id| !baseline.contains(id))
        .map(String::from)
        .collect();

    let missing_devices: Vec<String> = baseline
        .ids()
        .filter(|id| !followup.contains(id))
        .map(String::from)
        .collect();

    let common_devices = followup.len() - new_devices.len();

    ComparisonResult {
        new_devices,
        missing_devices,
        common_devices,
    }
}
