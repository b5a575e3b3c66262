//! Data models for capture comparison.
//!
//! This module contains the typed records that flow from the capture
//! store, through the analysis stages, into the rendered report.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Timestamp format used in summary tables.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Time zone used when rendering capture timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayZone {
    /// The machine's local time zone (default)
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
}

impl DisplayZone {
    /// Format a timestamp in this zone.
    pub fn format(&self, ts: &DateTime<Utc>) -> String {
        match self {
            DisplayZone::Local => ts.with_timezone(&Local).format(TIME_FORMAT).to_string(),
            DisplayZone::Utc => ts.format(TIME_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayZone::Local => write!(f, "local"),
            DisplayZone::Utc => write!(f, "UTC"),
        }
    }
}

/// Aggregate facts about one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Earliest packet timestamp.
    pub start: DateTime<Utc>,
    /// Latest packet timestamp.
    pub end: DateTime<Utc>,
    /// `(end - start) / 3600`, from the raw epoch seconds.
    pub duration_hours: f64,
    /// Rows in the device table.
    pub device_count: u64,
    /// Rows in the packet table.
    pub packet_count: u64,
    /// Distinct identifiers in the device table.
    pub unique_device_ids: u64,
}

impl CaptureSummary {
    /// True when the device table holds duplicate identifiers.
    pub fn has_identifier_mismatch(&self) -> bool {
        self.device_count != self.unique_device_ids
    }

    /// The five label/value rows shown for a capture.
    pub fn display_rows(&self, zone: DisplayZone) -> Vec<(&'static str, String)> {
        vec![
            (
                "Time Range",
                format!("{} - {}", zone.format(&self.start), zone.format(&self.end)),
            ),
            ("Duration", format!("{:.2} hours", self.duration_hours)),
            ("Device Count", self.device_count.to_string()),
            ("Packet Count", self.packet_count.to_string()),
            ("Unique MACs", self.unique_device_ids.to_string()),
        ]
    }
}

/// One row of the device table, as stored in the capture.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub id: String,
    pub phy_name: String,
    pub device_type: String,
    pub signal: Option<f64>,
}

/// A device joined with its packet count for one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Device MAC address.
    pub id: String,
    /// Radio layer that observed the device.
    pub phy_name: String,
    /// Device classification.
    pub device_type: String,
    /// Strongest observed signal, when recorded.
    pub signal: Option<f64>,
    /// Packets sent by this device; zero when none were observed.
    pub packet_count: u64,
}

impl DeviceSummary {
    pub fn from_record(record: DeviceRecord, packet_count: u64) -> Self {
        Self {
            id: record.id,
            phy_name: record.phy_name,
            device_type: record.device_type,
            signal: record.signal,
            packet_count,
        }
    }

    /// Signal formatted for tables, `-` when absent.
    pub fn signal_display(&self) -> String {
        match self.signal {
            Some(signal) => signal.to_string(),
            None => "-".to_string(),
        }
    }
}

/// Device summaries keyed by identifier, in first-insertion order.
///
/// Re-inserting an identifier replaces its values but keeps its original
/// position, so iteration order only depends on the source row order.
#[derive(Debug, Clone, Default)]
pub struct DeviceTable {
    entries: Vec<DeviceSummary>,
    index: HashMap<String, usize>,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device. Returns the replaced summary if the identifier was
    /// already present.
    pub fn insert(&mut self, device: DeviceSummary) -> Option<DeviceSummary> {
        match self.index.get(&device.id) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos], device)),
            None => {
                self.index.insert(device.id.clone(), self.entries.len());
                self.entries.push(device);
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&DeviceSummary> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.id.as_str())
    }

    /// The `n` devices with the most packets, highest first.
    ///
    /// The sort is stable: equal counts keep table order.
    pub fn top_active(&self, n: usize) -> Vec<&DeviceSummary> {
        let mut ranked: Vec<&DeviceSummary> = self.entries.iter().collect();
        ranked.sort_by_key(|d| std::cmp::Reverse(d.packet_count));
        ranked.truncate(n);
        ranked
    }

    /// Look up each identifier, skipping any that are not in the table.
    pub fn select<'a, I>(&self, ids: I) -> Vec<DeviceSummary>
    where
        I: IntoIterator<Item = &'a String>,
    {
        ids.into_iter()
            .filter_map(|id| self.get(id))
            .cloned()
            .collect()
    }
}

impl FromIterator<DeviceSummary> for DeviceTable {
    fn from_iter<T: IntoIterator<Item = DeviceSummary>>(iter: T) -> Self {
        let mut table = DeviceTable::new();
        for device in iter {
            table.insert(device);
        }
        table
    }
}

/// Identifier-level difference between two captures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// In the follow-up but not the baseline, in follow-up order.
    pub new_devices: Vec<String>,
    /// In the baseline but not the follow-up, in baseline order.
    pub missing_devices: Vec<String>,
    /// Present in both captures.
    pub common_devices: usize,
}

impl ComparisonResult {
    pub fn has_changes(&self) -> bool {
        !self.new_devices.is_empty() || !self.missing_devices.is_empty()
    }
}

/// A fully analyzed capture.
#[derive(Debug, Clone)]
pub struct CaptureAnalysis {
    /// "baseline" or "follow-up".
    pub label: String,
    /// File the capture was read from.
    pub source: String,
    pub summary: CaptureSummary,
    pub devices: DeviceTable,
}

/// Report section for one capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    pub label: String,
    pub source: String,
    pub summary: CaptureSummary,
    pub top_devices: Vec<DeviceSummary>,
}

impl CaptureReport {
    fn from_analysis(analysis: &CaptureAnalysis, top_n: usize) -> Self {
        Self {
            label: analysis.label.clone(),
            source: analysis.source.clone(),
            summary: analysis.summary.clone(),
            top_devices: analysis
                .devices
                .top_active(top_n)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

/// Metadata about the comparison report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Tool version that produced the report.
    pub version: String,
    /// Size of the top-active tables.
    pub top_n: usize,
    /// Zone used for human-readable timestamps.
    pub display_zone: DisplayZone,
}

/// The complete comparison report handed to the renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub baseline: CaptureReport,
    pub followup: CaptureReport,
    /// Follow-up rows for devices absent from the baseline.
    pub new_devices: Vec<DeviceSummary>,
    /// Baseline rows for devices absent from the follow-up.
    pub missing_devices: Vec<DeviceSummary>,
    pub common_devices: usize,
}

impl Report {
    /// Assemble the report from both analyses and their comparison.
    pub fn build(
        baseline: &CaptureAnalysis,
        followup: &CaptureAnalysis,
        comparison: &ComparisonResult,
        top_n: usize,
        display_zone: DisplayZone,
    ) -> Self {
        Self {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                top_n,
                display_zone,
            },
            baseline: CaptureReport::from_analysis(baseline, top_n),
            followup: CaptureReport::from_analysis(followup, top_n),
            new_devices: followup.devices.select(&comparison.new_devices),
            missing_devices: baseline.devices.select(&comparison.missing_devices),
            common_devices: comparison.common_devices,
        }
    }
}
