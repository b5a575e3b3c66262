//! Markdown and JSON report generation.
//!
//! This module renders a [`Report`] into the comparison tables shown to
//! the user.

use crate::models::{CaptureReport, DeviceSummary, DisplayZone, Report};
use anyhow::Result;

const DEVICE_COLUMNS: [&str; 5] = ["MAC", "PHY", "Type", "Signal", "Packet Count"];

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();
    let zone = report.metadata.display_zone;

    // Title
    output.push_str("# Kismet Capture Comparison\n\n");

    output.push_str(&generate_metadata_section(report));

    // Per-capture summaries
    output.push_str(&generate_summary_section(
        "Baseline Summary",
        &report.baseline,
        zone,
    ));
    output.push_str(&generate_summary_section(
        "Follow-up Summary",
        &report.followup,
        zone,
    ));

    // Most active devices
    output.push_str(&generate_top_devices_section(
        "Baseline",
        &report.baseline,
        report.metadata.top_n,
    ));
    output.push_str(&generate_top_devices_section(
        "Follow-up",
        &report.followup,
        report.metadata.top_n,
    ));

    // Differences
    output.push_str(&generate_device_list_section(
        &format!("New Devices Detected: {}", report.new_devices.len()),
        &report.new_devices,
    ));
    output.push_str(&generate_device_list_section(
        &format!(
            "Missing Devices (Present in Baseline, Not in Follow-up): {}",
            report.missing_devices.len()
        ),
        &report.missing_devices,
    ));

    output.push_str(&generate_footer(report));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Baseline:** `{}`\n", report.baseline.source));
    section.push_str(&format!("- **Follow-up:** `{}`\n", report.followup.source));
    section.push_str(&format!(
        "- **Devices in both captures:** {}\n",
        report.common_devices
    ));
    section.push_str(&format!(
        "- **Times shown in:** {}\n\n",
        report.metadata.display_zone
    ));

    section
}

/// Generate the five-row summary table for one capture.
fn generate_summary_section(title: &str, capture: &CaptureReport, zone: DisplayZone) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str("| | Value |\n");
    section.push_str("|:---|:---|\n");

    for (label, value) in capture.summary.display_rows(zone) {
        section.push_str(&format!("| {} | {} |\n", label, value));
    }
    section.push('\n');

    if capture.summary.has_identifier_mismatch() {
        section.push_str(&format!(
            "> Device count ({}) differs from unique MACs ({}): the device table contains duplicate identifiers.\n\n",
            capture.summary.device_count, capture.summary.unique_device_ids
        ));
    }

    section
}

/// Generate the most-active table for one capture.
fn generate_top_devices_section(name: &str, capture: &CaptureReport, top_n: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Top {} Most Active Devices in {}\n\n", top_n, name));

    if capture.top_devices.is_empty() {
        section.push_str("No devices recorded.\n\n");
    } else {
        section.push_str(&device_table(&capture.top_devices));
    }

    section
}

/// Generate a titled device table, omitting the table when empty.
fn generate_device_list_section(title: &str, devices: &[DeviceSummary]) -> String {
    let mut section = format!("## {}\n\n", title);

    if !devices.is_empty() {
        section.push_str(&device_table(devices));
    }

    section
}

fn device_table(devices: &[DeviceSummary]) -> String {
    let mut table = String::new();

    table.push_str(&format!("| {} |\n", DEVICE_COLUMNS.join(" | ")));
    table.push_str("|:---|:---|:---|---:|---:|\n");

    for device in devices {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            code_cell(&device.id),
            escape_cell(&device.phy_name),
            escape_cell(&device.device_type),
            device.signal_display(),
            device.packet_count
        ));
    }
    table.push('\n');

    table
}

/// Keep free-form capture text from breaking table rows.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// Render an identifier as inline code inside a table cell. The fence is
/// one backtick longer than the longest run inside the value.
fn code_cell(value: &str) -> String {
    let escaped = escape_cell(value);
    let longest_run = escaped
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);

    if longest_run == 0 {
        format!("`{}`", escaped)
    } else {
        let fence = "`".repeat(longest_run + 1);
        format!("{fence} {escaped} {fence}")
    }
}

/// Generate the report footer.
fn generate_footer(report: &Report) -> String {
    format!(
        "---\n\n*Generated by SignalSift v{} on {}*\n",
        report.metadata.version,
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
