//! Device aggregation.
//!
//! Joins the device table with per-source packet counts into a
//! [`DeviceTable`] keyed by MAC.

use crate::capture::CaptureStore;
use crate::error::CaptureError;
use crate::models::{DeviceRecord, DeviceSummary, DeviceTable};
use std::collections::HashMap;
use tracing::debug;

/// Default size of the most-active device tables.
pub const DEFAULT_TOP_N: usize = 10;

/// Packet counts per source identifier.
#[derive(Debug, Clone, Default)]
pub struct PacketCounts(HashMap<String, u64>);

impl PacketCounts {
    /// Packets sent by `id`.
    ///
    /// This is total: a device that never appears as a packet source has
    /// sent zero packets.
    pub fn count_for(&self, id: &str) -> u64 {
        self.0.get(id).copied().unwrap_or(0)
    }

    pub fn sources(&self) -> usize {
        self.0.len()
    }
}

impl From<HashMap<String, u64>> for PacketCounts {
    fn from(counts: HashMap<String, u64>) -> Self {
        Self(counts)
    }
}

/// Build the device table for a capture.
pub fn aggregate_devices(store: &CaptureStore) -> Result<DeviceTable, CaptureError> {
    let counts = PacketCounts::from(store.packet_counts_by_source()?);
    let records = store.device_records()?;

    debug!(
        "{} capture: {} device rows, {} packet sources",
        store.label(),
        records.len(),
        counts.sources()
    );

    Ok(join_devices(records, &counts))
}

/// Attach packet counts to device records.
///
/// Duplicate identifiers resolve last-write-wins in row order.
pub fn join_devices(records: Vec<DeviceRecord>, counts: &PacketCounts) -> DeviceTable {
    let mut table = DeviceTable::new();

    for record in records {
        let packets = counts.count_for(&record.id);
        if let Some(previous) = table.insert(DeviceSummary::from_record(record, packets)) {
            debug!("Duplicate device row for {}, keeping later values", previous.id);
        }
    }

    table
}
