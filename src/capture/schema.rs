//! Table and column names used to read a capture.

use serde::{Deserialize, Serialize};

/// Where the packet and device data live inside a capture database.
///
/// The defaults match the Kismet log layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSchema {
    /// Packet table name.
    #[serde(default = "default_packets_table")]
    pub packets_table: String,

    /// Packet timestamp column, seconds since the epoch.
    #[serde(default = "default_packet_timestamp")]
    pub packet_timestamp: String,

    /// Packet source identifier column.
    #[serde(default = "default_packet_source")]
    pub packet_source: String,

    /// Device table name.
    #[serde(default = "default_devices_table")]
    pub devices_table: String,

    /// Device identifier column.
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Radio layer name column.
    #[serde(default = "default_device_phy")]
    pub device_phy: String,

    /// Device classification column.
    #[serde(default = "default_device_type")]
    pub device_type: String,

    /// Strongest observed signal column.
    #[serde(default = "default_device_signal")]
    pub device_signal: String,
}

impl Default for CaptureSchema {
    fn default() -> Self {
        Self {
            packets_table: default_packets_table(),
            packet_timestamp: default_packet_timestamp(),
            packet_source: default_packet_source(),
            devices_table: default_devices_table(),
            device_id: default_device_id(),
            device_phy: default_device_phy(),
            device_type: default_device_type(),
            device_signal: default_device_signal(),
        }
    }
}

fn default_packets_table() -> String {
    "packets".to_string()
}

fn default_packet_timestamp() -> String {
    "ts_sec".to_string()
}

fn default_packet_source() -> String {
    "sourcemac".to_string()
}

fn default_devices_table() -> String {
    "devices".to_string()
}

fn default_device_id() -> String {
    "devmac".to_string()
}

fn default_device_phy() -> String {
    "phyname".to_string()
}

fn default_device_type() -> String {
    "type".to_string()
}

fn default_device_signal() -> String {
    "strongest_signal".to_string()
}

impl CaptureSchema {
    /// Required columns of the packet table.
    pub fn packet_columns(&self) -> [&str; 2] {
        [self.packet_timestamp.as_str(), self.packet_source.as_str()]
    }

    /// Required columns of the device table.
    pub fn device_columns(&self) -> [&str; 4] {
        [
            self.device_id.as_str(),
            self.device_phy.as_str(),
            self.device_type.as_str(),
            self.device_signal.as_str(),
        ]
    }

    /// Check that every configured name is a plain SQL identifier.
    ///
    /// Names are interpolated into queries, so anything else is refused.
    pub fn validate(&self) -> Result<(), String> {
        let names = [self.packets_table.as_str(), self.devices_table.as_str()]
            .into_iter()
            .chain(self.packet_columns())
            .chain(self.device_columns());

        for name in names {
            if !is_identifier(name) {
                return Err(format!("Invalid table or column name in schema: '{}'", name));
            }
        }

        Ok(())
    }
}

/// Quote a validated identifier for use in SQL text.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
