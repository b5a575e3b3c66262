//! Builders for small capture databases used in tests.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const KISMET_TABLES: &str = "
CREATE TABLE packets (
    ts_sec INT,
    ts_usec INT,
    phyname TEXT,
    sourcemac TEXT,
    destmac TEXT
);
CREATE TABLE devices (
    first_time INT,
    last_time INT,
    devkey TEXT,
    phyname TEXT,
    devmac TEXT,
    strongest_signal INT,
    type TEXT
);
";

/// A packet row: timestamp and source MAC.
#[derive(Debug, Clone)]
pub struct Packet {
    pub ts: i64,
    pub source: String,
}

impl Packet {
    pub fn new(ts: i64, source: &str) -> Self {
        Self {
            ts,
            source: source.to_string(),
        }
    }
}

/// A device row.
#[derive(Debug, Clone)]
pub struct Device {
    pub mac: String,
    pub phy: String,
    pub kind: String,
    pub signal: i64,
}

pub fn device(mac: &str, signal: i64) -> Device {
    Device {
        mac: mac.to_string(),
        phy: "IEEE802.11".to_string(),
        kind: "Wi-Fi Client".to_string(),
        signal,
    }
}

/// `count` packets from `source`, one second apart starting at `start`.
pub fn burst(source: &str, start: i64, count: usize) -> Vec<Packet> {
    (0..count)
        .map(|i| Packet::new(start + i as i64, source))
        .collect()
}

/// Write a Kismet-style capture to `dir/name` and return its path.
pub fn write_capture(dir: &Path, name: &str, packets: &[Packet], devices: &[Device]) -> PathBuf {
    let path = dir.join(name);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(KISMET_TABLES).unwrap();

    for packet in packets {
        conn.execute(
            "INSERT INTO packets (ts_sec, ts_usec, phyname, sourcemac, destmac)
             VALUES (?1, 0, 'IEEE802.11', ?2, 'FF:FF:FF:FF:FF:FF')",
            params![packet.ts, packet.source],
        )
        .unwrap();
    }

    for device in devices {
        conn.execute(
            "INSERT INTO devices (first_time, last_time, devkey, phyname, devmac, strongest_signal, type)
             VALUES (0, 0, ?1, ?2, ?1, ?3, ?4)",
            params![device.mac, device.phy, device.signal, device.kind],
        )
        .unwrap();
    }

    path
}

/// Write a database built from arbitrary SQL to `dir/name`.
pub fn write_sql(dir: &Path, name: &str, sql: &str) -> PathBuf {
    let path = dir.join(name);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(sql).unwrap();
    path
}

/// Raw bytes of a Kismet-style capture.
pub fn capture_bytes(packets: &[Packet], devices: &[Device]) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    std::fs::read(write_capture(dir.path(), "capture.kismet", packets, devices)).unwrap()
}

/// Raw bytes of a database built from arbitrary SQL.
pub fn sql_bytes(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    std::fs::read(write_sql(dir.path(), "capture.kismet", sql)).unwrap()
}

/// Raw bytes of a WAL-mode database built from arbitrary SQL. The journal
/// is checkpointed on close, so the bytes hold every row.
pub fn wal_sql_bytes(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("capture.kismet");
    {
        let conn = Connection::open(&path).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        conn.execute_batch(sql).unwrap();
    }
    std::fs::read(path).unwrap()
}
