//! Read-only access to one capture database.
//!
//! A capture is copied into a private temporary directory before SQLite
//! opens it, so the user's file is never locked or written. The directory
//! holds the copy plus any journal files SQLite creates next to it (the
//! `-wal` and `-shm` files of a WAL-mode capture) and lives exactly as long
//! as the [`CaptureStore`].

use super::schema::{quote, CaptureSchema};
use crate::error::CaptureError;
use crate::models::DeviceRecord;
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// File name of the copy inside the transient directory.
const CAPTURE_FILE: &str = "capture.kismet";

/// An open capture database backed by a transient copy.
pub struct CaptureStore {
    label: String,
    schema: CaptureSchema,
    // Declared before `backing` so the connection closes before the directory is removed.
    conn: Connection,
    backing: TempDir,
}

impl CaptureStore {
    /// Read a capture file from disk and open a private copy of it.
    pub fn open(
        label: &str,
        path: &Path,
        schema: &CaptureSchema,
        temp_dir: Option<&Path>,
    ) -> Result<Self, CaptureError> {
        info!("Loading {} capture: {}", label, path.display());
        let bytes = std::fs::read(path).map_err(|e| CaptureError::io(label, e))?;
        Self::from_bytes(label, &bytes, schema, temp_dir)
    }

    /// Materialize raw capture bytes and open them as a database.
    ///
    /// On any error the transient directory is removed before returning.
    pub fn from_bytes(
        label: &str,
        bytes: &[u8],
        schema: &CaptureSchema,
        temp_dir: Option<&Path>,
    ) -> Result<Self, CaptureError> {
        // SQLite treats a zero-length file as a fresh empty database.
        if bytes.is_empty() {
            return Err(CaptureError::InvalidCaptureFormat {
                label: label.to_string(),
                reason: "file is empty".to_string(),
            });
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("signalsift-");
        let backing = match temp_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| CaptureError::io(label, e))?;

        let path = backing.path().join(CAPTURE_FILE);
        std::fs::File::create(&path)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.flush()
            })
            .map_err(|e| CaptureError::io(label, e))?;

        debug!(
            "Materialized {} bytes of {} capture at {}",
            bytes.len(),
            label,
            path.display()
        );

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CaptureError::InvalidCaptureFormat {
            label: label.to_string(),
            reason: e.to_string(),
        })?;

        let store = Self {
            label: label.to_string(),
            schema: schema.clone(),
            conn,
            backing,
        };
        store.validate_schema()?;

        Ok(store)
    }

    /// Label used in logs and errors ("baseline", "follow-up").
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Table and column names this store reads.
    pub fn schema(&self) -> &CaptureSchema {
        &self.schema
    }

    #[cfg(test)]
    fn backing_path(&self) -> std::path::PathBuf {
        self.backing.path().join(CAPTURE_FILE)
    }

    /// Confirm the required tables and columns exist.
    fn validate_schema(&self) -> Result<(), CaptureError> {
        let tables = self.table_names()?;

        let packet_columns = self.schema.packet_columns();
        let device_columns = self.schema.device_columns();
        let required: [(&str, &[&str]); 2] = [
            (self.schema.packets_table.as_str(), &packet_columns),
            (self.schema.devices_table.as_str(), &device_columns),
        ];

        for (table, columns) in required {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                return Err(CaptureError::MissingRequiredTable {
                    label: self.label.clone(),
                    table: table.to_string(),
                });
            }

            let present = self.column_names(table)?;
            for column in columns {
                if !present.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                    return Err(CaptureError::MissingRequiredColumn {
                        label: self.label.clone(),
                        table: table.to_string(),
                        column: column.to_string(),
                    });
                }
            }
        }

        debug!("{} capture schema ok ({} tables)", self.label, tables.len());
        Ok(())
    }

    /// Names of all tables and views. This is the first real read, so an
    /// error here means the bytes are not a database.
    fn table_names(&self) -> Result<Vec<String>, CaptureError> {
        let invalid = |e: rusqlite::Error| CaptureError::InvalidCaptureFormat {
            label: self.label.clone(),
            reason: e.to_string(),
        };

        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")
            .map_err(invalid)?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(invalid)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        Ok(names)
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>, CaptureError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote(table)))
            .map_err(|e| self.query_error(e))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| self.query_error(e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.query_error(e))?;

        Ok(names)
    }

    fn query_error(&self, e: rusqlite::Error) -> CaptureError {
        CaptureError::query(&self.label, e)
    }

    fn count(&self, sql: &str) -> Result<u64, CaptureError> {
        let n: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| self.query_error(e))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Rows in the packet table.
    pub fn packet_count(&self) -> Result<u64, CaptureError> {
        self.count(&format!(
            "SELECT COUNT(*) FROM {}",
            quote(&self.schema.packets_table)
        ))
    }

    /// Rows in the device table.
    pub fn device_count(&self) -> Result<u64, CaptureError> {
        self.count(&format!(
            "SELECT COUNT(*) FROM {}",
            quote(&self.schema.devices_table)
        ))
    }

    /// Distinct identifiers in the device table.
    pub fn unique_device_ids(&self) -> Result<u64, CaptureError> {
        self.count(&format!(
            "SELECT COUNT(DISTINCT {}) FROM {}",
            quote(&self.schema.device_id),
            quote(&self.schema.devices_table)
        ))
    }

    /// Earliest and latest packet timestamps, in epoch seconds.
    ///
    /// Fails with `EmptyCapture` when there is no timestamp to report.
    pub fn time_range(&self) -> Result<(f64, f64), CaptureError> {
        let sql = format!(
            "SELECT MIN({ts}), MAX({ts}) FROM {table}",
            ts = quote(&self.schema.packet_timestamp),
            table = quote(&self.schema.packets_table)
        );

        let (min, max): (Option<f64>, Option<f64>) = self
            .conn
            .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| self.query_error(e))?;

        match (min, max) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(CaptureError::EmptyCapture {
                label: self.label.clone(),
            }),
        }
    }

    /// Packet count per source identifier. Sources that never sent a
    /// packet do not appear.
    pub fn packet_counts_by_source(&self) -> Result<HashMap<String, u64>, CaptureError> {
        let sql = format!(
            "SELECT {src}, COUNT(*) FROM {table} GROUP BY {src}",
            src = quote(&self.schema.packet_source),
            table = quote(&self.schema.packets_table)
        );

        let mut stmt = self.conn.prepare(&sql).map_err(|e| self.query_error(e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| self.query_error(e))?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in rows {
            let (source, count) = row.map_err(|e| self.query_error(e))?;
            if let Some(source) = source {
                *counts.entry(source).or_default() += u64::try_from(count).unwrap_or(0);
            }
        }

        Ok(counts)
    }

    /// Every device row, in table order.
    pub fn device_records(&self) -> Result<Vec<DeviceRecord>, CaptureError> {
        let sql = format!(
            "SELECT {id}, {phy}, {kind}, {signal} FROM {table}",
            id = quote(&self.schema.device_id),
            phy = quote(&self.schema.device_phy),
            kind = quote(&self.schema.device_type),
            signal = quote(&self.schema.device_signal),
            table = quote(&self.schema.devices_table)
        );

        let mut stmt = self.conn.prepare(&sql).map_err(|e| self.query_error(e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            })
            .map_err(|e| self.query_error(e))?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            let (id, phy_name, device_type, signal) = row.map_err(|e| self.query_error(e))?;
            match id {
                Some(id) => records.push(DeviceRecord {
                    id,
                    phy_name: phy_name.unwrap_or_default(),
                    device_type: device_type.unwrap_or_default(),
                    signal,
                }),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(
                "{} capture: skipped {} device rows without an identifier",
                self.label, skipped
            );
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fixture::{self, Packet};
    use tempfile::TempDir;

    fn open(bytes: &[u8]) -> Result<CaptureStore, CaptureError> {
        CaptureStore::from_bytes("baseline", bytes, &CaptureSchema::default(), None)
    }

    fn sample() -> Vec<u8> {
        fixture::capture_bytes(
            &[
                Packet::new(1_000, "AA"),
                Packet::new(4_600, "AA"),
                Packet::new(2_000, "BB"),
            ],
            &[
                fixture::device("AA", -40),
                fixture::device("BB", -70),
                fixture::device("CC", -90),
            ],
        )
    }

    #[test]
    fn test_counts_and_range() {
        let store = open(&sample()).unwrap();

        assert_eq!(store.label(), "baseline");
        assert_eq!(store.packet_count().unwrap(), 3);
        assert_eq!(store.device_count().unwrap(), 3);
        assert_eq!(store.unique_device_ids().unwrap(), 3);
        assert_eq!(store.time_range().unwrap(), (1_000.0, 4_600.0));
    }

    #[test]
    fn test_packet_counts_by_source() {
        let store = open(&sample()).unwrap();
        let counts = store.packet_counts_by_source().unwrap();

        assert_eq!(counts.get("AA"), Some(&2));
        assert_eq!(counts.get("BB"), Some(&1));
        assert!(!counts.contains_key("CC"));
    }

    #[test]
    fn test_device_records_in_table_order() {
        let store = open(&sample()).unwrap();
        let ids: Vec<String> = store
            .device_records()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["AA", "BB", "CC"]);
    }

    #[test]
    fn test_garbage_is_invalid_format() {
        let bytes = b"this is definitely not an sqlite database, just some text padding it out".repeat(20);
        let err = open(&bytes).err().unwrap();
        assert!(matches!(err, CaptureError::InvalidCaptureFormat { .. }));
    }

    #[test]
    fn test_missing_table() {
        let bytes = fixture::sql_bytes(
            "CREATE TABLE packets (ts_sec INT, sourcemac TEXT);
             INSERT INTO packets VALUES (1, 'AA');",
        );
        match open(&bytes) {
            Err(CaptureError::MissingRequiredTable { table, .. }) => assert_eq!(table, "devices"),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_missing_column() {
        let bytes = fixture::sql_bytes(
            "CREATE TABLE packets (ts_sec INT, sourcemac TEXT);
             CREATE TABLE devices (devmac TEXT, phyname TEXT, type TEXT);",
        );
        match open(&bytes) {
            Err(CaptureError::MissingRequiredColumn { table, column, .. }) => {
                assert_eq!(table, "devices");
                assert_eq!(column, "strongest_signal");
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_empty_packet_table_has_no_range() {
        let bytes = fixture::capture_bytes(&[], &[fixture::device("AA", -40)]);
        let store = open(&bytes).unwrap();

        assert_eq!(store.packet_count().unwrap(), 0);
        assert!(matches!(
            store.time_range(),
            Err(CaptureError::EmptyCapture { .. })
        ));
    }

    #[test]
    fn test_null_source_and_id_are_skipped() {
        let bytes = fixture::sql_bytes(
            "CREATE TABLE packets (ts_sec INT, sourcemac TEXT);
             CREATE TABLE devices (devmac TEXT, phyname TEXT, type TEXT, strongest_signal INT);
             INSERT INTO packets VALUES (10, NULL), (11, 'AA');
             INSERT INTO devices VALUES (NULL, 'IEEE802.11', 'Wi-Fi AP', -50),
                                        ('AA', NULL, NULL, NULL);",
        );
        let store = open(&bytes).unwrap();

        let counts = store.packet_counts_by_source().unwrap();
        assert_eq!(counts.len(), 1);

        let records = store.device_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phy_name, "");
        assert_eq!(records[0].signal, None);
    }

    #[test]
    fn test_real_timestamps() {
        let bytes = fixture::sql_bytes(
            "CREATE TABLE packets (ts_sec REAL, sourcemac TEXT);
             CREATE TABLE devices (devmac TEXT, phyname TEXT, type TEXT, strongest_signal REAL);
             INSERT INTO packets VALUES (100.5, 'AA'), (200.25, 'AA');",
        );
        let store = open(&bytes).unwrap();
        assert_eq!(store.time_range().unwrap(), (100.5, 200.25));
    }

    #[test]
    fn test_custom_schema() {
        let bytes = fixture::sql_bytes(
            "CREATE TABLE frames (seen INT, src TEXT);
             CREATE TABLE stations (mac TEXT, radio TEXT, kind TEXT, rssi INT);
             INSERT INTO frames VALUES (5, 'AA');
             INSERT INTO stations VALUES ('AA', 'BTLE', 'BTLE Device', -80);",
        );
        let schema = CaptureSchema {
            packets_table: "frames".to_string(),
            packet_timestamp: "seen".to_string(),
            packet_source: "src".to_string(),
            devices_table: "stations".to_string(),
            device_id: "mac".to_string(),
            device_phy: "radio".to_string(),
            device_type: "kind".to_string(),
            device_signal: "rssi".to_string(),
        };

        let store = CaptureStore::from_bytes("baseline", &bytes, &schema, None).unwrap();
        assert_eq!(store.packet_count().unwrap(), 1);
        assert_eq!(store.device_records().unwrap()[0].phy_name, "BTLE");
    }

    #[test]
    fn test_backing_file_removed_on_drop() {
        let store = open(&sample()).unwrap();
        let path = store.backing_path();
        assert!(path.exists());

        drop(store);
        assert!(!path.exists());
    }

    #[test]
    fn test_backing_file_removed_on_error() {
        let scratch = TempDir::new().unwrap();
        let bytes = fixture::sql_bytes("CREATE TABLE unrelated (x INT);");

        let result = CaptureStore::from_bytes(
            "follow-up",
            &bytes,
            &CaptureSchema::default(),
            Some(scratch.path()),
        );

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_wal_capture_leaves_no_journal_files() {
        let scratch = TempDir::new().unwrap();
        let bytes = fixture::wal_sql_bytes(
            "CREATE TABLE packets (ts_sec INT, sourcemac TEXT);
             CREATE TABLE devices (devmac TEXT, phyname TEXT, type TEXT, strongest_signal INT);
             INSERT INTO packets VALUES (1, 'AA'), (7201, 'BB');
             INSERT INTO devices VALUES ('AA', 'IEEE802.11', 'Wi-Fi AP', -50);",
        );
        // Header write/read versions of 2 mark a WAL-mode database.
        assert_eq!(&bytes[18..20], &[2, 2]);

        let store = CaptureStore::from_bytes(
            "baseline",
            &bytes,
            &CaptureSchema::default(),
            Some(scratch.path()),
        )
        .unwrap();
        assert_eq!(store.packet_count().unwrap(), 2);
        assert_eq!(store.time_range().unwrap(), (1.0, 7201.0));

        drop(store);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_bytes_is_invalid_format() {
        let scratch = TempDir::new().unwrap();
        let err = CaptureStore::from_bytes(
            "baseline",
            &[],
            &CaptureSchema::default(),
            Some(scratch.path()),
        )
        .err()
        .unwrap();

        assert!(matches!(err, CaptureError::InvalidCaptureFormat { .. }));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let scratch = TempDir::new().unwrap();
        let err = CaptureStore::open(
            "baseline",
            &scratch.path().join("absent.kismet"),
            &CaptureSchema::default(),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, CaptureError::Io { .. }));
    }
}
