//! Durable device registrations backed by SQLite.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use discovery_types::{BootstrapOutcome, DeviceRecord, DeviceStatus, Hostname, RegistrationStats};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

const RECORD_COLUMNS: &str =
    "serial, mac, hostname, sequence, status, registered_at, confirmed_at, error_message";

/// Persistent store of device records keyed by serial.
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct RegistrationStore {
    conn: Arc<Mutex<Connection>>,
}

impl RegistrationStore {
    /// Opens (or creates) a store at the given path, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        debug!(path = %path.display(), "opened registration store");
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS registrations (
                serial TEXT PRIMARY KEY NOT NULL,
                mac TEXT NOT NULL,
                prefix TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                hostname TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL DEFAULT 'registered',
                registered_at TEXT NOT NULL,
                confirmed_at TEXT,
                error_message TEXT,
                UNIQUE(prefix, sequence)
            );

            CREATE INDEX IF NOT EXISTS idx_registrations_status ON registrations(status);

            CREATE TABLE IF NOT EXISTS hostname_counters (
                prefix TEXT PRIMARY KEY NOT NULL,
                last_sequence INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Looks up the record for a serial.
    pub fn get(&self, serial: &str) -> StoreResult<Option<DeviceRecord>> {
        let conn = self.lock()?;
        select_by_serial(&conn, serial)
    }

    /// Looks up a record matching both serial and hostname exactly.
    pub fn find(&self, serial: &str, hostname: &str) -> StoreResult<Option<DeviceRecord>> {
        Ok(self
            .get(serial)?
            .filter(|record| record.hostname.as_str() == hostname))
    }

    /// All records in allocation order.
    pub fn list(&self) -> StoreResult<Vec<DeviceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM registrations ORDER BY prefix, sequence"
        ))?;
        let rows = stmt
            .query_map([], RawRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRecord::into_record).collect()
    }

    /// Moves a `registered` record to its terminal status.
    ///
    /// Fails with [`StoreError::NotFound`] when no record matches both fields
    /// or the record is already terminal; nothing is written in that case.
    pub fn confirm(
        &self,
        serial: &str,
        hostname: &str,
        outcome: BootstrapOutcome,
        error_message: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<DeviceRecord> {
        let conn = self.lock()?;
        let error_message = match outcome {
            BootstrapOutcome::Success => None,
            BootstrapOutcome::Failure => error_message,
        };
        let updated = conn.execute(
            "UPDATE registrations
             SET status = ?1, confirmed_at = ?2, error_message = ?3
             WHERE serial = ?4 AND hostname = ?5 AND status = 'registered'",
            params![
                outcome.terminal_status().as_str(),
                format_timestamp(&at),
                error_message,
                serial,
                hostname,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("{serial}/{hostname}")));
        }
        select_by_serial(&conn, serial)?
            .ok_or_else(|| StoreError::NotFound(format!("{serial}/{hostname}")))
    }

    /// Counts records by status.
    pub fn stats(&self) -> StoreResult<RegistrationStats> {
        let conn = self.lock()?;
        let (total, registered, confirmed, failed, last): (i64, i64, i64, i64, Option<String>) =
            conn.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(status = 'registered'), 0),
                    COALESCE(SUM(status = 'confirmed'), 0),
                    COALESCE(SUM(status = 'failed'), 0),
                    MAX(registered_at)
                 FROM registrations",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )?;
        Ok(RegistrationStats {
            total: total as u64,
            registered: registered as u64,
            confirmed: confirmed as u64,
            failed: failed as u64,
            last_registration: last.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    /// Cheap round trip used by the health check.
    pub fn ping(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

pub(crate) fn select_by_serial(
    conn: &Connection,
    serial: &str,
) -> StoreResult<Option<DeviceRecord>> {
    let raw = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM registrations WHERE serial = ?1"),
            params![serial],
            RawRecord::from_row,
        )
        .optional()?;
    raw.map(RawRecord::into_record).transpose()
}

pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("timestamp {s:?}: {e}")))
}

/// A row as stored, before domain validation.
struct RawRecord {
    serial: String,
    mac: String,
    hostname: String,
    sequence: i64,
    status: String,
    registered_at: String,
    confirmed_at: Option<String>,
    error_message: Option<String>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            serial: row.get(0)?,
            mac: row.get(1)?,
            hostname: row.get(2)?,
            sequence: row.get(3)?,
            status: row.get(4)?,
            registered_at: row.get(5)?,
            confirmed_at: row.get(6)?,
            error_message: row.get(7)?,
        })
    }

    fn into_record(self) -> StoreResult<DeviceRecord> {
        let hostname = Hostname::from_str(&self.hostname)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let status = DeviceStatus::from_str(&self.status)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let sequence = u32::try_from(self.sequence)
            .map_err(|_| StoreError::InvalidData(format!("sequence {}", self.sequence)))?;
        Ok(DeviceRecord {
            serial: self.serial,
            mac: self.mac,
            hostname,
            sequence,
            status,
            registered_at: parse_timestamp(&self.registered_at)?,
            confirmed_at: self.confirmed_at.as_deref().map(parse_timestamp).transpose()?,
            error_message: self.error_message,
        })
    }
}
