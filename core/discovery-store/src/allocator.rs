//! Atomic hostname allocation.
//!
//! A serial is assigned a hostname exactly once. The lookup, the next-number
//! computation and the insert happen inside one `IMMEDIATE` transaction, so two
//! racing first registrations can never observe the same sequence.

use crate::error::{StoreError, StoreResult};
use crate::store::{format_timestamp, select_by_serial, RegistrationStore};
use chrono::Utc;
use discovery_types::{validate_hostname_prefix, DeviceRecord, DeviceStatus, Hostname};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::time::Duration;
use tracing::{info, warn};

/// Default number of attempts before a conflicting allocation gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Result of [`IdentityAllocator::assign_or_lookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub record: DeviceRecord,
    /// `true` when this call created the record.
    pub newly_assigned: bool,
}

/// Hands out `{prefix}-{NN}` hostnames in first-registration order.
#[derive(Clone)]
pub struct IdentityAllocator {
    store: RegistrationStore,
    prefix: String,
    max_attempts: u32,
    backoff: Duration,
}

impl IdentityAllocator {
    pub fn new(store: RegistrationStore, prefix: impl Into<String>) -> StoreResult<Self> {
        let prefix = prefix.into();
        validate_hostname_prefix(&prefix).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(Self {
            store,
            prefix,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(20),
        })
    }

    /// Overrides the conflict retry budget.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &RegistrationStore {
        &self.store
    }

    /// Returns the existing record for `serial`, or allocates the next hostname.
    ///
    /// Repeat calls for a known serial return the stored record unchanged (the
    /// MAC in the request is not compared) and never advance the counter.
    /// Blocking: call from a blocking context in async code.
    pub fn assign_or_lookup(&self, serial: &str, mac: &str) -> StoreResult<Assignment> {
        let mut attempt = 1;
        loop {
            match self.try_assign(serial, mac) {
                Err(e) if e.is_conflict() && attempt < self.max_attempts => {
                    warn!(serial, attempt, error = %e, "hostname allocation conflict, retrying");
                    std::thread::sleep(self.backoff * attempt);
                    attempt += 1;
                }
                Err(e) if e.is_conflict() => {
                    return Err(StoreError::AllocationExhausted { attempts: attempt });
                }
                other => return other,
            }
        }
    }

    fn try_assign(&self, serial: &str, mac: &str) -> StoreResult<Assignment> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(record) = select_by_serial(&tx, serial)? {
            tx.commit()?;
            return Ok(Assignment {
                record,
                newly_assigned: false,
            });
        }

        let counter: Option<i64> = tx
            .query_row(
                "SELECT last_sequence FROM hostname_counters WHERE prefix = ?1",
                params![self.prefix],
                |row| row.get(0),
            )
            .optional()?;
        let highest: Option<i64> = tx.query_row(
            "SELECT MAX(sequence) FROM registrations WHERE prefix = ?1",
            params![self.prefix],
            |row| row.get(0),
        )?;
        let next = counter.unwrap_or(0).max(highest.unwrap_or(0)) + 1;
        let sequence =
            u32::try_from(next).map_err(|_| StoreError::InvalidData(format!("sequence {next}")))?;
        let hostname = Hostname::new(&self.prefix, sequence);

        tx.execute(
            "INSERT INTO hostname_counters (prefix, last_sequence) VALUES (?1, ?2)
             ON CONFLICT(prefix) DO UPDATE SET last_sequence = excluded.last_sequence",
            params![self.prefix, next],
        )?;
        tx.execute(
            "INSERT INTO registrations
                 (serial, mac, prefix, sequence, hostname, status, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                serial,
                mac,
                self.prefix,
                next,
                hostname.as_str(),
                DeviceStatus::Registered.as_str(),
                format_timestamp(&Utc::now()),
            ],
        )?;

        let record = select_by_serial(&tx, serial)?
            .ok_or_else(|| StoreError::NotFound(serial.to_string()))?;
        tx.commit()?;

        info!(serial, hostname = %record.hostname, "assigned hostname");
        Ok(Assignment {
            record,
            newly_assigned: true,
        })
    }
}
