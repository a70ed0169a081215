//! Error types for the registration store.

use rusqlite::ffi;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No record matches the given serial/hostname pair in `registered` state.
    #[error("registration not found: {0}")]
    NotFound(String),

    /// The allocation transaction lost a race (constraint or busy) and may be retried.
    #[error("hostname allocation conflict")]
    AllocationConflict,

    /// Allocation kept conflicting after every retry.
    #[error("hostname allocation failed after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    /// A stored row could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A thread panicked while holding the connection.
    #[error("store connection poisoned")]
    Poisoned,

    /// IO error (creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Transient failures that the allocator retries internally.
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::AllocationConflict => true,
            StoreError::Database(rusqlite::Error::SqliteFailure(e, _)) => match e.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => true,
                // Only a lost race on a key; NOT NULL and CHECK failures are bugs.
                rusqlite::ErrorCode::ConstraintViolation => matches!(
                    e.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                ),
                _ => false,
            },
            _ => false,
        }
    }
}
