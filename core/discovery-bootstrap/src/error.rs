//! Bootstrap client error types.

use discovery_crypto::CryptoError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for bootstrap operations.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Errors that can end (or interrupt) a bootstrap attempt.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("network not reachable after {0:?}")]
    NetworkTimeout(Duration),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service rejected the signature; the PSK does not match.
    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<BootstrapError>,
    },

    /// The payload could not be opened with this device's key.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A success status whose body is not the expected JSON, e.g. a proxy page
    /// served while the service is still starting.
    #[error("unparseable {status} response from {path}: {detail}")]
    UnparseableBody {
        path: String,
        status: u16,
        detail: String,
    },

    #[error("device identity detection failed: {0}")]
    DeviceDetection(String),

    #[error("failed to write {path}: {source}")]
    Apply {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl BootstrapError {
    /// Transport failures, 5xx/429 responses and garbled success bodies are
    /// worth retrying; anything else points at a configuration mismatch.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::UnparseableBody { .. } => true,
            Self::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// True when the failure came from decrypting the delivered payload.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::DecryptionFailed))
    }
}
