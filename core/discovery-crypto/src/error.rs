//! Error types for the crypto engine.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed (invalid scrypt parameters).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Malformed blob, truncated blob, wrong key or tampered data.
    ///
    /// Carries no detail so callers cannot tell the causes apart.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The pre-shared key is empty.
    #[error("pre-shared key must not be empty")]
    EmptyPsk,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
