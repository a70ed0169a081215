//! Core type definitions for the device discovery service.
//!
//! This crate defines the types shared by the registration service and the
//! on-device bootstrap client:
//! - Device records and their lifecycle status
//! - Sequential hostnames (`<prefix>-<NN>`)
//! - JSON request/response bodies for `/register`, `/confirm`, `/health`, `/stats`
//! - The configuration payload delivered (encrypted) to a device
//!
//! Nothing here performs I/O or cryptography.

mod hostname;
mod record;
mod validate;
mod wire;

pub use hostname::{Hostname, MAX_PREFIX_LEN};
pub use record::{BootstrapOutcome, DeviceRecord, DeviceStatus, RegistrationStats};
pub use validate::{validate_hostname_prefix, validate_mac, validate_serial, MAX_SERIAL_LEN};
pub use wire::{
    ConfigPayload, ConfirmRequest, ConfirmResponse, ErrorResponse, HealthResponse,
    RegisterRequest, RegisterResponse, StatsResponse,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid serial: {0}")]
    InvalidSerial(String),

    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("invalid hostname: {0}")]
    InvalidHostname(String),

    #[error("invalid device status: {0}")]
    InvalidStatus(String),
}
