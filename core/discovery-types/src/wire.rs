//! JSON bodies exchanged between the bootstrap client and the service.

use crate::hostname::Hostname;
use crate::record::{DeviceStatus, RegistrationStats};
use crate::validate::{validate_mac, validate_serial};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `POST /register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub serial: String,
    pub mac: String,
    /// Hex HMAC-SHA256 over `serial:mac[:timestamp]`.
    pub signature: String,
    /// Unix seconds, included in the signed message when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl RegisterRequest {
    /// Schema-level checks; says nothing about authenticity.
    pub fn validate(&self) -> Result<(), Error> {
        validate_serial(&self.serial)?;
        validate_mac(&self.mac)?;
        Ok(())
    }
}

/// `POST /register` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub hostname: Hostname,
    /// `base64(nonce || ciphertext || tag)` of a JSON [`ConfigPayload`].
    pub encrypted_config: String,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// `POST /confirm` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub serial: String,
    pub hostname: String,
    /// Hex HMAC-SHA256 over `serial:hostname[:timestamp]`.
    pub signature: String,
    /// `"success"` or anything else for failure.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ConfirmRequest {
    pub fn validate(&self) -> Result<(), Error> {
        validate_serial(&self.serial)?;
        if self.hostname.is_empty() {
            return Err(Error::InvalidHostname("empty".to_string()));
        }
        if self.status.is_empty() {
            return Err(Error::InvalidStatus("empty".to_string()));
        }
        Ok(())
    }
}

/// `POST /confirm` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub message: String,
    pub status: DeviceStatus,
}

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
    pub uptime_seconds: f64,
}

/// `GET /stats` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total: u64,
    pub registered: u64,
    pub confirmed: u64,
    pub failed: u64,
    pub last_registration: Option<DateTime<Utc>>,
}

impl From<RegistrationStats> for StatsResponse {
    fn from(stats: RegistrationStats) -> Self {
        Self {
            total: stats.total,
            registered: stats.registered,
            confirmed: stats.confirmed,
            failed: stats.failed,
            last_registration: stats.last_registration,
        }
    }
}

/// Body of every rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Secrets delivered to one device inside `encrypted_config`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPayload {
    pub hostname: Hostname,
    pub ssh_keys: Vec<String>,
    /// VPN/mesh enrollment credential.
    pub enrollment_credential: String,
    /// Unix seconds at which the service built this payload.
    pub issued_at: i64,
}

impl fmt::Debug for ConfigPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPayload")
            .field("hostname", &self.hostname)
            .field("ssh_keys", &self.ssh_keys.len())
            .field("enrollment_credential", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

fn default_true() -> bool {
    true
}
