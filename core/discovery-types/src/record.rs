//! Device registration records and their lifecycle.

use crate::hostname::Hostname;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a registered device.
///
/// `Registered` is the only non-terminal state; it moves to `Confirmed` or
/// `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Registered,
    Confirmed,
    Failed,
}

impl DeviceStatus {
    /// Returns the lowercase name stored and shown on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `Confirmed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Self::Registered),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Outcome a device reports to `/confirm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Success,
    Failure,
}

impl BootstrapOutcome {
    /// Interprets the wire `status` string: `"success"` succeeds, anything else fails.
    #[must_use]
    pub fn from_reported(status: &str) -> Self {
        if status == "success" {
            Self::Success
        } else {
            Self::Failure
        }
    }

    /// The wire string sent by the bootstrap client.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// The terminal status this outcome moves a record to.
    #[must_use]
    pub const fn terminal_status(&self) -> DeviceStatus {
        match self {
            Self::Success => DeviceStatus::Confirmed,
            Self::Failure => DeviceStatus::Failed,
        }
    }
}

/// One physical device, keyed by its hardware serial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub serial: String,
    /// Link-layer address seen at registration time.
    pub mac: String,
    pub hostname: Hostname,
    /// Allocation sequence number embedded in `hostname`.
    pub sequence: u32,
    pub status: DeviceStatus,
    pub registered_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Error reported by the device alongside a failed confirmation.
    pub error_message: Option<String>,
}

/// Aggregate counts over all records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStats {
    pub total: u64,
    pub registered: u64,
    pub confirmed: u64,
    pub failed: u64,
    pub last_registration: Option<DateTime<Utc>>,
}
