//! Sequential device hostnames.
//!
//! Hostnames have the form `<prefix>-<NN>` where `NN` is the allocation
//! sequence number, zero-padded to at least two digits.

use crate::validate::validate_hostname_prefix;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest prefix accepted, leaving room for `-NNNNNNNNNN` inside a 63-byte label.
pub const MAX_PREFIX_LEN: usize = 50;

/// A hostname assigned to exactly one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hostname(String);

impl Hostname {
    /// Formats the hostname for the given prefix and sequence number.
    #[must_use]
    pub fn new(prefix: &str, sequence: u32) -> Self {
        Self(format!("{prefix}-{sequence:02}"))
    }

    /// Returns the hostname as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the hostname back into its prefix and sequence number.
    pub fn parse(s: &str) -> Result<(String, u32), Error> {
        let (prefix, digits) = s
            .rsplit_once('-')
            .ok_or_else(|| Error::InvalidHostname(format!("missing sequence in {s:?}")))?;
        validate_hostname_prefix(prefix).map_err(|_| {
            Error::InvalidHostname(format!("invalid prefix in {s:?}"))
        })?;
        if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidHostname(format!("invalid sequence in {s:?}")));
        }
        let sequence = digits
            .parse::<u32>()
            .map_err(|e| Error::InvalidHostname(format!("{s:?}: {e}")))?;
        Ok((prefix.to_string(), sequence))
    }

    /// Consumes the hostname, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Hostname {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)?;
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
