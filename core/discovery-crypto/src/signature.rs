//! Request authentication with HMAC-SHA256 over the PSK.
//!
//! Signed messages are colon-joined fields: `serial:mac` for registration and
//! `serial:hostname` for confirmation, each optionally followed by
//! `:timestamp` when replay hardening is in use. Signatures travel as
//! lowercase hex.

use crate::key::Psk;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded signature.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Canonical message for `/register`.
pub fn registration_message(serial: &str, mac: &str, timestamp: Option<i64>) -> String {
    canonical(&[serial, mac], timestamp)
}

/// Canonical message for `/confirm`.
pub fn confirmation_message(serial: &str, hostname: &str, timestamp: Option<i64>) -> String {
    canonical(&[serial, hostname], timestamp)
}

fn canonical(fields: &[&str], timestamp: Option<i64>) -> String {
    let mut message = fields.join(":");
    if let Some(ts) = timestamp {
        message.push(':');
        message.push_str(&ts.to_string());
    }
    message
}

fn mac_bytes(psk: &Psk, message: &str) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(psk.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(message.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Signs `message` with the PSK, returning lowercase hex.
pub fn sign(psk: &Psk, message: &str) -> String {
    hex::encode(mac_bytes(psk, message))
}

/// Checks `candidate` against `HMAC-SHA256(psk, message)`.
///
/// The hex strings are compared with a constant-time equality check; only the
/// length comparison can exit early.
pub fn verify_signature(psk: &Psk, message: &str, candidate: &str) -> bool {
    if candidate.len() != SIGNATURE_HEX_LEN {
        return false;
    }
    let expected = sign(psk, message);
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}
