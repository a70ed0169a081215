//! Pre-shared key handling and per-device key derivation.
//!
//! Every device image carries the same PSK. The payload key for a device is
//! `scrypt(psk, salt = serial)`, so two devices never share a decryption key.

use crate::error::{CryptoError, CryptoResult};
use scrypt::Params;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of device keys in bytes (256 bits for AES-256-GCM).
pub const KEY_SIZE: usize = 32;

/// Size of the serial-derived salt in bytes.
pub const SALT_SIZE: usize = 32;

/// The deployment-wide pre-shared key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Psk {
    bytes: Vec<u8>,
}

impl Psk {
    /// Wraps a PSK string as configured on the service and burned into images.
    pub fn new(psk: impl Into<String>) -> CryptoResult<Self> {
        let bytes = psk.into().into_bytes();
        if bytes.is_empty() {
            return Err(CryptoError::EmptyPsk);
        }
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the key in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; construction rejects empty keys.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Psk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Psk").field("bytes", &"[REDACTED]").finish()
    }
}

/// A device-specific AES-256 key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DeviceKey {
    bytes: [u8; KEY_SIZE],
}

impl DeviceKey {
    /// Creates a device key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// scrypt cost parameters.
///
/// Both sides of the protocol must agree on these; the defaults are the
/// deployed wire parameters (`N = 2^14, r = 8, p = 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost `N`.
    pub log_n: u8,
    /// Block size.
    pub r: u32,
    /// Parallelism factor.
    pub p: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            log_n: 14,
            r: 8,
            p: 1,
        }
    }
}

/// Builds the salt for a serial: its UTF-8 bytes, NUL-padded or truncated to
/// [`SALT_SIZE`].
pub fn device_salt(serial: &str) -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    let bytes = serial.as_bytes();
    let n = bytes.len().min(SALT_SIZE);
    salt[..n].copy_from_slice(&bytes[..n]);
    salt
}

/// Derives the payload key for one device.
///
/// Deliberately slow; run it off async executors.
pub fn derive_device_key(psk: &Psk, serial: &str, params: &KdfParams) -> CryptoResult<DeviceKey> {
    let scrypt_params = Params::new(params.log_n, params.r, params.p, KEY_SIZE)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let salt = device_salt(serial);
    let mut key_bytes = [0u8; KEY_SIZE];
    scrypt::scrypt(psk.as_bytes(), &salt, &scrypt_params, &mut key_bytes)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let key = DeviceKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}
