//! Config payload encryption using AES-256-GCM.
//!
//! Wire format: `base64(nonce(12) || ciphertext || tag(16))`.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DeviceKey;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};

/// Size of nonce in bytes (96 bits for GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A sealed config blob split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedConfig {
    /// The nonce used for encryption (unique per encryption).
    pub nonce: [u8; NONCE_SIZE],
    /// The encrypted ciphertext (includes auth tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedConfig {
    /// Returns the total size of the encrypted data.
    pub fn len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }

    /// Returns true if the ciphertext is empty.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    /// Encodes to the base64 wire format.
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        STANDARD.encode(&bytes)
    }

    /// Decodes from the base64 wire format.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        let ciphertext = bytes[NONCE_SIZE..].to_vec();

        Ok(Self { nonce, ciphertext })
    }
}

/// Encrypts plaintext with a fresh random nonce.
pub fn encrypt(key: &DeviceKey, plaintext: &[u8]) -> CryptoResult<EncryptedConfig> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedConfig {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts and authenticates a sealed blob.
pub fn decrypt(key: &DeviceKey, encrypted: &EncryptedConfig) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&encrypted.nonce);

    cipher
        .decrypt(nonce, encrypted.ciphertext.as_ref())
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypts a plaintext config and returns the base64 wire blob.
pub fn encrypt_config(key: &DeviceKey, plaintext: &[u8]) -> CryptoResult<String> {
    Ok(encrypt(key, plaintext)?.to_base64())
}

/// Decrypts a base64 wire blob produced by [`encrypt_config`].
pub fn decrypt_config(key: &DeviceKey, blob: &str) -> CryptoResult<Vec<u8>> {
    let encrypted = EncryptedConfig::from_base64(blob)?;
    decrypt(key, &encrypted)
}

/// Serializes `value` to JSON and seals it for one device.
pub fn seal_json<T: Serialize>(key: &DeviceKey, value: &T) -> CryptoResult<String> {
    let plaintext = serde_json::to_vec(value)?;
    encrypt_config(key, &plaintext)
}

/// Opens a sealed blob and parses the JSON inside.
///
/// A plaintext that authenticates but does not parse is still reported as
/// [`CryptoError::DecryptionFailed`].
pub fn open_json<T: DeserializeOwned>(key: &DeviceKey, blob: &str) -> CryptoResult<T> {
    let plaintext = decrypt_config(key, blob)?;
    serde_json::from_slice(&plaintext).map_err(|_| CryptoError::DecryptionFailed)
}
