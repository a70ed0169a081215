//! Crypto engine for the discovery protocol.
//!
//! Stateless building blocks used by both the service and the device:
//! - HMAC-SHA256 request signatures keyed by the deployment PSK
//! - scrypt derivation of a per-device key from `(psk, serial)`
//! - AES-256-GCM sealing of the config payload delivered to one device
//!
//! All functions are pure apart from nonce generation and safe to call from
//! any number of threads.

mod cipher;
mod error;
mod key;
mod signature;

pub use cipher::{
    decrypt, decrypt_config, encrypt, encrypt_config, open_json, seal_json, EncryptedConfig,
    NONCE_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_device_key, device_salt, DeviceKey, KdfParams, Psk, KEY_SIZE, SALT_SIZE};
pub use signature::{
    confirmation_message, registration_message, sign, verify_signature, SIGNATURE_HEX_LEN,
};
