//! Property-based tests for the crypto engine.
//!
//! These tests verify security properties that must always hold:
//! - Only the exact HMAC of the message under the PSK verifies
//! - Sealed configs open with the key of the device they were made for
//! - A key derived for any other serial fails closed

use discovery_crypto::{
    decrypt_config, derive_device_key, encrypt_config, registration_message, sign,
    verify_signature, CryptoError, KdfParams, Psk,
};
use proptest::prelude::*;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

/// Fast KDF params for testing (low cost for speed)
fn fast_kdf_params() -> KdfParams {
    KdfParams {
        log_n: 4,
        r: 8,
        p: 1,
    }
}

fn psk_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9!@#$%^&*()]{1,64}").unwrap()
}

fn serial_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9a-f]{8,16}").unwrap()
}

fn mac_strategy() -> impl Strategy<Value = String> {
    prop::array::uniform6(any::<u8>()).prop_map(|b| {
        b.iter()
            .map(|o| format!("{o:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    })
}

// =============================================================================
// SIGNATURE PROPERTIES
// =============================================================================

mod signature_properties {
    use super::*;

    proptest! {
        /// A signature produced with the PSK always verifies
        #[test]
        fn own_signature_verifies(
            psk in psk_strategy(),
            serial in serial_strategy(),
            mac in mac_strategy(),
        ) {
            let psk = Psk::new(psk).unwrap();
            let msg = registration_message(&serial, &mac, None);
            let sig = sign(&psk, &msg);
            prop_assert!(verify_signature(&psk, &msg, &sig));
        }

        /// A signature under a different PSK never verifies
        #[test]
        fn foreign_psk_never_verifies(
            a in psk_strategy(),
            b in psk_strategy(),
            serial in serial_strategy(),
            mac in mac_strategy(),
        ) {
            prop_assume!(a != b);
            let pa = Psk::new(a).unwrap();
            let pb = Psk::new(b).unwrap();
            let msg = registration_message(&serial, &mac, None);
            prop_assert!(!verify_signature(&pa, &msg, &sign(&pb, &msg)));
        }

        /// Arbitrary strings are not accepted as signatures
        #[test]
        fn random_candidate_rejected(
            serial in serial_strategy(),
            candidate in "[0-9a-f]{0,80}",
        ) {
            let psk = Psk::new("fixed-deployment-psk").unwrap();
            let msg = registration_message(&serial, "b8:27:eb:12:34:56", None);
            prop_assume!(candidate != sign(&psk, &msg));
            prop_assert!(!verify_signature(&psk, &msg, &candidate));
        }
    }
}

// =============================================================================
// DEVICE BINDING PROPERTIES
// =============================================================================

mod device_binding_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Payload sealed for serial A never opens with the key for serial B
        #[test]
        fn other_serial_fails_closed(
            a in serial_strategy(),
            b in serial_strategy(),
            plaintext in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            prop_assume!(a != b);
            let psk = Psk::new("fixed-deployment-psk").unwrap();
            let params = fast_kdf_params();
            let ka = derive_device_key(&psk, &a, &params).unwrap();
            let kb = derive_device_key(&psk, &b, &params).unwrap();

            let blob = encrypt_config(&ka, &plaintext).unwrap();
            prop_assert!(matches!(
                decrypt_config(&kb, &blob),
                Err(CryptoError::DecryptionFailed)
            ));
            prop_assert_eq!(decrypt_config(&ka, &blob).unwrap(), plaintext);
        }

        /// Derivation is a pure function of (psk, serial)
        #[test]
        fn derivation_is_deterministic(psk in psk_strategy(), serial in serial_strategy()) {
            let psk = Psk::new(psk).unwrap();
            let params = fast_kdf_params();
            let k1 = derive_device_key(&psk, &serial, &params).unwrap();
            let k2 = derive_device_key(&psk, &serial, &params).unwrap();
            prop_assert_eq!(k1.as_bytes(), k2.as_bytes());
        }
    }
}
