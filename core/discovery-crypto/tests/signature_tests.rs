use discovery_crypto::{
    confirmation_message, registration_message, sign, verify_signature, Psk, SIGNATURE_HEX_LEN,
};

fn psk() -> Psk {
    Psk::new("0123456789abcdef0123456789abcdef").unwrap()
}

// ── Canonical messages ───────────────────────────────────────────

#[test]
fn registration_message_is_serial_colon_mac() {
    assert_eq!(
        registration_message("10000000a1b2c3d4", "b8:27:eb:12:34:56", None),
        "10000000a1b2c3d4:b8:27:eb:12:34:56"
    );
}

#[test]
fn confirmation_message_is_serial_colon_hostname() {
    assert_eq!(
        confirmation_message("10000000a1b2c3d4", "sensor-01", None),
        "10000000a1b2c3d4:sensor-01"
    );
}

#[test]
fn timestamp_is_appended_when_present() {
    assert_eq!(
        registration_message("s1", "b8:27:eb:12:34:56", Some(1_700_000_000)),
        "s1:b8:27:eb:12:34:56:1700000000"
    );
    assert_eq!(
        confirmation_message("s1", "sensor-02", Some(42)),
        "s1:sensor-02:42"
    );
}

// ── sign ─────────────────────────────────────────────────────────

#[test]
fn sign_matches_rfc4231_vector() {
    // RFC 4231 test case 2
    let key = Psk::new("Jefe").unwrap();
    assert_eq!(
        sign(&key, "what do ya want for nothing?"),
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
}

#[test]
fn signature_is_lowercase_hex() {
    let sig = sign(&psk(), "s1:b8:27:eb:12:34:56");
    assert_eq!(sig.len(), SIGNATURE_HEX_LEN);
    assert!(sig.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
}

#[test]
fn sign_is_deterministic() {
    assert_eq!(sign(&psk(), "msg"), sign(&psk(), "msg"));
}

// ── verify_signature ─────────────────────────────────────────────

#[test]
fn verify_accepts_correct_signature() {
    let msg = registration_message("10000000a1b2c3d4", "b8:27:eb:12:34:56", None);
    let sig = sign(&psk(), &msg);
    assert!(verify_signature(&psk(), &msg, &sig));
}

#[test]
fn verify_rejects_other_psk() {
    let msg = "s1:b8:27:eb:12:34:56";
    let other = Psk::new("a-completely-different-shared-key").unwrap();
    let sig = sign(&other, msg);
    assert!(!verify_signature(&psk(), msg, &sig));
}

#[test]
fn verify_rejects_other_message() {
    let sig = sign(&psk(), "s1:b8:27:eb:12:34:56");
    assert!(!verify_signature(&psk(), "s2:b8:27:eb:12:34:56", &sig));
    assert!(!verify_signature(&psk(), "s1:b8:27:eb:12:34:57", &sig));
}

#[test]
fn verify_rejects_every_single_bit_flip() {
    let msg = "10000000a1b2c3d4:b8:27:eb:12:34:56";
    let good = hex::decode(sign(&psk(), msg)).unwrap();
    for byte in 0..good.len() {
        for bit in 0..8 {
            let mut flipped = good.clone();
            flipped[byte] ^= 1 << bit;
            assert!(
                !verify_signature(&psk(), msg, &hex::encode(&flipped)),
                "flip at byte {byte} bit {bit} was accepted"
            );
        }
    }
}

#[test]
fn verify_rejects_truncated_and_extended() {
    let msg = "s1:sensor-01";
    let sig = sign(&psk(), msg);
    assert!(!verify_signature(&psk(), msg, &sig[..SIGNATURE_HEX_LEN - 2]));
    assert!(!verify_signature(&psk(), msg, &format!("{sig}00")));
    assert!(!verify_signature(&psk(), msg, ""));
}

#[test]
fn verify_rejects_uppercase_hex() {
    let msg = "s1:sensor-01";
    let sig = sign(&psk(), msg).to_uppercase();
    assert!(!verify_signature(&psk(), msg, &sig));
}

#[test]
fn registration_signature_does_not_authorize_confirmation() {
    let reg = registration_message("s1", "b8:27:eb:12:34:56", None);
    let sig = sign(&psk(), &reg);
    let conf = confirmation_message("s1", "sensor-01", None);
    assert!(!verify_signature(&psk(), &conf, &sig));
}

#[test]
fn timestamped_signature_does_not_verify_without_timestamp() {
    let with_ts = registration_message("s1", "b8:27:eb:12:34:56", Some(100));
    let sig = sign(&psk(), &with_ts);
    let without = registration_message("s1", "b8:27:eb:12:34:56", None);
    assert!(!verify_signature(&psk(), &without, &sig));
}

#[test]
fn signature_matches_known_answer() {
    let psk = Psk::new("test-psk-0123456789abcdef").unwrap();
    let message = registration_message("10000000a1b2c3d4", "b8:27:eb:12:34:56", None);
    let expected = "97e95d24687ab97a8ff2fdefa52927c61b0af7c17ea85c1e44d36a175d5d6c8b";
    assert_eq!(sign(&psk, &message), expected);
    assert!(verify_signature(&psk, &message, expected));
}
