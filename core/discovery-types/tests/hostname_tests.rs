use discovery_types::{validate_hostname_prefix, Hostname};
use proptest::prelude::*;
use std::collections::HashSet;
use std::str::FromStr;

// ── Formatting ────────────────────────────────────────────────────

#[test]
fn first_hostname_is_zero_padded() {
    assert_eq!(Hostname::new("sensor", 1).as_str(), "sensor-01");
}

#[test]
fn two_digit_sequence_is_unchanged() {
    assert_eq!(Hostname::new("sensor", 42).as_str(), "sensor-42");
}

#[test]
fn sequence_grows_past_two_digits() {
    assert_eq!(Hostname::new("sensor", 100).as_str(), "sensor-100");
    assert_eq!(Hostname::new("sensor", 12345).as_str(), "sensor-12345");
}

#[test]
fn prefix_with_inner_hyphen() {
    let h = Hostname::new("field-node", 7);
    assert_eq!(h.to_string(), "field-node-07");
}

// ── Parsing ───────────────────────────────────────────────────────

#[test]
fn parse_splits_prefix_and_sequence() {
    let (prefix, seq) = Hostname::parse("field-node-07").unwrap();
    assert_eq!(prefix, "field-node");
    assert_eq!(seq, 7);
}

#[test]
fn from_str_accepts_formatted_hostname() {
    let h = Hostname::from_str("sensor-03").unwrap();
    assert_eq!(h, Hostname::new("sensor", 3));
}

#[test]
fn parse_rejects_missing_sequence() {
    assert!(Hostname::parse("sensor").is_err());
    assert!(Hostname::parse("sensor-").is_err());
}

#[test]
fn parse_rejects_unpadded_sequence() {
    assert!(Hostname::parse("sensor-1").is_err());
}

#[test]
fn parse_rejects_non_numeric_sequence() {
    assert!(Hostname::parse("sensor-ab").is_err());
}

#[test]
fn parse_rejects_bad_prefix() {
    assert!(Hostname::parse("Sensor-01").is_err());
    assert!(Hostname::parse("-01").is_err());
}

#[test]
fn serde_is_transparent() {
    let h = Hostname::new("sensor", 1);
    let json = serde_json::to_string(&h).unwrap();
    assert_eq!(json, "\"sensor-01\"");
    let back: Hostname = serde_json::from_str(&json).unwrap();
    assert_eq!(back, h);
}

#[test]
fn distinct_sequences_give_distinct_hostnames() {
    let set: HashSet<Hostname> = (1..=500).map(|n| Hostname::new("sensor", n)).collect();
    assert_eq!(set.len(), 500);
}

// ── Prefix validation ─────────────────────────────────────────────

#[test]
fn prefix_validation() {
    assert!(validate_hostname_prefix("sensor").is_ok());
    assert!(validate_hostname_prefix("pi4-lab").is_ok());
    assert!(validate_hostname_prefix("").is_err());
    assert!(validate_hostname_prefix("UPPER").is_err());
    assert!(validate_hostname_prefix("trailing-").is_err());
    assert!(validate_hostname_prefix("has space").is_err());
    assert!(validate_hostname_prefix(&"a".repeat(51)).is_err());
}

proptest! {
    #[test]
    fn format_then_parse_recovers_sequence(
        prefix in "[a-z][a-z0-9]{0,10}(-[a-z0-9]{1,5})?",
        seq in 0u32..1_000_000,
    ) {
        let h = Hostname::new(&prefix, seq);
        let (p, s) = Hostname::parse(h.as_str()).unwrap();
        prop_assert_eq!(p, prefix);
        prop_assert_eq!(s, seq);
    }
}
