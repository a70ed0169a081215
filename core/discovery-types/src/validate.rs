//! Input validation shared by the service and the bootstrap client.

use crate::hostname::MAX_PREFIX_LEN;
use crate::Error;

/// Longest serial accepted from a device.
pub const MAX_SERIAL_LEN: usize = 128;

/// Checks that a serial is printable ASCII without `:`.
///
/// The colon is reserved as the field separator of signed messages, so a
/// serial containing one could collide with a different `serial:mac` pair.
pub fn validate_serial(serial: &str) -> Result<(), Error> {
    if serial.is_empty() {
        return Err(Error::InvalidSerial("empty".to_string()));
    }
    if serial.len() > MAX_SERIAL_LEN {
        return Err(Error::InvalidSerial(format!(
            "longer than {MAX_SERIAL_LEN} characters"
        )));
    }
    if !serial.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidSerial(
            "must be printable ASCII without ':'".to_string(),
        ));
    }
    Ok(())
}

/// Checks for six colon-separated hex octets (`b8:27:eb:12:34:56`).
pub fn validate_mac(mac: &str) -> Result<(), Error> {
    let octets: Vec<&str> = mac.split(':').collect();
    let well_formed = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()));
    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidMac(mac.to_string()))
    }
}

/// Checks that a prefix can start a DNS label: lowercase alphanumerics and
/// inner hyphens only.
pub fn validate_hostname_prefix(prefix: &str) -> Result<(), Error> {
    if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
        return Err(Error::InvalidHostname(format!(
            "prefix must be 1-{MAX_PREFIX_LEN} characters"
        )));
    }
    let valid_chars = prefix
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if !valid_chars || prefix.starts_with('-') || prefix.ends_with('-') {
        return Err(Error::InvalidHostname(format!(
            "prefix {prefix:?} is not a valid DNS label"
        )));
    }
    Ok(())
}
