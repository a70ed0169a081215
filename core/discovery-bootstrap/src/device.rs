//! Hardware identity detection.
//!
//! Finds a stable serial and the primary link-layer address by probing the
//! usual Linux sources in order. Every path is resolved under a root
//! directory so detection can run against a fixture tree.

use crate::error::{BootstrapError, BootstrapResult};
use discovery_types::{validate_mac, validate_serial};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const DEVICE_TREE_SERIALS: &[&str] = &[
    "sys/firmware/devicetree/base/serial-number",
    "proc/device-tree/serial-number",
];
const CPUINFO: &str = "proc/cpuinfo";
const DMI_SERIALS: &[&str] = &["sys/class/dmi/id/product_serial", "sys/class/dmi/id/board_serial"];
const MACHINE_IDS: &[&str] = &["etc/machine-id", "var/lib/dbus/machine-id"];
const NET_CLASS: &str = "sys/class/net";

const DMI_PLACEHOLDERS: &[&str] = &[
    "Not Specified",
    "To Be Filled By O.E.M.",
    "Default string",
    "System Serial Number",
    "None",
];
const INTERFACE_PREFERENCE: &[&str] = &["eth", "en", "wl"];
const ZERO_MAC: &str = "00:00:00:00:00:00";

/// What the device presents to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub serial: String,
    pub mac: String,
}

impl DeviceIdentity {
    pub fn new(serial: impl Into<String>, mac: impl Into<String>) -> BootstrapResult<Self> {
        let serial = serial.into();
        let mac = mac.into().to_ascii_lowercase();
        validate_serial(&serial).map_err(|e| BootstrapError::DeviceDetection(e.to_string()))?;
        validate_mac(&mac).map_err(|e| BootstrapError::DeviceDetection(e.to_string()))?;
        Ok(Self { serial, mac })
    }

    /// Detects both fields under `root` (normally `/`).
    pub fn detect(root: &Path) -> BootstrapResult<Self> {
        let identity = Self::new(detect_serial(root)?, detect_mac(root)?)?;
        info!(serial = %identity.serial, mac = %identity.mac, "device identity detected");
        Ok(identity)
    }
}

/// Device tree, then `/proc/cpuinfo`, then DMI, then machine-id.
pub fn detect_serial(root: &Path) -> BootstrapResult<String> {
    for rel in DEVICE_TREE_SERIALS {
        if let Some(serial) = read_trimmed(&root.join(rel)).filter(|s| usable_serial(s)) {
            debug!(source = rel, "serial from device tree");
            return Ok(serial);
        }
    }

    if let Some(serial) = cpuinfo_serial(&root.join(CPUINFO)) {
        debug!("serial from cpuinfo");
        return Ok(serial);
    }

    for rel in DMI_SERIALS {
        if let Some(serial) = read_trimmed(&root.join(rel))
            .filter(|s| !DMI_PLACEHOLDERS.contains(&s.as_str()) && usable_serial(s))
        {
            debug!(source = rel, "serial from DMI");
            return Ok(serial);
        }
    }

    for rel in MACHINE_IDS {
        if let Some(id) = read_trimmed(&root.join(rel)).filter(|s| usable_serial(s)) {
            warn!(source = rel, "using machine-id as serial fallback");
            return Ok(id);
        }
    }

    Err(BootstrapError::DeviceDetection(
        "could not determine device serial number".into(),
    ))
}

/// First usable address among `eth*`, then `en*`, then `wl*` interfaces.
pub fn detect_mac(root: &Path) -> BootstrapResult<String> {
    let net = root.join(NET_CLASS);
    let mut interfaces: Vec<String> = fs::read_dir(&net)
        .map_err(|e| BootstrapError::DeviceDetection(format!("{}: {e}", net.display())))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name != "lo")
        .collect();
    interfaces.sort();

    for prefix in INTERFACE_PREFERENCE {
        for iface in interfaces.iter().filter(|name| name.starts_with(prefix)) {
            let address = read_trimmed(&net.join(iface).join("address"))
                .map(|mac| mac.to_ascii_lowercase());
            if let Some(mac) = address.filter(|mac| mac != ZERO_MAC && validate_mac(mac).is_ok()) {
                debug!(interface = %iface, "MAC address found");
                return Ok(mac);
            }
        }
    }

    Err(BootstrapError::DeviceDetection(
        "could not determine device MAC address".into(),
    ))
}

fn cpuinfo_serial(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    content
        .lines()
        .filter(|line| line.starts_with("Serial"))
        .filter_map(|line| line.split(':').nth(1))
        .map(str::trim)
        .find(|s| !s.is_empty() && s.chars().any(|c| c != '0') && usable_serial(s))
        .map(String::from)
}

fn read_trimmed(path: &Path) -> Option<String> {
    let raw = fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&raw);
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn usable_serial(s: &str) -> bool {
    validate_serial(s).is_ok()
}
