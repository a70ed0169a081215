//! On-device bootstrap client.
//!
//! Runs once on a freshly imaged device: waits for the network, registers
//! with the discovery service using the PSK baked into the image, decrypts
//! and applies the returned config, then confirms the outcome.
//!
//! The protocol logic lives in [`Bootstrapper`]; time, connectivity and the
//! local apply step sit behind traits so the whole sequence runs against
//! fakes in tests.

mod apply;
mod bootstrap;
mod client;
mod clock;
mod device;
mod error;
mod network;
mod retry;

pub use apply::{
    AppliedConfig, ConfigApplier, FileApplier, AUTHORIZED_KEYS_FILE, BLOCK_END, BLOCK_START,
    CONFIG_FILE, CREDENTIAL_FILE, HOSTNAME_FILE,
};
pub use bootstrap::{BootstrapReport, BootstrapSettings, Bootstrapper};
pub use client::DiscoveryClient;
pub use clock::{Clock, SystemClock};
pub use device::{detect_mac, detect_serial, DeviceIdentity};
pub use error::{BootstrapError, BootstrapResult};
pub use network::{wait_for_network, Connectivity, TcpProbe};
pub use retry::{retry_with_policy, RetryPolicy};
