//! Waiting for the network to come up.

use crate::clock::Clock;
use crate::error::{BootstrapError, BootstrapResult};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// A single reachability check.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Probes by opening a TCP connection to the service.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Targets the host and port of a service URL.
    pub fn for_url(url: &str, timeout: Duration) -> BootstrapResult<Self> {
        let parsed = Url::parse(url).map_err(|e| BootstrapError::Config(format!("{url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| BootstrapError::Config(format!("{url}: missing host")))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| BootstrapError::Config(format!("{url}: missing port")))?;
        Ok(Self::new(format!("{host}:{port}"), timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn probe(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "probe failed");
                false
            }
            Err(_) => {
                debug!(addr = %self.addr, "probe timed out");
                false
            }
        }
    }
}

/// Polls `probe` every `poll_interval` until it succeeds or `timeout` elapses.
pub async fn wait_for_network(
    probe: &dyn Connectivity,
    clock: &dyn Clock,
    timeout: Duration,
    poll_interval: Duration,
) -> BootstrapResult<()> {
    let started = clock.now();
    loop {
        if probe.probe().await {
            info!("network reachable");
            return Ok(());
        }
        if clock.now().duration_since(started) >= timeout {
            return Err(BootstrapError::NetworkTimeout(timeout));
        }
        clock.sleep(poll_interval).await;
    }
}
