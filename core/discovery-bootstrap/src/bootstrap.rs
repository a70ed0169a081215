//! The device-side bootstrap sequence:
//! `WaitForNetwork -> Register (retry) -> ApplyConfig -> Confirm (best effort) -> Done`.

use crate::apply::{AppliedConfig, ConfigApplier};
use crate::client::DiscoveryClient;
use crate::clock::{Clock, SystemClock};
use crate::device::DeviceIdentity;
use crate::error::{BootstrapError, BootstrapResult};
use crate::network::{wait_for_network, Connectivity};
use crate::retry::{retry_with_policy, RetryPolicy};
use discovery_crypto::{
    confirmation_message, derive_device_key, open_json, registration_message, sign, KdfParams, Psk,
};
use discovery_types::{
    BootstrapOutcome, ConfigPayload, ConfirmRequest, Hostname, RegisterRequest, RegisterResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Tunables for one bootstrap run.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub psk: Psk,
    pub kdf: KdfParams,
    pub register_retry: RetryPolicy,
    pub confirm_retry: RetryPolicy,
    pub network_timeout: Duration,
    pub poll_interval: Duration,
    /// Sign and send a unix timestamp with every request.
    pub timestamped: bool,
}

impl BootstrapSettings {
    pub fn new(psk: Psk) -> Self {
        Self {
            psk,
            kdf: KdfParams::default(),
            register_retry: RetryPolicy::default(),
            confirm_retry: RetryPolicy::new(3, Duration::from_secs(5)),
            network_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
            timestamped: false,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub hostname: Hostname,
    pub applied: AppliedConfig,
    /// Whether the service acknowledged the confirmation.
    pub confirmed: bool,
}

pub struct Bootstrapper {
    client: DiscoveryClient,
    settings: BootstrapSettings,
    connectivity: Arc<dyn Connectivity>,
    applier: Arc<dyn ConfigApplier>,
    clock: Arc<dyn Clock>,
}

impl Bootstrapper {
    pub fn new(
        client: DiscoveryClient,
        settings: BootstrapSettings,
        connectivity: Arc<dyn Connectivity>,
        applier: Arc<dyn ConfigApplier>,
    ) -> Self {
        Self {
            client,
            settings,
            connectivity,
            applier,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs the whole sequence once.
    ///
    /// Network timeout, exhausted registration retries, authentication
    /// rejection and decryption or apply failures are fatal. A failed
    /// confirmation is not: the report says `confirmed: false`.
    pub async fn run(&self, identity: &DeviceIdentity) -> BootstrapResult<BootstrapReport> {
        info!(server = %self.client.base_url(), "waiting for network");
        wait_for_network(
            self.connectivity.as_ref(),
            self.clock.as_ref(),
            self.settings.network_timeout,
            self.settings.poll_interval,
        )
        .await?;

        let response = self.register(identity).await?;
        let hostname = response.hostname.clone();
        info!(hostname = %hostname, "registration accepted");

        match self.apply(identity, &response).await {
            Ok(applied) => {
                let confirmed = self
                    .confirm(identity, hostname.as_str(), BootstrapOutcome::Success, None)
                    .await;
                Ok(BootstrapReport {
                    hostname,
                    applied,
                    confirmed,
                })
            }
            Err(e) => {
                if e.is_decryption_failure() {
                    error!("config payload did not decrypt; PSK or serial mismatch");
                } else {
                    error!(error = %e, "applying config failed");
                }
                self.confirm(
                    identity,
                    hostname.as_str(),
                    BootstrapOutcome::Failure,
                    Some(e.to_string()),
                )
                .await;
                Err(e)
            }
        }
    }

    fn timestamp(&self) -> Option<i64> {
        self.settings
            .timestamped
            .then(|| self.clock.unix_timestamp())
    }

    async fn register(&self, identity: &DeviceIdentity) -> BootstrapResult<RegisterResponse> {
        retry_with_policy(
            &self.settings.register_retry,
            self.clock.as_ref(),
            "register",
            |attempt| async move {
                let timestamp = self.timestamp();
                let message = registration_message(&identity.serial, &identity.mac, timestamp);
                let request = RegisterRequest {
                    serial: identity.serial.clone(),
                    mac: identity.mac.clone(),
                    signature: sign(&self.settings.psk, &message),
                    timestamp,
                };
                info!(attempt, serial = %identity.serial, "registering");
                self.client.register(&request).await
            },
        )
        .await
    }

    async fn apply(
        &self,
        identity: &DeviceIdentity,
        response: &RegisterResponse,
    ) -> BootstrapResult<AppliedConfig> {
        let psk = self.settings.psk.clone();
        let serial = identity.serial.clone();
        let kdf = self.settings.kdf;
        let key = tokio::task::spawn_blocking(move || derive_device_key(&psk, &serial, &kdf))
            .await
            .map_err(|e| BootstrapError::Task(e.to_string()))??;

        let payload: ConfigPayload = open_json(&key, &response.encrypted_config)?;
        if payload.hostname != response.hostname {
            return Err(BootstrapError::InvalidResponse(format!(
                "payload hostname {} does not match assigned {}",
                payload.hostname, response.hostname
            )));
        }
        self.applier.apply(&payload)
    }

    async fn confirm(
        &self,
        identity: &DeviceIdentity,
        hostname: &str,
        outcome: BootstrapOutcome,
        error_message: Option<String>,
    ) -> bool {
        let result = retry_with_policy(
            &self.settings.confirm_retry,
            self.clock.as_ref(),
            "confirm",
            |_| {
                let error_message = error_message.clone();
                async move {
                    let timestamp = self.timestamp();
                    let message = confirmation_message(&identity.serial, hostname, timestamp);
                    let request = ConfirmRequest {
                        serial: identity.serial.clone(),
                        hostname: hostname.to_string(),
                        signature: sign(&self.settings.psk, &message),
                        status: outcome.as_str().to_string(),
                        error_message,
                        timestamp,
                    };
                    self.client.confirm(&request).await
                }
            },
        )
        .await;

        match result {
            Ok(response) => {
                info!(hostname, status = %response.status, "confirmation recorded");
                true
            }
            Err(e) => {
                warn!(hostname, error = %e, "confirmation failed; continuing");
                false
            }
        }
    }
}
