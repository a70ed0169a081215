//! Shared, immutable handler state.

use crate::config::{ConfigError, ServiceConfig};
use crate::error::ApiError;
use crate::notifier::{self, NotificationEvent, Notifier};
use chrono::Utc;
use discovery_crypto::{derive_device_key, seal_json, KdfParams, Psk};
use discovery_store::{Assignment, IdentityAllocator, RegistrationStore};
use discovery_types::ConfigPayload;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything the handlers need, built once from a validated [`ServiceConfig`].
pub struct AppState {
    psk: Psk,
    ssh_keys: Vec<String>,
    enrollment_credential: String,
    allocator: IdentityAllocator,
    store: RegistrationStore,
    notifier: Arc<dyn Notifier>,
    kdf: KdfParams,
    replay_window: Option<Duration>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        store: RegistrationStore,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        let deployment = &config.deployment;
        let allocator = IdentityAllocator::new(store.clone(), deployment.hostname_prefix.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self {
            psk: deployment.psk()?,
            ssh_keys: deployment.ssh_keys.clone(),
            enrollment_credential: deployment.enrollment_credential.clone(),
            allocator,
            store,
            notifier,
            kdf: KdfParams::default(),
            replay_window: config.security.replay_window(),
            started_at: Instant::now(),
        })
    }

    /// Overrides the scrypt cost. Devices must use the same parameters.
    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn psk(&self) -> &Psk {
        &self.psk
    }

    pub fn store(&self) -> &RegistrationStore {
        &self.store
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Rejects timestamps outside the replay window, when one is configured.
    pub fn check_freshness(&self, timestamp: Option<i64>) -> Result<(), ApiError> {
        let Some(window) = self.replay_window else {
            return Ok(());
        };
        let ts = timestamp.ok_or(ApiError::Authentication)?;
        let skew = Utc::now().timestamp().abs_diff(ts);
        if skew > window.as_secs() {
            return Err(ApiError::Authentication);
        }
        Ok(())
    }

    /// Assigns (or looks up) the device's hostname and seals its config
    /// payload under the device key. Blocking.
    pub fn assign_and_seal(
        &self,
        serial: &str,
        mac: &str,
    ) -> Result<(Assignment, String), ApiError> {
        let assignment = self.allocator.assign_or_lookup(serial, mac)?;
        let payload = ConfigPayload {
            hostname: assignment.record.hostname.clone(),
            ssh_keys: self.ssh_keys.clone(),
            enrollment_credential: self.enrollment_credential.clone(),
            issued_at: Utc::now().timestamp(),
        };
        let key = derive_device_key(&self.psk, serial, &self.kdf)?;
        let sealed = seal_json(&key, &payload)?;
        Ok((assignment, sealed))
    }

    pub fn notify(&self, event: NotificationEvent) {
        notifier::dispatch(self.notifier.clone(), event);
    }
}
