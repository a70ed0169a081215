//! Service configuration, loaded once from a TOML file at startup.
//!
//! ```toml
//! [deployment]
//! hostname_prefix = "sensor"
//! psk = "change-me-to-a-long-random-secret"
//! ssh_keys = ["ssh-ed25519 AAAA... admin@laptop"]
//! enrollment_credential = "tskey-auth-..."
//! bind_address = "0.0.0.0:8080"
//!
//! [database]
//! path = "data/registrations.db"
//!
//! [security]
//! replay_window_secs = 300
//!
//! [ntfy]
//! enabled = true
//! url = "https://ntfy.sh/fleet-bootstrap"
//! auth = { type = "bearer", token = "tk_..." }
//! ```

use discovery_crypto::Psk;
use discovery_types::validate_hostname_prefix;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Shortest PSK the service will start with.
pub const MIN_PSK_LEN: usize = 16;

const SSH_KEY_PREFIXES: &[&str] = &["ssh-", "ecdsa-", "sk-"];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub ntfy: NtfyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Reads and parses a TOML file. Call [`validate`](Self::validate) afterwards.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Checks every field; the service refuses to start on the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.deployment.validate()?;
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path is empty".into()));
        }
        if self.security.replay_window_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "security.replay_window_secs must be positive".into(),
            ));
        }
        self.ntfy.validate()
    }
}

/// Static deployment inputs: the PSK and the secrets handed to devices.
#[derive(Clone, Deserialize)]
pub struct DeploymentConfig {
    pub hostname_prefix: String,
    pub psk: String,
    #[serde(default)]
    pub ssh_keys: Vec<String>,
    pub enrollment_credential: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl DeploymentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_hostname_prefix(&self.hostname_prefix)
            .map_err(|e| ConfigError::Invalid(format!("deployment.hostname_prefix: {e}")))?;
        if self.psk.len() < MIN_PSK_LEN {
            return Err(ConfigError::Invalid(format!(
                "deployment.psk must be at least {MIN_PSK_LEN} bytes"
            )));
        }
        for (i, key) in self.ssh_keys.iter().enumerate() {
            let key = key.trim();
            if !SSH_KEY_PREFIXES.iter().any(|p| key.starts_with(p)) {
                return Err(ConfigError::Invalid(format!(
                    "deployment.ssh_keys[{i}] is not an SSH public key"
                )));
            }
        }
        if self.enrollment_credential.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "deployment.enrollment_credential is empty".into(),
            ));
        }
        Ok(())
    }

    pub fn psk(&self) -> Result<Psk, ConfigError> {
        Psk::new(self.psk.clone()).map_err(|e| ConfigError::Invalid(format!("deployment.psk: {e}")))
    }
}

impl fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentConfig")
            .field("hostname_prefix", &self.hostname_prefix)
            .field("psk", &"[REDACTED]")
            .field("ssh_keys", &self.ssh_keys.len())
            .field("enrollment_credential", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Optional hardening beyond the plain HMAC scheme.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// When set, requests must carry a signed `timestamp` within this many
    /// seconds of the service clock.
    #[serde(default)]
    pub replay_window_secs: Option<u64>,
}

impl SecurityConfig {
    pub fn replay_window(&self) -> Option<Duration> {
        self.replay_window_secs.map(Duration::from_secs)
    }
}

/// ntfy push notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NtfyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_ntfy_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub auth: NtfyAuth,
}

impl NtfyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        match self.url.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "ntfy.url must be an http(s) URL when ntfy is enabled".into(),
                ));
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("ntfy.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            priority: default_priority(),
            tags: Vec::new(),
            timeout_secs: default_ntfy_timeout(),
            auth: NtfyAuth::None,
        }
    }
}

#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NtfyAuth {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
}

impl fmt::Debug for NtfyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"[REDACTED]").finish(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG` and `--verbose`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/registrations.db")
}

fn default_priority() -> String {
    "default".to_string()
}

fn default_ntfy_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}
