//! Fire-and-forget push notifications about device lifecycle events.

use crate::config::{NtfyAuth, NtfyConfig};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint returned {0}")]
    Status(u16),

    #[error("invalid notifier configuration: {0}")]
    Config(String),
}

/// A lifecycle event worth telling an operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// First registration of a serial.
    Registered { serial: String, hostname: String },
    /// The device reported a successful bootstrap.
    Confirmed { serial: String, hostname: String },
    /// The device reported a failed bootstrap.
    Failed {
        serial: String,
        hostname: String,
        error: Option<String>,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::Confirmed { .. } => "confirmed",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn serial(&self) -> &str {
        match self {
            Self::Registered { serial, .. }
            | Self::Confirmed { serial, .. }
            | Self::Failed { serial, .. } => serial,
        }
    }

    pub fn hostname(&self) -> &str {
        match self {
            Self::Registered { hostname, .. }
            | Self::Confirmed { hostname, .. }
            | Self::Failed { hostname, .. } => hostname,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "New Device Registered",
            Self::Confirmed { .. } => "Device Bootstrap Complete",
            Self::Failed { .. } => "Device Bootstrap Failed",
        }
    }

    fn body(&self) -> String {
        let mut body = format!("Device: {}\nSerial: {}\n", self.hostname(), self.serial());
        match self {
            Self::Registered { .. } => body.push_str("Status: Bootstrapping..."),
            Self::Confirmed { .. } => body.push_str("Status: Bootstrap successful"),
            Self::Failed { error, .. } => {
                body.push_str("Status: Bootstrap failed\n");
                body.push_str(&format!("Error: {}", error.as_deref().unwrap_or("Unknown error")));
            }
        }
        body
    }

    fn tags(&self) -> &'static [&'static str] {
        match self {
            Self::Registered { .. } => &["registration"],
            Self::Confirmed { .. } => &["white_check_mark", "bootstrap"],
            Self::Failed { .. } => &["x", "bootstrap", "error"],
        }
    }
}

/// Delivers notification events somewhere outside the service.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifierError>;
}

/// Discards every event; used when notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: &NotificationEvent) -> Result<(), NotifierError> {
        Ok(())
    }
}

/// Posts plain-text messages to an ntfy topic URL.
pub struct NtfyNotifier {
    client: Client,
    url: String,
    priority: String,
    tags: Vec<String>,
    auth: NtfyAuth,
}

impl NtfyNotifier {
    pub fn new(config: &NtfyConfig) -> Result<Self, NotifierError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| NotifierError::Config("ntfy.url is not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            priority: config.priority.clone(),
            tags: config.tags.clone(),
            auth: config.auth.clone(),
        })
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifierError> {
        let priority = match event {
            NotificationEvent::Failed { .. } => "high",
            _ => self.priority.as_str(),
        };
        let tags: Vec<&str> = event
            .tags()
            .iter()
            .copied()
            .chain(self.tags.iter().map(String::as_str))
            .collect();

        let mut request = self
            .client
            .post(&self.url)
            .header("Title", event.title())
            .header("Priority", priority)
            .header("Tags", tags.join(","))
            .body(event.body());
        request = match &self.auth {
            NtfyAuth::None => request,
            NtfyAuth::Basic { username, password } => request.basic_auth(username, Some(password)),
            NtfyAuth::Bearer { token } => request.bearer_auth(token),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotifierError::Status(response.status().as_u16()));
        }
        debug!(event = event.kind(), serial = event.serial(), "notification sent");
        Ok(())
    }
}

/// Builds the notifier selected by configuration.
pub fn from_config(config: &NtfyConfig) -> Result<Arc<dyn Notifier>, NotifierError> {
    if config.enabled {
        Ok(Arc::new(NtfyNotifier::new(config)?))
    } else {
        Ok(Arc::new(NoopNotifier))
    }
}

/// Sends `event` on a detached task. Failures are logged and dropped.
pub fn dispatch(notifier: Arc<dyn Notifier>, event: NotificationEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&event).await {
            warn!(
                event = event.kind(),
                serial = event.serial(),
                error = %e,
                "notification failed"
            );
        }
    })
}
