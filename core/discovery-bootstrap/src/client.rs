//! HTTP client for the registration service.

use crate::error::{BootstrapError, BootstrapResult};
use discovery_types::{
    ConfirmRequest, ConfirmResponse, ErrorResponse, RegisterRequest, RegisterResponse,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Talks to `/register` and `/confirm`. Each call is one bounded request.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http: Client,
    base_url: String,
}

impl DiscoveryClient {
    pub fn new(base_url: &str, timeout: Duration) -> BootstrapResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register(&self, request: &RegisterRequest) -> BootstrapResult<RegisterResponse> {
        self.post("/register", request).await
    }

    pub async fn confirm(&self, request: &ConfirmRequest) -> BootstrapResult<ConfirmResponse> {
        self.post("/confirm", request).await
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> BootstrapResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            return serde_json::from_str(&text).map_err(|e| BootstrapError::UnparseableBody {
                path: path.to_string(),
                status: status.as_u16(),
                detail: e.to_string(),
            });
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(match status {
            StatusCode::UNAUTHORIZED => BootstrapError::Authentication(message),
            StatusCode::NOT_FOUND => BootstrapError::NotFound(message),
            other => BootstrapError::Server {
                status: other.as_u16(),
                message,
            },
        })
    }
}
