//! HTTP-facing error taxonomy.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use discovery_crypto::CryptoError;
use discovery_store::StoreError;
use discovery_types::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Errors a handler can return.
///
/// Only authentication, malformed-request and not-found failures are visible to
/// callers; everything else collapses into a generic 500.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing signature, or a timestamp outside the replay window.
    #[error("Invalid signature")]
    Authentication,

    #[error("{0}")]
    MalformedRequest(String),

    /// No `registered` record matches the serial/hostname pair.
    #[error("Device not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedRequest(rejection.body_text())
    }
}

impl From<discovery_types::Error> for ApiError {
    fn from(err: discovery_types::Error) -> Self {
        Self::MalformedRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}
