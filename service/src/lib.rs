//! Device registration service.
//!
//! Serves the bootstrap protocol over HTTP/JSON:
//! - `POST /register`: verify the device signature, assign or look up its
//!   hostname, return the config payload sealed under the device key
//! - `POST /confirm`: record the outcome the device reports
//! - `GET /health`, `GET /stats`: unauthenticated liveness and counters

pub mod config;
pub mod error;
pub mod notifier;
pub mod state;

pub use config::{ConfigError, ServiceConfig};
pub use error::ApiError;
pub use notifier::{NoopNotifier, NotificationEvent, Notifier, NtfyNotifier};
pub use state::AppState;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use discovery_crypto::{confirmation_message, registration_message, verify_signature};
use discovery_types::{
    BootstrapOutcome, ConfirmRequest, ConfirmResponse, DeviceStatus, HealthResponse,
    RegisterRequest, RegisterResponse, StatsResponse,
};
use std::sync::Arc;
use tracing::{info, warn};

async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    state.check_freshness(request.timestamp).inspect_err(|_| {
        warn!(serial = %request.serial, "registration rejected: stale or missing timestamp");
    })?;
    let message = registration_message(&request.serial, &request.mac, request.timestamp);
    if !verify_signature(state.psk(), &message, &request.signature) {
        warn!(serial = %request.serial, "registration rejected: invalid signature");
        return Err(ApiError::Authentication);
    }

    let worker = state.clone();
    let (serial, mac) = (request.serial.clone(), request.mac.clone());
    let (assignment, encrypted_config) =
        tokio::task::spawn_blocking(move || worker.assign_and_seal(&serial, &mac)).await??;

    let hostname = assignment.record.hostname.clone();
    let message = if assignment.newly_assigned {
        info!(serial = %request.serial, hostname = %hostname, "device registered");
        state.notify(NotificationEvent::Registered {
            serial: request.serial.clone(),
            hostname: hostname.to_string(),
        });
        "Device registered successfully"
    } else {
        info!(serial = %request.serial, hostname = %hostname, "device re-registered");
        "Device already registered"
    };

    Ok(Json(RegisterResponse {
        hostname,
        encrypted_config,
        success: true,
        message: message.to_string(),
    }))
}

async fn confirm_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    state.check_freshness(request.timestamp).inspect_err(|_| {
        warn!(serial = %request.serial, "confirmation rejected: stale or missing timestamp");
    })?;
    let message = confirmation_message(&request.serial, &request.hostname, request.timestamp);
    if !verify_signature(state.psk(), &message, &request.signature) {
        warn!(serial = %request.serial, "confirmation rejected: invalid signature");
        return Err(ApiError::Authentication);
    }

    let outcome = BootstrapOutcome::from_reported(&request.status);
    let store = state.store().clone();
    let (serial, hostname, error_message) = (
        request.serial.clone(),
        request.hostname.clone(),
        request.error_message.clone(),
    );
    let record = tokio::task::spawn_blocking(move || {
        store.confirm(&serial, &hostname, outcome, error_message.as_deref(), Utc::now())
    })
    .await?
    .inspect_err(|e| {
        warn!(
            serial = %request.serial,
            hostname = %request.hostname,
            error = %e,
            "confirmation rejected"
        );
    })?;

    let event = match record.status {
        DeviceStatus::Failed => {
            warn!(
                serial = %record.serial,
                hostname = %record.hostname,
                error = record.error_message.as_deref().unwrap_or("unknown"),
                "device reported bootstrap failure"
            );
            NotificationEvent::Failed {
                serial: record.serial.clone(),
                hostname: record.hostname.to_string(),
                error: record.error_message.clone(),
            }
        }
        _ => {
            info!(serial = %record.serial, hostname = %record.hostname, "device confirmed");
            NotificationEvent::Confirmed {
                serial: record.serial.clone(),
                hostname: record.hostname.to_string(),
            }
        }
    };
    state.notify(event);

    let message = match outcome {
        BootstrapOutcome::Success => "Bootstrap confirmed",
        BootstrapOutcome::Failure => "Bootstrap failure recorded",
    };
    Ok(Json(ConfirmResponse {
        success: true,
        message: message.to_string(),
        status: record.status,
    }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store = state.store().clone();
    let reachable = matches!(
        tokio::task::spawn_blocking(move || store.ping()).await,
        Ok(Ok(()))
    );
    let (code, status, database) = if reachable {
        (StatusCode::OK, "healthy", "ok")
    } else {
        warn!("health check failed: store unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "unreachable")
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            database: database.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.uptime().as_secs_f64(),
        }),
    )
}

async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let store = state.store().clone();
    let stats = tokio::task::spawn_blocking(move || store.stats()).await??;
    Ok(Json(stats.into()))
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/confirm", post(confirm_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}
