//! Device registration service.
//!
//! Usage:
//!   discovery-service --config /etc/discovery/config.toml
//!
//! Freshly imaged devices call `/register` once they reach the network and
//! receive a sequential hostname plus their encrypted bootstrap config.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::Parser;
use discovery_service::{build_router, notifier, AppState, ServiceConfig};
use discovery_store::RegistrationStore;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "discovery-service")]
#[command(about = "Registration service for device bootstrap")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Address to listen on, overriding deployment.bind_address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        config.deployment.bind_address = bind;
    }
    config.validate().context("Invalid configuration")?;

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Discovery service starting...");
    let store = RegistrationStore::open(&config.database.path).with_context(|| {
        format!("Failed to open database {}", config.database.path.display())
    })?;
    let notifier = notifier::from_config(&config.ntfy).context("Failed to build notifier")?;
    let state = AppState::new(&config, store, notifier).context("Failed to build service state")?;

    info!(
        prefix = %config.deployment.hostname_prefix,
        ssh_keys = config.deployment.ssh_keys.len(),
        replay_window_secs = ?config.security.replay_window_secs,
        ntfy = config.ntfy.enabled,
        "deployment loaded"
    );

    let app = build_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(config.deployment.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.deployment.bind_address))?;
    info!("HTTP API listening on {}", config.deployment.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Discovery service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
