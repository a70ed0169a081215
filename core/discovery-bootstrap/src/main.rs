//! Device bootstrap client.
//!
//! Usage:
//!   discovery-bootstrap http://discovery.local:8080 --psk-file /etc/discovery/psk
//!
//! Logs go to stderr; on success a `KEY=value` block is printed on stdout.

use std::{fs, path::PathBuf, sync::Arc, time::Duration};
use anyhow::{bail, Context, Result};
use clap::Parser;
use discovery_bootstrap::{
    BootstrapSettings, Bootstrapper, DeviceIdentity, DiscoveryClient, FileApplier, RetryPolicy,
    TcpProbe,
};
use discovery_crypto::Psk;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "discovery-bootstrap")]
#[command(about = "Register this device with the discovery service and apply its config")]
struct Args {
    /// Base URL of the discovery service
    server_url: String,

    /// Pre-shared key
    #[arg(long, conflicts_with = "psk_file")]
    psk: Option<String>,

    /// File containing the pre-shared key
    #[arg(long)]
    psk_file: Option<PathBuf>,

    /// Registration attempts before giving up
    #[arg(long, default_value = "5")]
    retries: u32,

    /// Seconds between registration attempts
    #[arg(long, default_value = "10")]
    retry_delay_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Seconds to wait for the network before failing
    #[arg(long, default_value = "300")]
    network_timeout_secs: u64,

    /// Seconds between connectivity probes
    #[arg(long, default_value = "5")]
    poll_interval_secs: u64,

    /// Directory the config files are written to
    #[arg(long, default_value = "/var/lib/discovery-bootstrap")]
    output_dir: PathBuf,

    /// Override the detected serial number
    #[arg(long)]
    serial: Option<String>,

    /// Override the detected MAC address
    #[arg(long)]
    mac: Option<String>,

    /// Root under which /sys, /proc and /etc are read
    #[arg(long, default_value = "/")]
    sysfs_root: PathBuf,

    /// Include a signed timestamp in every request
    #[arg(long)]
    timestamped: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let psk = load_psk(&args)?;
    let identity = resolve_identity(&args)?;
    info!(serial = %identity.serial, mac = %identity.mac, "starting bootstrap");

    let mut settings = BootstrapSettings::new(psk);
    settings.register_retry =
        RetryPolicy::new(args.retries, Duration::from_secs(args.retry_delay_secs));
    settings.network_timeout = Duration::from_secs(args.network_timeout_secs);
    settings.poll_interval = Duration::from_secs(args.poll_interval_secs);
    settings.timestamped = args.timestamped;

    let timeout = Duration::from_secs(args.timeout_secs);
    let client =
        DiscoveryClient::new(&args.server_url, timeout).context("Failed to build HTTP client")?;
    let probe = TcpProbe::for_url(&args.server_url, Duration::from_secs(5))?;
    let applier = FileApplier::new(&args.output_dir);

    let bootstrapper = Bootstrapper::new(client, settings, Arc::new(probe), Arc::new(applier));
    let report = bootstrapper.run(&identity).await.context("Bootstrap failed")?;

    let credential = &report.applied.enrollment_credential;
    let preview: String = credential.chars().take(8).collect();
    info!(
        hostname = %report.hostname,
        ssh_keys = report.applied.ssh_keys_count,
        credential = %format!("{preview}..."),
        confirmed = report.confirmed,
        "bootstrap complete"
    );
    print!("{}", report.applied.render_block());
    Ok(())
}

fn load_psk(args: &Args) -> Result<Psk> {
    let raw = match (&args.psk, &args.psk_file) {
        (Some(psk), _) => psk.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read PSK file {}", path.display()))?,
        (None, None) => bail!("one of --psk or --psk-file is required"),
    };
    Ok(Psk::new(raw.trim().to_string())?)
}

fn resolve_identity(args: &Args) -> Result<DeviceIdentity> {
    let serial = match &args.serial {
        Some(serial) => serial.clone(),
        None => discovery_bootstrap::detect_serial(&args.sysfs_root)?,
    };
    let mac = match &args.mac {
        Some(mac) => mac.clone(),
        None => discovery_bootstrap::detect_mac(&args.sysfs_root)?,
    };
    Ok(DeviceIdentity::new(serial, mac)?)
}
