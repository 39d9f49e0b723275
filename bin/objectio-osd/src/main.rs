//! ObjectIO OSD - Object Storage Daemon
//!
//! Owns a set of local disks and serves the distributed RPC shim (C10) so
//! that coordinators elsewhere in the cluster can read and write chunks and
//! xl.meta documents on them.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-osd")]
#[command(about = "ObjectIO Object Storage Daemon")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/objectio/osd.toml")]
    config: String,

    /// Listen address for the RPC surface
    #[arg(short, long, env = "OBJECTIO_OSD_LISTEN")]
    listen: Option<String>,

    /// Disk paths this OSD owns
    #[arg(long, env = "OBJECTIO_OSD_DISKS")]
    disks: Vec<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Heartbeat interval in seconds
    #[arg(long, default_value_t = 30)]
    heartbeat_secs: u64,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    listen: Option<String>,
    #[serde(default)]
    disks: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ObjectIO OSD");
    info!(config = %args.config, "config file");

    let file_config = config::Config::builder()
        .add_source(config::File::with_name(&args.config).required(false))
        .build()
        .ok()
        .and_then(|c| c.try_deserialize::<FileConfig>().ok())
        .unwrap_or_default();

    let listen = args
        .listen
        .or(file_config.listen)
        .unwrap_or_else(|| "0.0.0.0:9100".to_string());
    let addr: SocketAddr = listen.parse().with_context(|| format!("invalid listen address: {listen}"))?;

    let disks: Vec<PathBuf> = if !args.disks.is_empty() {
        args.disks.iter().map(PathBuf::from).collect()
    } else {
        file_config.disks.iter().map(PathBuf::from).collect()
    };
    if disks.is_empty() {
        warn!("no disks configured; this OSD will reject every chunk/xl.meta request");
    }
    for disk in &disks {
        std::fs::create_dir_all(disk).with_context(|| format!("failed to prepare disk root {}", disk.display()))?;
        info!(disk = %disk.display(), "disk root ready");
    }

    tokio::spawn(heartbeat(disks.clone(), Duration::from_secs(args.heartbeat_secs)));

    let app = objectio_rpc::router();
    let listener = TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "objectio-osd listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically confirms every configured disk root is still reachable.
/// There is no cluster registry to report health to in this deployment;
/// the heartbeat surfaces disk loss in the local log stream instead.
async fn heartbeat(disks: Vec<PathBuf>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        for disk in &disks {
            match std::fs::metadata(disk) {
                Ok(meta) if meta.is_dir() => {
                    tracing::debug!(disk = %disk.display(), "heartbeat: disk ok");
                }
                Ok(_) => warn!(disk = %disk.display(), "heartbeat: path is not a directory"),
                Err(e) => warn!(disk = %disk.display(), error = %e, "heartbeat: disk unreachable"),
            }
        }
    }
}
