//! ObjectIO Gateway - S3 API Gateway
//!
//! Wires the topology manager (C6), read caches (C7), placement ring (C8)
//! and object coordinator (C9) together and exposes them through the thin
//! S3 HTTP adapter (§4.11).

use anyhow::{Context, Result};
use clap::Parser;
use objectio_common::config::PlacementConfig;
use objectio_common::ErasureConfig;
use objectio_coordinator::{Coordinator, CoordinatorConfig};
use objectio_placement::PlacementManager;
use objectio_rpc::RpcClient;
use objectio_s3::AppState;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-gateway")]
#[command(about = "ObjectIO S3 Gateway")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/objectio/gateway.toml")]
    config: String,

    /// Listen address for the S3 HTTP surface
    #[arg(short, long, env = "OBJECTIO_GATEWAY_LISTEN")]
    listen: Option<String>,

    /// Disk paths holding this node's share of format.json/topology.json
    /// quorum state
    #[arg(long, env = "OBJECTIO_GATEWAY_METADATA_DISKS")]
    metadata_disks: Vec<String>,

    /// Local disk paths the coordinator can read and write directly,
    /// without going through the RPC shim
    #[arg(long, env = "OBJECTIO_GATEWAY_LOCAL_DISKS")]
    local_disks: Vec<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    listen: Option<String>,
    #[serde(default)]
    metadata_disks: Vec<String>,
    #[serde(default)]
    local_disks: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ObjectIO Gateway");
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
        .unwrap_or_else(|| "0.0.0.0:9000".to_string());
    let addr: SocketAddr = listen.parse().with_context(|| format!("invalid listen address: {listen}"))?;

    let metadata_disks: Vec<PathBuf> = if !args.metadata_disks.is_empty() {
        args.metadata_disks.iter().map(PathBuf::from).collect()
    } else {
        file_config.metadata_disks.iter().map(PathBuf::from).collect()
    };
    let local_disks: Vec<PathBuf> = if !args.local_disks.is_empty() {
        args.local_disks.iter().map(PathBuf::from).collect()
    } else {
        file_config.local_disks.iter().map(PathBuf::from).collect()
    };
    anyhow::ensure!(!metadata_disks.is_empty(), "at least one --metadata-disks path is required");

    let manager = objectio_topology::global::init(metadata_disks.iter().cloned().map(Some).collect())
        .context("topology manager already initialised")?;
    let topology = manager.load().context("failed to load cluster topology from quorum disks")?;
    info!(generation = topology.generation, "loaded cluster topology");

    let placement = Arc::new(PlacementManager::new());
    placement.rebuild_ring(&topology);

    let placement_for_callback = placement.clone();
    manager.set_callback(move |t| placement_for_callback.rebuild_ring(t));

    let placement_config = PlacementConfig::default();
    let coordinator_config = CoordinatorConfig {
        ec: ErasureConfig::EC_4_2,
        inline_threshold: placement_config.inline_threshold,
        verify_checksums: placement_config.verify_checksums,
    };
    let coordinator = Arc::new(Coordinator::new(placement, RpcClient::new(), coordinator_config, local_disks.clone()));

    let state = AppState {
        coordinator,
        bucket_root: local_disks.first().cloned(),
    };

    let app = objectio_s3::router(state).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "objectio-gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
