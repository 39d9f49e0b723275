//! ObjectIO CLI - Admin Command Line Interface
//!
//! Operator surface for cluster bootstrap and topology evolution (§4.12):
//! `format create`/`format show`, `topology init`/`add-pool`/`add-set`/
//! `mark-draining`/`mark-removed`/`show`, and `endpoint expand`. These
//! commands operate directly on disk-root paths rather than through a
//! running service, since format/topology state is quorum-replicated
//! filesystem state, not an RPC-addressable resource.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use objectio_endpoint::{expand_endpoints, group_into_sets};
use objectio_format::FormatDocument;
use objectio_topology::document::{DiskEntry, SetState, TopologyDocument};
use objectio_topology::quorum;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-cli")]
#[command(about = "ObjectIO Admin CLI")]
#[command(version)]
struct Args {
    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Format document operations
    Format {
        #[command(subcommand)]
        action: FormatCommands,
    },
    /// Topology document operations
    Topology {
        #[command(subcommand)]
        action: TopologyCommands,
    },
    /// Endpoint expansion helpers
    Endpoint {
        #[command(subcommand)]
        action: EndpointCommands,
    },
}

#[derive(Subcommand, Debug)]
enum FormatCommands {
    /// Create a fresh format document from endpoint patterns and write
    /// it to every resolved local disk root.
    Create {
        /// Endpoint patterns, optionally with `{A...B}` brace ranges.
        endpoints: Vec<String>,
        /// Disks per erasure set.
        #[arg(long)]
        disks_per_set: usize,
    },
    /// Show the format document stored under a disk root.
    Show {
        /// Disk root containing `.buckets.sys/format.json`.
        disk_root: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum TopologyCommands {
    /// Derive a generation-1 topology from an existing format document
    /// and quorum-persist it to the same disk roots.
    Init {
        /// Local disk root paths.
        disks: Vec<PathBuf>,
    },
    /// Append an empty pool.
    AddPool {
        /// Local disk root paths holding the quorum-replicated topology.
        #[arg(long)]
        disks: Vec<PathBuf>,
    },
    /// Append an `ACTIVE` set with freshly generated disk UUIDs.
    AddSet {
        #[arg(long)]
        disks: Vec<PathBuf>,
        #[arg(long)]
        pool: u32,
        /// Number of disk slots in the new set.
        #[arg(long)]
        set_disks: usize,
    },
    /// `ACTIVE -> DRAINING` for one set.
    MarkDraining {
        #[arg(long)]
        disks: Vec<PathBuf>,
        #[arg(long)]
        pool: u32,
        #[arg(long)]
        set: u32,
    },
    /// `DRAINING -> REMOVED` for one set.
    MarkRemoved {
        #[arg(long)]
        disks: Vec<PathBuf>,
        #[arg(long)]
        pool: u32,
        #[arg(long)]
        set: u32,
    },
    /// Print the quorum-consensus topology.
    Show {
        #[arg(long)]
        disks: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum EndpointCommands {
    /// Expand a brace pattern and group the result into erasure sets.
    Expand {
        pattern: String,
        #[arg(long)]
        disks_per_set: Option<usize>,
    },
}

fn roots_to_disks(disks: &[PathBuf]) -> Vec<Option<PathBuf>> {
    disks.iter().cloned().map(Some).collect()
}

fn mutate_and_report(disks: &[PathBuf], f: impl FnOnce(&mut TopologyDocument) -> objectio_common::Result<()>) -> Result<()> {
    let roots = roots_to_disks(disks);
    let mut topology = quorum::load_quorum(&roots).context("failed to reach read quorum on the existing topology")?;
    f(&mut topology)?;
    quorum::save_quorum(&roots, &topology).context("failed to reach write quorum persisting the new topology")?;
    println!("generation {} -> {}", topology.generation - 1, topology.generation);
    print_topology(&topology);
    Ok(())
}

fn print_topology(topology: &TopologyDocument) {
    println!("deployment_id: {}", topology.deployment_id);
    println!("generation:    {}", topology.generation);
    println!("vnode_factor:  {}", topology.vnode_factor);
    for pool in &topology.pools {
        println!("pool {}:", pool.idx);
        for set in &pool.sets {
            let state = match set.state {
                SetState::Active => "active",
                SetState::Draining => "draining",
                SetState::Removed => "removed",
            };
            println!("  set {} [{state}] disks={}", set.idx, set.disks.len());
            for disk in &set.disks {
                println!("    {} endpoint={:?} capacity={}", disk.uuid, disk.endpoint, disk.capacity);
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Commands::Format { action } => match action {
            FormatCommands::Create { endpoints, disks_per_set } => {
                let expanded = expand_endpoints(&endpoints).context("endpoint expansion failed")?;
                let sets = group_into_sets(expanded, disks_per_set).context("grouping endpoints into sets failed")?;
                let format = FormatDocument::new(sets.len(), disks_per_set).context("FormatDocument::new failed")?;
                let bytes = format.to_bytes()?;

                for (set_idx, set) in sets.iter().enumerate() {
                    for (disk_idx, endpoint) in set.iter().enumerate() {
                        if let objectio_endpoint::Endpoint::Path(path) = endpoint {
                            let root = PathBuf::from(path);
                            let path = objectio_storage::layout::format_path(&root);
                            objectio_storage::write_atomic(&path, &bytes)
                                .with_context(|| format!("writing format.json to set {set_idx} disk {disk_idx}"))?;
                        } else {
                            println!(
                                "set {set_idx} disk {disk_idx} ({endpoint}): remote endpoint, skipping local format.json write"
                            );
                        }
                    }
                }
                println!("deployment_id: {}", format.deployment_id);
                println!("sets: {} disks_per_set: {}", format.set_count(), format.disks_per_set());
            }
            FormatCommands::Show { disk_root } => {
                let path = objectio_storage::layout::format_path(&disk_root);
                let bytes = objectio_storage::read_all(&path).with_context(|| format!("reading {}", path.display()))?;
                let format = FormatDocument::parse(&bytes)?;
                println!("deployment_id:     {}", format.deployment_id);
                println!("erasure_version:   {}", format.erasure_version);
                println!("distribution_algo: {}", format.distribution_algo);
                println!("sets x disks:      {} x {}", format.set_count(), format.disks_per_set());
            }
        },
        Commands::Topology { action } => match action {
            TopologyCommands::Init { disks } => {
                anyhow::ensure!(!disks.is_empty(), "topology init requires at least one disk root");
                let first = objectio_storage::layout::format_path(&disks[0]);
                let bytes = objectio_storage::read_all(&first).context("no format.json found; run `format create` first")?;
                let format = FormatDocument::parse(&bytes)?;
                let topology = TopologyDocument::from_format(&format);
                let roots = roots_to_disks(&disks);
                quorum::save_quorum(&roots, &topology).context("failed to reach write quorum persisting the initial topology")?;
                print_topology(&topology);
            }
            TopologyCommands::AddPool { disks } => mutate_and_report(&disks, |t| {
                t.add_pool();
                Ok(())
            })?,
            TopologyCommands::AddSet { disks, pool, set_disks } => mutate_and_report(&disks, |t| {
                let slots = (0..set_disks).map(|_| DiskEntry::new(uuid::Uuid::new_v4())).collect();
                t.add_set(pool, slots)
            })?,
            TopologyCommands::MarkDraining { disks, pool, set } => {
                mutate_and_report(&disks, |t| t.mark_draining(pool, set))?;
            }
            TopologyCommands::MarkRemoved { disks, pool, set } => {
                mutate_and_report(&disks, |t| t.mark_removed(pool, set))?;
            }
            TopologyCommands::Show { disks } => {
                let roots = roots_to_disks(&disks);
                let topology = quorum::load_quorum(&roots).context("failed to reach read quorum")?;
                print_topology(&topology);
            }
        },
        Commands::Endpoint { action } => match action {
            EndpointCommands::Expand { pattern, disks_per_set } => {
                let expanded = expand_endpoints(&[pattern]).context("endpoint expansion failed")?;
                if let Some(n) = disks_per_set {
                    let sets = group_into_sets(expanded, n).context("grouping into sets failed")?;
                    for (i, set) in sets.iter().enumerate() {
                        let rendered: Vec<String> = set.iter().map(ToString::to_string).collect();
                        println!("set {i}: [{}]", rendered.join(", "));
                    }
                } else {
                    for endpoint in &expanded {
                        println!("{endpoint}");
                    }
                }
            }
        },
    }

    Ok(())
}
