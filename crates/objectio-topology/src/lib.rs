//! Cluster topology: document model (C4), quorum persistence (C5),
//! serialised mutation (C6), and read-mostly caching (C7).

pub mod cache;
pub mod document;
pub mod manager;
pub mod quorum;

pub use cache::{FormatCache, TopologyCache};
pub use document::{DiskEntry, ErasureSet, Pool, SetState, TopologyDocument, DEFAULT_VNODE_FACTOR, TOPOLOGY_VERSION};
pub use manager::{global, TopologyManager};
pub use quorum::{load_quorum, save_quorum};
