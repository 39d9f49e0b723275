//! Atomic ring rebuild-and-swap (§4.8 rebuild policy).

use crate::ring::{PlacementRing, PlacementResult};
use objectio_common::Result;
use objectio_topology::TopologyDocument;
use parking_lot::RwLock;
use std::sync::Arc;

/// Holds the current ring behind a readers-writer lock. `rebuild_ring`
/// builds the replacement off to the side and swaps it in atomically;
/// concurrent lookups keep observing the old ring until the swap lands,
/// and the old ring is freed once its last reader drops it.
#[derive(Default)]
pub struct PlacementManager(RwLock<Option<Arc<PlacementRing>>>);

impl PlacementManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build (or rebuild) the ring from `topology` and install it.
    pub fn rebuild_ring(&self, topology: &TopologyDocument) {
        let ring = Arc::new(PlacementRing::build(topology));
        *self.0.write() = Some(ring);
    }

    /// Look up the owning erasure set. Fails `UNSUPPORTED` if no ring has
    /// been built yet, or if the ring has no active sets.
    pub fn place(&self, bucket: &str, object: &str) -> Result<PlacementResult> {
        let ring = self
            .0
            .read()
            .clone()
            .ok_or_else(|| objectio_common::Error::unsupported("placement ring not built"))?;
        ring.place(bucket, object)
    }
}
