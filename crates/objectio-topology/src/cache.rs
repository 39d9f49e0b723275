//! Process-wide read-mostly metadata caches (C7, §4.7).
//!
//! Readers take a shared lock and clone out an `Arc` snapshot; `set`
//! swaps in a new value under the exclusive lock and the old `Arc` is
//! freed only once the last reader holding it drops it, so a `set`
//! racing with an in-flight read never tears what the reader observes.

use crate::document::TopologyDocument;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cache for the immutable format document. `set` *copies* its argument
/// — the cache owns an independent clone, the caller keeps theirs.
#[derive(Default)]
pub struct FormatCache(RwLock<Option<Arc<objectio_format::FormatDocument>>>);

impl FormatCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An observable snapshot; do not retain across a concurrent `set`.
    #[must_use]
    pub fn get(&self) -> Option<Arc<objectio_format::FormatDocument>> {
        self.0.read().clone()
    }

    pub fn set(&self, format: &objectio_format::FormatDocument) {
        *self.0.write() = Some(Arc::new(format.clone()));
    }

    pub fn invalidate(&self) {
        *self.0.write() = None;
    }
}

/// Cache for the mutable topology document. `set` *takes ownership* of
/// its argument — the caller's working copy becomes the cache's copy.
#[derive(Default)]
pub struct TopologyCache(RwLock<Option<Arc<TopologyDocument>>>);

impl TopologyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Option<Arc<TopologyDocument>> {
        self.0.read().clone()
    }

    pub fn set(&self, topology: TopologyDocument) {
        *self.0.write() = Some(Arc::new(topology));
    }

    pub fn invalidate(&self) {
        *self.0.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn topology_cache_set_then_get() {
        let cache = TopologyCache::new();
        assert!(cache.get().is_none());
        cache.set(TopologyDocument::new(Uuid::new_v4()));
        assert!(cache.get().is_some());
        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn format_cache_copies_not_moves() {
        let cache = FormatCache::new();
        let format = objectio_format::FormatDocument::new(1, 4).unwrap();
        cache.set(&format);
        // Caller's `format` is still usable after `set`.
        assert_eq!(format.set_count(), 1);
        assert_eq!(cache.get().unwrap().deployment_id, format.deployment_id);
    }

    #[test]
    fn reader_snapshot_survives_concurrent_set() {
        let cache = TopologyCache::new();
        cache.set(TopologyDocument::new(Uuid::new_v4()));
        let snapshot = cache.get().unwrap();
        cache.set(TopologyDocument::new(Uuid::new_v4()));
        // The old Arc is still valid; it just isn't what `get()` returns anymore.
        assert_ne!(snapshot.deployment_id, cache.get().unwrap().deployment_id);
    }
}
