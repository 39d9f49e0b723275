//! Serialised, coordinated topology evolution (C6, §4.6).

use crate::cache::TopologyCache;
use crate::document::{DiskEntry, TopologyDocument};
use crate::quorum;
use objectio_common::{Error, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;

type ChangeCallback = dyn Fn(&TopologyDocument) + Send + Sync;

/// Owns the configured disk-path list and serialises every mutation
/// through a single mutex so that any caller observing generation
/// `g + 1` has also observed every prior mutation.
pub struct TopologyManager {
    disk_roots: Vec<Option<PathBuf>>,
    cache: TopologyCache,
    /// Serialises the load-clone-mutate-persist-install sequence.
    serialize: Mutex<()>,
    callback: Mutex<Option<Box<ChangeCallback>>>,
}

impl TopologyManager {
    #[must_use]
    pub fn new(disk_roots: Vec<Option<PathBuf>>) -> Self {
        Self {
            disk_roots,
            cache: TopologyCache::new(),
            serialize: Mutex::new(()),
            callback: Mutex::new(None),
        }
    }

    /// Quorum-read the topology from disk and install it into the cache.
    pub fn load(&self) -> Result<Arc<TopologyDocument>> {
        let _guard = self.serialize.lock();
        let topology = quorum::load_quorum(&self.disk_roots)?;
        self.cache.set(topology);
        Ok(self.cache.get().expect("just set"))
    }

    /// A thread-safe snapshot of the currently cached topology.
    pub fn get(&self) -> Result<Arc<TopologyDocument>> {
        self.cache
            .get()
            .ok_or_else(|| Error::invalid_argument("topology manager: no topology loaded; call load() first"))
    }

    /// Register the callback invoked with the newly visible topology
    /// after every successful mutation. Replaces any previous callback.
    pub fn set_callback(&self, callback: impl Fn(&TopologyDocument) + Send + Sync + 'static) {
        *self.callback.lock() = Some(Box::new(callback));
    }

    pub fn add_pool(&self) -> Result<Arc<TopologyDocument>> {
        self.mutate(|t| {
            t.add_pool();
            Ok(())
        })
    }

    pub fn add_set(&self, pool_idx: u32, disks: Vec<DiskEntry>) -> Result<Arc<TopologyDocument>> {
        self.mutate(|t| t.add_set(pool_idx, disks))
    }

    pub fn mark_draining(&self, pool_idx: u32, set_idx: u32) -> Result<Arc<TopologyDocument>> {
        self.mutate(|t| t.mark_draining(pool_idx, set_idx))
    }

    pub fn mark_removed(&self, pool_idx: u32, set_idx: u32) -> Result<Arc<TopologyDocument>> {
        self.mutate(|t| t.mark_removed(pool_idx, set_idx))
    }

    /// The discipline shared by every mutator (§4.6):
    /// snapshot -> clone -> mutate -> persist -> install -> notify.
    /// If persisting fails the cache is left untouched; callers observe
    /// the pre-mutation state and may retry.
    fn mutate(&self, f: impl FnOnce(&mut TopologyDocument) -> Result<()>) -> Result<Arc<TopologyDocument>> {
        let _guard = self.serialize.lock();

        let current = self.get()?;
        let mut working = (*current).clone();
        f(&mut working)?;

        quorum::save_quorum(&self.disk_roots, &working)?;

        let visible = working.clone();
        self.cache.set(working);
        let installed = self.cache.get().expect("just set");

        if let Some(callback) = self.callback.lock().as_ref() {
            callback(&visible);
        }
        Ok(installed)
    }
}

static GLOBAL: OnceLock<Mutex<Option<Arc<TopologyManager>>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Arc<TopologyManager>>> {
    GLOBAL.get_or_init(|| Mutex::new(None))
}

/// Process-wide singleton lifecycle, per §4.6 / §4.9 design note.
pub mod global {
    use super::{Arc, Error, Result, TopologyManager, slot};
    use std::path::PathBuf;

    /// Initialise the singleton with the node's local disk-path list.
    /// Fails with `INVALID_ARG` on double-init.
    pub fn init(disk_roots: Vec<Option<PathBuf>>) -> Result<Arc<TopologyManager>> {
        let mut slot = slot().lock();
        if slot.is_some() {
            return Err(Error::invalid_argument("topology manager: already initialised"));
        }
        let manager = Arc::new(TopologyManager::new(disk_roots));
        *slot = Some(manager.clone());
        Ok(manager)
    }

    /// Tear down the singleton so `init` may be called again.
    pub fn cleanup() {
        *slot().lock() = None;
    }

    /// Fetch the singleton. Fails with `INVALID_ARG` if `init` was never
    /// called (a "pre-init" call).
    pub fn instance() -> Result<Arc<TopologyManager>> {
        slot()
            .lock()
            .clone()
            .ok_or_else(|| Error::invalid_argument("topology manager: not initialised"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::tempdir;
    use uuid::Uuid;

    fn manager(n: usize) -> (tempfile::TempDir, TopologyManager) {
        let dir = tempdir().unwrap();
        let roots = (0..n)
            .map(|i| Some(dir.path().join(format!("disk{i}"))))
            .collect();
        (dir, TopologyManager::new(roots))
    }

    #[test]
    fn get_before_load_fails() {
        let (_d, mgr) = manager(3);
        assert_eq!(mgr.get().unwrap_err().error_code(), "INVALID_ARG");
    }

    #[test]
    fn mutations_bump_generation_and_invoke_callback() {
        let (_d, mgr) = manager(3);
        let seed = TopologyDocument::new(Uuid::new_v4());
        quorum::save_quorum(&mgr.disk_roots, &seed).unwrap();
        mgr.load().unwrap();

        let seen_generation = Arc::new(AtomicU64::new(0));
        let seen = seen_generation.clone();
        mgr.set_callback(move |t| seen.store(t.generation, Ordering::SeqCst));

        let t = mgr.add_pool().unwrap();
        assert_eq!(t.generation, 1);
        assert_eq!(seen_generation.load(Ordering::SeqCst), 1);

        let disks = vec![DiskEntry::new(Uuid::new_v4()), DiskEntry::new(Uuid::new_v4())];
        let t = mgr.add_set(0, disks).unwrap();
        assert_eq!(t.generation, 2);
        assert_eq!(seen_generation.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_persist_leaves_cache_untouched() {
        let (_dir, mgr) = manager(3);
        let seed = TopologyDocument::new(Uuid::new_v4());
        quorum::save_quorum(&mgr.disk_roots, &seed).unwrap();
        mgr.load().unwrap();

        // Sabotage two of the three disk roots so save_quorum can't reach
        // majority on the next mutation.
        for root in &mgr.disk_roots[0..2] {
            let root = root.as_ref().unwrap();
            std::fs::remove_dir_all(root).ok();
            std::fs::write(root, b"blocked").unwrap();
        }

        let before = mgr.get().unwrap();
        let err = mgr.add_pool().unwrap_err();
        assert_eq!(err.error_code(), "QUORUM");
        let after = mgr.get().unwrap();
        assert_eq!(before.generation, after.generation);
    }

    #[test]
    fn global_double_init_fails() {
        global::cleanup();
        let dir = tempdir().unwrap();
        global::init(vec![Some(dir.path().to_path_buf())]).unwrap();
        assert!(global::init(vec![]).is_err());
        global::cleanup();
    }

    #[test]
    fn global_pre_init_fails() {
        global::cleanup();
        assert!(global::instance().is_err());
    }
}
