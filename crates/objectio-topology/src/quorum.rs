//! Quorum persistence for the topology document (C5, §4.5).

use crate::document::TopologyDocument;
use objectio_common::{Error, Result};
use objectio_storage::{layout, read_all, write_atomic};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Save `topology` to every non-null disk in `disk_roots`, independently.
/// A single disk failure does not abort the loop. Succeeds once at least
/// `floor(N/2)+1` writes land, else [`Error::Quorum`].
pub fn save_quorum(disk_roots: &[Option<PathBuf>], topology: &TopologyDocument) -> Result<()> {
    let n = disk_roots.len();
    let needed = n / 2 + 1;
    let bytes = topology.to_bytes()?;

    let mut successes = 0usize;
    for root in disk_roots.iter().flatten() {
        let path = layout::topology_path(root);
        match write_atomic(&path, &bytes) {
            Ok(()) => successes += 1,
            Err(e) => tracing::warn!(disk = %root.display(), error = %e, "save_quorum: write failed"),
        }
    }

    if successes >= needed {
        Ok(())
    } else {
        Err(Error::quorum(needed, successes))
    }
}

/// Read each disk's topology document, vote by canonical-serialisation
/// hash, and return the first value whose vote count reaches
/// `read_quorum = max(1, floor(N/2))`. All other loaded documents are
/// discarded. Disk order is the tie-break: ties are resolved by whichever
/// hash accumulates `read_quorum` votes first while scanning in order.
pub fn load_quorum(disk_roots: &[Option<PathBuf>]) -> Result<TopologyDocument> {
    let n = disk_roots.len();
    let read_quorum = (n / 2).max(1);

    let mut votes: HashMap<u64, (TopologyDocument, usize)> = HashMap::new();
    let mut best_count = 0usize;

    for root in disk_roots.iter().flatten() {
        let Some(topology) = load_one(root) else { continue };
        let Ok(canonical) = topology.to_bytes() else { continue };
        let hash = xxhash_rust::xxh64::xxh64(&canonical, 0);

        let entry = votes.entry(hash).or_insert_with(|| (topology, 0));
        entry.1 += 1;
        best_count = best_count.max(entry.1);
        if entry.1 >= read_quorum {
            return Ok(entry.0.clone());
        }
    }

    Err(Error::quorum(read_quorum, best_count))
}

fn load_one(disk_root: &Path) -> Option<TopologyDocument> {
    let path = layout::topology_path(disk_root);
    let bytes = read_all(&path).ok()?;
    TopologyDocument::parse(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn disks(n: usize) -> (tempfile::TempDir, Vec<Option<PathBuf>>) {
        let dir = tempdir().unwrap();
        let roots = (0..n)
            .map(|i| Some(dir.path().join(format!("disk{i}"))))
            .collect();
        (dir, roots)
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, roots) = disks(4);
        let topology = TopologyDocument::new(Uuid::new_v4());
        save_quorum(&roots, &topology).unwrap();
        let loaded = load_quorum(&roots).unwrap();
        assert_eq!(loaded, topology);
    }

    #[test]
    fn single_disk_quorum_collapses_to_one() {
        let (_dir, roots) = disks(1);
        let topology = TopologyDocument::new(Uuid::new_v4());
        save_quorum(&roots, &topology).unwrap();
        assert!(load_quorum(&roots).is_ok());
    }

    #[test]
    fn null_paths_skipped_silently_in_save() {
        let (_dir, mut roots) = disks(3);
        roots.push(None);
        let topology = TopologyDocument::new(Uuid::new_v4());
        // 3 real + 1 null: needed = 4/2+1 = 3, all 3 real disks succeed.
        save_quorum(&roots, &topology).unwrap();
    }

    /// Scenario 3: topology read consensus.
    #[test]
    fn scenario_topology_read_consensus() {
        let (_dir, roots) = disks(5);
        let a = {
            let mut t = TopologyDocument::new(Uuid::new_v4());
            for _ in 0..100 {
                t.add_pool();
            }
            t
        };
        let b = TopologyDocument::new(Uuid::new_v4());

        for root in roots[0..3].iter().flatten() {
            write_atomic(&layout::topology_path(root), &a.to_bytes().unwrap()).unwrap();
        }
        for root in roots[3..5].iter().flatten() {
            write_atomic(&layout::topology_path(root), &b.to_bytes().unwrap()).unwrap();
        }

        let loaded = load_quorum(&roots).unwrap();
        assert_eq!(loaded, a);
    }

    #[test]
    fn no_quorum_when_nothing_agrees() {
        let (_dir, roots) = disks(2);
        let a = TopologyDocument::new(Uuid::new_v4());
        let b = TopologyDocument::new(Uuid::new_v4());
        write_atomic(&layout::topology_path(roots[0].as_ref().unwrap()), &a.to_bytes().unwrap()).unwrap();
        write_atomic(&layout::topology_path(roots[1].as_ref().unwrap()), &b.to_bytes().unwrap()).unwrap();

        let err = load_quorum(&roots).unwrap_err();
        assert_eq!(err.error_code(), "QUORUM");
    }

    #[test]
    fn save_fails_quorum_when_majority_of_disks_missing() {
        let (dir, roots) = disks(5);
        // Make 3 of the 5 disk roots unwritable by pre-creating them as
        // read-only files instead of directories.
        for root in &roots[0..3] {
            let root = root.as_ref().unwrap();
            std::fs::create_dir_all(root.parent().unwrap()).unwrap();
            std::fs::write(root, b"not a directory").unwrap();
        }
        let _ = &dir;
        let topology = TopologyDocument::new(Uuid::new_v4());
        let err = save_quorum(&roots, &topology).unwrap_err();
        assert_eq!(err.error_code(), "QUORUM");
    }
}
