//! Consistent-hash placement ring (C8, §4.8).

use objectio_common::{Error, Result};
use objectio_topology::{DiskEntry, TopologyDocument};
use siphasher::sip::SipHasher24;
use std::hash::Hasher;

/// The outcome of a `place()` lookup: the winning erasure set and its
/// disk-slot list in the set's own order.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementResult {
    pub pool_idx: u32,
    pub set_idx: u32,
    pub disks: Vec<DiskEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Vnode {
    hash: u64,
    pool_idx: u32,
    set_idx: u32,
    v: u32,
}

/// A sorted, immutable snapshot of vnode positions built from one
/// topology generation. Rebuilding never mutates an existing ring;
/// callers atomically swap the `Arc` holding it (see [`crate::manager`]).
#[derive(Debug)]
pub struct PlacementRing {
    k0: u64,
    k1: u64,
    vnodes: Vec<Vnode>,
    sets: Vec<(u32, u32, Vec<DiskEntry>)>,
}

fn sip_keys(deployment_id: &uuid::Uuid) -> (u64, u64) {
    let bytes = deployment_id.as_bytes();
    let k0 = u64::from_be_bytes(bytes[0..8].try_into().unwrap());
    let k1 = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
    (k0, k1)
}

fn sip_hash(k0: u64, k1: u64, data: &[u8]) -> u64 {
    let mut hasher = SipHasher24::new_with_keys(k0, k1);
    hasher.write(data);
    hasher.finish()
}

impl PlacementRing {
    /// Build a ring from every `ACTIVE` set in `topology`, emitting
    /// `topology.vnode_factor` vnodes per set.
    #[must_use]
    pub fn build(topology: &TopologyDocument) -> Self {
        let (k0, k1) = sip_keys(&topology.deployment_id);
        let mut vnodes = Vec::new();
        let mut sets = Vec::new();

        for (pool, set) in topology.active_sets() {
            for v in 0..topology.vnode_factor {
                let key = format!("{}:{}:{v}", pool.idx, set.idx);
                let hash = sip_hash(k0, k1, key.as_bytes());
                vnodes.push(Vnode {
                    hash,
                    pool_idx: pool.idx,
                    set_idx: set.idx,
                    v,
                });
            }
            sets.push((pool.idx, set.idx, set.disks.clone()));
        }

        vnodes.sort_by(|a, b| {
            a.hash
                .cmp(&b.hash)
                .then(a.pool_idx.cmp(&b.pool_idx))
                .then(a.set_idx.cmp(&b.set_idx))
                .then(a.v.cmp(&b.v))
        });

        Self { k0, k1, vnodes, sets }
    }

    /// Number of vnodes on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vnodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vnodes.is_empty()
    }

    /// Locate the owning erasure set for `bucket`/`object` and compose its
    /// disk list. Fails `UNSUPPORTED` if the ring has no active sets.
    pub fn place(&self, bucket: &str, object: &str) -> Result<PlacementResult> {
        if self.vnodes.is_empty() {
            return Err(Error::unsupported("placement ring has no active sets"));
        }
        let key = format!("{bucket}/{object}");
        let h = sip_hash(self.k0, self.k1, key.as_bytes());

        let idx = self.vnodes.partition_point(|vn| vn.hash < h);
        let idx = if idx == self.vnodes.len() { 0 } else { idx };
        let vnode = &self.vnodes[idx];

        let (pool_idx, set_idx, disks) = self
            .sets
            .iter()
            .find(|(p, s, _)| *p == vnode.pool_idx && *s == vnode.set_idx)
            .expect("vnode always references a set collected in the same build()");

        Ok(PlacementResult {
            pool_idx: *pool_idx,
            set_idx: *set_idx,
            disks: disks.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectio_topology::DiskEntry;
    use uuid::Uuid;

    fn topology_with_sets(n: usize, disks_per_set: usize) -> TopologyDocument {
        let mut t = TopologyDocument::new(Uuid::new_v4());
        t.add_pool();
        for _ in 0..n {
            let disks = (0..disks_per_set).map(|_| DiskEntry::new(Uuid::new_v4())).collect();
            t.add_set(0, disks).unwrap();
        }
        t
    }

    #[test]
    fn ring_size_matches_active_sets_times_vnode_factor() {
        let t = topology_with_sets(8, 4);
        let ring = PlacementRing::build(&t);
        assert_eq!(ring.len(), 8 * t.vnode_factor as usize);
    }

    #[test]
    fn draining_sets_excluded_from_ring() {
        let mut t = topology_with_sets(2, 2);
        t.mark_draining(0, 1).unwrap();
        let ring = PlacementRing::build(&t);
        assert_eq!(ring.len(), t.vnode_factor as usize);
    }

    /// Scenario: placement is a pure function of (bucket, object).
    #[test]
    fn placement_is_deterministic() {
        let t = topology_with_sets(4, 3);
        let ring = PlacementRing::build(&t);
        let a = ring.place("bucket1", "a").unwrap();
        let b = ring.place("bucket1", "a").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_ring_is_unsupported() {
        let t = TopologyDocument::new(Uuid::new_v4());
        let ring = PlacementRing::build(&t);
        assert!(ring.place("b", "o").is_err());
    }

    /// Scenario 4: ring stability under a single set draining.
    #[test]
    fn scenario_ring_stability_under_single_set_removal() {
        let t = topology_with_sets(8, 2);
        let ring_before = PlacementRing::build(&t);

        let keys: Vec<String> = ('a'..='z').map(|c| c.to_string()).collect();
        let before: Vec<_> = keys
            .iter()
            .map(|k| ring_before.place("bucket1", k).unwrap())
            .collect();

        let mut t2 = t;
        t2.mark_draining(0, 7).unwrap();
        let ring_after = PlacementRing::build(&t2);
        let after: Vec<_> = keys.iter().map(|k| ring_after.place("bucket1", k).unwrap()).collect();

        let changed = before.iter().zip(after.iter()).filter(|(a, b)| a != b).count();
        // Roughly 1/8 of keys should have moved off the removed set; allow slack.
        assert!(changed <= keys.len() / 2, "too many keys moved: {changed}/{}", keys.len());
        // Every remaining placement must avoid the now-draining set 7.
        assert!(after.iter().all(|p| p.set_idx != 7));
    }
}
