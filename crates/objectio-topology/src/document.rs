//! The mutable, generation-numbered topology document (C4, §4.4).

use objectio_common::{Error, Result};
use objectio_format::FormatDocument;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `version` written into every newly created topology document.
pub const TOPOLOGY_VERSION: u32 = 1;
/// Default number of vnodes emitted per active erasure set.
pub const DEFAULT_VNODE_FACTOR: u32 = 150;

/// One-directional set lifecycle: `Active -> Draining -> Removed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetState {
    Active,
    Draining,
    Removed,
}

impl SetState {
    /// `true` if `self -> next` is a valid forward transition (or a no-op).
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Active, Self::Draining) | (Self::Draining, Self::Removed)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiskEntry {
    pub uuid: Uuid,
    pub endpoint: String,
    #[serde(with = "capacity_as_decimal_string")]
    pub capacity: u64,
}

impl DiskEntry {
    #[must_use]
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            endpoint: String::new(),
            capacity: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErasureSet {
    pub idx: u32,
    pub state: SetState,
    pub disks: Vec<DiskEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub idx: u32,
    pub sets: Vec<ErasureSet>,
}

/// The mutable, generation-numbered description of pools, erasure sets,
/// and disk membership.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyDocument {
    pub version: u32,
    pub generation: u64,
    pub deployment_id: Uuid,
    pub vnode_factor: u32,
    pub pools: Vec<Pool>,
}

impl TopologyDocument {
    /// An empty, unconfigured topology (`generation = 0`).
    #[must_use]
    pub fn new(deployment_id: Uuid) -> Self {
        Self {
            version: TOPOLOGY_VERSION,
            generation: 0,
            deployment_id,
            vnode_factor: DEFAULT_VNODE_FACTOR,
            pools: Vec::new(),
        }
    }

    /// Derive the generation-1 topology from a freshly created format:
    /// one pool, one `ACTIVE` set per format set, disk UUIDs copied
    /// verbatim. Endpoints/capacities start empty and are filled in later
    /// by the endpoint resolver.
    #[must_use]
    pub fn from_format(format: &FormatDocument) -> Self {
        let sets = format
            .sets
            .iter()
            .enumerate()
            .map(|(idx, disks)| ErasureSet {
                idx: idx as u32,
                state: SetState::Active,
                disks: disks.iter().map(|&uuid| DiskEntry::new(uuid)).collect(),
            })
            .collect();
        Self {
            version: TOPOLOGY_VERSION,
            generation: 1,
            deployment_id: format.deployment_id,
            vnode_factor: DEFAULT_VNODE_FACTOR,
            pools: vec![Pool { idx: 0, sets }],
        }
    }

    /// Append a new, empty pool. Always succeeds and bumps `generation`.
    pub fn add_pool(&mut self) {
        let idx = self.pools.len() as u32;
        self.pools.push(Pool { idx, sets: Vec::new() });
        self.generation += 1;
    }

    /// Append an `ACTIVE` set with the given disk slots to `pool_idx`.
    pub fn add_set(&mut self, pool_idx: u32, disks: Vec<DiskEntry>) -> Result<()> {
        if disks.is_empty() {
            return Err(Error::invalid_argument("add_set: disks must not be empty"));
        }
        let pool = self
            .pools
            .iter_mut()
            .find(|p| p.idx == pool_idx)
            .ok_or_else(|| Error::invalid_argument(format!("add_set: unknown pool {pool_idx}")))?;
        let idx = pool.sets.len() as u32;
        pool.sets.push(ErasureSet {
            idx,
            state: SetState::Active,
            disks,
        });
        self.generation += 1;
        Ok(())
    }

    /// Replace a set's state. A same-state call is a no-op (generation is
    /// NOT bumped); any transition other than the forward lifecycle edge
    /// (`Active -> Draining -> Removed`) is rejected.
    pub fn set_state(&mut self, pool_idx: u32, set_idx: u32, new_state: SetState) -> Result<()> {
        let set = self.find_set_mut(pool_idx, set_idx)?;
        if set.state == new_state {
            return Ok(());
        }
        if !set.state.can_transition_to(new_state) {
            return Err(Error::invalid_argument(format!(
                "set_state: illegal transition {:?} -> {:?} for pool {pool_idx} set {set_idx}",
                set.state, new_state
            )));
        }
        set.state = new_state;
        self.generation += 1;
        Ok(())
    }

    /// `ACTIVE -> DRAINING`.
    pub fn mark_draining(&mut self, pool_idx: u32, set_idx: u32) -> Result<()> {
        self.set_state(pool_idx, set_idx, SetState::Draining)
    }

    /// `DRAINING -> REMOVED`.
    pub fn mark_removed(&mut self, pool_idx: u32, set_idx: u32) -> Result<()> {
        self.set_state(pool_idx, set_idx, SetState::Removed)
    }

    fn find_set_mut(&mut self, pool_idx: u32, set_idx: u32) -> Result<&mut ErasureSet> {
        let pool = self
            .pools
            .iter_mut()
            .find(|p| p.idx == pool_idx)
            .ok_or_else(|| Error::invalid_argument(format!("unknown pool {pool_idx}")))?;
        pool.sets
            .iter_mut()
            .find(|s| s.idx == set_idx)
            .ok_or_else(|| Error::invalid_argument(format!("unknown set {pool_idx}/{set_idx}")))
    }

    /// Every `ACTIVE` set, in `(pool_idx, set_idx)` order.
    pub fn active_sets(&self) -> impl Iterator<Item = (&Pool, &ErasureSet)> {
        self.pools.iter().flat_map(|pool| {
            pool.sets
                .iter()
                .filter(|s| s.state == SetState::Active)
                .map(move |s| (pool, s))
        })
    }

    /// Serialise to the canonical on-disk JSON encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse the canonical on-disk JSON encoding.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::corrupt(format!("topology.json: {e}")))?;
        if value.get("deploymentId").is_none() {
            return Err(Error::corrupt("topology.json: missing deploymentId"));
        }
        if value.get("pools").is_none() {
            return Err(Error::corrupt("topology.json: missing pools"));
        }
        if let Some(pools) = value.get("pools").and_then(|p| p.as_array()) {
            for pool in pools {
                let Some(sets) = pool.get("sets").and_then(|s| s.as_array()) else {
                    return Err(Error::corrupt("topology.json: pool missing sets"));
                };
                for set in sets {
                    if set.get("disks").is_none() {
                        return Err(Error::corrupt("topology.json: set missing disks"));
                    }
                }
            }
        }
        serde_json::from_value(value).map_err(|e| Error::corrupt(format!("topology.json: {e}")))
    }
}

mod capacity_as_decimal_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        // Accept both string and integer forms defensively (§9 design note).
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StrOrInt {
            Str(String),
            Int(u64),
        }
        match StrOrInt::deserialize(d)? {
            StrOrInt::Str(s) => s.parse().map_err(serde::de::Error::custom),
            StrOrInt::Int(n) => Ok(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unconfigured() {
        let t = TopologyDocument::new(Uuid::new_v4());
        assert_eq!(t.generation, 0);
        assert_eq!(t.vnode_factor, DEFAULT_VNODE_FACTOR);
        assert!(t.pools.is_empty());
    }

    #[test]
    fn from_format_builds_one_active_pool() {
        let format = FormatDocument::new(3, 4).unwrap();
        let t = TopologyDocument::from_format(&format);
        assert_eq!(t.generation, 1);
        assert_eq!(t.deployment_id, format.deployment_id);
        assert_eq!(t.pools.len(), 1);
        assert_eq!(t.pools[0].sets.len(), 3);
        assert!(t.pools[0].sets.iter().all(|s| s.state == SetState::Active));
        assert_eq!(t.pools[0].sets[0].disks.len(), 4);
    }

    /// Scenario 2: generation monotonicity.
    #[test]
    fn scenario_generation_monotonicity() {
        let mut t = TopologyDocument::new(Uuid::new_v4());
        assert_eq!(t.generation, 0);

        t.add_pool();
        assert_eq!(t.generation, 1);

        let disks = (0..4).map(|_| DiskEntry::new(Uuid::new_v4())).collect();
        t.add_set(0, disks).unwrap();
        assert_eq!(t.generation, 2);

        t.mark_draining(0, 0).unwrap();
        assert_eq!(t.generation, 3);

        t.mark_removed(0, 0).unwrap();
        assert_eq!(t.generation, 4);

        // Second mark_removed is a same-state no-op.
        t.mark_removed(0, 0).unwrap();
        assert_eq!(t.generation, 4);
    }

    #[test]
    fn illegal_transition_rejected() {
        let mut t = TopologyDocument::new(Uuid::new_v4());
        t.add_pool();
        let disks = (0..2).map(|_| DiskEntry::new(Uuid::new_v4())).collect();
        t.add_set(0, disks).unwrap();

        // Active -> Removed skips Draining.
        assert!(t.set_state(0, 0, SetState::Removed).is_err());
        // Draining -> Active is a reverse edge.
        t.mark_draining(0, 0).unwrap();
        assert!(t.set_state(0, 0, SetState::Active).is_err());
    }

    #[test]
    fn add_set_rejects_unknown_pool_or_empty_disks() {
        let mut t = TopologyDocument::new(Uuid::new_v4());
        assert!(t.add_set(0, vec![DiskEntry::new(Uuid::new_v4())]).is_err());
        t.add_pool();
        assert!(t.add_set(0, vec![]).is_err());
    }

    #[test]
    fn round_trip_serialisation() {
        let format = FormatDocument::new(2, 3).unwrap();
        let t = TopologyDocument::from_format(&format);
        let bytes = t.to_bytes().unwrap();
        let parsed = TopologyDocument::parse(&bytes).unwrap();
        assert_eq!(t, parsed);
    }

    #[test]
    fn parse_accepts_integer_capacity_defensively() {
        let format = FormatDocument::new(1, 2).unwrap();
        let t = TopologyDocument::from_format(&format);
        let mut value: serde_json::Value = serde_json::from_slice(&t.to_bytes().unwrap()).unwrap();
        value["pools"][0]["sets"][0]["disks"][0]["capacity"] = serde_json::json!(12345);
        let parsed = TopologyDocument::parse(value.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.pools[0].sets[0].disks[0].capacity, 12345);
    }

    #[test]
    fn parse_rejects_missing_fields() {
        let bad = serde_json::json!({"version": 1, "generation": 0, "vnodeFactor": 150, "pools": []});
        assert!(TopologyDocument::parse(bad.to_string().as_bytes()).is_err());

        let bad2 = serde_json::json!({
            "version": 1, "generation": 0, "deploymentId": Uuid::new_v4().to_string(),
            "vnodeFactor": 150,
        });
        assert!(TopologyDocument::parse(bad2.to_string().as_bytes()).is_err());
    }

    #[test]
    fn empty_pools_is_accepted() {
        let t = TopologyDocument::new(Uuid::new_v4());
        let parsed = TopologyDocument::parse(&t.to_bytes().unwrap()).unwrap();
        assert!(parsed.pools.is_empty());
    }
}
