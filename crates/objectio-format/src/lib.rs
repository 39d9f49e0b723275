//! The immutable cluster-identity Format document (`format.json`).
//!
//! A Format document is created once per cluster, fixes the disk-slot
//! identity of every erasure set forever, and is replicated verbatim to
//! every disk. This module covers creation, (de)serialisation, cloning,
//! and majority-quorum validation across loaded replicas.

use objectio_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `erasure_version` written into every newly created Format document.
pub const ERASURE_VERSION: u32 = 3;
/// `version` written into every newly created Format document.
pub const FORMAT_VERSION: u32 = 1;
/// Default `distributionAlgo` for newly created clusters.
pub const DEFAULT_DISTRIBUTION_ALGO: &str = "SIPMOD+PARITY";

/// The immutable cluster-identity document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDocument {
    pub version: u32,
    pub format_type: String,
    pub deployment_id: Uuid,
    pub erasure_version: u32,
    /// Deployment-local identifier of the disk holding this copy; empty
    /// until the disk resolver assigns it.
    pub this_disk: String,
    pub distribution_algo: String,
    /// `sets[i][j]` fixes the identity of the j-th slot of set i forever.
    pub sets: Vec<Vec<Uuid>>,
}

impl FormatDocument {
    /// Create a fresh Format document with `set_count` sets of
    /// `disks_per_set` freshly generated disk UUIDs each.
    pub fn new(set_count: usize, disks_per_set: usize) -> Result<Self> {
        if set_count == 0 || disks_per_set == 0 {
            return Err(Error::invalid_argument(
                "FormatDocument::new: set_count and disks_per_set must both be > 0",
            ));
        }
        let sets = (0..set_count)
            .map(|_| (0..disks_per_set).map(|_| Uuid::new_v4()).collect())
            .collect();
        Ok(Self {
            version: FORMAT_VERSION,
            format_type: "erasure".to_string(),
            deployment_id: Uuid::new_v4(),
            erasure_version: ERASURE_VERSION,
            this_disk: String::new(),
            distribution_algo: DEFAULT_DISTRIBUTION_ALGO.to_string(),
            sets,
        })
    }

    #[must_use]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn disks_per_set(&self) -> usize {
        self.sets.first().map_or(0, Vec::len)
    }

    /// Assign the deployment-local disk identifier for this copy.
    pub fn assign_this_disk(&mut self, disk_uuid: Uuid) {
        self.this_disk = disk_uuid.to_string();
    }

    /// Serialise to the canonical on-disk JSON encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let raw = RawFormat {
            version: self.version,
            format: self.format_type.clone(),
            id: self.deployment_id.to_string(),
            xl: RawXl {
                version: self.erasure_version,
                this: self.this_disk.clone(),
                distribution_algo: self.distribution_algo.clone(),
                sets: self
                    .sets
                    .iter()
                    .map(|set| set.iter().map(Uuid::to_string).collect())
                    .collect(),
            },
        };
        serde_json::to_vec_pretty(&raw).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse the canonical on-disk JSON encoding.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: RawFormat =
            serde_json::from_slice(bytes).map_err(|e| Error::corrupt(format!("format.json: {e}")))?;

        if raw.id.is_empty() {
            return Err(Error::corrupt("format.json: missing id"));
        }
        let deployment_id = Uuid::parse_str(&raw.id)
            .map_err(|e| Error::corrupt(format!("format.json: invalid id: {e}")))?;

        if raw.xl.sets.is_empty() {
            return Err(Error::corrupt("format.json: xl.sets is empty"));
        }
        let disks_per_set = raw.xl.sets[0].len();
        if disks_per_set == 0 {
            return Err(Error::corrupt("format.json: xl.sets[0] is empty"));
        }
        let mut sets = Vec::with_capacity(raw.xl.sets.len());
        for (i, set) in raw.xl.sets.iter().enumerate() {
            if set.len() != disks_per_set {
                return Err(Error::corrupt(format!(
                    "format.json: ragged set width at index {i}: expected {disks_per_set}, got {}",
                    set.len()
                )));
            }
            let mut parsed_set = Vec::with_capacity(set.len());
            for uuid_str in set {
                let uuid = Uuid::parse_str(uuid_str)
                    .map_err(|e| Error::corrupt(format!("format.json: invalid disk uuid '{uuid_str}': {e}")))?;
                parsed_set.push(uuid);
            }
            sets.push(parsed_set);
        }

        Ok(Self {
            version: raw.version,
            format_type: raw.format,
            deployment_id,
            erasure_version: raw.xl.version,
            this_disk: raw.xl.this,
            distribution_algo: raw.xl.distribution_algo,
            sets,
        })
    }

    /// Validate a slice of loaded replicas (possibly containing `None`
    /// for unreadable disks) for quorum agreement on cluster identity.
    ///
    /// The first non-`None` replica is the reference; every other
    /// non-`None` replica is compared on `deployment_id`, `set_count`,
    /// `disks_per_set`, and `distribution_algo`. Requires
    /// `valid >= floor(N/2) + 1` of the N replicas to agree, else
    /// [`Error::Quorum`].
    pub fn validate_replicas(replicas: &[Option<Self>]) -> Result<()> {
        let n = replicas.len();
        let needed = n / 2 + 1;

        let Some(reference) = replicas.iter().flatten().next() else {
            return Err(Error::quorum(needed, 0));
        };

        let valid = replicas
            .iter()
            .flatten()
            .filter(|f| {
                f.deployment_id == reference.deployment_id
                    && f.set_count() == reference.set_count()
                    && f.disks_per_set() == reference.disks_per_set()
                    && f.distribution_algo == reference.distribution_algo
            })
            .count();

        if valid >= needed {
            Ok(())
        } else {
            Err(Error::quorum(needed, valid))
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawFormat {
    version: u32,
    format: String,
    id: String,
    xl: RawXl,
}

#[derive(Serialize, Deserialize)]
struct RawXl {
    version: u32,
    this: String,
    #[serde(rename = "distributionAlgo")]
    distribution_algo: String,
    sets: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_positive_counts() {
        assert!(FormatDocument::new(0, 4).is_err());
        assert!(FormatDocument::new(4, 0).is_err());
        assert!(FormatDocument::new(4, 4).is_ok());
    }

    #[test]
    fn new_generates_fresh_ids_each_call() {
        let a = FormatDocument::new(2, 4).unwrap();
        let b = FormatDocument::new(2, 4).unwrap();
        assert_ne!(a.deployment_id, b.deployment_id);
        assert_ne!(a.sets[0][0], b.sets[0][0]);
    }

    #[test]
    fn round_trip_serialisation() {
        let f = FormatDocument::new(4, 4).unwrap();
        let bytes = f.to_bytes().unwrap();
        let parsed = FormatDocument::parse(&bytes).unwrap();
        assert_eq!(f, parsed);
    }

    #[test]
    fn parse_rejects_missing_id() {
        let bad = serde_json::json!({
            "version": 1, "format": "erasure", "id": "",
            "xl": {"version": 3, "this": "", "distributionAlgo": "SIPMOD+PARITY", "sets": [["a"]]}
        });
        let err = FormatDocument::parse(bad.to_string().as_bytes()).unwrap_err();
        assert_eq!(err.error_code(), "CORRUPT");
    }

    #[test]
    fn parse_rejects_ragged_sets() {
        let f = FormatDocument::new(2, 3).unwrap();
        let mut raw: serde_json::Value = serde_json::from_slice(&f.to_bytes().unwrap()).unwrap();
        raw["xl"]["sets"][1].as_array_mut().unwrap().pop();
        let err = FormatDocument::parse(raw.to_string().as_bytes()).unwrap_err();
        assert_eq!(err.error_code(), "CORRUPT");
    }

    #[test]
    fn parse_rejects_non_string_uuid() {
        let f = FormatDocument::new(1, 2).unwrap();
        let mut raw: serde_json::Value = serde_json::from_slice(&f.to_bytes().unwrap()).unwrap();
        raw["xl"]["sets"][0][0] = serde_json::json!(1234);
        assert!(FormatDocument::parse(raw.to_string().as_bytes()).is_err());
    }

    /// Scenario 1 from the testable-properties list: format quorum.
    #[test]
    fn scenario_format_quorum() {
        let reference = FormatDocument::new(2, 4).unwrap();
        let replicas = vec![Some(reference.clone()); 4];
        assert!(FormatDocument::validate_replicas(&replicas).is_ok());

        // Disk 4 diverges: 3 of 4 still agree -> quorum holds.
        let mut replicas = replicas;
        replicas[3] = Some(FormatDocument::new(2, 4).unwrap());
        assert!(FormatDocument::validate_replicas(&replicas).is_ok());

        // Disks 3 and 4 diverge: only 2 of 4 agree -> quorum fails.
        replicas[2] = Some(FormatDocument::new(2, 4).unwrap());
        let err = FormatDocument::validate_replicas(&replicas).unwrap_err();
        assert_eq!(err.error_code(), "QUORUM");
    }

    #[test]
    fn validate_replicas_tolerates_nulls() {
        let reference = FormatDocument::new(1, 4).unwrap();
        let replicas = vec![Some(reference.clone()), None, Some(reference.clone()), None];
        // 2 of 4 agree; needed = 4/2+1 = 3 -> quorum fails.
        let err = FormatDocument::validate_replicas(&replicas).unwrap_err();
        assert_eq!(err.error_code(), "QUORUM");
    }

    #[test]
    fn validate_replicas_single_disk_self_agrees() {
        let reference = FormatDocument::new(1, 1).unwrap();
        let replicas = vec![Some(reference)];
        assert!(FormatDocument::validate_replicas(&replicas).is_ok());
    }
}
