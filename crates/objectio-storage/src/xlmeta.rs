//! The per-object, per-disk metadata document (`xl.meta`, §3/§6).

use base64::Engine as _;
use blake2::Blake2b;
use blake2::digest::consts::U32;
use chrono::{DateTime, Utc};
use objectio_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

type Blake2b256 = Blake2b<U32>;

/// `version` written into every newly created `xl.meta`.
pub const XL_META_VERSION: u32 = 1;
/// Default checksum algorithm for chunk digests.
pub const DEFAULT_CHECKSUM_ALGO: &str = "blake2b";
/// The erasure codec's minimum shard size (it pads every shard up to this
/// floor before encoding); `validate()` relaxes its lower-size-bound check
/// below this threshold since padding, not corruption, explains it.
const SHARD_SIZE_FLOOR: u64 = 64;

/// BLAKE2b-256 digest of `data`, for chunk checksums.
#[must_use]
pub fn checksum(data: &[u8]) -> [u8; 32] {
    use blake2::Digest;
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Per-object metadata co-located with chunk files on each disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub version: u32,
    pub format: String,
    pub stat: StatInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erasure: Option<ErasureInfo>,
    #[serde(default)]
    pub meta: std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning: Option<VersioningInfo>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "inline")]
    pub inline_data: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatInfo {
    pub size: u64,
    #[serde(rename = "modTime")]
    pub mod_time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErasureInfo {
    pub algorithm: String,
    pub data: u32,
    pub parity: u32,
    #[serde(rename = "blockSize")]
    pub block_size: u64,
    pub index: u32,
    pub distribution: Vec<u32>,
    pub checksums: Vec<ChunkChecksum>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkChecksum {
    pub algo: String,
    pub hash: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersioningInfo {
    pub version_id: String,
    pub is_latest: bool,
    pub is_delete_marker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_marker_version_id: Option<String>,
}

impl ChunkChecksum {
    #[must_use]
    pub fn new(hash: [u8; 32]) -> Self {
        Self {
            algo: DEFAULT_CHECKSUM_ALGO.to_string(),
            hash: hex::encode(hash),
        }
    }

    /// Verify `data` against this checksum's recorded hash.
    #[must_use]
    pub fn verify(&self, data: &[u8]) -> bool {
        hex::encode(checksum(data)) == self.hash
    }
}

impl ObjectMetadata {
    /// Build the metadata for an erasure-coded (non-inline) object.
    pub fn new_erasure_coded(
        size: u64,
        content_type: Option<&str>,
        user_metadata: impl IntoIterator<Item = (String, String)>,
        data: u32,
        parity: u32,
        block_size: u64,
        chunk_checksums: Vec<ChunkChecksum>,
    ) -> Result<Self> {
        if chunk_checksums.len() != (data + parity) as usize {
            return Err(Error::invalid_argument(
                "ObjectMetadata::new_erasure_coded: checksum count must equal data+parity",
            ));
        }
        let mut meta = std::collections::BTreeMap::new();
        if let Some(ct) = content_type {
            meta.insert("content-type".to_string(), ct.to_string());
        }
        for (k, v) in user_metadata {
            meta.insert(k, v);
        }
        Ok(Self {
            version: XL_META_VERSION,
            format: "xl".to_string(),
            stat: StatInfo {
                size,
                mod_time: now_iso8601(),
            },
            erasure: Some(ErasureInfo {
                algorithm: "reed-solomon".to_string(),
                data,
                parity,
                block_size,
                index: 1,
                distribution: (1..=data + parity).collect(),
                checksums: chunk_checksums,
            }),
            meta,
            versioning: None,
            inline_data: None,
        })
    }

    /// Build the metadata for an inline (no chunk files) object.
    pub fn new_inline(
        bytes: &[u8],
        content_type: Option<&str>,
        user_metadata: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut meta = std::collections::BTreeMap::new();
        if let Some(ct) = content_type {
            meta.insert("content-type".to_string(), ct.to_string());
        }
        for (k, v) in user_metadata {
            meta.insert(k, v);
        }
        Self {
            version: XL_META_VERSION,
            format: "xl".to_string(),
            stat: StatInfo {
                size: bytes.len() as u64,
                mod_time: now_iso8601(),
            },
            erasure: None,
            meta,
            versioning: None,
            inline_data: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }

    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.inline_data.is_some()
    }

    /// Decode the inline payload, if present.
    pub fn inline_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.inline_data
            .as_deref()
            .map(|b64| {
                base64::engine::general_purpose::STANDARD
                    .decode(b64)
                    .map_err(|e| Error::corrupt(format!("xl.meta: invalid inline base64: {e}")))
            })
            .transpose()
    }

    /// Check the size/checksum-count invariants from §3.
    pub fn validate(&self) -> Result<()> {
        if self.is_inline() {
            return Ok(());
        }
        let Some(erasure) = &self.erasure else {
            return Err(Error::corrupt("xl.meta: non-inline object missing erasure info"));
        };
        if self.stat.size == 0 {
            return Err(Error::corrupt("xl.meta: non-inline object must have size > 0"));
        }
        let total = (erasure.data + erasure.parity) as usize;
        if erasure.checksums.len() != total || erasure.distribution.len() != total {
            return Err(Error::corrupt(
                "xl.meta: checksums/distribution must cover every chunk",
            ));
        }
        let chunk_size = erasure.block_size;
        let data = u64::from(erasure.data);
        if chunk_size * data < self.stat.size {
            return Err(Error::corrupt("xl.meta: chunk_size * data must be >= size"));
        }
        // The codec pads every shard up to a 64-byte floor (see
        // objectio_erasure::codec's `shard_size`), so a small object's
        // recorded block_size can exceed the tight chunk_size*(data-1) < size
        // bound without anything being wrong. Only enforce the lower bound
        // once block_size is large enough that the floor can't be at play.
        if data > 1 && chunk_size > SHARD_SIZE_FLOOR && chunk_size * (data - 1) >= self.stat.size {
            return Err(Error::corrupt(
                "xl.meta: chunk_size * (data-1) must be < size",
            ));
        }
        Ok(())
    }

    /// Serialise to the canonical on-disk JSON encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse the canonical on-disk JSON encoding.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let meta: Self =
            serde_json::from_slice(bytes).map_err(|e| Error::corrupt(format!("xl.meta: {e}")))?;
        meta.validate()?;
        Ok(meta)
    }
}

fn now_iso8601() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    DateTime::<Utc>::from_timestamp(now.as_secs() as i64, now.subsec_nanos())
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| "1970-01-01T00:00:00.000Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        assert_eq!(checksum(b"hello"), checksum(b"hello"));
        assert_ne!(checksum(b"hello"), checksum(b"world"));
    }

    #[test]
    fn chunk_checksum_round_trips() {
        let cc = ChunkChecksum::new(checksum(b"chunk-data"));
        assert_eq!(cc.algo, "blake2b");
        assert!(cc.verify(b"chunk-data"));
        assert!(!cc.verify(b"other-data"));
    }

    #[test]
    fn inline_round_trip() {
        let meta = ObjectMetadata::new_inline(b"tiny", Some("text/plain"), []);
        assert!(meta.is_inline());
        let bytes = meta.to_bytes().unwrap();
        let parsed = ObjectMetadata::parse(&bytes).unwrap();
        assert_eq!(parsed.inline_bytes().unwrap().unwrap(), b"tiny");
        assert_eq!(parsed.meta.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn erasure_coded_requires_checksum_per_chunk() {
        let err = ObjectMetadata::new_erasure_coded(100, None, [], 4, 2, 64, vec![]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARG");
    }

    #[test]
    fn size_invariant_enforced() {
        let checksums: Vec<_> = (0..6).map(|_| ChunkChecksum::new(checksum(b"x"))).collect();
        // size=0 with non-inline erasure info must fail validate().
        let mut meta =
            ObjectMetadata::new_erasure_coded(64, None, [], 4, 2, 16, checksums).unwrap();
        meta.stat.size = 0;
        assert!(meta.validate().is_err());
    }

    #[test]
    fn valid_erasure_metadata_round_trips() {
        let checksums: Vec<_> = (0..6).map(|_| ChunkChecksum::new(checksum(b"x"))).collect();
        let meta =
            ObjectMetadata::new_erasure_coded(100, Some("application/octet-stream"), [], 4, 2, 32, checksums)
                .unwrap();
        meta.validate().unwrap();
        let bytes = meta.to_bytes().unwrap();
        let parsed = ObjectMetadata::parse(&bytes).unwrap();
        assert_eq!(parsed, meta);
    }

    /// A small object whose shards the codec padded up to its 64-byte
    /// floor must still pass validate(): block_size*(data-1) legitimately
    /// exceeds size here, and that's the floor, not corruption.
    #[test]
    fn validate_tolerates_padded_shard_floor() {
        let checksums: Vec<_> = (0..6).map(|_| ChunkChecksum::new(checksum(b"x"))).collect();
        let meta = ObjectMetadata::new_erasure_coded(10, None, [], 4, 2, 64, checksums).unwrap();
        meta.validate().unwrap();
    }
}
