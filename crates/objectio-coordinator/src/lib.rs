//! PUT/GET/DELETE/HEAD object coordination (C9, §4.9): placement lookup,
//! erasure encode/decode, per-chunk checksums, and fan-out I/O across
//! local disks (through C1) and remote disks (through C10).

use objectio_common::{Error, ErasureConfig, Result};
use objectio_endpoint::{Endpoint, UrlEndpoint};
use objectio_erasure::ErasureCodec;
use objectio_placement::PlacementManager;
use objectio_rpc::{ReadChunkRequest, ReadXlMetaRequest, RpcClient, WriteChunkRequest, WriteXlMetaRequest};
use objectio_storage::xlmeta::{checksum, ChunkChecksum, ObjectMetadata};
use objectio_storage::{layout, read_all, write_atomic};
use objectio_topology::DiskEntry;
use std::path::PathBuf;
use std::sync::Arc;

/// Codec and threshold parameters the coordinator applies to every PUT.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub ec: ErasureConfig,
    pub inline_threshold: u64,
    pub verify_checksums: bool,
}

#[derive(Clone, Debug)]
enum DiskTarget {
    Local(PathBuf),
    Remote(UrlEndpoint, String),
}

/// Resolve one erasure-set disk slot to a concrete I/O target. An empty
/// `endpoint` (unconfigured topology) falls back to the node's own
/// locally-configured multi-disk layer, addressed by slot index (§4.8
/// "Result composition").
fn resolve_target(disk: &DiskEntry, local_disks: &[PathBuf], slot: usize) -> Result<DiskTarget> {
    if disk.endpoint.is_empty() {
        return local_disks
            .get(slot)
            .cloned()
            .map(DiskTarget::Local)
            .ok_or_else(|| Error::unsupported("coordinator: no local disk configured for unresolved endpoint"));
    }
    let endpoint = Endpoint::parse(&disk.endpoint)?;
    if endpoint.is_local() {
        let path = match &endpoint {
            Endpoint::Path(p) => p.clone(),
            Endpoint::Url(u) => u.path.clone(),
        };
        Ok(DiskTarget::Local(PathBuf::from(path)))
    } else if let Endpoint::Url(u) = endpoint {
        let disk_path = u.path.clone();
        Ok(DiskTarget::Remote(u, disk_path))
    } else {
        unreachable!("is_local() is true for every Endpoint::Path")
    }
}

/// Coordinates object reads/writes across the erasure set the placement
/// ring assigns to `(bucket, object)`.
pub struct Coordinator {
    placement: Arc<PlacementManager>,
    rpc: RpcClient,
    config: CoordinatorConfig,
    /// This node's own configured disk roots, used both as the
    /// unconfigured-endpoint fallback and as the single-disk degenerate
    /// mode described in §4.9 step 2.
    local_disks: Vec<PathBuf>,
}

impl Coordinator {
    #[must_use]
    pub fn new(placement: Arc<PlacementManager>, rpc: RpcClient, config: CoordinatorConfig, local_disks: Vec<PathBuf>) -> Self {
        Self {
            placement,
            rpc,
            config,
            local_disks,
        }
    }

    /// Pick the disk-target list for `(bucket, object)`: the placement
    /// ring's winning set if it has at least `k+m` disks, else the
    /// single-disk fallback on the node's first configured disk.
    fn select_disks(&self, bucket: &str, object: &str, k_plus_m: usize) -> Result<Vec<DiskTarget>> {
        let placement = self.placement.place(bucket, object).ok();
        if let Some(p) = placement {
            if p.disks.len() >= k_plus_m {
                return p
                    .disks
                    .iter()
                    .enumerate()
                    .map(|(slot, d)| resolve_target(d, &self.local_disks, slot))
                    .collect();
            }
        }
        let root = self
            .local_disks
            .first()
            .cloned()
            .ok_or_else(|| Error::unsupported("coordinator: no local disk configured for single-disk fallback"))?;
        Ok(vec![DiskTarget::Local(root)])
    }

    async fn write_chunk(&self, target: &DiskTarget, bucket: &str, object: &str, index: usize, data: Vec<u8>) -> Result<()> {
        match target {
            DiskTarget::Local(root) => {
                let path = layout::part_path(root, bucket, object, index);
                tokio::task::spawn_blocking(move || write_atomic(&path, &data))
                    .await
                    .map_err(|e| Error::internal(e.to_string()))?
            }
            DiskTarget::Remote(url, disk_path) => {
                let req = WriteChunkRequest::new(bucket, object, disk_path.clone(), index as u32, &data);
                self.rpc.write_chunk(url, &req).await
            }
        }
    }

    async fn read_chunk(&self, target: &DiskTarget, bucket: &str, object: &str, index: usize) -> Result<Vec<u8>> {
        match target {
            DiskTarget::Local(root) => {
                let path = layout::part_path(root, bucket, object, index);
                tokio::task::spawn_blocking(move || read_all(&path))
                    .await
                    .map_err(|e| Error::internal(e.to_string()))?
            }
            DiskTarget::Remote(url, disk_path) => {
                let req = ReadChunkRequest {
                    bucket: bucket.to_string(),
                    object: object.to_string(),
                    disk_path: disk_path.clone(),
                    chunk_index: index as u32,
                };
                self.rpc.read_chunk(url, &req).await
            }
        }
    }

    async fn write_xl_meta(&self, target: &DiskTarget, bucket: &str, object: &str, meta: &ObjectMetadata) -> Result<()> {
        match target {
            DiskTarget::Local(root) => {
                let path = layout::xl_meta_path(root, bucket, object);
                let bytes = meta.to_bytes()?;
                tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
                    .await
                    .map_err(|e| Error::internal(e.to_string()))?
            }
            DiskTarget::Remote(url, disk_path) => {
                let value = serde_json::to_value(meta).map_err(|e| Error::Serialization(e.to_string()))?;
                let req = WriteXlMetaRequest {
                    bucket: bucket.to_string(),
                    object: object.to_string(),
                    disk_path: disk_path.clone(),
                    xl_meta: value,
                };
                self.rpc.write_xl_meta(url, &req).await
            }
        }
    }

    async fn read_xl_meta(&self, target: &DiskTarget, bucket: &str, object: &str) -> Result<ObjectMetadata> {
        match target {
            DiskTarget::Local(root) => {
                let path = layout::xl_meta_path(root, bucket, object);
                let bytes = tokio::task::spawn_blocking(move || read_all(&path))
                    .await
                    .map_err(|e| Error::internal(e.to_string()))??;
                ObjectMetadata::parse(&bytes)
            }
            DiskTarget::Remote(url, disk_path) => {
                let req = ReadXlMetaRequest {
                    bucket: bucket.to_string(),
                    object: object.to_string(),
                    disk_path: disk_path.clone(),
                };
                let value = self.rpc.read_xl_meta(url, &req).await?;
                serde_json::from_value(value).map_err(|e| Error::Corrupt(e.to_string()))
            }
        }
    }

    /// §4.9 PUT.
    pub async fn put(&self, bucket: &str, object: &str, bytes: &[u8], content_type: Option<&str>) -> Result<()> {
        let k = self.config.ec.data_shards as usize;
        let m = self.config.ec.parity_shards as usize;
        let disks = self.select_disks(bucket, object, k + m)?;

        if disks.len() < k + m || (bytes.len() as u64) < self.config.inline_threshold {
            let meta = ObjectMetadata::new_inline(bytes, content_type, std::iter::empty());
            return self.write_xl_meta(&disks[0], bucket, object, &meta).await;
        }

        let codec = ErasureCodec::new(self.config.ec)?;
        let shards = codec.encode(bytes)?;
        let block_size = shards.first().map_or(0, |s| s.len()) as u64;
        let checksums: Vec<ChunkChecksum> = shards.iter().map(|s| ChunkChecksum::new(checksum(s))).collect();
        let meta = ObjectMetadata::new_erasure_coded(
            bytes.len() as u64,
            content_type,
            std::iter::empty(),
            k as u32,
            m as u32,
            block_size,
            checksums,
        )?;

        let chunk_writes = shards
            .into_iter()
            .enumerate()
            .map(|(i, shard)| self.write_chunk(&disks[i], bucket, object, i + 1, shard));
        for result in futures::future::join_all(chunk_writes).await {
            result?;
        }

        let meta_writes = disks.iter().map(|target| self.write_xl_meta(target, bucket, object, &meta));
        for result in futures::future::join_all(meta_writes).await {
            result?;
        }
        Ok(())
    }

    /// §4.9 GET.
    pub async fn get(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        let k = self.config.ec.data_shards as usize;
        let m = self.config.ec.parity_shards as usize;
        let disks = self.select_disks(bucket, object, k + m)?;

        let mut meta = None;
        for target in &disks {
            if let Ok(m) = self.read_xl_meta(target, bucket, object).await {
                meta = Some(m);
                break;
            }
        }
        let meta = meta.ok_or_else(|| Error::NotFound(format!("{bucket}/{object}")))?;

        if let Some(bytes) = meta.inline_bytes()? {
            return Ok(bytes);
        }

        let erasure = meta
            .erasure
            .as_ref()
            .ok_or_else(|| Error::corrupt("xl.meta: non-inline object missing erasure info"))?;

        let reads = disks
            .iter()
            .enumerate()
            .map(|(i, target)| self.read_chunk(target, bucket, object, i + 1));
        let read_results = futures::future::join_all(reads).await;

        let mut shards: Vec<Option<Vec<u8>>> = Vec::with_capacity(read_results.len());
        let mut successes = 0usize;
        for (i, result) in read_results.into_iter().enumerate() {
            let shard = match result {
                Ok(data) => {
                    let ok = !self.config.verify_checksums
                        || erasure.checksums.get(i).is_some_and(|c| c.verify(&data));
                    if ok {
                        successes += 1;
                        Some(data)
                    } else {
                        tracing::warn!(%bucket, %object, chunk = i, "chunk failed checksum verification");
                        None
                    }
                }
                Err(e) => {
                    tracing::warn!(%bucket, %object, chunk = i, error = %e, "chunk read failed");
                    None
                }
            };
            shards.push(shard);
        }

        if successes < k {
            return Err(Error::quorum(k, successes));
        }

        let codec = ErasureCodec::new(self.config.ec)?;
        codec.decode(&mut shards, meta.stat.size as usize)
    }

    /// §4.9 DELETE. Idempotent: deleting a missing object is `NOT_FOUND`.
    pub async fn delete(&self, bucket: &str, object: &str) -> Result<()> {
        let k = self.config.ec.data_shards as usize;
        let m = self.config.ec.parity_shards as usize;
        let disks = self.select_disks(bucket, object, k + m)?;

        let mut found = false;
        for target in &disks {
            if let Ok(meta) = self.read_xl_meta(target, bucket, object).await {
                found = true;
                if !meta.is_inline() {
                    let unlinks = (1..=disks.len()).map(|i| self.unlink_chunk(&disks[i - 1], bucket, object, i));
                    futures::future::join_all(unlinks).await;
                }
            }
        }
        if !found {
            return Err(Error::NotFound(format!("{bucket}/{object}")));
        }

        let unlinks = disks.iter().map(|target| self.unlink_xl_meta(target, bucket, object));
        futures::future::join_all(unlinks).await;
        Ok(())
    }

    /// §4.9 HEAD/STAT.
    pub async fn head(&self, bucket: &str, object: &str) -> Result<ObjectMetadata> {
        let k = self.config.ec.data_shards as usize;
        let m = self.config.ec.parity_shards as usize;
        let disks = self.select_disks(bucket, object, k + m)?;
        for target in &disks {
            if let Ok(meta) = self.read_xl_meta(target, bucket, object).await {
                return Ok(meta);
            }
        }
        Err(Error::NotFound(format!("{bucket}/{object}")))
    }

    async fn unlink_chunk(&self, target: &DiskTarget, bucket: &str, object: &str, index: usize) {
        if let DiskTarget::Local(root) = target {
            let _ = std::fs::remove_file(layout::part_path(root, bucket, object, index));
        }
        // Remote chunk debris is left for a future scrub pass, per §4.9.
    }

    async fn unlink_xl_meta(&self, target: &DiskTarget, bucket: &str, object: &str) {
        if let DiskTarget::Local(root) = target {
            let path = layout::xl_meta_path(root, bucket, object);
            let _ = std::fs::remove_file(&path);
            if let Some(dir) = path.parent() {
                let _ = std::fs::remove_dir(dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectio_placement::PlacementManager;
    use objectio_topology::TopologyDocument;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn single_disk_coordinator() -> (tempfile::TempDir, Coordinator) {
        let dir = tempdir().unwrap();
        let placement = Arc::new(PlacementManager::new());
        let config = CoordinatorConfig {
            ec: ErasureConfig::new(2, 1),
            inline_threshold: 16,
            verify_checksums: true,
        };
        let coordinator = Coordinator::new(placement, RpcClient::new(), config, vec![dir.path().to_path_buf()]);
        (dir, coordinator)
    }

    #[tokio::test]
    async fn small_object_round_trips_inline() {
        let (_dir, coordinator) = single_disk_coordinator();
        coordinator.put("bucket", "small", b"hi", Some("text/plain")).await.unwrap();
        let data = coordinator.get("bucket", "small").await.unwrap();
        assert_eq!(data, b"hi");
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (_dir, coordinator) = single_disk_coordinator();
        coordinator.put("bucket", "obj", b"hi", None).await.unwrap();
        coordinator.delete("bucket", "obj").await.unwrap();
        assert_eq!(coordinator.get("bucket", "obj").await.unwrap_err().error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn delete_missing_object_is_not_found() {
        let (_dir, coordinator) = single_disk_coordinator();
        assert_eq!(coordinator.delete("bucket", "missing").await.unwrap_err().error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn head_returns_metadata_without_body() {
        let (_dir, coordinator) = single_disk_coordinator();
        coordinator.put("bucket", "obj", b"payload", None).await.unwrap();
        let meta = coordinator.head("bucket", "obj").await.unwrap();
        assert_eq!(meta.stat.size, 7);
    }

    #[tokio::test]
    async fn erasure_coded_round_trip_across_multiple_disks() {
        let dir = tempdir().unwrap();
        let disk_roots: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("disk{i}"))).collect();

        let mut topology = TopologyDocument::new(Uuid::new_v4());
        topology.add_pool();
        let disks = disk_roots
            .iter()
            .map(|root| {
                let mut d = DiskEntry::new(Uuid::new_v4());
                d.endpoint = root.to_string_lossy().to_string();
                d
            })
            .collect();
        topology.add_set(0, disks).unwrap();

        let placement = Arc::new(PlacementManager::new());
        placement.rebuild_ring(&topology);

        let config = CoordinatorConfig {
            ec: ErasureConfig::new(2, 1),
            inline_threshold: 4,
            verify_checksums: true,
        };
        let coordinator = Coordinator::new(placement, RpcClient::new(), config, vec![]);

        let payload = vec![7u8; 4096];
        coordinator.put("bucket", "big", &payload, Some("application/octet-stream")).await.unwrap();
        let data = coordinator.get("bucket", "big").await.unwrap();
        assert_eq!(data, payload);
    }
}
