//! Cross-module scenario: erasure-coded PUT/GET survives disk loss up to
//! the parity budget, and fails once more than `m` chunks are missing.
//! Mirrors the literal scenario 5 from the testable-properties list.

use objectio_common::ErasureConfig;
use objectio_coordinator::{Coordinator, CoordinatorConfig};
use objectio_placement::PlacementManager;
use objectio_rpc::RpcClient;
use objectio_storage::layout;
use objectio_topology::{DiskEntry, TopologyDocument};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;
use uuid::Uuid;

fn six_disk_coordinator() -> (tempfile::TempDir, Vec<PathBuf>, Coordinator) {
    let dir = tempdir().unwrap();
    let disk_roots: Vec<PathBuf> = (0..6).map(|i| dir.path().join(format!("disk{i}"))).collect();

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
        ec: ErasureConfig::new(4, 2),
        inline_threshold: 4,
        verify_checksums: true,
    };
    let coordinator = Coordinator::new(placement, RpcClient::new(), config, vec![]);
    (dir, disk_roots, coordinator)
}

#[tokio::test]
async fn survives_loss_of_up_to_parity_chunks_but_not_beyond() {
    let (_dir, disk_roots, coordinator) = six_disk_coordinator();
    let payload = vec![0xABu8; 10 * 1024 * 1024];
    coordinator.put("bucket", "big", &payload, Some("application/octet-stream")).await.unwrap();

    // Delete the 3rd and 5th chunk files (1-indexed slots 3 and 5).
    for index in [3, 5] {
        let path = layout::part_path(&disk_roots[index - 1], "bucket", "big", index);
        std::fs::remove_file(path).unwrap();
    }
    let data = coordinator.get("bucket", "big").await.unwrap();
    assert_eq!(data, payload);

    // Delete a third chunk: now only 3 of 6 shards remain, below k=4.
    let path = layout::part_path(&disk_roots[5], "bucket", "big", 6);
    std::fs::remove_file(path).unwrap();
    let err = coordinator.get("bucket", "big").await.unwrap_err();
    assert_eq!(err.error_code(), "QUORUM");
}

#[tokio::test]
async fn empty_body_put_round_trips_inline() {
    let (_dir, _roots, coordinator) = six_disk_coordinator();
    coordinator.put("bucket", "empty", b"", None).await.unwrap();
    let data = coordinator.get("bucket", "empty").await.unwrap();
    assert_eq!(data, b"");
}

#[tokio::test]
async fn overwrite_replaces_previous_value() {
    let (_dir, _roots, coordinator) = six_disk_coordinator();
    coordinator.put("bucket", "key", b"first", None).await.unwrap();
    coordinator.put("bucket", "key", b"second", None).await.unwrap();
    assert_eq!(coordinator.get("bucket", "key").await.unwrap(), b"second");
}
