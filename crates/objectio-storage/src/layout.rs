//! On-disk path layout (§6).
//!
//! ```text
//! <disk_root>/
//!   .buckets.sys/
//!     format.json
//!     topology.json
//!   <bucket>/<object-key-dir>/
//!     xl.meta
//!     part.<i>
//! ```
//!
//! Object keys may contain `/`; the object directory is the verbatim key
//! joined onto the bucket directory, so `"a/b/c"` nests three levels deep
//! the same way the S3 key namespace implies.

use std::path::{Path, PathBuf};

const SYSTEM_DIR: &str = ".buckets.sys";

/// Path to the disk's replicated format document.
#[must_use]
pub fn format_path(disk_root: &Path) -> PathBuf {
    disk_root.join(SYSTEM_DIR).join("format.json")
}

/// Path to the disk's replicated topology document.
#[must_use]
pub fn topology_path(disk_root: &Path) -> PathBuf {
    disk_root.join(SYSTEM_DIR).join("topology.json")
}

/// Directory holding an object's `xl.meta` and chunk files.
#[must_use]
pub fn object_dir(disk_root: &Path, bucket: &str, object: &str) -> PathBuf {
    disk_root.join(bucket).join(object)
}

/// Path to an object's metadata document.
#[must_use]
pub fn xl_meta_path(disk_root: &Path, bucket: &str, object: &str) -> PathBuf {
    object_dir(disk_root, bucket, object).join("xl.meta")
}

/// Path to chunk `index` (1-indexed: `1..=data+parity`) of an object.
#[must_use]
pub fn part_path(disk_root: &Path, bucket: &str, object: &str, index: usize) -> PathBuf {
    object_dir(disk_root, bucket, object).join(format!("part.{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_match_spec_shape() {
        let root = Path::new("/mnt/disk1");
        assert_eq!(format_path(root), Path::new("/mnt/disk1/.buckets.sys/format.json"));
        assert_eq!(topology_path(root), Path::new("/mnt/disk1/.buckets.sys/topology.json"));
        assert_eq!(xl_meta_path(root, "b", "o"), Path::new("/mnt/disk1/b/o/xl.meta"));
        assert_eq!(part_path(root, "b", "o", 3), Path::new("/mnt/disk1/b/o/part.3"));
    }

    #[test]
    fn nested_object_keys_nest_directories() {
        let root = Path::new("/mnt/disk1");
        assert_eq!(
            xl_meta_path(root, "b", "a/b/c"),
            Path::new("/mnt/disk1/b/a/b/c/xl.meta")
        );
    }
}
