//! Per-disk primitives: atomic file I/O (C1), the on-disk path layout
//! (§6), and the `xl.meta` object-metadata document (§3).
//!
//! This crate deliberately knows nothing about erasure coding, placement,
//! or the network — it is the lowest layer the coordinator (C9) and the
//! RPC shim (C10) build on to read and write a single disk.

pub mod atomic;
pub mod layout;
pub mod xlmeta;

pub use atomic::{read_all, write_atomic};
pub use xlmeta::{ChunkChecksum, ErasureInfo, ObjectMetadata, StatInfo, VersioningInfo, checksum};
