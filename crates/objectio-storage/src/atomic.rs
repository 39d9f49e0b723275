//! Write-temp-fsync-rename atomic file I/O (C1).
//!
//! Every structured document the cluster persists — `format.json`,
//! `topology.json`, `xl.meta` — goes through [`write_atomic`] so that a
//! crash mid-write never leaves a torn file in place of the previous
//! version. The rename-then-fsync-parent ordering is the durability
//! contract: once `write_atomic` returns `Ok`, the new content is either
//! fully visible at `path` or the old content still is.

use objectio_common::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Write `bytes` to `path` atomically.
///
/// Creates parent directories if missing, writes to a sibling temp file
/// named `<file>.tmp.<pid>`, flushes and fsyncs it, renames it over
/// `path`, then fsyncs the parent directory so the rename itself is
/// durable.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::invalid_argument("write_atomic: path has no parent directory"))?;
    fs::create_dir_all(parent).map_err(|e| {
        Error::storage(format!("write_atomic: mkdir {}: {e}", parent.display()))
    })?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::invalid_argument("write_atomic: path has no file name"))?
        .to_string_lossy();
    let tmp_path = parent.join(format!("{file_name}.tmp.{}", std::process::id()));

    {
        let mut tmp = File::create(&tmp_path).map_err(|e| {
            Error::storage(format!("write_atomic: create {}: {e}", tmp_path.display()))
        })?;
        tmp.write_all(bytes).map_err(|e| {
            Error::storage(format!("write_atomic: write {}: {e}", tmp_path.display()))
        })?;
        tmp.sync_all().map_err(|e| {
            Error::storage(format!("write_atomic: fsync {}: {e}", tmp_path.display()))
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::storage(format!(
            "write_atomic: rename {} -> {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    sync_dir(parent)?;
    Ok(())
}

/// Read the entire contents of `path`.
///
/// Returns [`Error::NotFound`] if the file does not exist, otherwise
/// [`Error::Storage`] on any other I/O failure.
pub fn read_all(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(path.display().to_string()))
        }
        Err(e) => Err(Error::storage(format!("read_all: {}: {e}", path.display()))),
    }
}

fn sync_dir(dir: &Path) -> Result<()> {
    let f = OpenOptions::new()
        .read(true)
        .open(dir)
        .map_err(|e| Error::storage(format!("fsync parent {}: open: {e}", dir.display())))?;
    f.sync_all()
        .map_err(|e| Error::storage(format!("fsync parent {}: {e}", dir.display())))
}
