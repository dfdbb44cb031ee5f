//! Directory-level OS services: the single-writer advisory lock and the
//! free-space/dir-size queries merge admission needs. Grounded on
//! `stat_linux.go` (`DirSize` via `filepath.Walk`, `AvailableDiskSize` via
//! `syscall.Statfs`); `fs2` is the Rust analog of both `syscall.Flock` and
//! `syscall.Statfs` used there, and is the crate the bitkv reference and
//! several other pack repos reach for to do the same.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::{Errors, Result};

/// Acquires the exclusive, non-blocking advisory lock at `<dir>/flock`,
/// creating the (empty) lock file if it doesn't exist. Held for the
/// lifetime of the returned handle; dropping it releases the lock.
pub(crate) fn acquire_directory_lock(dir: &Path) -> Result<File> {
    let lock_path = dir.join(datafile::LOCK_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&lock_path)?;
    file.try_lock_exclusive().map_err(|_| {
        log::warn!(
            "directory lock at {lock_path:?} is already held by another process",
        );
        Errors::DatabaseInUse
    })?;
    Ok(file)
}

/// Recursively sums the byte size of every regular file under `dir`, the
/// direct analog of `filepath.Walk` in `stat_linux.go`.
pub(crate) fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(std::io::Error::from)?.len();
        }
    }
    Ok(total)
}

/// Queries the free space on the filesystem backing `dir`, the analog of
/// `syscall.Statfs` in `stat_linux.go`.
pub(crate) fn available_disk_space(dir: &Path) -> Result<u64> {
    Ok(fs2::available_space(dir)?)
}
