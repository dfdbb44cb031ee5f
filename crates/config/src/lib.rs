//! # Config - RiptideKV Database Options
//!
//! Plain-data configuration types shared by every layer of the engine:
//! [`DbOptions`] (passed to `Engine::open`), [`IteratorOptions`] (passed when
//! constructing a forward/reverse key iterator), and [`WriteBatchOptions`]
//! (passed when starting an atomic batch).
//!
//! This crate has no internal dependencies — every other crate in the
//! workspace may depend on it, never the reverse.

use std::path::PathBuf;
use thiserror::Error;

/// Selects which in-memory index backend an [`Engine`](../engine/struct.Engine.html) uses.
///
/// All three backends implement the same point-lookup and ordered-iteration
/// contract; they differ in memory layout and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexType {
    /// A sorted in-memory B-tree (fan-out 32), guarded by a reader-writer lock.
    #[default]
    BTree,
    /// An adaptive radix tree, guarded by a reader-writer lock.
    Art,
    /// A persistent B+-tree backed by a single-file transactional page store.
    BPlusTree,
}

/// Options accepted by `Engine::open`.
///
/// `DbOptions::default()` returns a usable configuration: a 64 MiB active-file
/// rotation threshold, the sorted B-tree index, no forced per-write fsync,
/// and a merge admission ratio of 0.5.
#[derive(Debug, Clone)]
pub struct DbOptions {
    /// Root directory the database is rooted at. Must be non-empty.
    pub dir_path: PathBuf,
    /// Size threshold, in bytes, at which the active data file rotates.
    pub data_file_size: u64,
    /// If `true`, every append is followed by an `fsync` of the active file.
    pub sync_writes: bool,
    /// Fsync the active file once accumulated unsynced bytes reach this
    /// threshold. `0` disables byte-budget syncing.
    pub bytes_per_sync: usize,
    /// Use a read-only memory map to accelerate the startup index rebuild.
    pub mmap_at_startup: bool,
    /// Which index backend to use.
    pub index_type: IndexType,
    /// Minimum fraction of reclaimable bytes (`reclaim_size / disk_size`)
    /// required to admit a merge. Must be in `[0.0, 1.0]`.
    pub data_file_merge_ratio: f32,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            dir_path: PathBuf::from("/tmp/riptide-kv"),
            data_file_size: 64 * 1024 * 1024,
            sync_writes: false,
            bytes_per_sync: 0,
            mmap_at_startup: false,
            index_type: IndexType::BTree,
            data_file_merge_ratio: 0.5,
        }
    }
}

/// Raised by `Engine::open` when [`DbOptions`] fails validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// `dir_path` was empty.
    #[error("database directory path is empty")]
    DirPathEmpty,
    /// `data_file_size` was zero.
    #[error("data file size must be greater than zero")]
    DataFileSizeTooSmall,
    /// `data_file_merge_ratio` fell outside `[0.0, 1.0]`.
    #[error("data file merge ratio must be within [0, 1]")]
    InvalidMergeRatio,
}

impl DbOptions {
    /// Validates the option set, matching the checks `Engine::open` must run
    /// before touching the filesystem.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.dir_path.as_os_str().is_empty() {
            return Err(OptionsError::DirPathEmpty);
        }
        if self.data_file_size == 0 {
            return Err(OptionsError::DataFileSizeTooSmall);
        }
        if !(0.0..=1.0).contains(&self.data_file_merge_ratio) {
            return Err(OptionsError::InvalidMergeRatio);
        }
        Ok(())
    }
}

/// Options accepted when constructing a key iterator over the index.
#[derive(Debug, Clone, Default)]
pub struct IteratorOptions {
    /// Only keys starting with this byte string are yielded. Empty means no filter.
    pub prefix: Vec<u8>,
    /// Iterate in descending key order instead of ascending.
    pub reverse: bool,
}

/// Options accepted when constructing a [`WriteBatch`](../engine/struct.WriteBatch.html).
#[derive(Debug, Clone)]
pub struct WriteBatchOptions {
    /// Maximum number of staged operations a single batch may hold.
    pub max_batch_num: usize,
    /// If `true`, `Commit` fsyncs the active file after the batch is appended.
    pub sync_writes: bool,
}

impl Default for WriteBatchOptions {
    fn default() -> Self {
        Self {
            max_batch_num: 10_000,
            sync_writes: true,
        }
    }
}
