//! # Engine - RiptideKV Bitcask Storage Engine
//!
//! An embeddable, single-writer, log-structured key-value store. A database
//! is a directory of append-only data files; [`Engine`] owns the active
//! file, the immutable ones, and an in-memory [`index::Indexer`] mapping
//! keys to on-disk positions.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → encode record → append to active   │
//! │              |         file → update index    │
//! │              |  (file full?)                  │
//! │              v            yes                 │
//! │           rotate: active → immutable,          │
//! │                   open new active file         │
//! │                                               │
//! │ read.rs  → index lookup → read + verify record │
//! │                                               │
//! │ merge.rs → rewrite live records into sibling   │
//! │            directory → hint file → promote     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module       | Purpose                                                |
//! |--------------|---------------------------------------------------------|
//! | [`lib.rs`]   | `Engine` struct, `open`, accessors, `Close`, `Sync`, `Stat` |
//! | [`recovery`] | `loadMergeFile`, `loadDataFiles`, `loadIndexFromHintFile`, `loadIndexFromDatafile`, `loadSeqNo` |
//! | [`write`]    | `put`, `delete`, the internal append path (§4.6)       |
//! | [`read`]     | `get`, `list_keys`, `fold`, the forward/reverse iterator façade |
//! | [`merge`]    | Compaction pipeline: admission, execution, promotion   |
//! | [`batch`]    | `WriteBatch`: staged multi-key atomic commits          |
//! | [`sys`]      | Directory advisory lock, dir-size walk, free-space query |
//!
//! ## Crash Safety
//!
//! Every write lands in the active file before the index is updated. A
//! crash mid-append leaves a torn tail record that recovery detects and
//! discards as a clean end-of-file (never a hard error). Merge writes a
//! completion marker only after every live record and the hint file are
//! durably synced; an incomplete merge sidecar is discarded wholesale on
//! the next Open.
mod batch;
pub mod error;
mod merge;
mod read;
mod recovery;
mod sys;
mod write;

pub use batch::WriteBatch;
pub use error::{Errors, Result};
pub use read::DbIterator;

use config::{DbOptions, IndexType};
use datafile::DataFile;
use index::{Indexer, IndexKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Translates the configuration-facing [`IndexType`] into the
/// implementation-facing [`IndexKind`] the `index` crate actually builds
/// from. Kept as a thin mapping rather than merging the two enums so
/// `config` never has to depend on `index`.
fn index_kind(t: IndexType) -> IndexKind {
    match t {
        IndexType::BTree => IndexKind::BTree,
        IndexType::Art => IndexKind::Art,
        IndexType::BPlusTree => IndexKind::BPlusTree,
    }
}

/// `{key_num, data_file_num, reclaim_size, disk_size}`, as returned by
/// [`Engine::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Number of keys currently live in the index.
    pub key_num: usize,
    /// Number of data files on disk, active file included.
    pub data_file_num: usize,
    /// Running lower bound on dead bytes across immutable files.
    pub reclaim_size: u64,
    /// Total on-disk byte size of the database directory.
    pub disk_size: u64,
}

/// The central storage engine: one open database directory.
///
/// # Write path
///
/// 1. Reject an empty key.
/// 2. Encode a framed record (`varint(0) ‖ key` for non-batch writes).
/// 3. Append it via the internal append path (§4.6), rotating the active
///    file if it would overflow `data_file_size`.
/// 4. Update the index; fold the prior position's size (if any) into
///    `reclaim_size`.
///
/// # Read path
///
/// Look up the key's position in the index, read and CRC-verify the framed
/// record at that position, reject tombstones as `KeyNotFound`.
///
/// # Recovery
///
/// On [`Engine::open`], any pending merge promotion is completed first,
/// then data files are loaded, the index is seeded from a hint file if one
/// exists, and finally (for the two in-memory backends) records beyond the
/// merge boundary are replayed, honoring transaction-commit markers.
pub struct Engine {
    pub(crate) options: DbOptions,
    pub(crate) active_file: RwLock<DataFile>,
    pub(crate) older_files: RwLock<HashMap<u32, DataFile>>,
    pub(crate) index: Box<dyn Indexer>,
    pub(crate) seq: AtomicU64,
    pub(crate) reclaim_size: AtomicU64,
    /// Serializes Put/Delete/Commit, standing in for the design's `DB.mu`
    /// write lock. Held across each operation's full append-then-index
    /// critical section rather than split across finer-grained field locks.
    pub(crate) write_lock: Mutex<()>,
    pub(crate) batch_commit_lock: Mutex<()>,
    pub(crate) merging_lock: Mutex<()>,
    pub(crate) bytes_since_sync: Mutex<usize>,
    pub(crate) seq_no_file_exists: bool,
    pub(crate) is_initial: bool,
    lock_file: Option<File>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dir_path", &self.options.dir_path)
            .field("seq", &self.seq.load(Ordering::SeqCst))
            .field("reclaim_size", &self.reclaim_size.load(Ordering::SeqCst))
            .field("is_initial", &self.is_initial)
            .finish()
    }
}

impl Engine {
    /// Opens (or creates) a database rooted at `options.dir_path`, running
    /// the full recovery sequence described in [`recovery`].
    pub fn open(options: DbOptions) -> Result<Self> {
        options.validate()?;

        let dir_path: PathBuf = options.dir_path.clone();
        let is_initial = !dir_path.exists();
        if is_initial {
            std::fs::create_dir_all(&dir_path)?;
        }
        let is_initial = is_initial || std::fs::read_dir(&dir_path)?.next().is_none();

        let lock_file = sys::acquire_directory_lock(&dir_path)?;

        let merge_boundary = merge::load_merge_file(&dir_path)?;

        let mmap_at_startup = options.mmap_at_startup;
        let (mut active_file, mut older_files, file_ids) =
            recovery::load_data_files(&dir_path, mmap_at_startup)?;

        let index = index::new_indexer(index_kind(options.index_type), &dir_path)?;

        recovery::load_index_from_hint_file(
            &dir_path,
            index.as_ref(),
            options.index_type,
            merge_boundary,
        )?;

        let mut seq = 0u64;
        let mut reclaim_size = 0u64;
        let mut seq_no_file_exists = false;
        if options.index_type != IndexType::BPlusTree {
            let (loaded_seq, loaded_reclaim_size) = recovery::load_index_from_datafile(
                index.as_ref(),
                &active_file,
                &older_files,
                &file_ids,
            )?;
            seq = loaded_seq;
            reclaim_size = loaded_reclaim_size;
        } else {
            let (loaded_seq, existed) = recovery::load_seq_no(&dir_path)?;
            seq = loaded_seq;
            seq_no_file_exists = existed;
        }

        if mmap_at_startup {
            let active_id = active_file.file_id();
            active_file = DataFile::reopen_standard(&dir_path, active_id)?;
            let mut reopened = HashMap::with_capacity(older_files.len());
            for id in older_files.keys().copied().collect::<Vec<_>>() {
                reopened.insert(id, DataFile::reopen_standard(&dir_path, id)?);
            }
            older_files = reopened;
        }

        log::info!(
            "opened database at {:?} (seq={}, files={}, index={:?})",
            dir_path,
            seq,
            file_ids.len().max(1),
            options.index_type
        );

        Ok(Self {
            options,
            active_file: RwLock::new(active_file),
            older_files: RwLock::new(older_files),
            index,
            seq: AtomicU64::new(seq),
            reclaim_size: AtomicU64::new(reclaim_size),
            write_lock: Mutex::new(()),
            batch_commit_lock: Mutex::new(()),
            merging_lock: Mutex::new(()),
            bytes_since_sync: Mutex::new(0),
            seq_no_file_exists,
            is_initial,
            lock_file: Some(lock_file),
        })
    }

    /// Flushes the active file to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.active_file.read().sync()?;
        Ok(())
    }

    /// `{key_num, data_file_num, reclaim_size, disk_size}`.
    pub fn stat(&self) -> Result<Stat> {
        let key_num = self.index.size()?;
        let data_file_num = self.older_files.read().len() + 1;
        let disk_size = sys::dir_size(&self.options.dir_path)?;
        Ok(Stat {
            key_num,
            data_file_num,
            reclaim_size: self.reclaim_size.load(Ordering::SeqCst),
            disk_size,
        })
    }

    /// Releases the directory lock, closes the index backend (flushing the
    /// B+-tree if in use), persists `seq-no` (meaningful only for the
    /// B+-tree backend, but always safe to write), and closes every data
    /// file in ascending id order.
    pub fn close(&mut self) -> Result<()> {
        if !self.options.dir_path.exists() {
            return Ok(());
        }

        self.index.close()?;

        let seq_no_file = DataFile::open_seq_no_file(&self.options.dir_path)?;
        let mut seq_no_file = seq_no_file;
        let seq = self.seq.load(Ordering::SeqCst);
        seq_no_file.write(format!("{seq}").as_bytes())?;
        seq_no_file.sync()?;

        {
            let active = self.active_file.read();
            active.sync()?;
            active.close()?;
        }
        let mut ids: Vec<u32> = self.older_files.read().keys().copied().collect();
        ids.sort_unstable();
        let older = self.older_files.read();
        for id in ids {
            if let Some(f) = older.get(&id) {
                f.close()?;
            }
        }
        drop(older);

        // Unlocking the directory lock on every exit path is treated as a
        // failure-safe scope: a failure here indicates a broken OS state
        // the caller cannot meaningfully recover from.
        if let Some(lock) = self.lock_file.take() {
            fs2::FileExt::unlock(&lock).expect("failed to release database directory lock");
        }
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests;
