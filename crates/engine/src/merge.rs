//! Compaction (merge) pipeline: admission checks, the single-threaded
//! rewrite into a sibling directory, and the promotion that runs at the
//! next `Open`. Grounded on `merge.go` end to end (`nonMergeFileId`
//! boundary, the `<dir>-merge` sidecar, `loadMergeFile`/
//! `loadIndexFromHintFile` promotion).

use crate::error::{Errors, Result};
use crate::Engine;
use codec::{parse_key_with_seq, LogRecordType};
use datafile::{
    data_file_name, DataFile, BPTREE_INDEX_FILE_NAME, LOCK_FILE_NAME, SEQ_NO_FILE_NAME,
};
use config::DbOptions;
use std::path::{Path, PathBuf};

/// Names the sidecar merge directory for `dir`: its basename suffixed with
/// `-merge`, in the same parent.
fn merge_dir_path(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match dir.parent() {
        Some(parent) => parent.join(format!("{name}-merge")),
        None => PathBuf::from(format!("{name}-merge")),
    }
}

/// Files in the merge sidecar that must never migrate into the primary
/// directory during promotion: they belong to the *temporary* engine that
/// wrote the sidecar, not the primary one.
fn is_non_migrating(name: &str) -> bool {
    name == SEQ_NO_FILE_NAME || name == LOCK_FILE_NAME || name == BPTREE_INDEX_FILE_NAME
}

/// Completes any pending merge promotion left over from a prior run.
/// Returns the merge boundary (`nonMergeFileId`) if a promotion happened
/// this call, so the caller can apply the B+-tree hint-overwrite rule.
pub(crate) fn load_merge_file(dir: &Path) -> Result<Option<u32>> {
    let merge_dir = merge_dir_path(dir);
    if !merge_dir.exists() {
        return Ok(None);
    }

    let finished_marker = merge_dir.join(datafile::MERGE_FINISHED_FILE_NAME);
    if !finished_marker.exists() {
        std::fs::remove_dir_all(&merge_dir)?;
        return Ok(None);
    }

    let marker_file = DataFile::open_merge_finished_file(&merge_dir)?;
    let (record, _) = marker_file
        .read_log_record(0)?
        .ok_or(Errors::DataDirectoryCorrupted)?;
    let boundary: u32 = String::from_utf8_lossy(&record.value)
        .parse()
        .map_err(|_| Errors::DataDirectoryCorrupted)?;

    for id in 0..boundary {
        let path = data_file_name(dir, id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
    }

    for entry in std::fs::read_dir(&merge_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_non_migrating(&name) {
            continue;
        }
        std::fs::rename(entry.path(), dir.join(name.as_ref()))?;
    }
    std::fs::remove_dir_all(&merge_dir)?;

    log::info!("promoted pending merge at {:?} (boundary={})", dir, boundary);
    Ok(Some(boundary))
}

impl Engine {
    /// Runs merge to completion: admission checks, the foreground rewrite,
    /// and durable commit of the sidecar. Promotion into the primary
    /// directory happens on the next `Open`, per [`load_merge_file`].
    pub fn merge(&self) -> Result<()> {
        let _guard = self
            .merging_lock
            .try_lock()
            .map_err(|_| Errors::MergeInProgress)?;

        let stat = self.stat()?;
        if stat.disk_size > 0 {
            let ratio = self.reclaim_size_f64() / stat.disk_size as f64;
            if ratio < self.options.data_file_merge_ratio as f64 {
                return Err(Errors::MergeRatioUnreached);
            }
        }
        let free_space = crate::sys::available_disk_space(&self.options.dir_path)?;
        if stat.disk_size.saturating_sub(stat.reclaim_size) >= free_space {
            return Err(Errors::NoFreeSpaceForMerge);
        }

        let dir = self.options.dir_path.clone();
        let merge_dir = merge_dir_path(&dir);
        if merge_dir.exists() {
            std::fs::remove_dir_all(&merge_dir)?;
        }
        std::fs::create_dir_all(&merge_dir)?;

        let boundary = {
            let mut active = self.active_file.write();
            active.sync()?;
            let old_id = active.file_id();
            let new_active = DataFile::open(&dir, old_id + 1, io::IoType::Standard)?;
            let retired = std::mem::replace(&mut *active, new_active);
            let boundary = retired.file_id() + 1;
            self.older_files.write().insert(old_id, retired);
            boundary
        };

        let older_guard = self.older_files.read();
        let mut candidate_ids: Vec<u32> = older_guard
            .keys()
            .copied()
            .filter(|id| *id < boundary)
            .collect();
        candidate_ids.sort_unstable();
        let candidate_count = candidate_ids.len();

        let temp_options = DbOptions {
            dir_path: merge_dir.clone(),
            data_file_size: self.options.data_file_size,
            sync_writes: false,
            bytes_per_sync: 0,
            mmap_at_startup: false,
            index_type: config::IndexType::BTree,
            data_file_merge_ratio: 0.0,
        };
        let temp_engine = Engine::open(temp_options)?;
        let mut hint_file = DataFile::open_hint_file(&merge_dir)?;

        for id in candidate_ids {
            let source = match older_guard.get(&id) {
                Some(f) => f,
                None => continue,
            };
            let mut offset = 0u64;
            while let Some((record, size)) = source.read_log_record(offset)? {
                if record.record_type == LogRecordType::Normal {
                    let (user_key, _seq) = parse_key_with_seq(&record.key);
                    let candidate_pos = codec::Position {
                        file_id: id,
                        offset: offset as i64,
                        size: size as u32,
                    };
                    let is_live = matches!(self.index.get(&user_key)?, Some(p) if p == candidate_pos);
                    if is_live {
                        let new_pos = temp_engine.append_record(
                            codec::encode_key_with_seq(&user_key, 0),
                            record.value.clone(),
                            LogRecordType::Normal,
                        )?;
                        hint_file.write_hint_record(&user_key, &new_pos)?;
                    }
                }
                offset += size;
            }
        }
        drop(older_guard);

        hint_file.sync()?;
        temp_engine.sync()?;

        let mut marker_file = DataFile::open_merge_finished_file(&merge_dir)?;
        let record = codec::LogRecord {
            key: Vec::new(),
            value: boundary.to_string().into_bytes(),
            record_type: LogRecordType::Normal,
        };
        marker_file.write(&record.encode())?;
        marker_file.sync()?;

        hint_file.close()?;
        marker_file.close()?;
        drop(temp_engine);

        log::info!(
            "merge finished at {:?}: {} candidate file(s) below boundary {}",
            dir,
            candidate_count,
            boundary
        );
        Ok(())
    }

    fn reclaim_size_f64(&self) -> f64 {
        self.reclaim_size.load(std::sync::atomic::Ordering::SeqCst) as f64
    }
}
