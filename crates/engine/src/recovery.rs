//! Open-time recovery: loading data files, seeding the index from a hint
//! file, and (for the in-memory backends) replaying records beyond the
//! merge boundary while honoring transaction-commit markers. Grounded on
//! `db.go`'s `loadDataFiles`/`loadIndexFromDatafile` and `batch.go`'s
//! `TxnFinished` staging discipline; `loadMergeFile` itself lives in
//! [`crate::merge`] since it is part of the merge pipeline proper.

use crate::error::{Errors, Result};
use codec::{decode_position, parse_key_with_seq, LogRecordType, Position};
use config::IndexType;
use datafile::{parse_data_file_id, DataFile, DATA_FILE_NAME_SUFFIX};
use index::Indexer;
use io::IoType;
use std::collections::HashMap;
use std::path::Path;

/// Key used for a batch's commit marker, before the sequence-number prefix
/// is added: `varint(S) ‖ "txn-fin"`.
pub(crate) const TXN_FIN_KEY: &[u8] = b"txn-fin";

/// Enumerates `*.data`, parses and sorts file ids, and opens each one. The
/// highest id becomes the active file; the rest are immutable. Returns the
/// active file, the immutable map, and the full sorted id list (used by
/// [`load_index_from_datafile`] to iterate in order).
pub(crate) fn load_data_files(
    dir: &Path,
    mmap_at_startup: bool,
) -> Result<(DataFile, HashMap<u32, DataFile>, Vec<u32>)> {
    let io_type = if mmap_at_startup {
        IoType::ReadOnlyMapped
    } else {
        IoType::Standard
    };

    let mut file_ids = Vec::new();
    if dir.exists() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.ends_with(DATA_FILE_NAME_SUFFIX) {
                continue;
            }
            match parse_data_file_id(&name) {
                Some(id) => file_ids.push(id),
                None => return Err(Errors::DataDirectoryCorrupted),
            }
        }
    }
    file_ids.sort_unstable();

    if file_ids.is_empty() {
        let active = DataFile::open(dir, 0, IoType::Standard)?;
        return Ok((active, HashMap::new(), vec![0]));
    }

    let active_id = *file_ids.last().unwrap();
    let mut older_files = HashMap::with_capacity(file_ids.len().saturating_sub(1));
    for &id in &file_ids {
        if id == active_id {
            continue;
        }
        older_files.insert(id, DataFile::open(dir, id, io_type)?);
    }
    let active = DataFile::open(dir, active_id, io_type)?;
    Ok((active, older_files, file_ids))
}

/// Seeds the index from `hint-index`, if present. For the persistent
/// B+-tree backend, a hint entry only overwrites a live index entry whose
/// file-id is below `merge_boundary` (the "safer rule" — post-merge writes
/// always supersede merge output); for the in-memory backends the
/// subsequent [`load_index_from_datafile`] pass always supersedes hint
/// entries anyway, so they're applied unconditionally.
pub(crate) fn load_index_from_hint_file(
    dir: &Path,
    index: &dyn Indexer,
    index_type: IndexType,
    merge_boundary: Option<u32>,
) -> Result<()> {
    let hint_path = dir.join(datafile::HINT_FILE_NAME);
    if !hint_path.exists() {
        return Ok(());
    }

    let hint_file = DataFile::open_hint_file(dir)?;
    let mut offset = 0u64;
    while let Some((record, size)) = hint_file.read_log_record(offset)? {
        let pos = decode_position(&record.value).ok_or(Errors::DataDirectoryCorrupted)?;

        if index_type == IndexType::BPlusTree {
            if let Some(boundary) = merge_boundary {
                let current = index.get(&record.key)?;
                let allowed = match current {
                    None => true,
                    Some(existing) => existing.file_id < boundary,
                };
                if allowed {
                    index.put(record.key, pos)?;
                }
            }
        } else {
            index.put(record.key, pos)?;
        }
        offset += size;
    }
    Ok(())
}

/// Scans every data file (active and immutable) for records, applying
/// non-transactional writes immediately and staging transactional ones
/// keyed by sequence number until their `TxnFinished` marker is observed.
/// Staged records whose marker never appears (a crash mid-batch) are
/// dropped silently when the scan ends. Returns the maximum sequence
/// number seen (so the engine's counter resumes past it) and the total
/// dead-byte count accumulated while applying the scan (so `reclaim_size`
/// is correct immediately after Open, not reset to zero until the next
/// live write) — every overwritten or deleted record's prior size, plus
/// the framed size of every tombstone, is folded in exactly as the live
/// write path in `write.rs`/`batch.rs` does.
pub(crate) fn load_index_from_datafile(
    index: &dyn Indexer,
    active_file: &parking_lot::RwLock<DataFile>,
    older_files: &parking_lot::RwLock<HashMap<u32, DataFile>>,
    file_ids: &[u32],
) -> Result<(u64, u64)> {
    let mut max_seq = 0u64;
    let mut reclaim_size = 0u64;
    let mut staged: HashMap<u64, Vec<(Vec<u8>, Position, LogRecordType)>> = HashMap::new();

    let active_guard = active_file.read();
    let older_guard = older_files.read();

    for &file_id in file_ids {
        let mut offset = 0u64;
        let file_size = if file_id == active_guard.file_id() {
            active_guard.offset()
        } else {
            older_guard.get(&file_id).map_or(0, |f| f.offset())
        };
        loop {
            let read_result = if file_id == active_guard.file_id() {
                active_guard.read_log_record(offset)?
            } else {
                match older_guard.get(&file_id) {
                    Some(f) => f.read_log_record(offset)?,
                    None => break,
                }
            };
            let (record, size) = match read_result {
                Some(r) => r,
                None => {
                    if offset < file_size {
                        log::warn!(
                            "tolerating a truncated tail record in file {file_id} at offset {offset} (file size {file_size}); treating it as end-of-file",
                        );
                    }
                    break;
                }
            };

            let (user_key, seq) = parse_key_with_seq(&record.key);
            max_seq = max_seq.max(seq);
            let pos = Position {
                file_id,
                offset: offset as i64,
                size: size as u32,
            };

            if seq == 0 {
                reclaim_size += apply_one(index, &user_key, pos, record.record_type)?;
            } else if record.record_type == LogRecordType::TxnFinished {
                if let Some(batch) = staged.remove(&seq) {
                    for (key, pos, rtype) in batch {
                        reclaim_size += apply_one(index, &key, pos, rtype)?;
                    }
                }
            } else {
                staged
                    .entry(seq)
                    .or_default()
                    .push((user_key, pos, record.record_type));
            }

            offset += size;
        }
    }

    // Any remaining staged batches never saw a TxnFinished marker — a crash
    // mid-commit. They are dropped here simply by letting `staged` go out
    // of scope unapplied.
    Ok((max_seq, reclaim_size))
}

/// Applies one recovered record to the index, returning the number of dead
/// bytes it accounts for: the prior position's size (if this write or
/// delete overwrote a live entry) plus, for a tombstone, the tombstone's
/// own framed size — the same accounting `write.rs`'s `put`/`delete` and
/// `batch.rs`'s `commit` perform on the live path.
fn apply_one(
    index: &dyn Indexer,
    user_key: &[u8],
    pos: Position,
    record_type: LogRecordType,
) -> Result<u64> {
    let mut reclaimed = 0u64;
    match record_type {
        LogRecordType::Normal => {
            if let Some(prior) = index.put(user_key.to_vec(), pos)? {
                reclaimed += prior.size as u64;
            }
        }
        LogRecordType::Tombstone => {
            reclaimed += pos.size as u64;
            let (prior, _existed) = index.delete(user_key)?;
            if let Some(prior) = prior {
                reclaimed += prior.size as u64;
            }
        }
        LogRecordType::TxnFinished => {}
    }
    Ok(reclaimed)
}

/// Reads and deletes `seq-no`, returning the last-used sequence number and
/// whether the file existed at all (an absent file means this is a fresh
/// database and the batch layer must refuse to build until the first
/// successful `Close` writes one).
pub(crate) fn load_seq_no(dir: &Path) -> Result<(u64, bool)> {
    let path = dir.join(datafile::SEQ_NO_FILE_NAME);
    if !path.exists() {
        return Ok((0, false));
    }
    let contents = std::fs::read_to_string(&path)?;
    std::fs::remove_file(&path)?;
    let seq = contents.trim().parse::<u64>().unwrap_or(0);
    Ok((seq, true))
}
