//! Write path: `put`, `delete`, and the internal append path (§4.6) shared
//! by both of them, by the batch layer, and by the merge pipeline's
//! rewrite into its temporary engine.
//!
//! Every mutation is first framed and appended to the active file, then
//! reflected into the index; the prior position's size (if any) is folded
//! into `reclaim_size` so merge admission can judge how much of the
//! directory is dead weight.

use crate::error::{Errors, Result};
use crate::Engine;
use codec::{encode_key_with_seq, LogRecord, LogRecordType, Position};
use datafile::DataFile;
use io::IoType;
use std::sync::atomic::Ordering;

impl Engine {
    /// Inserts or overwrites `key`'s value.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(Errors::KeyIsEmpty);
        }
        let _write_guard = self.write_lock.lock().unwrap();
        let encoded_key = encode_key_with_seq(&key, 0);
        let pos = self.append_record(encoded_key, value, LogRecordType::Normal)?;
        let prior = self.index.put(key, pos)?;
        if let Some(prior) = prior {
            self.reclaim_size.fetch_add(prior.size as u64, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Removes `key`. A no-op (not an error) if the key is already absent.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Errors::KeyIsEmpty);
        }
        let _write_guard = self.write_lock.lock().unwrap();
        if self.index.get(key)?.is_none() {
            return Ok(());
        }

        let encoded_key = encode_key_with_seq(key, 0);
        let tombstone_pos =
            self.append_record(encoded_key, Vec::new(), LogRecordType::Tombstone)?;
        self.reclaim_size
            .fetch_add(tombstone_pos.size as u64, Ordering::SeqCst);

        let (prior, existed) = self.index.delete(key)?;
        if !existed {
            return Err(Errors::IndexUpdateFailed);
        }
        if let Some(prior) = prior {
            self.reclaim_size.fetch_add(prior.size as u64, Ordering::SeqCst);
        }
        Ok(())
    }

    /// The internal append path (§4.6): encodes `(encoded_key, value,
    /// record_type)`, rotates the active file if it would overflow
    /// `data_file_size`, appends, applies the sync policy, and returns the
    /// position the record landed at.
    pub(crate) fn append_record(
        &self,
        encoded_key: Vec<u8>,
        value: Vec<u8>,
        record_type: LogRecordType,
    ) -> Result<Position> {
        let record = LogRecord {
            key: encoded_key,
            value,
            record_type,
        };
        let encoded = record.encode();
        let size = encoded.len() as u64;

        let mut active = self.active_file.write();
        if active.offset() + size > self.options.data_file_size {
            active.sync()?;
            let old_id = active.file_id();
            log::debug!(
                "active file {old_id} would overflow data_file_size ({} + {size} > {}), rotating to {}",
                active.offset(),
                self.options.data_file_size,
                old_id + 1,
            );
            let new_active = DataFile::open(&self.options.dir_path, old_id + 1, IoType::Standard)?;
            let retired = std::mem::replace(&mut *active, new_active);
            self.older_files.write().insert(old_id, retired);
        }

        let pre_write_offset = active.offset();
        active.write(&encoded)?;

        let mut bytes_since_sync = self.bytes_since_sync.lock().unwrap();
        *bytes_since_sync += encoded.len();
        if self.options.sync_writes
            || (self.options.bytes_per_sync > 0 && *bytes_since_sync >= self.options.bytes_per_sync)
        {
            active.sync()?;
            *bytes_since_sync = 0;
        }

        Ok(Position {
            file_id: active.file_id(),
            offset: pre_write_offset as i64,
            size: encoded.len() as u32,
        })
    }
}
