//! Batch/transaction layer: sequence-number tagged atomic multi-key
//! writes, committed under a single `TxnFinished` marker. Grounded on
//! `batch.go`'s `WriteBatch` end to end — the `pendingWrites` staging map,
//! the drop-if-absent-and-unstaged rule for `Delete`, and the
//! lock-order/atomic-sequence-allocation discipline of `Commit`.

use crate::error::{Errors, Result};
use crate::recovery::TXN_FIN_KEY;
use crate::Engine;
use codec::{encode_key_with_seq, LogRecordType};
use config::{IndexType, WriteBatchOptions};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

struct PendingWrite {
    value: Vec<u8>,
    record_type: LogRecordType,
}

/// A builder for one atomic multi-key commit. Staged `put`/`delete` calls
/// accumulate in `pending`; nothing is written to the log until `commit`.
pub struct WriteBatch<'a> {
    engine: &'a Engine,
    options: WriteBatchOptions,
    pending: Mutex<HashMap<Vec<u8>, PendingWrite>>,
}

impl Engine {
    /// Starts a new batch. Fails under the persistent B+-tree backend if
    /// `seq-no` was not present at `Open` — sequence allocation must
    /// strictly increase across restarts for batch-commit semantics to
    /// hold on replay, and a missing `seq-no` means there is no prior
    /// sequence to increase past.
    pub fn new_write_batch(&self, options: WriteBatchOptions) -> Result<WriteBatch<'_>> {
        if self.options.index_type == IndexType::BPlusTree && !self.seq_no_file_exists {
            return Err(Errors::SeqNoFileRequired);
        }
        Ok(WriteBatch {
            engine: self,
            options,
            pending: Mutex::new(HashMap::new()),
        })
    }
}

impl<'a> WriteBatch<'a> {
    /// Stages a `Put`, overwriting any earlier staged write for the same
    /// key in this batch.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(Errors::KeyIsEmpty);
        }
        self.pending.lock().unwrap().insert(
            key,
            PendingWrite {
                value,
                record_type: LogRecordType::Normal,
            },
        );
        Ok(())
    }

    /// Stages a `Delete`. If the key has no live index entry and nothing
    /// is staged for it in this batch, the delete is dropped entirely —
    /// there is nothing to shadow, so there is no point spending a log
    /// record on it. If something *is* staged for it in this batch, that
    /// staged write is simply withdrawn (nothing was ever committed for
    /// it). Otherwise a tombstone is staged.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Errors::KeyIsEmpty);
        }
        let mut pending = self.pending.lock().unwrap();
        if self.engine.index.get(key)?.is_none() {
            pending.remove(key);
            return Ok(());
        }
        pending.insert(
            key.to_vec(),
            PendingWrite {
                value: Vec::new(),
                record_type: LogRecordType::Tombstone,
            },
        );
        Ok(())
    }

    /// Commits every staged operation atomically: all of them are appended
    /// under one freshly allocated sequence number, followed by a
    /// `TxnFinished` marker tagged with the same sequence. Only once that
    /// marker is itself durable does the batch apply to the index.
    pub fn commit(&self) -> Result<()> {
        let mut pending = self.pending.lock().unwrap();
        if pending.len() > self.options.max_batch_num {
            return Err(Errors::ExceedMaxBatchNum);
        }
        if pending.is_empty() {
            return Ok(());
        }

        let _write_guard = self.engine.write_lock.lock().unwrap();
        let seq = self.engine.seq.fetch_add(1, Ordering::SeqCst) + 1;

        let mut applied = Vec::with_capacity(pending.len());
        for (key, record) in pending.drain() {
            let encoded_key = encode_key_with_seq(&key, seq);
            let record_type = record.record_type;
            let pos = self
                .engine
                .append_record(encoded_key, record.value, record_type)?;
            applied.push((key, pos, record_type));
        }

        let marker_key = encode_key_with_seq(TXN_FIN_KEY, seq);
        self.engine
            .append_record(marker_key, Vec::new(), LogRecordType::TxnFinished)?;

        // Avoid a redundant sync when the DB itself already syncs on every
        // append; only force one here if the batch asked for it and the DB
        // wouldn't have synced this append anyway.
        if self.options.sync_writes && !self.engine.options.sync_writes {
            self.engine.active_file.read().sync()?;
        }

        for (key, pos, record_type) in applied {
            match record_type {
                LogRecordType::Normal => {
                    let prior = self.engine.index.put(key, pos)?;
                    if let Some(prior) = prior {
                        self.engine
                            .reclaim_size
                            .fetch_add(prior.size as u64, Ordering::SeqCst);
                    }
                }
                LogRecordType::Tombstone => {
                    self.engine
                        .reclaim_size
                        .fetch_add(pos.size as u64, Ordering::SeqCst);
                    let (prior, _existed) = self.engine.index.delete(&key)?;
                    if let Some(prior) = prior {
                        self.engine
                            .reclaim_size
                            .fetch_add(prior.size as u64, Ordering::SeqCst);
                    }
                }
                LogRecordType::TxnFinished => unreachable!("only staged for the marker itself"),
            }
        }

        Ok(())
    }
}
