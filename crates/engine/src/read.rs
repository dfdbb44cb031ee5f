//! Read path: `get`, `list_keys`, `fold`, and the forward/reverse iterator
//! façade ([`DbIterator`]). Point lookups resolve through the index then
//! verify the framed record's CRC on every read; the index is never
//! allowed to reference a position whose record is not `Normal`, so a
//! successful lookup can only ever decode a live value or signal
//! corruption.

use crate::error::{Errors, Result};
use crate::Engine;
use codec::{LogRecordType, Position};
use config::IteratorOptions;
use index::IndexIterator;

impl Engine {
    /// Looks up `key`, reading and CRC-verifying its record.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(Errors::KeyIsEmpty);
        }
        let pos = self.index.get(key)?.ok_or(Errors::KeyNotFound)?;
        value_at(self, pos)
    }

    /// Snapshots the current forward iterator into a vector of keys.
    pub fn list_keys(&self) -> Result<Vec<Vec<u8>>> {
        let mut it = self.index.iterator(false)?;
        let mut keys = Vec::new();
        it.rewind();
        while it.valid() {
            keys.push(it.key().to_vec());
            it.next();
        }
        Ok(keys)
    }

    /// Iterates forward over every live key/value pair, calling `f(key,
    /// value)` for each and stopping early the first time it returns
    /// `false`. Holds the write lock for the whole fold — the iterator
    /// needs a stable view of the active file across each `value_at` call,
    /// and this is the simplest way to guarantee it; an intentionally
    /// coarse lock.
    pub fn fold(&self, mut f: impl FnMut(&[u8], &[u8]) -> bool) -> Result<()> {
        let _write_guard = self.write_lock.lock().unwrap();
        let mut it = self.index.iterator(false)?;
        it.rewind();
        while it.valid() {
            let value = value_at(self, it.value())?;
            if !f(it.key(), &value) {
                break;
            }
            it.next();
        }
        Ok(())
    }

    /// Constructs a forward or reverse iterator over live key/value pairs,
    /// optionally filtered to keys starting with `options.prefix`.
    pub fn iter(&self, options: IteratorOptions) -> Result<DbIterator<'_>> {
        let inner = self.index.iterator(options.reverse)?;
        Ok(DbIterator {
            engine: self,
            inner,
            prefix: options.prefix,
        })
    }
}

/// Reads the record at `pos`, verifies it, and returns its value.
/// Rejects tombstones as `KeyNotFound` — a position should never reference
/// one, but a stale index entry surfacing a tombstone is treated as an
/// ordinary miss rather than silently returning garbage.
pub(crate) fn value_at(engine: &Engine, pos: Position) -> Result<Vec<u8>> {
    let active = engine.active_file.read();
    let record = if pos.file_id == active.file_id() {
        active.read_log_record(pos.offset as u64)?
    } else {
        drop(active);
        let older = engine.older_files.read();
        match older.get(&pos.file_id) {
            Some(f) => f.read_log_record(pos.offset as u64)?,
            None => return Err(Errors::NoDataFile),
        }
    };
    let (record, _size) = record.ok_or(Errors::NoDataFile)?;
    match record.record_type {
        LogRecordType::Normal => Ok(record.value),
        LogRecordType::Tombstone | LogRecordType::TxnFinished => Err(Errors::KeyNotFound),
    }
}

/// A positioned cursor over a snapshot of the engine's live key/value
/// pairs, taken at construction time. Values are resolved lazily, one
/// `value_at` call per `value()`, rather than materialized up front.
pub struct DbIterator<'a> {
    engine: &'a Engine,
    inner: Box<dyn IndexIterator>,
    prefix: Vec<u8>,
}

impl<'a> DbIterator<'a> {
    /// Resets to the first entry, re-applying the prefix filter.
    pub fn rewind(&mut self) {
        self.inner.rewind();
        self.skip_to_matching();
    }

    /// Seeks to the first entry matching the iterator's direction and
    /// prefix at or past `key`.
    pub fn seek(&mut self, key: &[u8]) {
        self.inner.seek(key);
        self.skip_to_matching();
    }

    /// Advances to the next matching entry.
    pub fn next(&mut self) {
        self.inner.next();
        self.skip_to_matching();
    }

    /// Whether the cursor currently references a live, prefix-matching entry.
    pub fn valid(&self) -> bool {
        self.inner.valid()
    }

    /// The current entry's key.
    pub fn key(&self) -> &[u8] {
        self.inner.key()
    }

    /// Reads and returns the current entry's value.
    pub fn value(&self) -> Result<Vec<u8>> {
        value_at(self.engine, self.inner.value())
    }

    fn skip_to_matching(&mut self) {
        if self.prefix.is_empty() {
            return;
        }
        while self.inner.valid() && !self.inner.key().starts_with(self.prefix.as_slice()) {
            self.inner.next();
        }
    }
}
