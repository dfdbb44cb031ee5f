//! Sorted in-memory index backend, a `BTreeMap` guarded by a single
//! reader-writer lock. Grounded in the same buffer-reuse-and-lock
//! discipline as `memtable`'s `BTreeMap<Vec<u8>, ValueEntry>`, generalized
//! here to hold just a [`Position`] per key with no sequence-gating (the
//! engine, not the index, decides whether a write is stale).

use crate::{Entry, IndexError, IndexIterator, Indexer, MaterializedIterator};
use codec::Position;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory sorted index. Construction is infallible and the index holds
/// no file handles, so every [`Indexer`] method here is effectively
/// synchronous with no I/O.
pub struct BTreeIndex {
    tree: RwLock<BTreeMap<Vec<u8>, Position>>,
}

impl BTreeIndex {
    /// Builds an empty index.
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for BTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer for BTreeIndex {
    fn put(&self, key: Vec<u8>, pos: Position) -> Result<Option<Position>, IndexError> {
        Ok(self.tree.write().insert(key, pos))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Position>, IndexError> {
        Ok(self.tree.read().get(key).copied())
    }

    fn delete(&self, key: &[u8]) -> Result<(Option<Position>, bool), IndexError> {
        let prior = self.tree.write().remove(key);
        let existed = prior.is_some();
        Ok((prior, existed))
    }

    fn size(&self) -> Result<usize, IndexError> {
        Ok(self.tree.read().len())
    }

    fn iterator(&self, reverse: bool) -> Result<Box<dyn IndexIterator>, IndexError> {
        let snapshot: Vec<Entry> = self
            .tree
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Ok(Box::new(MaterializedIterator::new(snapshot, reverse)))
    }

    fn close(&self) -> Result<(), IndexError> {
        Ok(())
    }
}
