//! # Index - Pluggable In-Memory/Persistent Key Position Maps
//!
//! An [`Indexer`] maps a user key to the [`Position`] of its most recent
//! live record in the data files. Three backends implement it: [`btree`]
//! (an in-memory sorted tree), [`art`] (an in-memory radix trie), and
//! [`bptree`] (a persistent single-file B+-tree via `jammdb`). All three
//! share the same iteration contract through [`IndexIterator`] and
//! [`MaterializedIterator`].

mod art;
mod bptree;
mod btree;

pub use art::ArtIndex;
pub use bptree::BPlusTreeIndex;
pub use btree::BTreeIndex;

use codec::Position;
use std::path::Path;
use thiserror::Error;

/// Which [`Indexer`] backend to construct. Mirrors [`config::IndexType`]
/// without creating a dependency cycle between the two crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// In-memory sorted tree.
    BTree,
    /// In-memory radix trie.
    Art,
    /// Persistent single-file B+-tree.
    BPlusTree,
}

/// Errors raised constructing or operating a persistent index backend.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The persistent B+-tree's backing file could not be opened.
    #[error("failed to open persistent index: {0}")]
    Open(String),
    /// A read or write transaction against the persistent index failed.
    #[error("persistent index transaction failed: {0}")]
    Transaction(String),
}

/// A single key's position mapping, as surfaced by [`IndexIterator`].
pub type Entry = (Vec<u8>, Position);

/// Maps user keys to the [`Position`] of their current live record.
///
/// Every method takes `&self`: implementations hold their own interior
/// locking (a [`parking_lot::RwLock`] for the in-memory backends, a
/// `jammdb` transaction for the persistent one) so the engine can share one
/// `Indexer` across readers and a single writer without an outer lock.
pub trait Indexer: Send + Sync {
    /// Inserts or overwrites `key`'s position, returning whatever position
    /// was previously stored for it, if any.
    fn put(&self, key: Vec<u8>, pos: Position) -> Result<Option<Position>, IndexError>;

    /// Looks up `key`'s current position.
    fn get(&self, key: &[u8]) -> Result<Option<Position>, IndexError>;

    /// Removes `key`, returning its prior position and whether it was
    /// present at all (a present-but-already-absent delete is not an
    /// error — the caller still needs to know whether to write a
    /// tombstone).
    fn delete(&self, key: &[u8]) -> Result<(Option<Position>, bool), IndexError>;

    /// The number of keys currently indexed.
    fn size(&self) -> Result<usize, IndexError>;

    /// Produces a snapshot iterator over every indexed key in
    /// byte-lexicographic order (or its reverse).
    fn iterator(&self, reverse: bool) -> Result<Box<dyn IndexIterator>, IndexError>;

    /// Flushes and releases any backing resources. A no-op for the
    /// in-memory backends.
    fn close(&self) -> Result<(), IndexError>;
}

/// A positioned cursor over a snapshot of an [`Indexer`]'s contents.
///
/// Every backend takes this snapshot at iterator-construction time: the
/// sorted tree and the radix trie copy their entries into an array under a
/// read lock and release it immediately (the underlying structures offer no
/// pausable in-order traversal); the B+-tree backend walks its cursor to
/// completion inside one long-lived read transaction before rolling it
/// back. Writes that happen after the iterator is constructed are not
/// observed by it.
pub trait IndexIterator {
    /// Resets the cursor to the first entry (in the iterator's direction).
    fn rewind(&mut self);

    /// Positions the cursor at the smallest key `>= target` (forward
    /// iterators) or the largest key `<= target` (reverse iterators).
    fn seek(&mut self, target: &[u8]);

    /// Advances the cursor by one entry.
    fn next(&mut self);

    /// Whether the cursor currently references a live entry.
    fn valid(&self) -> bool;

    /// The current entry's key. Panics if `!valid()`.
    fn key(&self) -> &[u8];

    /// The current entry's position. Panics if `!valid()`.
    fn value(&self) -> Position;
}

/// Shared iterator implementation backing all three [`Indexer`]s: a sorted
/// (or reverse-sorted) snapshot array plus a cursor index, with `seek`
/// implemented as a binary search.
pub struct MaterializedIterator {
    items: Vec<Entry>,
    reverse: bool,
    idx: usize,
}

impl MaterializedIterator {
    /// Builds an iterator from an unsorted snapshot of entries, sorting
    /// them into byte-lexicographic (or reverse) order.
    pub fn new(mut items: Vec<Entry>, reverse: bool) -> Self {
        items.sort_by(|a, b| a.0.cmp(&b.0));
        if reverse {
            items.reverse();
        }
        Self {
            items,
            reverse,
            idx: 0,
        }
    }
}

impl IndexIterator for MaterializedIterator {
    fn rewind(&mut self) {
        self.idx = 0;
    }

    fn seek(&mut self, target: &[u8]) {
        self.idx = if !self.reverse {
            self.items.partition_point(|(k, _)| k.as_slice() < target)
        } else {
            self.items.partition_point(|(k, _)| k.as_slice() > target)
        };
    }

    fn next(&mut self) {
        self.idx += 1;
    }

    fn valid(&self) -> bool {
        self.idx < self.items.len()
    }

    fn key(&self) -> &[u8] {
        &self.items[self.idx].0
    }

    fn value(&self) -> Position {
        self.items[self.idx].1
    }
}

/// Constructs the requested backend. `dir_path` is only used by
/// [`IndexKind::BPlusTree`], which keeps its own single-file page store
/// alongside the data files.
pub fn new_indexer(kind: IndexKind, dir_path: &Path) -> Result<Box<dyn Indexer>, IndexError> {
    match kind {
        IndexKind::BTree => Ok(Box::new(BTreeIndex::new())),
        IndexKind::Art => Ok(Box::new(ArtIndex::new())),
        IndexKind::BPlusTree => Ok(Box::new(BPlusTreeIndex::open(dir_path)?)),
    }
}
