//! Adaptive radix trie index backend.
//!
//! No crate providing an adaptive radix tree surfaced anywhere in the
//! retrieval pack, so unlike [`crate::bptree`] (which has a direct `jammdb`
//! analogue for `bbolt`) this tree is hand-rolled: a byte-indexed trie, one
//! child per possible next byte, with no node-size specialization. That
//! gives up the "adaptive" part of ART's name but keeps the shape
//! `index/artree.go` wraps — recursive `Insert`/`Search`/`Delete` over a
//! shared tree guarded by one lock, with iteration forced to materialize
//! into an array because the underlying tree has no pausable in-order
//! walk.

use crate::{Entry, IndexError, IndexIterator, Indexer, MaterializedIterator};
use codec::Position;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Node {
    value: Option<Position>,
    children: HashMap<u8, Node>,
}

impl Node {
    fn insert(&mut self, key: &[u8], pos: Position) -> Option<Position> {
        match key.split_first() {
            None => self.value.replace(pos),
            Some((&b, rest)) => self.children.entry(b).or_default().insert(rest, pos),
        }
    }

    fn get(&self, key: &[u8]) -> Option<Position> {
        match key.split_first() {
            None => self.value,
            Some((&b, rest)) => self.children.get(&b).and_then(|child| child.get(rest)),
        }
    }

    /// Removes the value at `key`, pruning any child node left fully empty.
    /// Returns the removed position, if any.
    fn remove(&mut self, key: &[u8]) -> Option<Position> {
        match key.split_first() {
            None => self.value.take(),
            Some((&b, rest)) => {
                let child = self.children.get_mut(&b)?;
                let removed = child.remove(rest);
                if child.value.is_none() && child.children.is_empty() {
                    self.children.remove(&b);
                }
                removed
            }
        }
    }

    fn collect(&self, prefix: &mut Vec<u8>, out: &mut Vec<Entry>) {
        if let Some(pos) = self.value {
            out.push((prefix.clone(), pos));
        }
        for (&b, child) in &self.children {
            prefix.push(b);
            child.collect(prefix, out);
            prefix.pop();
        }
    }

    fn count(&self) -> usize {
        self.value.is_some() as usize + self.children.values().map(Node::count).sum::<usize>()
    }
}

/// In-memory radix trie index, guarded by the same single reader-writer
/// lock discipline as [`crate::btree::BTreeIndex`].
pub struct ArtIndex {
    root: RwLock<Node>,
}

impl ArtIndex {
    /// Builds an empty index.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Node::default()),
        }
    }
}

impl Default for ArtIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer for ArtIndex {
    fn put(&self, key: Vec<u8>, pos: Position) -> Result<Option<Position>, IndexError> {
        Ok(self.root.write().insert(&key, pos))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Position>, IndexError> {
        Ok(self.root.read().get(key))
    }

    fn delete(&self, key: &[u8]) -> Result<(Option<Position>, bool), IndexError> {
        let prior = self.root.write().remove(key);
        let existed = prior.is_some();
        Ok((prior, existed))
    }

    fn size(&self) -> Result<usize, IndexError> {
        Ok(self.root.read().count())
    }

    fn iterator(&self, reverse: bool) -> Result<Box<dyn IndexIterator>, IndexError> {
        let mut snapshot = Vec::new();
        self.root.read().collect(&mut Vec::new(), &mut snapshot);
        Ok(Box::new(MaterializedIterator::new(snapshot, reverse)))
    }

    fn close(&self) -> Result<(), IndexError> {
        Ok(())
    }
}
