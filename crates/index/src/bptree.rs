//! Persistent single-file B+-tree index backend, via `jammdb` — the direct
//! Rust analogue of the Go original's `bbolt`-backed `BPlusTree`
//! (`index/bptree.go`). Every call opens exactly one transaction; `Put`,
//! `Get`, and `Delete` each commit (or, for reads, simply drop) their own
//! transaction the way `index/bptree.go` does, rather than batching
//! several index mutations into one.

use crate::{Entry, IndexError, IndexIterator, Indexer, MaterializedIterator};
use codec::{decode_position, encode_position, Position};
use datafile::BPTREE_INDEX_FILE_NAME;
use jammdb::{Data, DB};
use std::path::Path;

const BUCKET_NAME: &[u8] = b"riptide-index";

/// Persistent index backed by a single `jammdb` page file living alongside
/// the data files.
pub struct BPlusTreeIndex {
    db: DB,
}

impl BPlusTreeIndex {
    /// Opens (creating if absent) the `bptree-index` file under `dir_path`
    /// and ensures its one bucket exists.
    pub fn open(dir_path: &Path) -> Result<Self, IndexError> {
        let db = DB::open(dir_path.join(BPTREE_INDEX_FILE_NAME))
            .map_err(|e| IndexError::Open(e.to_string()))?;
        let tx = db
            .tx(true)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        tx.get_or_create_bucket(BUCKET_NAME)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        tx.commit().map_err(|e| IndexError::Transaction(e.to_string()))?;
        Ok(Self { db })
    }
}

impl Indexer for BPlusTreeIndex {
    fn put(&self, key: Vec<u8>, pos: Position) -> Result<Option<Position>, IndexError> {
        let tx = self
            .db
            .tx(true)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let bucket = tx
            .get_bucket(BUCKET_NAME)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let prior = bucket
            .get_kv(&key)
            .and_then(|data| decode_position(data.value()));
        bucket
            .put(key, encode_position(&pos))
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        tx.commit().map_err(|e| IndexError::Transaction(e.to_string()))?;
        Ok(prior)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Position>, IndexError> {
        let tx = self
            .db
            .tx(false)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let bucket = tx
            .get_bucket(BUCKET_NAME)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        Ok(bucket.get_kv(key).and_then(|data| decode_position(data.value())))
    }

    fn delete(&self, key: &[u8]) -> Result<(Option<Position>, bool), IndexError> {
        let tx = self
            .db
            .tx(true)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let bucket = tx
            .get_bucket(BUCKET_NAME)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let prior = bucket
            .get_kv(key)
            .and_then(|data| decode_position(data.value()));
        let existed = prior.is_some();
        if existed {
            bucket
                .delete(key)
                .map_err(|e| IndexError::Transaction(e.to_string()))?;
        }
        tx.commit().map_err(|e| IndexError::Transaction(e.to_string()))?;
        Ok((prior, existed))
    }

    fn size(&self) -> Result<usize, IndexError> {
        let tx = self
            .db
            .tx(false)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let bucket = tx
            .get_bucket(BUCKET_NAME)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        Ok(bucket.stats().key_n)
    }

    /// Walks the whole bucket inside one read transaction, exactly the
    /// "long-lived read transaction, closed once exhausted" the Go original
    /// holds for its B+-tree iterator — the transaction here simply lives
    /// no longer than the walk, since `jammdb`'s cursor cannot outlive the
    /// transaction it borrows from without unsafe self-referential storage.
    fn iterator(&self, reverse: bool) -> Result<Box<dyn IndexIterator>, IndexError> {
        let tx = self
            .db
            .tx(false)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let bucket = tx
            .get_bucket(BUCKET_NAME)
            .map_err(|e| IndexError::Transaction(e.to_string()))?;
        let snapshot: Vec<Entry> = bucket
            .cursor()
            .filter_map(|data| match data {
                Data::KeyValue(kv) => decode_position(kv.value()).map(|pos| (kv.key().to_vec(), pos)),
                Data::Bucket(_) => None,
            })
            .collect();
        Ok(Box::new(MaterializedIterator::new(snapshot, reverse)))
    }

    fn close(&self) -> Result<(), IndexError> {
        Ok(())
    }
}
