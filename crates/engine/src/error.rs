//! Error kinds surfaced by every public `Engine` operation (§7 of the
//! design). Grounded on the original source's `error.go` plus the named
//! kinds the design notes add on top of it (`DatabaseInUse`,
//! `MergeRatioUnreached`, `NoFreeSpaceForMerge`, `InvalidCrc`).

use codec::CodecError;
use datafile::DataFileError;
use index::IndexError;
use thiserror::Error;

/// Every error an `Engine` operation can return.
#[derive(Debug, Error)]
pub enum Errors {
    /// `Put`/`WriteBatch::put` called with an empty key.
    #[error("the key is empty")]
    KeyIsEmpty,
    /// `Get`/`Delete` found no live index entry for the key.
    #[error("key not found")]
    KeyNotFound,
    /// An index `Delete` failed on a path that requires it to succeed.
    #[error("failed to update index")]
    IndexUpdateFailed,
    /// The index points at a file id the engine has no open handle for.
    #[error("data file not found in engine")]
    NoDataFile,
    /// A `.data` file name in the directory did not parse during Open.
    #[error("the database directory may be corrupted")]
    DataDirectoryCorrupted,
    /// A batch staged more operations than `WriteBatchOptions::max_batch_num`.
    #[error("exceeded the max batch size")]
    ExceedMaxBatchNum,
    /// Merge was already in progress when called again.
    #[error("merge is in progress, try again later")]
    MergeInProgress,
    /// Reclaimable fraction of disk space fell below `data_file_merge_ratio`.
    #[error("merge ratio does not reach the configured threshold")]
    MergeRatioUnreached,
    /// Free disk space is insufficient to safely run merge.
    #[error("disk space is not enough for merge")]
    NoFreeSpaceForMerge,
    /// The directory's advisory lock is already held by another process.
    #[error("the database directory is in use by another process")]
    DatabaseInUse,
    /// A record's framed CRC did not match its bytes.
    #[error("invalid crc value, log record may be corrupted")]
    InvalidCrc,
    /// `Engine::open` was called with an invalid `DbOptions`.
    #[error(transparent)]
    InvalidOptions(#[from] config::OptionsError),
    /// Batch commit requires a previously persisted `seq-no` file under the
    /// persistent B+-tree backend, and none was found at Open.
    #[error("sequence number is required for the persistent index but was not found")]
    SeqNoFileRequired,
    /// An index backend operation failed for a reason other than corruption.
    #[error("index backend error: {0}")]
    Index(String),
    /// A data-file-level I/O failure not covered by a more specific variant.
    #[error("data file error: {0}")]
    DataFile(String),
    /// A raw filesystem failure (directory walk, rename, lock acquisition).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<DataFileError> for Errors {
    fn from(e: DataFileError) -> Self {
        match e {
            DataFileError::Codec(CodecError::InvalidCrc) => Errors::InvalidCrc,
            other => Errors::DataFile(other.to_string()),
        }
    }
}

impl From<IndexError> for Errors {
    fn from(e: IndexError) -> Self {
        Errors::Index(e.to_string())
    }
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, Errors>;
