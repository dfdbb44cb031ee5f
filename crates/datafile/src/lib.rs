//! # DataFile - Append-Only Log Segment
//!
//! Wraps an [`io::IoManager`] with a monotonically-growing write offset and
//! framed record I/O ([`codec`]). A [`DataFile`] is either the single active
//! file receiving appends, or one of the immutable files kept around for
//! reads, and it is also the vehicle for the three auxiliary files the
//! engine writes: the hint index, the merge-finished marker, and the
//! sequence-number file.

use codec::{decode_header, verify_and_build, CodecError, LogRecord, LogRecordType, Position};
use io::{new_io_manager, IoError, IoManager, IoType};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix every data segment file carries: `%09d.data`.
pub const DATA_FILE_NAME_SUFFIX: &str = ".data";
/// Name of the post-merge compact index file.
pub const HINT_FILE_NAME: &str = "hint-index";
/// Name of the merge completion marker file.
pub const MERGE_FINISHED_FILE_NAME: &str = "merge-finished";
/// Name of the file the persistent B+-tree backend uses to persist the last
/// sequence number across restarts.
pub const SEQ_NO_FILE_NAME: &str = "seq-no";
/// Name of the empty file used to hold the OS advisory process lock.
pub const LOCK_FILE_NAME: &str = "flock";
/// Name of the persistent B+-tree index's own single-file page store.
pub const BPTREE_INDEX_FILE_NAME: &str = "bptree-index";

/// Errors raised while reading, writing, or naming a [`DataFile`].
#[derive(Debug, Error)]
pub enum DataFileError {
    /// An underlying backend I/O failure.
    #[error(transparent)]
    Io(#[from] IoError),
    /// A record failed to decode for a reason other than truncation.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Builds the path for data file `file_id` under `dir`: `<dir>/%09d.data`.
pub fn data_file_name(dir: &Path, file_id: u32) -> PathBuf {
    dir.join(format!("{:09}{}", file_id, DATA_FILE_NAME_SUFFIX))
}

/// Parses a file-id out of a data file's name (`"000000003.data"` -> `Some(3)`).
/// Returns `None` for any name that isn't a `.data` file or doesn't parse,
/// signaling a corrupted data directory to the caller.
pub fn parse_data_file_id(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(DATA_FILE_NAME_SUFFIX)?;
    stem.parse::<u32>().ok()
}

/// An append-only log segment: a positioned I/O backend plus the running
/// write offset the engine uses both to place new records and to decide
/// when to rotate.
pub struct DataFile {
    file_id: u32,
    io: Box<dyn IoManager>,
    offset: u64,
}

impl DataFile {
    /// Opens (or creates) the data file with the given `file_id` under `dir`.
    pub fn open(dir: &Path, file_id: u32, io_type: IoType) -> Result<Self, DataFileError> {
        let io = new_io_manager(data_file_name(dir, file_id), io_type)?;
        let offset = io.size()?;
        Ok(Self {
            file_id,
            io,
            offset,
        })
    }

    /// Opens `hint-index` under `dir`, creating it if absent.
    pub fn open_hint_file(dir: &Path) -> Result<Self, DataFileError> {
        Self::open_named(dir, HINT_FILE_NAME)
    }

    /// Opens `merge-finished` under `dir`, creating it if absent.
    pub fn open_merge_finished_file(dir: &Path) -> Result<Self, DataFileError> {
        Self::open_named(dir, MERGE_FINISHED_FILE_NAME)
    }

    /// Opens `seq-no` under `dir`, creating it if absent.
    pub fn open_seq_no_file(dir: &Path) -> Result<Self, DataFileError> {
        Self::open_named(dir, SEQ_NO_FILE_NAME)
    }

    fn open_named(dir: &Path, name: &str) -> Result<Self, DataFileError> {
        let io = new_io_manager(dir.join(name), IoType::Standard)?;
        let offset = io.size()?;
        Ok(Self {
            file_id: 0,
            io,
            offset,
        })
    }

    /// Re-opens this file under the standard backend, preserving its
    /// current write offset. Used to upgrade a file that was opened
    /// read-only-mapped at startup before it can receive writes.
    pub fn reopen_standard(dir: &Path, file_id: u32) -> Result<Self, DataFileError> {
        Self::open(dir, file_id, IoType::Standard)
    }

    /// This file's id (`0` for the auxiliary named files).
    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    /// The current write offset — equivalently, the number of bytes
    /// appended so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Overrides the tracked write offset. Used during recovery once the
    /// scan across an active file's records has determined where writes
    /// should resume.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Appends `buf` to the file, advancing the write offset by its length.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, DataFileError> {
        let n = self.io.write(buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    /// Encodes and appends a hint record: `key = user_key`, `value =
    /// encoded position` of the corresponding live record in the
    /// post-merge data files.
    pub fn write_hint_record(&mut self, key: &[u8], pos: &Position) -> Result<(), DataFileError> {
        let record = LogRecord {
            key: key.to_vec(),
            value: codec::encode_position(pos),
            record_type: LogRecordType::Normal,
        };
        self.write(&record.encode())?;
        Ok(())
    }

    /// Flushes and fsyncs this file to stable storage.
    pub fn sync(&self) -> Result<(), DataFileError> {
        Ok(self.io.sync()?)
    }

    /// Closes the underlying backend.
    pub fn close(&self) -> Result<(), DataFileError> {
        Ok(self.io.close()?)
    }

    /// Reads and decodes the record framed at `offset`, returning the
    /// decoded record and its full on-disk byte size so the caller can
    /// advance to the next record.
    ///
    /// Returns `Ok(None)` at a clean end-of-file *or* when a truncated tail
    /// record is encountered (a crash mid-append) — both terminate a
    /// recovery scan the same way. A genuine CRC mismatch on an otherwise
    /// complete record surfaces as [`DataFileError::Codec`].
    pub fn read_log_record(&self, offset: u64) -> Result<Option<(LogRecord, u64)>, DataFileError> {
        let file_size = self.io.size()?;
        if offset >= file_size {
            return Ok(None);
        }

        let mut header_len = codec::MAX_LOG_RECORD_HEADER_SIZE as u64;
        if offset + header_len > file_size {
            header_len = file_size - offset;
        }
        let mut header_buf = vec![0u8; header_len as usize];
        self.io.read_at(&mut header_buf, offset)?;

        let header = match decode_header(&header_buf) {
            Ok(Some(h)) => h,
            Ok(None) => return Ok(None),
            Err(CodecError::UnexpectedEof) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let kv_len = header.key_size + header.value_size;
        let mut kv_buf = vec![0u8; kv_len];
        if kv_len > 0 {
            let n = self
                .io
                .read_at(&mut kv_buf, offset + header.header_size as u64)?;
            if n < kv_len {
                // Torn write: header was complete but key/value was not.
                return Ok(None);
            }
        }
        let key = kv_buf[..header.key_size].to_vec();
        let value = kv_buf[header.key_size..].to_vec();
        let record = verify_and_build(&header, &header_buf, key, value)?;
        let size = header.header_size as u64 + kv_len as u64;
        Ok(Some((record, size)))
    }
}

#[cfg(test)]
mod tests;
