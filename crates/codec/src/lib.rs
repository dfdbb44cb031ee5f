//! # Codec - Log Record Framing
//!
//! Frames and unframes a single on-disk log record:
//!
//! ```text
//! [crc32: u32 LE][type: u8][key_len: svarint][value_len: svarint][key][value]
//! ```
//!
//! The CRC32 (IEEE polynomial) covers every byte following the CRC field
//! itself. Key and value lengths are *signed* varints (the
//! [`integer_encoding`] crate zigzag-encodes signed integers); the
//! sequence-number prefix used by [`encode_key_with_seq`] is an *unsigned*
//! varint — the two encodings are not interchangeable.
//!
//! This crate also frames/unframes [`Position`], the `(file_id, offset,
//! size)` triple stored both in the in-memory index and in hint-file /
//! B+-tree-index records on disk.

use integer_encoding::VarInt;
use thiserror::Error;

/// Maximum bytes a record header can occupy: 4 (CRC) + 1 (type) + 2 * 5
/// (signed varint-encoded `u32`-range lengths).
pub const MAX_LOG_RECORD_HEADER_SIZE: usize = 4 + 1 + 2 * 5;

/// Tags what a [`LogRecord`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// A live key/value write.
    Normal = 0,
    /// A deletion marker; the index entry for the key is removed.
    Tombstone = 1,
    /// Marks that every record tagged with the same sequence number has
    /// been durably written — the sole atomic-commit evidence for a batch.
    TxnFinished = 2,
}

impl LogRecordType {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(LogRecordType::Normal),
            1 => Some(LogRecordType::Tombstone),
            2 => Some(LogRecordType::TxnFinished),
            _ => None,
        }
    }
}

/// A single decoded (or to-be-encoded) log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// The encoded key as stored in the log: `varint(seq) ‖ user_key`.
    pub key: Vec<u8>,
    /// The value payload. Empty for tombstones and the `TxnFinished` marker.
    pub value: Vec<u8>,
    /// Which kind of record this is.
    pub record_type: LogRecordType,
}

/// Errors raised while decoding a framed record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The record's CRC did not match its framed bytes.
    #[error("invalid crc: record is corrupted")]
    InvalidCrc,
    /// Fewer bytes remained than a complete record requires, but more than
    /// zero — typically a torn write at the tail of the active file after a
    /// crash. Callers scanning a file for recovery treat this the same as
    /// a clean EOF.
    #[error("unexpected eof while decoding log record")]
    UnexpectedEof,
}

impl LogRecord {
    /// Encodes this record into its on-disk framed byte layout, computing
    /// and patching in the CRC32 over everything after the CRC field.
    pub fn encode(&self) -> Vec<u8> {
        let mut header = [0u8; MAX_LOG_RECORD_HEADER_SIZE];
        header[4] = self.record_type as u8;
        let mut index = 5;
        index += (self.key.len() as i64).encode_var(&mut header[index..]);
        index += (self.value.len() as i64).encode_var(&mut header[index..]);

        let mut buf = Vec::with_capacity(index + self.key.len() + self.value.len());
        buf.extend_from_slice(&header[..index]);
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[4..]);
        buf[..4].copy_from_slice(&crc.to_le_bytes());
        buf
    }
}

/// The fixed+varint portion of a record parsed from its header bytes, before
/// the key and value have been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecordHeader {
    /// The CRC32 stored in the header, to be checked once key+value are read.
    pub crc: u32,
    /// The record's tag.
    pub record_type: LogRecordType,
    /// Decoded key length in bytes.
    pub key_size: usize,
    /// Decoded value length in bytes.
    pub value_size: usize,
    /// How many bytes the header itself occupied (CRC + type + both varints).
    pub header_size: usize,
}

/// Decodes a record header from up to [`MAX_LOG_RECORD_HEADER_SIZE`] bytes.
///
/// Returns `Ok(None)` when `buf` is empty (clean EOF) or when every header
/// field decodes to zero (the Go implementation this engine ports uses an
/// all-zero header as its EOF sentinel for an unwritten file tail; the same
/// all-zero pattern is reachable here if a file is pre-extended). Returns
/// [`CodecError::UnexpectedEof`] when `buf` holds a truncated header.
pub fn decode_header(buf: &[u8]) -> Result<Option<LogRecordHeader>, CodecError> {
    if buf.is_empty() {
        return Ok(None);
    }
    if buf.len() < 5 {
        return Err(CodecError::UnexpectedEof);
    }
    let crc = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    let record_type = match LogRecordType::from_u8(buf[4]) {
        Some(t) => t,
        None => {
            if crc == 0 && buf[4] == 0 {
                return Ok(None);
            }
            return Err(CodecError::UnexpectedEof);
        }
    };

    let mut index = 5;
    let (key_size, n) = match i64::decode_var(&buf[index..]) {
        Some(v) => v,
        None => return Err(CodecError::UnexpectedEof),
    };
    index += n;
    let (value_size, n2) = match i64::decode_var(&buf[index..]) {
        Some(v) => v,
        None => return Err(CodecError::UnexpectedEof),
    };
    index += n2;

    if crc == 0 && key_size == 0 && value_size == 0 {
        return Ok(None);
    }
    if key_size < 0 || value_size < 0 {
        return Err(CodecError::UnexpectedEof);
    }

    Ok(Some(LogRecordHeader {
        crc,
        record_type,
        key_size: key_size as usize,
        value_size: value_size as usize,
        header_size: index,
    }))
}

/// Verifies `header`'s CRC against the exact header bytes, `key`, and
/// `value`, then assembles the decoded [`LogRecord`].
pub fn verify_and_build(
    header: &LogRecordHeader,
    header_bytes: &[u8],
    key: Vec<u8>,
    value: Vec<u8>,
) -> Result<LogRecord, CodecError> {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header_bytes[4..header.header_size]);
    hasher.update(&key);
    hasher.update(&value);
    if hasher.finalize() != header.crc {
        return Err(CodecError::InvalidCrc);
    }
    Ok(LogRecord {
        key,
        value,
        record_type: header.record_type,
    })
}

/// Prepends an unsigned varint-encoded sequence number to `key`, the layout
/// the engine writes to the log for every record (sequence `0` for
/// non-transactional writes).
pub fn encode_key_with_seq(key: &[u8], seq: u64) -> Vec<u8> {
    let mut seq_buf = [0u8; 10];
    let n = seq.encode_var(&mut seq_buf);
    let mut out = Vec::with_capacity(n + key.len());
    out.extend_from_slice(&seq_buf[..n]);
    out.extend_from_slice(key);
    out
}

/// Splits an encoded log key back into its user key and sequence number.
pub fn parse_key_with_seq(encoded: &[u8]) -> (Vec<u8>, u64) {
    match u64::decode_var(encoded) {
        Some((seq, n)) => (encoded[n..].to_vec(), seq),
        None => (encoded.to_vec(), 0),
    }
}

/// The `(file_id, offset, size)` triple the index maps a user key to. `size`
/// is the full on-disk framed byte length and exists only for reclaim
/// accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Which data file holds the record.
    pub file_id: u32,
    /// Byte offset of the first byte of the framed record within that file.
    pub offset: i64,
    /// Full on-disk size of the framed record, in bytes.
    pub size: u32,
}

/// Encodes a [`Position`] as `[file_id: varint][offset: varint][size: varint]`,
/// the layout used by hint-file records and the persistent B+-tree index.
pub fn encode_position(pos: &Position) -> Vec<u8> {
    let mut buf = [0u8; 30];
    let mut index = 0;
    index += (pos.file_id as u64).encode_var(&mut buf[index..]);
    index += pos.offset.encode_var(&mut buf[index..]);
    index += (pos.size as u64).encode_var(&mut buf[index..]);
    buf[..index].to_vec()
}

/// Decodes a [`Position`] previously written by [`encode_position`].
pub fn decode_position(buf: &[u8]) -> Option<Position> {
    let (file_id, n1) = u64::decode_var(buf)?;
    let (offset, n2) = i64::decode_var(&buf[n1..])?;
    let (size, _n3) = u64::decode_var(&buf[n1 + n2..])?;
    Some(Position {
        file_id: file_id as u32,
        offset,
        size: size as u32,
    })
}

#[cfg(test)]
mod tests;
