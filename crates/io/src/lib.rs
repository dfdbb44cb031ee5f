//! # IO - Positioned File Backends
//!
//! A single [`IoManager`] trait with two implementations:
//!
//! - [`FileIo`] — standard positioned read, append write, sync, size, close.
//! - [`MmapIo`] — read-only memory map, used only to accelerate the startup
//!   index rebuild; `write`/`sync` fail hard.
//!
//! A file opened as [`MmapIo`] at startup must be re-opened as [`FileIo`]
//! before it can receive writes — the mapping is read-only by construction.

use memmap2::Mmap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised by an [`IoManager`] implementation.
#[derive(Debug, Error)]
pub enum IoError {
    /// An underlying OS-level I/O failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// `write`/`sync` called on a read-only memory-mapped backend.
    #[error("backend is read-only")]
    ReadOnly,
}

/// Positioned read, append write, sync, size, and close, abstracted over the
/// concrete storage backend a data file is opened with.
pub trait IoManager: Send + Sync {
    /// Reads into `buf` starting at byte offset `offset`, returning the
    /// number of bytes actually read (may be less than `buf.len()` at EOF).
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, IoError>;
    /// Appends `buf` to the end of the file, returning the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError>;
    /// Flushes buffered writes and fsyncs the file to stable storage.
    fn sync(&self) -> Result<(), IoError>;
    /// Closes the backend, releasing its file handle.
    fn close(&self) -> Result<(), IoError>;
    /// Returns the current on-disk size of the file in bytes.
    fn size(&self) -> Result<u64, IoError>;
}

/// Standard positioned file I/O, opened for create/append/read.
pub struct FileIo {
    file: File,
}

impl FileIo {
    /// Opens (or creates) `path` for positioned reads and appends.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl IoManager for FileIo {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, IoError> {
        use std::os::unix::fs::FileExt;
        // `read_at` may return short reads near EOF; the caller (datafile)
        // clamps its request length to the file size up front, so a short
        // read here simply means "we asked for what remained".
        let mut total = 0;
        loop {
            match self.file.read_at(&mut buf[total..], offset + total as u64) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
            if total == buf.len() {
                break;
            }
        }
        Ok(total)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> Result<(), IoError> {
        self.file.sync_all()?;
        Ok(())
    }

    fn close(&self) -> Result<(), IoError> {
        Ok(())
    }

    fn size(&self) -> Result<u64, IoError> {
        Ok(self.file.metadata()?.len())
    }
}

/// Read-only memory-mapped I/O backend, used only during startup to
/// accelerate recovery scans. `write`/`sync` always fail with [`IoError::ReadOnly`].
pub struct MmapIo {
    // `None` for a zero-length file: `Mmap::map` refuses to map an empty file.
    mmap: Option<Mmap>,
}

impl MmapIo {
    /// Opens `path` as a read-only memory map. The file must already exist
    /// (callers create an empty file first if needed).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let file = OpenOptions::new().read(true).open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self { mmap: None });
        }
        // Safety: the file is treated as immutable for the lifetime of this
        // mapping; callers never write through this backend (see `write`/`sync`).
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap: Some(mmap) })
    }
}

impl IoManager for MmapIo {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, IoError> {
        let Some(mmap) = self.mmap.as_ref() else {
            return Ok(0);
        };
        let offset = offset as usize;
        if offset >= mmap.len() {
            return Ok(0);
        }
        let end = (offset + buf.len()).min(mmap.len());
        let n = end - offset;
        buf[..n].copy_from_slice(&mmap[offset..end]);
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize, IoError> {
        Err(IoError::ReadOnly)
    }

    fn sync(&self) -> Result<(), IoError> {
        Err(IoError::ReadOnly)
    }

    fn close(&self) -> Result<(), IoError> {
        Ok(())
    }

    fn size(&self) -> Result<u64, IoError> {
        Ok(self.mmap.as_ref().map_or(0, |m| m.len() as u64))
    }
}

/// Selects which [`IoManager`] implementation a data file is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoType {
    /// Standard positioned file I/O ([`FileIo`]).
    Standard,
    /// Read-only memory-mapped I/O ([`MmapIo`]), used only at startup.
    ReadOnlyMapped,
}

/// Opens `path` with the requested [`IoType`], returning a boxed [`IoManager`].
pub fn new_io_manager<P: AsRef<Path>>(
    path: P,
    io_type: IoType,
) -> Result<Box<dyn IoManager>, IoError> {
    match io_type {
        IoType::Standard => Ok(Box::new(FileIo::new(path)?)),
        IoType::ReadOnlyMapped => {
            // The mmap path requires the file to exist first.
            OpenOptions::new().create(true).write(true).open(&path)?;
            Ok(Box::new(MmapIo::new(path)?))
        }
    }
}

#[cfg(test)]
mod tests;
