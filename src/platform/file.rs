//! Synchronous file access
//!
//! Thin wrapper over [`std::fs::File`] with the open modes and operations the
//! engine's loaders and sinks expect. Failures come back as [`FileError`],
//! whose [`FileError::code`] is the sentinel `-1` for callers that still
//! speak numeric result codes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Error type for file operations
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// Underlying OS error
    #[error("{path}: {source}")]
    Io {
        /// File the operation was applied to
        path: PathBuf,
        /// OS error
        #[source]
        source: io::Error,
    },

    /// A read returned no data
    #[error("{0}: end of file")]
    EndOfFile(PathBuf),

    /// A read or write was requested with an empty buffer
    #[error("{0}: empty buffer")]
    EmptyBuffer(PathBuf),
}

impl FileError {
    /// Numeric sentinel every failing file operation maps to.
    pub const SENTINEL: i32 = -1;

    /// Numeric result code for this failure (always [`FileError::SENTINEL`]).
    pub fn code(&self) -> i32 {
        Self::SENTINEL
    }

    fn io(path: &Path, source: io::Error) -> Self {
        FileError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for file operations
pub type FileResult<T> = std::result::Result<T, FileError>;

/// Open file handle.
#[derive(Debug)]
pub struct PlatformFile {
    file: File,
    path: PathBuf,
}

impl PlatformFile {
    /// Open an existing file for reading.
    pub fn open_for_read(path: impl AsRef<Path>) -> FileResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FileError::io(path, e))?;
        Ok(Self::wrap(file, path))
    }

    /// Open a file for writing, creating it or truncating an existing one.
    pub fn open_for_write(path: impl AsRef<Path>) -> FileResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| FileError::io(path, e))?;
        Ok(Self::wrap(file, path))
    }

    /// Open an existing file for reading and writing without truncating it.
    pub fn open_for_read_write(path: impl AsRef<Path>) -> FileResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| FileError::io(path, e))?;
        Ok(Self::wrap(file, path))
    }

    /// Create an empty file, replacing any file of the same name.
    pub fn create(path: impl AsRef<Path>) -> FileResult<()> {
        let path = path.as_ref();
        File::create(path).map_err(|e| FileError::io(path, e))?;
        Ok(())
    }

    /// Delete a file.
    pub fn delete(path: impl AsRef<Path>) -> FileResult<()> {
        let path = path.as_ref();
        fs::remove_file(path).map_err(|e| FileError::io(path, e))
    }

    /// Flush and close the handle.
    pub fn close(mut self) -> FileResult<()> {
        self.file.flush().map_err(|e| FileError::io(&self.path, e))
    }

    /// Read up to `buffer.len()` bytes at the current position.
    ///
    /// Returns the number of bytes read. Reading nothing (end of file) is an error.
    pub fn read(&mut self, buffer: &mut [u8]) -> FileResult<usize> {
        if buffer.is_empty() {
            return Err(FileError::EmptyBuffer(self.path.clone()));
        }
        let mut filled = 0;
        while filled < buffer.len() {
            match self.file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FileError::io(&self.path, e)),
            }
        }
        if filled == 0 {
            return Err(FileError::EndOfFile(self.path.clone()));
        }
        Ok(filled)
    }

    /// Write all of `buffer` at the current position and flush.
    ///
    /// Returns the number of bytes written.
    pub fn write(&mut self, buffer: &[u8]) -> FileResult<usize> {
        if buffer.is_empty() {
            return Err(FileError::EmptyBuffer(self.path.clone()));
        }
        self.file
            .write_all(buffer)
            .and_then(|_| self.file.flush())
            .map_err(|e| FileError::io(&self.path, e))?;
        Ok(buffer.len())
    }

    /// Move to an absolute byte position.
    pub fn seek(&mut self, position: u64) -> FileResult<()> {
        self.file
            .seek(SeekFrom::Start(position))
            .map(|_| ())
            .map_err(|e| FileError::io(&self.path, e))
    }

    /// Current absolute byte position.
    pub fn position(&mut self) -> FileResult<u64> {
        self.file
            .stream_position()
            .map_err(|e| FileError::io(&self.path, e))
    }

    /// Total size in bytes. Leaves the position unchanged.
    pub fn length(&self) -> FileResult<u64> {
        self.file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| FileError::io(&self.path, e))
    }

    /// Truncate or extend the file to `new_size` bytes.
    pub fn set_length(&mut self, new_size: u64) -> FileResult<()> {
        self.file
            .set_len(new_size)
            .map_err(|e| FileError::io(&self.path, e))
    }

    /// Path the handle was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn wrap(file: File, path: &Path) -> Self {
        PlatformFile {
            file,
            path: path.to_path_buf(),
        }
    }
}
