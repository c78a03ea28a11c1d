//! Input file classification
//!
//! The first four bytes pick the container: `MThd` (MIDI), `IREZ` (RMF),
//! `FORM` (AIFF) or `RIFF` (WAVE).

use crate::engine::{FileType, SessionKind};
use crate::platform::{FileError, PlatformFile};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::combinator::value;
use nom::IResult;
use std::path::{Path, PathBuf};

/// Result code reported for a file whose header matches no known container.
pub const UNRECOGNIZED_FILE_CODE: i32 = 10069;

/// Why a file could not be classified.
#[derive(thiserror::Error, Debug)]
pub enum SniffError {
    /// The file could not be opened or read
    #[error("cannot access file: {0}")]
    Access(#[from] FileError),

    /// The header is not one of the known magic values
    #[error("{path}: unrecognized file type")]
    Unrecognized {
        /// File that was sniffed
        path: PathBuf,
    },
}

impl SniffError {
    /// Numeric result code: the file sentinel for access failures, 10069 otherwise.
    pub fn code(&self) -> i32 {
        match self {
            SniffError::Access(err) => err.code(),
            SniffError::Unrecognized { .. } => UNRECOGNIZED_FILE_CODE,
        }
    }
}

fn magic(input: &[u8]) -> IResult<&[u8], FileType> {
    alt((
        value(FileType::Midi, tag(&b"MThd"[..])),
        value(FileType::Rmf, tag(&b"IREZ"[..])),
        value(FileType::Aiff, tag(&b"FORM"[..])),
        value(FileType::Wave, tag(&b"RIFF"[..])),
    ))(input)
}

/// Classify a header by its leading magic bytes.
pub fn classify(header: &[u8]) -> Option<FileType> {
    magic(header).ok().map(|(_, file_type)| file_type)
}

/// Session kind that plays a file of the given type.
pub fn session_kind_for(file_type: FileType) -> SessionKind {
    match file_type {
        FileType::Midi => SessionKind::Song,
        FileType::Rmf => SessionKind::Rmf,
        FileType::Aiff | FileType::Wave => SessionKind::Sample,
    }
}

/// Read the first four bytes of `path` and classify them.
pub fn sniff(path: &Path) -> Result<FileType, SniffError> {
    let mut file = PlatformFile::open_for_read(path)?;
    let mut header = [0u8; 4];
    let read = match file.read(&mut header) {
        Ok(n) => n,
        Err(FileError::EndOfFile(_)) => 0,
        Err(err) => return Err(err.into()),
    };
    file.close()?;

    classify(&header[..read]).ok_or_else(|| SniffError::Unrecognized {
        path: path.to_path_buf(),
    })
}
