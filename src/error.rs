use std::io;
use thiserror::Error;

use crate::codec::CodecError;
use crate::diagnostics::Warning;
use crate::index::{FileInfoError, FormatError};

pub type Result<T> = std::result::Result<T, CxbError>;

#[derive(Error, Debug)]
pub enum CxbError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("File-info table error: {0}")]
    FileInfo(#[from] FileInfoError),
    #[error("Chunk size {0} is outside 1..=32768")]
    InvalidChunkSize(usize),
    #[error("Document {name:?} is {len} bytes, too large for a segment header")]
    DocumentTooLarge { name: String, len: usize },
    /// Strict decoding turns the first warning into an error.
    #[error("Strict decode rejected the archive ({count} warning(s)), first: {first}")]
    Strict { count: usize, first: Box<Warning> },
}
