//! Non-fatal findings gathered while decoding.
//!
//! Decoding is deliberately lenient: a bad header field, a checksum mismatch
//! or a block that fails to decompress is reported and the decoder moves on.
//! Such findings are [`Warning`]s.  Every warning is logged through
//! `tracing` when it is recorded and is also handed back to the caller
//! inside an [`Outcome`].

use std::fmt;

use thiserror::Error;

use crate::codec::CodecError;
use crate::cursor::OutOfBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Magic,
    Version,
    Algo,
    EncBufferSize,
    DecBufferSize,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaderField::Magic         => "magic",
            HeaderField::Version       => "version",
            HeaderField::Algo          => "algo",
            HeaderField::EncBufferSize => "enc_buffer_size",
            HeaderField::DecBufferSize => "dec_buffer_size",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("segment {segment}: header field {field} is {found:#x}, expected {expected:#x}")]
    HeaderMismatch {
        segment:  String,
        field:    HeaderField,
        expected: u64,
        found:    u64,
    },
    #[error("segment {segment}: header declares a zero xml_size")]
    ZeroXmlSize {
        segment: String,
    },
    #[error("segment {segment} block {block}: checksum {computed:08x} does not match stored {stored:08x}")]
    ChecksumMismatch {
        segment:  String,
        block:    usize,
        stored:   u32,
        computed: u32,
    },
    #[error("segment {segment} block {block}: decompression failed, block dropped: {error}")]
    Decompression {
        segment: String,
        block:   usize,
        error:   CodecError,
    },
    #[error("segment {segment} block {block}: decoded {actual} of {declared} declared byte(s)")]
    DecodedSizeMismatch {
        segment:  String,
        block:    usize,
        declared: u32,
        actual:   usize,
    },
    #[error("segment {segment}: truncated, {error}")]
    OutOfBounds {
        segment: String,
        error:   OutOfBounds,
    },
    #[error("segment {segment}: declared range {start}..{end} runs past the {available} byte archive")]
    SegmentTruncated {
        segment:   String,
        start:     usize,
        end:       usize,
        available: usize,
    },
    #[error("segment {segment}: magic at offset {magic_offset} leaves no room for the size field")]
    SegmentBeforeStart {
        segment:      String,
        magic_offset: usize,
    },
    #[error("preamble entry {name:?} has an invalid size {token:?}; entry dropped")]
    InvalidSegmentSize {
        name:  String,
        token: String,
    },
}

/// A value together with the warnings raised while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value:    T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn clean(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_parts(self) -> (T, Vec<Warning>) {
        (self.value, self.warnings)
    }
}

/// Accumulates warnings, logging each one as it arrives.
#[derive(Debug, Default)]
pub struct WarningLog {
    warnings: Vec<Warning>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Take the value out of `outcome`, keeping its warnings.  They were
    /// logged when first recorded.
    pub fn absorb<T>(&mut self, outcome: Outcome<T>) -> T {
        self.warnings.extend(outcome.warnings);
        outcome.value
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn finish<T>(self, value: T) -> Outcome<T> {
        Outcome::new(value, self.warnings)
    }
}
