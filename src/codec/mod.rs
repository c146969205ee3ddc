//! Codec registry for CXB block payloads.
//!
//! # Identity rules
//! A codec is identified on disk by the one-byte `algo` field of the segment
//! header.  The only algorithm ever written is `2` (LZO2A).  The field is a
//! hint: readers always decode compressed blocks as LZO2A and merely report
//! a different value.
//!
//! # Chunking
//! A compressed block never holds more than [`MAX_CHUNK_SIZE`] decoded
//! bytes; the encoder splits documents before calling [`Codec::compress`].

pub mod lzo2a;

use thiserror::Error;

pub use lzo2a::LzoError;

/// Algorithm id of LZO2A in the segment header.
pub const ALGO_LZO2A: u8 = 2;

/// Largest decoded size of one block (the declared encode buffer size).
pub const MAX_CHUNK_SIZE: usize = 32 * 1024;

// ── CodecId ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    Lzo2a,
}

impl CodecId {
    /// The value written into the header `algo` field.
    #[inline]
    pub fn algo(self) -> u8 {
        match self {
            CodecId::Lzo2a => ALGO_LZO2A,
        }
    }

    pub fn from_algo(algo: u8) -> Option<Self> {
        match algo {
            ALGO_LZO2A => Some(CodecId::Lzo2a),
            _          => None,
        }
    }

    /// Human-readable name (for diagnostics only, never parsed).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::Lzo2a => "lzo2a",
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(#[from] LzoError),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    /// Decode `data`, failing rather than producing more than `max_len` bytes.
    fn decompress(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError>;
}

pub struct Lzo2aCodec;

impl Codec for Lzo2aCodec {
    fn codec_id(&self) -> CodecId { CodecId::Lzo2a }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() > MAX_CHUNK_SIZE {
            return Err(CodecError::Compression(format!(
                "chunk of {} bytes exceeds the {MAX_CHUNK_SIZE} byte block limit",
                data.len()
            )));
        }
        Ok(lzo2a::compress(data))
    }

    fn decompress(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
        Ok(lzo2a::decompress_safe(data, max_len)?)
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::Lzo2a => Box::new(Lzo2aCodec),
    }
}
