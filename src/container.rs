//! Whole-archive encode and decode.
//!
//! ```text
//! file-info table | segment 0 | segment 1 | ... | segment N-1
//! ```
//!
//! Decoding recovers the table by tokenizing the preamble and the segments
//! by scanning for their magic.  Decoded entries are keyed by segment name
//! plus `.xml` and kept in archive order.

use crate::codec::MAX_CHUNK_SIZE;
use crate::diagnostics::{Outcome, WarningLog};
use crate::error::{CxbError, Result};
use crate::index::{locate_segments, preamble::validate_name, write_file_info, IndexEntry};
use crate::segment::{decode_segment, encode_segment};

pub const XML_EXTENSION: &str = ".xml";

// ── Documents ────────────────────────────────────────────────────────────────

/// An encoder input: a segment name and the document bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub data: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), data: data.into() }
    }
}

/// Decoded archive contents, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedContainer {
    entries: Vec<(String, Vec<u8>)>,
}

impl DecodedContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace.  A replaced entry keeps its original position.
    pub fn insert(&mut self, name: String, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = data,
            None => self.entries.push((name, data)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d.as_slice())
    }

    /// Lossy UTF-8 view of an entry.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|d| String::from_utf8_lossy(d).into_owned())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d.as_slice()))
    }

    pub fn into_entries(self) -> Vec<(String, Vec<u8>)> {
        self.entries
    }
}

// ── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Treat any warning as an error.
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Uncompressed bytes per block, `1..=32768`.
    pub chunk_size: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { chunk_size: MAX_CHUNK_SIZE }
    }
}

// ── Decode ───────────────────────────────────────────────────────────────────

pub fn decode(buffer: &[u8]) -> Result<Outcome<DecodedContainer>> {
    decode_with(buffer, &DecodeOptions::default())
}

/// Decode every segment of `buffer`.
///
/// Fails only when the segment index cannot be built, or in strict mode
/// when anything was reported.
pub fn decode_with(buffer: &[u8], options: &DecodeOptions) -> Result<Outcome<DecodedContainer>> {
    let mut log = WarningLog::new();
    let locations = log.absorb(locate_segments(buffer)?);

    let mut container = DecodedContainer::new();
    for location in &locations {
        let segment = log.absorb(decode_segment(buffer, location));
        container.insert(format!("{}{XML_EXTENSION}", segment.name), segment.payload);
    }

    let rejected = options.strict && !log.is_empty();
    let outcome = log.finish(container);
    tracing::info!(
        segments = locations.len(),
        entries = outcome.value.len(),
        warnings = outcome.warnings.len(),
        "decoded container"
    );

    let count = outcome.warnings.len();
    match outcome.warnings.first() {
        Some(first) if rejected => Err(CxbError::Strict { count, first: Box::new(first.clone()) }),
        _ => Ok(outcome),
    }
}

// ── Encode ───────────────────────────────────────────────────────────────────

pub fn encode(documents: &[Document]) -> Result<Vec<u8>> {
    encode_with(documents, &EncodeOptions::default())
}

/// Encode `documents` in order.  Any failure aborts with no output.
pub fn encode_with(documents: &[Document], options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut entries = Vec::with_capacity(documents.len());
    let mut segments = Vec::with_capacity(documents.len());
    for doc in documents {
        validate_name(&doc.name)?;
        let segment = encode_segment(&doc.name, &doc.data, options.chunk_size)?;
        entries.push(IndexEntry { name: doc.name.clone(), declared_size: segment.len() });
        segments.push(segment);
    }

    let table = write_file_info(&entries)?;
    let total = table.len() + segments.iter().map(Vec::len).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&table);
    for segment in &segments {
        out.extend_from_slice(segment);
    }

    tracing::info!(documents = documents.len(), bytes = out.len(), "encoded container");
    Ok(out)
}
