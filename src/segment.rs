//! Segment encoding and decoding.
//!
//! A segment is one XML document:
//!
//! ```text
//! SegmentHeader (19 bytes) | block*
//! ```
//!
//! The document is NUL-terminated before it is split into blocks, and the
//! terminator is stripped again on decode.  A segment's extent in the
//! archive is `declared_size` bytes from its `xml_size` field onward, as
//! listed in the preamble.

use serde::Serialize;

use crate::block::{decode_block, BlockHeader};
use crate::codec::MAX_CHUNK_SIZE;
use crate::cursor::ByteCursor;
use crate::diagnostics::{Outcome, Warning, WarningLog};
use crate::error::{CxbError, Result};
use crate::header::SegmentHeader;
use crate::index::SegmentLocation;
use crate::perf::compress_chunks;

/// One block as found in an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    /// Offset of the flag byte, relative to the start of the archive.
    pub offset:   usize,
    #[serde(flatten)]
    pub header:   BlockHeader,
    /// Bytes the block contributed to the payload.
    pub produced: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSegment {
    pub name:    String,
    /// `None` when the segment is too short to hold a header.
    pub header:  Option<SegmentHeader>,
    pub blocks:  Vec<BlockSummary>,
    /// Decoded document bytes, terminator removed.
    pub payload: Vec<u8>,
}

impl DecodedSegment {
    fn empty(name: &str) -> Self {
        Self { name: name.to_owned(), header: None, blocks: Vec::new(), payload: Vec::new() }
    }
}

/// Decode the segment at `location`.
///
/// Never fails.  Anything unexpected is recorded as a warning and the bytes
/// recovered up to that point are returned.
pub fn decode_segment(buffer: &[u8], location: &SegmentLocation) -> Outcome<DecodedSegment> {
    let name = location.name.as_str();
    let mut log = WarningLog::new();
    let mut segment = DecodedSegment::empty(name);

    let Some(start) = location.start() else {
        log.record(Warning::SegmentBeforeStart {
            segment:      name.to_owned(),
            magic_offset: location.magic_offset,
        });
        return log.finish(segment);
    };

    let declared_end = start.saturating_add(location.declared_size);
    let end = if declared_end > buffer.len() {
        log.record(Warning::SegmentTruncated {
            segment:   name.to_owned(),
            start,
            end:       declared_end,
            available: buffer.len(),
        });
        buffer.len()
    } else {
        declared_end
    };
    let mut cursor = ByteCursor::new(&buffer[start.min(end)..end]);

    match SegmentHeader::read(&mut cursor) {
        Ok(header) => {
            for warning in header.validate(name) {
                log.record(warning);
            }
            segment.header = Some(header);
        }
        Err(error) => {
            log.record(Warning::OutOfBounds { segment: name.to_owned(), error });
            return log.finish(segment);
        }
    }

    while !cursor.is_empty() {
        let offset = start + cursor.position();
        let index = segment.blocks.len();

        let header = match BlockHeader::read(&mut cursor) {
            Ok(header) => header,
            Err(error) => {
                log.record(Warning::OutOfBounds { segment: name.to_owned(), error });
                break;
            }
        };
        let payload = match cursor.take(header.encoded_size as usize) {
            Ok(payload) => payload,
            Err(error) => {
                log.record(Warning::OutOfBounds { segment: name.to_owned(), error });
                break;
            }
        };

        let data = log.absorb(decode_block(&header, payload, name, index));
        segment.blocks.push(BlockSummary { offset, header, produced: data.len() });
        segment.payload.extend_from_slice(&data);
    }

    if segment.payload.last() == Some(&0) {
        segment.payload.pop();
    }

    tracing::debug!(
        segment = name,
        blocks = segment.blocks.len(),
        bytes = segment.payload.len(),
        warnings = log.len(),
        "decoded segment"
    );
    log.finish(segment)
}

/// Encode one document as a segment, splitting it into `chunk_size` blocks.
pub fn encode_segment(name: &str, document: &[u8], chunk_size: usize) -> Result<Vec<u8>> {
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(CxbError::InvalidChunkSize(chunk_size));
    }

    let mut xml = Vec::with_capacity(document.len() + 1);
    xml.extend_from_slice(document);
    xml.push(0);
    let xml_size = u32::try_from(xml.len())
        .map_err(|_| CxbError::DocumentTooLarge { name: name.to_owned(), len: document.len() })?;

    let chunks: Vec<&[u8]> = xml.chunks(chunk_size).collect();
    let blocks = compress_chunks(&chunks)?;

    let body: usize = blocks.iter().map(|(_, payload)| 13 + payload.len()).sum();
    let mut out = Vec::with_capacity(crate::header::HEADER_SIZE + body);
    SegmentHeader::new(xml_size).write(&mut out)?;
    for (header, payload) in &blocks {
        header.write(&mut out)?;
        out.extend_from_slice(payload);
    }

    tracing::debug!(segment = name, blocks = blocks.len(), bytes = out.len(), "encoded segment");
    Ok(out)
}
