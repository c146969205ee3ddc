//! Segment index: where each named segment sits in an archive buffer.
//!
//! The index is derived, never stored: magic offsets come from
//! [`scanner::find_magic`] and names/sizes from [`preamble::parse_preamble`].
//! The two lists are matched up by position, so they must have the same
//! length or the archive cannot be parsed at all.

pub mod preamble;
pub mod scanner;

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::Outcome;
use crate::header::SIZE_FIELD_LEN;

pub use preamble::{parse_preamble, write_file_info, FileInfoError, IndexEntry};
pub use scanner::find_magic;

/// Structural failures that make a whole archive unreadable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("no segment magic found in the archive")]
    NoMagic,
    #[error("archive has {magics} segment header(s) but the preamble lists {entries} segment(s)")]
    SegmentCountMismatch { magics: usize, entries: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentLocation {
    pub name:          String,
    pub magic_offset:  usize,
    pub declared_size: usize,
}

impl SegmentLocation {
    /// Offset of the leading `xml_size` field, if the buffer has room for it.
    pub fn start(&self) -> Option<usize> {
        self.magic_offset.checked_sub(SIZE_FIELD_LEN)
    }
}

/// Pair every magic occurrence with its preamble entry.
pub fn locate_segments(buffer: &[u8]) -> Result<Outcome<Vec<SegmentLocation>>, FormatError> {
    let offsets = find_magic(buffer);
    let Some(&first) = offsets.first() else {
        return Err(FormatError::NoMagic);
    };

    let (entries, warnings) = parse_preamble(buffer, first).into_parts();
    if entries.len() != offsets.len() {
        return Err(FormatError::SegmentCountMismatch {
            magics:  offsets.len(),
            entries: entries.len(),
        });
    }

    let locations = entries
        .into_iter()
        .zip(offsets)
        .map(|(entry, magic_offset)| SegmentLocation {
            name: entry.name,
            magic_offset,
            declared_size: entry.declared_size,
        })
        .collect();
    Ok(Outcome::new(locations, warnings))
}
