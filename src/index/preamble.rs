//! The preamble: the segment name/size table in front of the first segment.
//!
//! # Writing
//! The encoder emits a fixed-width file-info table:
//!
//! ```text
//! repeat per segment:  name[32] (ASCII, zero padded) | size[8] (ASCII decimal, zero padded)
//! then:                '0' | 39 x 00
//! ```
//!
//! # Reading
//! Readers do not rely on the fixed widths.  Every byte outside the
//! printable ASCII range becomes a space, the text is split on whitespace
//! and the tokens are taken pairwise as `(name, size)`.  The `"0"` after the
//! last entry is left over as an odd token and ignored.
//!
//! The two views agree only while every field keeps at least one NUL
//! separator, so names are limited to 31 graphic characters and sizes to 7
//! digits.

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::{Outcome, Warning, WarningLog};
use crate::header::SIZE_FIELD_LEN;

pub const NAME_FIELD_LEN:  usize = 32;
pub const SIZE_FIELD_WIDTH: usize = 8;
pub const TABLE_TERMINATOR: u8   = b'0';
pub const TERMINATOR_PAD:  usize = 39;
pub const MAX_NAME_LEN:    usize = NAME_FIELD_LEN - 1;
pub const MAX_SEGMENT_LEN: usize = 9_999_999;

/// One `(name, size)` pair from the preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub name:          String,
    pub declared_size: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileInfoError {
    #[error("segment name {name:?} is invalid: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("segment {name:?} is {size} bytes; the file-info table holds at most {MAX_SEGMENT_LEN}")]
    SegmentTooLarge { name: String, size: usize },
}

#[inline]
fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

/// Split a byte range into printable tokens.
pub fn tokenize(bytes: &[u8]) -> Vec<&str> {
    bytes
        .split(|&b| !is_printable(b) || b == b' ')
        .filter(|t| !t.is_empty())
        // Every byte left in a token is printable ASCII.
        .filter_map(|t| std::str::from_utf8(t).ok())
        .collect()
}

/// Leading-decimal parse: `"123"` and `"123abc"` give 123, `"abc"` fails.
fn parse_size(token: &str) -> Option<usize> {
    let digits = token.len() - token.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    token[..digits].parse().ok()
}

/// Read the `(name, size)` pairs in front of the first magic.
///
/// The tokenized range is `[0, first_magic - 4)`, not `[0, first_magic)`.
/// The four bytes directly before `first_magic` are the first segment's
/// `xml_size` field and are not part of the table; a printable byte there
/// would otherwise be read as an extra token.
pub fn parse_preamble(buffer: &[u8], first_magic: usize) -> Outcome<Vec<IndexEntry>> {
    let end = first_magic.saturating_sub(SIZE_FIELD_LEN).min(buffer.len());
    let tokens = tokenize(&buffer[..end]);

    let mut log = WarningLog::new();
    let mut entries = Vec::with_capacity(tokens.len() / 2);
    for pair in tokens.chunks_exact(2) {
        let (name, size) = (pair[0], pair[1]);
        match parse_size(size) {
            Some(declared_size) => entries.push(IndexEntry { name: name.to_owned(), declared_size }),
            None => log.record(Warning::InvalidSegmentSize {
                name:  name.to_owned(),
                token: size.to_owned(),
            }),
        }
    }
    tracing::debug!(tokens = tokens.len(), entries = entries.len(), "parsed preamble");
    log.finish(entries)
}

/// Check that `name` survives the write/tokenize round trip unchanged.
pub fn validate_name(name: &str) -> Result<(), FileInfoError> {
    let reason = if name.is_empty() {
        Some("empty")
    } else if name.len() > MAX_NAME_LEN {
        Some("longer than 31 bytes")
    } else if !name.bytes().all(|b| b.is_ascii_graphic()) {
        Some("contains whitespace or non-ASCII bytes")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(FileInfoError::InvalidName { name: name.to_owned(), reason }),
        None => Ok(()),
    }
}

/// Build the fixed-width file-info table for `entries`.
pub fn write_file_info(entries: &[IndexEntry]) -> Result<Vec<u8>, FileInfoError> {
    let mut out = Vec::with_capacity(entries.len() * (NAME_FIELD_LEN + SIZE_FIELD_WIDTH) + 1 + TERMINATOR_PAD);
    for entry in entries {
        validate_name(&entry.name)?;
        if entry.declared_size > MAX_SEGMENT_LEN {
            return Err(FileInfoError::SegmentTooLarge {
                name: entry.name.clone(),
                size: entry.declared_size,
            });
        }
        let mut name = [0u8; NAME_FIELD_LEN];
        name[..entry.name.len()].copy_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&name);

        let digits = entry.declared_size.to_string();
        let mut size = [0u8; SIZE_FIELD_WIDTH];
        size[..digits.len()].copy_from_slice(digits.as_bytes());
        out.extend_from_slice(&size);
    }
    out.push(TABLE_TERMINATOR);
    out.extend_from_slice(&[0u8; TERMINATOR_PAD]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, declared_size: usize) -> IndexEntry {
        IndexEntry { name: name.into(), declared_size }
    }

    #[test]
    fn table_layout() {
        let table = write_file_info(&[entry("a", 37)]).unwrap();
        assert_eq!(table.len(), 40 + 40);
        assert_eq!(table[0], b'a');
        assert!(table[1..32].iter().all(|&b| b == 0));
        assert_eq!(&table[32..34], b"37");
        assert_eq!(table[40], b'0');
        assert!(table[41..].iter().all(|&b| b == 0));
    }

    #[test]
    fn table_tokenizes_back_to_its_entries() {
        let entries = vec![
            entry("gamemodeparams_advteamwanted", 1_234_567),
            entry("x", 0),
            entry(&"n".repeat(MAX_NAME_LEN), 42),
        ];
        let mut buf = write_file_info(&entries).unwrap();
        // The first segment's xml_size field may hold printable bytes.
        buf.extend(b"1 2 ");
        let first_magic = buf.len();
        let parsed = parse_preamble(&buf, first_magic);
        assert!(parsed.is_clean());
        assert_eq!(parsed.value, entries);
    }

    #[test]
    fn size_field_before_first_magic_is_not_tokenized() {
        let mut buf = b"a 10 0".to_vec();
        // xml_size 0x20_37_37_20 reads as " 77 " if tokenized.
        buf.extend(b" 77 ");
        let parsed = parse_preamble(&buf, buf.len());
        assert_eq!(parsed.value, vec![entry("a", 10)]);
    }

    #[test]
    fn non_printable_bytes_separate_tokens() {
        let buf = b"alpha\x0112\xFFbeta\t7 0\0\0\0\0\0";
        let parsed = parse_preamble(buf, buf.len());
        assert_eq!(parsed.value, vec![entry("alpha", 12), entry("beta", 7)]);
    }

    #[test]
    fn bad_size_drops_only_that_pair() {
        let buf = b"a 10 b size c 30 0 ____";
        let parsed = parse_preamble(buf, buf.len());
        assert_eq!(parsed.value, vec![entry("a", 10), entry("c", 30)]);
        assert_eq!(
            parsed.warnings,
            vec![Warning::InvalidSegmentSize { name: "b".into(), token: "size".into() }]
        );
    }

    #[test]
    fn size_uses_leading_digits() {
        assert_eq!(parse_size("123abc"), Some(123));
        assert_eq!(parse_size("-5"), None);
        assert_eq!(parse_size("99999999999999999999999999"), None);
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(validate_name("gamemode_free").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("two words").is_err());
        assert!(validate_name(&"n".repeat(32)).is_err());
        assert!(validate_name("caf\u{e9}").is_err());
    }

    #[test]
    fn oversized_segment_is_rejected() {
        let err = write_file_info(&[entry("big", MAX_SEGMENT_LEN + 1)]).unwrap_err();
        assert!(matches!(err, FileInfoError::SegmentTooLarge { .. }));
    }
}
