//! Magic scanner: find every segment header in an archive buffer.
//!
//! Segment positions are never stored explicitly; they are rediscovered by a
//! literal search for the 8-byte magic.  The search ignores alignment and
//! never reports overlapping hits.

use crate::header::MAGIC_BYTES;

/// Byte offsets of every occurrence of the magic, in ascending order.
pub fn find_magic(buffer: &[u8]) -> Vec<usize> {
    let mut hits = Vec::new();
    let mut i = 0;
    while i + MAGIC_BYTES.len() <= buffer.len() {
        // Jump straight to the next candidate first byte.
        match buffer[i..].iter().position(|&b| b == MAGIC_BYTES[0]) {
            Some(skip) => i += skip,
            None => break,
        }
        if i + MAGIC_BYTES.len() > buffer.len() {
            break;
        }
        if buffer[i..i + MAGIC_BYTES.len()] == MAGIC_BYTES {
            hits.push(i);
            i += MAGIC_BYTES.len();
        } else {
            i += 1;
        }
    }
    hits
}
