//! Block framing inside a segment.
//!
//! ```text
//! compressed:  01 | encoded_size:u32 | decoded_size:u32 | checksum:u32 | payload[encoded_size]
//! raw:         00 | data_size:u32    | payload[data_size]
//! ```
//!
//! Any non-zero flag byte means "compressed".  The checksum is adler-32 over
//! the *encoded* bytes, seeded with 0 rather than the customary 1.

use adler2::Adler32;
use byteorder::{LittleEndian, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Write};

use crate::codec::{get_codec, CodecError, CodecId};
use crate::cursor::{ByteCursor, OutOfBounds};
use crate::diagnostics::{Outcome, Warning, WarningLog};

pub const FLAG_RAW:        u8 = 0;
pub const FLAG_COMPRESSED: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub compressed:   bool,
    pub encoded_size: u32,
    /// Equal to `encoded_size` for raw blocks.
    pub decoded_size: u32,
    /// Present only on compressed blocks.
    pub checksum:     Option<u32>,
}

impl BlockHeader {
    pub fn raw(len: u32) -> Self {
        Self { compressed: false, encoded_size: len, decoded_size: len, checksum: None }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        if self.compressed {
            writer.write_u8(FLAG_COMPRESSED)?;
            writer.write_u32::<LittleEndian>(self.encoded_size)?;
            writer.write_u32::<LittleEndian>(self.decoded_size)?;
            writer.write_u32::<LittleEndian>(self.checksum.unwrap_or(0))?;
        } else {
            writer.write_u8(FLAG_RAW)?;
            writer.write_u32::<LittleEndian>(self.encoded_size)?;
        }
        Ok(())
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self, OutOfBounds> {
        if cursor.read_u8()? == FLAG_RAW {
            return Ok(Self::raw(cursor.read_u32()?));
        }
        Ok(Self {
            compressed:   true,
            encoded_size: cursor.read_u32()?,
            decoded_size: cursor.read_u32()?,
            checksum:     Some(cursor.read_u32()?),
        })
    }
}

/// adler-32 with a zero seed, as stored in compressed block headers.
pub fn checksum(data: &[u8]) -> u32 {
    let mut adler = Adler32::from_checksum(0);
    adler.write_slice(data);
    adler.checksum()
}

/// Compress one chunk into a block.  Fails for chunks over the block limit.
pub fn encode_block(chunk: &[u8]) -> Result<(BlockHeader, Vec<u8>), CodecError> {
    let payload = get_codec(CodecId::Lzo2a).compress(chunk)?;
    let header = BlockHeader {
        compressed:   true,
        encoded_size: payload.len() as u32,
        decoded_size: chunk.len() as u32,
        checksum:     Some(checksum(&payload)),
    };
    Ok((header, payload))
}

/// Decode one block's payload.
///
/// Never fails: a checksum mismatch is reported and decompression still
/// runs; a block that will not decompress is reported and yields no bytes.
pub fn decode_block(header: &BlockHeader, payload: &[u8], segment: &str, index: usize) -> Outcome<Vec<u8>> {
    if !header.compressed {
        return Outcome::clean(payload.to_vec());
    }

    let mut log = WarningLog::new();
    if let Some(stored) = header.checksum {
        let computed = checksum(payload);
        if computed != stored {
            log.record(Warning::ChecksumMismatch {
                segment: segment.to_owned(),
                block:   index,
                stored,
                computed,
            });
        }
    }

    let decoded = match get_codec(CodecId::Lzo2a).decompress(payload, header.decoded_size as usize) {
        Ok(data) => {
            if data.len() != header.decoded_size as usize {
                log.record(Warning::DecodedSizeMismatch {
                    segment:  segment.to_owned(),
                    block:    index,
                    declared: header.decoded_size,
                    actual:   data.len(),
                });
            }
            data
        }
        Err(error) => {
            log.record(Warning::Decompression { segment: segment.to_owned(), block: index, error });
            Vec::new()
        }
    };
    log.finish(decoded)
}
