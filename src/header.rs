//! The fixed 19-byte segment header.
//!
//! ```text
//! offset  width  field
//!      0      4  xml_size         decoded payload length incl. NUL (informational)
//!      4      8  magic            0x1004FA9957FBAA33
//!     12      2  version          1
//!     14      1  algo             2 = LZO2A
//!     15      2  enc_buffer_size  32768
//!     17      2  dec_buffer_size  0
//! ```
//!
//! All fields are little-endian.  `version` is two bytes and `algo` one:
//! the bytes `01 00 02` are what archives in the wild carry at offset 12.
//!
//! The header is a validation hint only.  A reader reports fields that
//! differ from the constants above and keeps decoding.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::codec::{ALGO_LZO2A, MAX_CHUNK_SIZE};
use crate::cursor::{ByteCursor, OutOfBounds};
use crate::diagnostics::{HeaderField, Warning};

pub const MAGIC:           u64      = 0x1004_FA99_57FB_AA33;
pub const MAGIC_BYTES:     [u8; 8]  = MAGIC.to_le_bytes();
pub const VERSION:         u16      = 1;
pub const ALGO:            u8       = ALGO_LZO2A;
pub const ENC_BUFFER_SIZE: u16      = MAX_CHUNK_SIZE as u16;
pub const DEC_BUFFER_SIZE: u16      = 0;
pub const HEADER_SIZE:     usize    = 19;
/// Width of the `xml_size` field that precedes the magic.
pub const SIZE_FIELD_LEN:  usize    = 4;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SegmentHeader {
    pub xml_size:        u32,
    pub magic:           u64,
    pub version:         u16,
    pub algo:            u8,
    pub enc_buffer_size: u16,
    pub dec_buffer_size: u16,
}

impl SegmentHeader {
    pub fn new(xml_size: u32) -> Self {
        Self {
            xml_size,
            magic:           MAGIC,
            version:         VERSION,
            algo:            ALGO,
            enc_buffer_size: ENC_BUFFER_SIZE,
            dec_buffer_size: DEC_BUFFER_SIZE,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.xml_size)?;
        writer.write_u64::<LittleEndian>(self.magic)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u8(self.algo)?;
        writer.write_u16::<LittleEndian>(self.enc_buffer_size)?;
        writer.write_u16::<LittleEndian>(self.dec_buffer_size)?;
        Ok(())
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self, OutOfBounds> {
        Ok(Self {
            xml_size:        cursor.read_u32()?,
            magic:           cursor.read_u64()?,
            version:         cursor.read_u16()?,
            algo:            cursor.read_u8()?,
            enc_buffer_size: cursor.read_u16()?,
            dec_buffer_size: cursor.read_u16()?,
        })
    }

    /// Compare every field against the format constants.
    pub fn validate(&self, segment: &str) -> Vec<Warning> {
        let mut out = Vec::new();
        if self.xml_size == 0 {
            out.push(Warning::ZeroXmlSize { segment: segment.to_owned() });
        }
        let checks = [
            (HeaderField::Magic,         MAGIC,                        self.magic),
            (HeaderField::Version,       u64::from(VERSION),           u64::from(self.version)),
            (HeaderField::Algo,          u64::from(ALGO),              u64::from(self.algo)),
            (HeaderField::EncBufferSize, u64::from(ENC_BUFFER_SIZE),   u64::from(self.enc_buffer_size)),
            (HeaderField::DecBufferSize, u64::from(DEC_BUFFER_SIZE),   u64::from(self.dec_buffer_size)),
        ];
        for (field, expected, found) in checks {
            if expected != found {
                out.push(Warning::HeaderMismatch {
                    segment: segment.to_owned(),
                    field,
                    expected,
                    found,
                });
            }
        }
        out
    }
}
