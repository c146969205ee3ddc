//! Bounds-checked little-endian reader over an untrusted byte slice.
//!
//! Every fixed-width read checks the remaining length first and returns
//! [`OutOfBounds`] instead of panicking.  A failed read never moves the
//! cursor, so the caller can report exactly where the data ran out.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("read of {wanted} byte(s) at offset {offset} exceeds the {available} byte(s) available")]
pub struct OutOfBounds {
    pub offset:    usize,
    pub wanted:    usize,
    pub available: usize,
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], OutOfBounds> {
        if n > self.remaining() {
            return Err(OutOfBounds {
                offset:    self.pos,
                wanted:    n,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, OutOfBounds> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, OutOfBounds> {
        self.take(4).map(LittleEndian::read_u32)
    }

    pub fn read_u64(&mut self) -> Result<u64, OutOfBounds> {
        self.take(8).map(LittleEndian::read_u64)
    }
}
