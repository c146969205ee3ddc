//! LZO2A: a bit-flagged LZ77 variant with a 16 KiB window.
//!
//! # Stream layout
//! Flag bits are interleaved with the byte stream.  Whenever a flag bit is
//! needed and the current flag byte is used up, the next stream byte becomes
//! the new flag byte; bits are consumed least-significant first.  A 2-bit
//! field may straddle two flag bytes.
//!
//! | code      | encoding                                                       | range |
//! |-----------|----------------------------------------------------------------|-------|
//! | literal   | `0`, byte                                                      | 1 byte |
//! | M1        | `1 0`, 2 bits `len-2`, byte `off-1`                            | len 2..=5, off 1..=256 |
//! | M2        | `1 1`, byte `off&31 \| (len-2)<<5`, byte `off>>5`               | len 3..=9, off 1..=8191 |
//! | M2 long   | `1 1`, byte `off&31`, byte `off>>5`, bit `0`, ext(`len-9`)     | len >= 10 |
//! | M3        | `1 1`, byte `o&31`, byte `o>>5`, bit `1`, ext(`len-2`)         | off 8192..=16383, `o = off-8192` |
//! | EOF       | `1 1`, byte `0x20`, byte `0x00`                                | |
//!
//! `ext(n)` stores `n >= 1` as a run of zero bytes (255 each) followed by the
//! non-zero remainder.
//!
//! The compressor walks deep hash chains over the whole window and uses one
//! step of lazy evaluation: it is the slow, high-ratio mode.

use thiserror::Error;

pub const M1_MIN_LEN:     usize = 2;
pub const M1_MAX_LEN:     usize = 5;
pub const M1_MAX_OFFSET:  usize = 256;
pub const M2_MAX_LEN:     usize = 9;
pub const M2_MAX_OFFSET:  usize = 8191;
pub const M3_MIN_LEN:     usize = 3;
pub const M3_MAX_OFFSET:  usize = 16383;
const M3_OFFSET_BASE:     usize = 8192;
const M2_LONG_BASE:       usize = 9;

const MAX_MATCH_LEN: usize = 2048;
const MAX_CHAIN:     usize = 2048;
const NICE_LEN:      usize = 512;
const HASH_BITS:     u32   = 14;
const NIL:           usize = usize::MAX;

/// Upper bound on the up-front output allocation; the declared size is
/// untrusted, so larger outputs grow on demand.
const MAX_PREALLOC: usize = 1 << 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LzoError {
    #[error("input overrun: stream ended inside a code")]
    InputOverrun,
    #[error("output overrun: decoded data exceeds {limit} byte(s)")]
    OutputOverrun { limit: usize },
    #[error("lookbehind overrun: offset {offset} with only {produced} byte(s) decoded")]
    LookbehindOverrun { offset: usize, produced: usize },
    #[error("end-of-stream marker not found")]
    EofNotFound,
    #[error("{trailing} byte(s) after the end-of-stream marker")]
    InputNotConsumed { trailing: usize },
}

// ── Decompression ────────────────────────────────────────────────────────────

struct BitReader<'a> {
    data:  &'a [u8],
    pos:   usize,
    buf:   u32,
    count: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, buf: 0, count: 0 }
    }

    fn byte(&mut self) -> Result<u8, LzoError> {
        let b = *self.data.get(self.pos).ok_or(LzoError::InputOverrun)?;
        self.pos += 1;
        Ok(b)
    }

    fn need(&mut self, n: u32) -> Result<(), LzoError> {
        if self.count < n {
            let b = self.byte()?;
            self.buf |= u32::from(b) << self.count;
            self.count += 8;
        }
        Ok(())
    }

    fn bits(&mut self, n: u32) -> Result<u32, LzoError> {
        self.need(n)?;
        let v = self.buf & ((1 << n) - 1);
        self.buf >>= n;
        self.count -= n;
        Ok(v)
    }

    fn bit(&mut self) -> Result<bool, LzoError> {
        Ok(self.bits(1)? != 0)
    }

    fn ext_len(&mut self) -> Result<usize, LzoError> {
        let mut n = 0usize;
        loop {
            match self.byte()? {
                0 => n = n.saturating_add(255),
                b => return Ok(n.saturating_add(usize::from(b))),
            }
        }
    }
}

fn copy_match(out: &mut Vec<u8>, limit: usize, off: usize, len: usize) -> Result<(), LzoError> {
    if off == 0 || off > out.len() {
        return Err(LzoError::LookbehindOverrun { offset: off, produced: out.len() });
    }
    if len > limit - out.len() {
        return Err(LzoError::OutputOverrun { limit });
    }
    let start = out.len() - off;
    // Byte-wise: source and destination may overlap.
    for i in start..start + len {
        let b = out[i];
        out.push(b);
    }
    Ok(())
}

/// Decode an LZO2A stream, refusing to produce more than `limit` bytes.
pub fn decompress_safe(input: &[u8], limit: usize) -> Result<Vec<u8>, LzoError> {
    let mut out = Vec::with_capacity(limit.min(MAX_PREALLOC));
    let mut r = BitReader::new(input);

    while r.pos < input.len() {
        if !r.bit()? {
            let b = r.byte()?;
            if out.len() >= limit {
                return Err(LzoError::OutputOverrun { limit });
            }
            out.push(b);
            continue;
        }

        if !r.bit()? {
            let len = M1_MIN_LEN + r.bits(2)? as usize;
            let off = 1 + usize::from(r.byte()?);
            copy_match(&mut out, limit, off, len)?;
            continue;
        }

        let t = usize::from(r.byte()?);
        let mut off = (t & 31) | (usize::from(r.byte()?) << 5);
        let mut len = t >> 5;
        if len == 0 {
            len = if r.bit()? {
                off += M3_OFFSET_BASE;
                M3_MIN_LEN - 1
            } else {
                M2_LONG_BASE
            };
            len = len.saturating_add(r.ext_len()?);
        } else {
            if off == 0 {
                let trailing = input.len() - r.pos;
                return match trailing {
                    0 => Ok(out),
                    _ => Err(LzoError::InputNotConsumed { trailing }),
                };
            }
            len += 2;
        }
        copy_match(&mut out, limit, off, len)?;
    }

    Err(LzoError::EofNotFound)
}

// ── Compression ──────────────────────────────────────────────────────────────

struct BitWriter {
    out:      Vec<u8>,
    flag_pos: usize,
    used:     u32,
}

impl BitWriter {
    fn with_capacity(cap: usize) -> Self {
        Self { out: Vec::with_capacity(cap), flag_pos: 0, used: 8 }
    }

    fn bit(&mut self, set: bool) {
        if self.used == 8 {
            self.flag_pos = self.out.len();
            self.out.push(0);
            self.used = 0;
        }
        if set {
            self.out[self.flag_pos] |= 1 << self.used;
        }
        self.used += 1;
    }

    fn byte(&mut self, b: u8) {
        self.out.push(b);
    }

    fn ext(&mut self, mut n: usize) {
        debug_assert!(n >= 1);
        while n > 255 {
            self.byte(0);
            n -= 255;
        }
        self.byte(n as u8);
    }

    fn literal(&mut self, b: u8) {
        self.bit(false);
        self.byte(b);
    }

    fn put_match(&mut self, m: Match) {
        if m.len <= M1_MAX_LEN && m.off <= M1_MAX_OFFSET {
            let code = (m.len - M1_MIN_LEN) as u32;
            self.bit(true);
            self.bit(false);
            self.bit(code & 1 != 0);
            self.bit(code & 2 != 0);
            self.byte((m.off - 1) as u8);
        } else if m.off <= M2_MAX_OFFSET {
            self.bit(true);
            self.bit(true);
            if m.len <= M2_MAX_LEN {
                self.byte(((m.off & 31) | ((m.len - 2) << 5)) as u8);
                self.byte((m.off >> 5) as u8);
            } else {
                self.byte((m.off & 31) as u8);
                self.byte((m.off >> 5) as u8);
                self.bit(false);
                self.ext(m.len - M2_LONG_BASE);
            }
        } else {
            let o = m.off - M3_OFFSET_BASE;
            self.bit(true);
            self.bit(true);
            self.byte((o & 31) as u8);
            self.byte((o >> 5) as u8);
            self.bit(true);
            self.ext(m.len - (M3_MIN_LEN - 1));
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.bit(true);
        self.bit(true);
        self.byte(1 << 5);
        self.byte(0);
        self.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    off: usize,
    len: usize,
}

impl Match {
    /// Whether the match codes in fewer bits than the literals it replaces.
    fn worthwhile(&self) -> bool {
        match self.len {
            0 | 1 => false,
            2     => self.off <= M1_MAX_OFFSET,
            3     => self.off <= M2_MAX_OFFSET,
            _     => self.off <= M3_MAX_OFFSET,
        }
    }
}

struct MatchFinder<'a> {
    data:     &'a [u8],
    head:     Vec<usize>,
    prev:     Vec<usize>,
    /// Most recent position of every 2-byte sequence, for M1 pairs.
    pair:     Vec<usize>,
    inserted: usize,
}

impl<'a> MatchFinder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            head:     vec![NIL; 1 << HASH_BITS],
            prev:     vec![NIL; data.len()],
            pair:     vec![NIL; 1 << 16],
            inserted: 0,
        }
    }

    fn hash3(&self, i: usize) -> usize {
        let d = self.data;
        let v = u32::from(d[i]) | u32::from(d[i + 1]) << 8 | u32::from(d[i + 2]) << 16;
        (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    fn pair_key(&self, i: usize) -> usize {
        usize::from(self.data[i]) | usize::from(self.data[i + 1]) << 8
    }

    /// Make every position before `end` visible to the search.
    fn advance_to(&mut self, end: usize) {
        while self.inserted < end {
            let i = self.inserted;
            if i + 3 <= self.data.len() {
                let h = self.hash3(i);
                self.prev[i] = self.head[h];
                self.head[h] = i;
            }
            if i + 2 <= self.data.len() {
                let k = self.pair_key(i);
                self.pair[k] = i;
            }
            self.inserted += 1;
        }
    }

    fn match_len(&self, cand: usize, i: usize, max: usize) -> usize {
        let d = self.data;
        let mut n = 0;
        while n < max && d[cand + n] == d[i + n] {
            n += 1;
        }
        n
    }

    fn longest_match(&self, i: usize) -> Option<Match> {
        let avail = self.data.len() - i;
        let max = avail.min(MAX_MATCH_LEN);
        let mut best = Match { off: 0, len: 0 };

        if avail >= 3 {
            let mut cand = self.head[self.hash3(i)];
            let mut budget = MAX_CHAIN;
            while cand != NIL && budget > 0 {
                let off = i - cand;
                if off > M3_MAX_OFFSET {
                    break;
                }
                let len = self.match_len(cand, i, max);
                if len > best.len {
                    best = Match { off, len };
                    if len == max || len >= NICE_LEN {
                        break;
                    }
                }
                cand = self.prev[cand];
                budget -= 1;
            }
        }

        if best.len < 3 && avail >= 2 {
            let cand = self.pair[self.pair_key(i)];
            if cand != NIL && i - cand <= M1_MAX_OFFSET {
                best = Match { off: i - cand, len: 2 };
            }
        }

        Some(best).filter(Match::worthwhile)
    }
}

/// Compress `input` into a self-terminating LZO2A stream.
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut w = BitWriter::with_capacity(input.len() + input.len() / 8 + 16);
    let mut mf = MatchFinder::new(input);
    let mut i = 0;

    while i < input.len() {
        mf.advance_to(i);
        let Some(m) = mf.longest_match(i) else {
            w.literal(input[i]);
            i += 1;
            continue;
        };

        if i + 1 < input.len() {
            mf.advance_to(i + 1);
            if let Some(next) = mf.longest_match(i + 1) {
                if next.len > m.len {
                    w.literal(input[i]);
                    i += 1;
                    continue;
                }
            }
        }

        w.put_match(m);
        i += m.len;
    }

    w.finish()
}
