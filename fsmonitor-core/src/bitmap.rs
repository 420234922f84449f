//! A small compressed bitmap used to persist the set of dirty entry positions.
//!
//! The real compressed bitmap library (`ewah` in the upstream implementation
//! this crate's protocol is modeled on) is treated as an external
//! collaborator; this module is a minimal stand-in with the
//! same create/set/serialize/parse/iterate surface, compressed as
//! run-length-encoded gaps between set bits rather than a word-aligned EWAH
//! scheme. It exists so the crate is runnable without a vendored bitmap
//! dependency, not as a claim that this is the production compression
//! strategy.

use std::io::{Cursor, Read};

/// A bitmap over positions `[0, len)`, storing only the set bit positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanBitmap {
    len: u32,
    set_bits: Vec<u32>,
}

impl CleanBitmap {
    /// Create an empty bitmap over `len` positions.
    pub fn new(len: u32) -> Self {
        Self { len, set_bits: Vec::new() }
    }

    /// Number of positions this bitmap covers (`bit_size` in the upstream terminology).
    pub const fn bit_count(&self) -> usize {
        self.len as usize
    }

    /// Mark `pos` as set. `pos` must be `< bit_count()`; positions are expected
    /// to be set in non-decreasing order, matching how the bitmap library this
    /// stands in for is normally driven (a single forward scan).
    pub fn set(&mut self, pos: u32) {
        debug_assert!(pos < self.len, "bit position {pos} out of range for bitmap of len {}", self.len);
        if self.set_bits.last().copied() != Some(pos) {
            self.set_bits.push(pos);
        }
    }

    /// Whether `pos` is set.
    pub fn is_set(&self, pos: u32) -> bool {
        self.set_bits.binary_search(&pos).is_ok()
    }

    /// Iterate over the set bit positions in ascending order.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = u32> + '_ {
        self.set_bits.iter().copied()
    }

    /// Serialize as `[len:u32 BE][run_count:u32 BE][gap:u32 BE]*`, where each
    /// `gap` is the distance from the previous set bit (or 0) to this one.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.set_bits.len() * 4);
        out.extend_from_slice(&self.len.to_be_bytes());
        out.extend_from_slice(&(self.set_bits.len() as u32).to_be_bytes());
        let mut prev = 0u32;
        for &bit in &self.set_bits {
            out.extend_from_slice(&(bit - prev).to_be_bytes());
            prev = bit;
        }
        out
    }

    /// Parse a bitmap previously produced by [`Self::serialize`]. Returns the
    /// bitmap and the number of bytes consumed; the caller must treat a
    /// mismatch between the returned byte count and the advertised payload
    /// size as corruption (see `extension::parse`).
    pub fn parse(bytes: &[u8]) -> Option<(Self, usize)> {
        let mut cursor = Cursor::new(bytes);
        let len = read_u32(&mut cursor)?;
        let run_count = read_u32(&mut cursor)?;
        let mut set_bits = Vec::with_capacity(run_count as usize);
        let mut prev = 0u32;
        for _ in 0..run_count {
            let gap = read_u32(&mut cursor)?;
            prev += gap;
            set_bits.push(prev);
        }
        let consumed = cursor.position() as usize;
        Some((Self { len, set_bits }, consumed))
    }
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Option<u32> {
    let mut buf = [0u8; 4];
    cursor.read_exact(&mut buf).ok()?;
    Some(u32::from_be_bytes(buf))
}
