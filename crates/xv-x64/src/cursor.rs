//! Bounds-checked byte cursor over a borrowed code region.

use thiserror::Error;

/// A read or move past the end of the region.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{needed} byte(s) at offset {offset} exceed capacity {capacity}")]
pub struct OutOfBounds {
    /// Physical offset of the first byte that was requested.
    pub offset: usize,
    /// Number of bytes requested.
    pub needed: usize,
    /// Length of the region.
    pub capacity: usize,
}

/// Read position within a contiguous, immutable byte region.
///
/// The cursor never copies the region. `position` only moves through
/// [`Cursor::advance`] and [`Cursor::seek`], and always stays within
/// `0..=capacity`.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    position: usize,
    logical_base: u64,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `bytes`, whose first byte lives at
    /// `logical_base`.
    pub fn new(bytes: &'a [u8], logical_base: u64) -> Self {
        Self {
            bytes,
            position: 0,
            logical_base,
        }
    }

    /// Physical index of the next byte to decode.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Length of the region.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn logical_base(&self) -> u64 {
        self.logical_base
    }

    /// Bytes left between the position and the end of the region.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.bytes.len()
    }

    /// Logical address of the byte at the current position.
    pub fn logical_address(&self) -> u64 {
        self.logical_base.wrapping_add(self.position as u64)
    }

    /// The whole region, independent of the position.
    pub fn region(&self) -> &'a [u8] {
        self.bytes
    }

    /// Reads the byte `offset` bytes past the current position.
    pub fn peek(&self, offset: usize) -> Result<u8, OutOfBounds> {
        let index = self
            .position
            .checked_add(offset)
            .ok_or_else(|| self.out_of_bounds(usize::MAX, 1))?;
        self.bytes
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_bounds(index, 1))
    }

    /// Moves the position forward by `n` bytes, returning the new position.
    ///
    /// Fails without moving if fewer than `n` bytes remain.
    pub fn advance(&mut self, n: usize) -> Result<usize, OutOfBounds> {
        if n > self.remaining() {
            return Err(self.out_of_bounds(self.position, n));
        }
        self.position += n;
        Ok(self.position)
    }

    /// Moves the position to an absolute physical index (at most `capacity`).
    pub fn seek(&mut self, position: usize) -> Result<(), OutOfBounds> {
        if position > self.bytes.len() {
            return Err(self.out_of_bounds(position, 0));
        }
        self.position = position;
        Ok(())
    }

    /// Starts an uncommitted forward read at the current position.
    pub fn lookahead(&self) -> Lookahead<'a> {
        Lookahead {
            bytes: self.bytes,
            start: self.position,
            offset: 0,
        }
    }

    fn out_of_bounds(&self, offset: usize, needed: usize) -> OutOfBounds {
        OutOfBounds {
            offset,
            needed,
            capacity: self.bytes.len(),
        }
    }
}

/// Forward-only reader that never moves the cursor it came from.
///
/// The decoder threads one of these through every stage and folds
/// [`Lookahead::consumed`] into the cursor only once an instruction is
/// complete.
#[derive(Debug, Clone)]
pub struct Lookahead<'a> {
    bytes: &'a [u8],
    start: usize,
    offset: usize,
}

impl<'a> Lookahead<'a> {
    /// Bytes read so far.
    pub fn consumed(&self) -> usize {
        self.offset
    }

    /// Physical index this lookahead started at.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, OutOfBounds> {
        let index = self.start + self.offset;
        self.bytes
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_bounds(1))
    }

    /// Consumes and returns the next byte.
    pub fn next_u8(&mut self) -> Result<u8, OutOfBounds> {
        let byte = self.peek_u8()?;
        self.offset += 1;
        Ok(byte)
    }

    /// Consumes `n` bytes (at most 8) and returns them as a little-endian
    /// integer. Nothing is consumed on failure.
    pub fn read_le(&mut self, n: usize) -> Result<u64, OutOfBounds> {
        debug_assert!(n <= 8);
        let begin = self.start + self.offset;
        let raw = self
            .bytes
            .get(begin..begin + n)
            .ok_or_else(|| self.out_of_bounds(n))?;
        let value = raw
            .iter()
            .rev()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));
        self.offset += n;
        Ok(value)
    }

    /// Consumes `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) -> Result<(), OutOfBounds> {
        if self.start + self.offset + n > self.bytes.len() {
            return Err(self.out_of_bounds(n));
        }
        self.offset += n;
        Ok(())
    }

    fn out_of_bounds(&self, needed: usize) -> OutOfBounds {
        OutOfBounds {
            offset: self.start + self.offset,
            needed,
            capacity: self.bytes.len(),
        }
    }
}
