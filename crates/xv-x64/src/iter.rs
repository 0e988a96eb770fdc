//! Lazy instruction sequences.

use std::iter::FusedIterator;

use crate::cursor::{Cursor, OutOfBounds};
use crate::error::DecodeError;
use crate::status::DecodeStatus;
use crate::x86_64::{Decoder, Instruction};

/// Iterator over the instructions at a cursor.
///
/// Yields instructions until the first failed decode, then stays exhausted.
/// The failure is kept in [`Instructions::stop_reason`] and the cursor sits
/// at the failing byte. Iteration only resumes after the caller repositions
/// the cursor with [`Instructions::skip_bytes`] or [`Instructions::seek`].
#[derive(Debug)]
pub struct Instructions<'d, 'c, 'a> {
    decoder: &'d Decoder,
    cursor: &'c mut Cursor<'a>,
    stopped: Option<DecodeError>,
}

impl<'d, 'c, 'a> Instructions<'d, 'c, 'a> {
    pub(crate) fn new(decoder: &'d Decoder, cursor: &'c mut Cursor<'a>) -> Self {
        Self {
            decoder,
            cursor,
            stopped: None,
        }
    }

    /// The error that ended iteration, if it has ended.
    pub fn stop_reason(&self) -> Option<&DecodeError> {
        self.stopped.as_ref()
    }

    /// `Success` while iteration can continue, otherwise the final status.
    pub fn status(&self) -> DecodeStatus {
        self.stopped.map_or(DecodeStatus::Success, |err| err.status())
    }

    pub fn cursor(&self) -> &Cursor<'a> {
        &*self.cursor
    }

    /// Moves the cursor `n` bytes forward and clears the stop state.
    pub fn skip_bytes(&mut self, n: usize) -> Result<(), OutOfBounds> {
        self.cursor.advance(n)?;
        self.stopped = None;
        Ok(())
    }

    /// Moves the cursor to a physical position and clears the stop state.
    pub fn seek(&mut self, position: usize) -> Result<(), OutOfBounds> {
        self.cursor.seek(position)?;
        self.stopped = None;
        Ok(())
    }
}

impl Iterator for Instructions<'_, '_, '_> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped.is_some() {
            return None;
        }
        match self.decoder.decode(self.cursor) {
            Ok(instruction) => Some(instruction),
            Err(err) => {
                self.stopped = Some(err);
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.stopped.is_some() {
            (0, Some(0))
        } else {
            (0, Some(self.cursor.remaining()))
        }
    }
}

impl FusedIterator for Instructions<'_, '_, '_> {}
