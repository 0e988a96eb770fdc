//! Decode error types.

use thiserror::Error;

use crate::cursor::OutOfBounds;
use crate::status::DecodeStatus;
use crate::x86_64::OpcodeClass;

/// Why a byte pattern has no measurable length under the supported opcode maps.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Malformed {
    /// The opcode has no entry in its map (or is invalid in long mode).
    #[error("no encoding is defined for opcode {class}")]
    UnmappedOpcode { class: OpcodeClass },

    /// The lead byte starts an encoding family outside the four legacy maps
    /// (VEX or EVEX).
    #[error("unsupported encoding family introduced by {byte:#04x}")]
    Unsupported { byte: u8 },

    /// The instruction would be longer than the architectural limit.
    #[error("instruction length {length} exceeds the {max}-byte limit")]
    TooLong { length: usize, max: usize },
}

/// Error type for instruction decoding.
///
/// Every variant carries the logical address of the byte at which the failed
/// decode call started. The cursor is always left at that byte.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes remain for the byte(s) a stage needs.
    #[error("end of input at {address:#x}")]
    EndOfInput { address: u64 },

    /// The instruction started but ran out of bytes (only reported when
    /// truncation reporting is enabled).
    #[error("truncated instruction at {address:#x}: need {needed} bytes, have {available}")]
    Truncated {
        address: u64,
        needed: usize,
        available: usize,
    },

    /// Byte pattern with no defined length.
    #[error("malformed encoding at {address:#x}: {reason}")]
    MalformedEncoding { address: u64, reason: Malformed },

    /// A legacy prefix in opcode position, after a REX prefix.
    #[error("prefix {byte:#04x} follows a REX prefix in instruction at {address:#x}")]
    PrefixConflict { address: u64, byte: u8 },
}

impl DecodeError {
    /// Creates a new EndOfInput error.
    pub fn end_of_input(address: u64) -> Self {
        Self::EndOfInput { address }
    }

    /// Creates a new Truncated error.
    pub fn truncated(address: u64, needed: usize, available: usize) -> Self {
        Self::Truncated {
            address,
            needed,
            available,
        }
    }

    /// Creates a new MalformedEncoding error.
    pub fn malformed(address: u64, reason: Malformed) -> Self {
        Self::MalformedEncoding { address, reason }
    }

    /// Creates a new PrefixConflict error.
    pub fn prefix_conflict(address: u64, byte: u8) -> Self {
        Self::PrefixConflict { address, byte }
    }

    /// Logical address of the first byte of the failed instruction.
    pub fn address(&self) -> u64 {
        match *self {
            Self::EndOfInput { address }
            | Self::Truncated { address, .. }
            | Self::MalformedEncoding { address, .. }
            | Self::PrefixConflict { address, .. } => address,
        }
    }

    /// The status this error reports to the caller.
    pub fn status(&self) -> DecodeStatus {
        match *self {
            Self::EndOfInput { .. } => DecodeStatus::EndOfInput,
            Self::Truncated { .. } => DecodeStatus::Truncated,
            Self::MalformedEncoding { reason, .. } => DecodeStatus::MalformedEncoding(reason),
            Self::PrefixConflict { .. } => DecodeStatus::PrefixConflict,
        }
    }

    /// Returns true if the caller may resynchronize by skipping bytes.
    ///
    /// Running out of input is not resynchronizable: no later position can
    /// hold a complete instruction either.
    pub fn is_resynchronizable(&self) -> bool {
        matches!(
            self,
            Self::MalformedEncoding { .. } | Self::PrefixConflict { .. }
        )
    }
}

/// Failure raised inside a pipeline stage, before the instruction address
/// and configuration turn it into a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    OutOfBounds(OutOfBounds),
    Malformed(Malformed),
    PrefixConflict(u8),
}

impl From<OutOfBounds> for Fault {
    fn from(err: OutOfBounds) -> Self {
        Self::OutOfBounds(err)
    }
}

impl From<Malformed> for Fault {
    fn from(reason: Malformed) -> Self {
        Self::Malformed(reason)
    }
}
