//! Per-call decode status.

use std::fmt;

use crate::error::{DecodeError, Malformed};

/// Outcome of a single decode call.
///
/// A status is produced once per call and never carried across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeStatus {
    /// An instruction was emitted and the cursor advanced past it.
    Success,
    /// Not enough bytes remain.
    EndOfInput,
    /// The bytes have no defined length under the supported opcode maps.
    MalformedEncoding(Malformed),
    /// A legacy prefix appeared where the grammar only allows an opcode.
    PrefixConflict,
    /// The instruction started but its remaining bytes are missing.
    Truncated,
}

impl DecodeStatus {
    /// Status of a decode result.
    pub fn of<T>(result: &Result<T, DecodeError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => err.status(),
        }
    }

    /// Stable numeric code: 0 success, 1 end of input, 2 malformed,
    /// 3 prefix conflict, 4 truncated.
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::EndOfInput => 1,
            Self::MalformedEncoding(_) => 2,
            Self::PrefixConflict => 3,
            Self::Truncated => 4,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Self::EndOfInput)
    }
}

impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::EndOfInput => f.write_str("end of input"),
            Self::MalformedEncoding(reason) => write!(f, "malformed encoding ({reason})"),
            Self::PrefixConflict => f.write_str("prefix conflict"),
            Self::Truncated => f.write_str("truncated"),
        }
    }
}
