//! x86 prefix scanning.

use crate::config::RexPolicy;
use crate::cursor::Lookahead;
use crate::error::{Fault, Malformed};

/// Accumulated prefix state of one instruction.
///
/// Legacy prefixes overwrite their category on repeat; REX is kept unpacked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefixState {
    /// Segment override
    pub segment: Option<Segment>,
    /// Operand size override (0x66)
    pub operand_size: bool,
    /// Address size override (0x67)
    pub address_size: bool,
    /// REP/REPE (0xF3) or REPNE (0xF2)
    pub repeat: Option<Repeat>,
    /// LOCK prefix (0xF0)
    pub lock: bool,
    /// REX prefix
    pub rex: Option<Rex>,
    /// Number of prefix bytes consumed, REX included.
    pub len: u8,
}

/// Segment override prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    ES,
    CS,
    SS,
    DS,
    FS,
    GS,
}

impl Segment {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x26 => Some(Self::ES),
            0x2E => Some(Self::CS),
            0x36 => Some(Self::SS),
            0x3E => Some(Self::DS),
            0x64 => Some(Self::FS),
            0x65 => Some(Self::GS),
            _ => None,
        }
    }
}

/// Group 1 repeat prefixes. They share one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Repeat {
    /// 0xF3
    Rep,
    /// 0xF2
    Repne,
}

/// REX prefix fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rex {
    /// REX.W - 64-bit operand size
    pub w: bool,
    /// REX.R - extends ModR/M reg field
    pub r: bool,
    /// REX.X - extends SIB index field
    pub x: bool,
    /// REX.B - extends ModR/M r/m, SIB base, or opcode reg
    pub b: bool,
}

impl Rex {
    /// Returns true for bytes 0x40-0x4F.
    pub fn is_rex(byte: u8) -> bool {
        byte & 0xF0 == 0x40
    }

    /// Parse a REX byte.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            w: byte & 0x08 != 0,
            r: byte & 0x04 != 0,
            x: byte & 0x02 != 0,
            b: byte & 0x01 != 0,
        }
    }

    /// Re-encodes the prefix byte.
    pub fn to_byte(self) -> u8 {
        0x40 | (self.w as u8) << 3 | (self.r as u8) << 2 | (self.x as u8) << 1 | self.b as u8
    }
}

/// A single legacy prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Legacy {
    Segment(Segment),
    OperandSize,
    AddressSize,
    Repeat(Repeat),
    Lock,
}

impl Legacy {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x66 => Some(Self::OperandSize),
            0x67 => Some(Self::AddressSize),
            0xF0 => Some(Self::Lock),
            0xF2 => Some(Self::Repeat(Repeat::Repne)),
            0xF3 => Some(Self::Repeat(Repeat::Rep)),
            _ => Segment::from_byte(byte).map(Self::Segment),
        }
    }
}

/// Returns true if `byte` is a legacy prefix (REX excluded).
pub fn is_legacy_prefix(byte: u8) -> bool {
    Legacy::from_byte(byte).is_some()
}

impl PrefixState {
    /// Consumes prefix bytes up to the first opcode or escape byte.
    ///
    /// Stops without consuming a legacy prefix that follows a REX byte under
    /// [`RexPolicy::Strict`]; the opcode resolver then sees that byte. A run
    /// of prefixes that leaves no room for an opcode within `max_length`
    /// bytes is malformed.
    pub(crate) fn scan(
        input: &mut Lookahead<'_>,
        policy: RexPolicy,
        max_length: usize,
    ) -> Result<Self, Fault> {
        let mut state = Self::default();

        loop {
            if input.consumed() >= max_length {
                return Err(Malformed::TooLong {
                    length: input.consumed() + 1,
                    max: max_length,
                }
                .into());
            }

            let byte = input.peek_u8()?;
            if let Some(prefix) = Legacy::from_byte(byte) {
                if state.rex.is_some() {
                    match policy {
                        RexPolicy::Strict => break,
                        RexPolicy::Lenient => state.rex = None,
                    }
                }
                state.apply(prefix);
            } else if Rex::is_rex(byte) {
                state.rex = Some(Rex::from_byte(byte));
            } else {
                break;
            }

            input.skip(1)?;
            state.len += 1;
        }

        Ok(state)
    }

    fn apply(&mut self, prefix: Legacy) {
        match prefix {
            Legacy::Segment(segment) => self.segment = Some(segment),
            Legacy::OperandSize => self.operand_size = true,
            Legacy::AddressSize => self.address_size = true,
            Legacy::Repeat(repeat) => self.repeat = Some(repeat),
            Legacy::Lock => self.lock = true,
        }
    }

    /// Returns the REX prefix, or an all-clear one.
    pub fn rex_or_default(&self) -> Rex {
        self.rex.unwrap_or_default()
    }

    pub fn rex_w(&self) -> bool {
        self.rex.map_or(false, |rex| rex.w)
    }

    /// Effective operand width in bits for opcodes that default to 32.
    /// REX.W takes precedence over 0x66.
    pub fn operand_width(&self) -> u16 {
        if self.rex_w() {
            64
        } else if self.operand_size {
            16
        } else {
            32
        }
    }
}
