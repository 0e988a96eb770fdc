//! Immediate operand sizing and extraction.

use super::modrm::ModRmFields;
use super::prefix::{PrefixState, Repeat};
use crate::cursor::{Lookahead, OutOfBounds};

/// Static immediate kind of an opcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImmediateKind {
    #[default]
    None,
    /// imm8 / rel8
    Byte,
    /// imm16 (RET imm16)
    Word,
    /// imm32 / rel32, independent of prefixes
    Dword,
    /// imm16 with 0x66, otherwise imm32; REX.W keeps imm32
    OperandSized,
    /// MOV r, imm: imm16 with 0x66, imm64 with REX.W, otherwise imm32
    OperandSizedFull,
    /// ENTER: imm16 followed by imm8
    Enter,
    /// MOV moffs: 64-bit address, 32-bit with 0x67
    MemoryOffset,
    /// Group 3 byte form: imm8 only for TEST (/0, /1)
    TestByte,
    /// Group 3 full form: operand-sized immediate only for TEST (/0, /1)
    TestOperandSized,
    /// 0F 78: two imm8 (EXTRQ with 0x66, INSERTQ with 0xF2), none for VMREAD
    ByteExtract,
}

impl ImmediateKind {
    /// Number of immediate bytes for this kind under the given prefixes.
    ///
    /// Group 3 kinds look at the ModR/M reg field; without ModR/M they have
    /// no immediate.
    pub fn size(self, prefixes: &PrefixState, modrm: Option<&ModRmFields>) -> usize {
        match self {
            Self::None => 0,
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
            Self::OperandSized => operand_sized(prefixes),
            Self::OperandSizedFull => match prefixes.operand_width() {
                64 => 8,
                16 => 2,
                _ => 4,
            },
            Self::Enter => 3,
            Self::MemoryOffset => {
                if prefixes.address_size {
                    4
                } else {
                    8
                }
            }
            Self::TestByte => {
                if is_test(modrm) {
                    1
                } else {
                    0
                }
            }
            Self::TestOperandSized => {
                if is_test(modrm) {
                    operand_sized(prefixes)
                } else {
                    0
                }
            }
            Self::ByteExtract => {
                if prefixes.operand_size || prefixes.repeat == Some(Repeat::Repne) {
                    2
                } else {
                    0
                }
            }
        }
    }
}

/// 64-bit operand size still uses a 32-bit immediate (sign-extended).
fn operand_sized(prefixes: &PrefixState) -> usize {
    if prefixes.operand_width() == 16 {
        2
    } else {
        4
    }
}

fn is_test(modrm: Option<&ModRmFields>) -> bool {
    modrm.map_or(false, |fields| fields.modrm.reg & 0x7 <= 1)
}

/// Raw immediate bytes, little-endian, zero-extended into `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Immediate {
    pub value: u64,
    /// Size in bytes: 1, 2, 3 (ENTER), 4 or 8.
    pub size: u8,
}

impl Immediate {
    /// Value sign-extended from its encoded width.
    ///
    /// ENTER's packed imm16/imm8 pair is returned unchanged.
    pub fn signed(&self) -> i64 {
        match self.size {
            1 => self.value as u8 as i8 as i64,
            2 => self.value as u16 as i16 as i64,
            4 => self.value as u32 as i32 as i64,
            _ => self.value as i64,
        }
    }

    /// For ENTER, the (frame size, nesting level) pair.
    pub fn enter_operands(&self) -> Option<(u16, u8)> {
        (self.size == 3).then(|| (self.value as u16, (self.value >> 16) as u8))
    }
}

/// Reads the immediate for `kind`, if it has one.
pub(crate) fn read(
    input: &mut Lookahead<'_>,
    kind: ImmediateKind,
    prefixes: &PrefixState,
    modrm: Option<&ModRmFields>,
) -> Result<Option<Immediate>, OutOfBounds> {
    let size = kind.size(prefixes, modrm);
    if size == 0 {
        return Ok(None);
    }
    let value = input.read_le(size)?;
    Ok(Some(Immediate {
        value,
        size: size as u8,
    }))
}
