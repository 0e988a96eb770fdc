//! Decoded instruction record.

use super::immediate::Immediate;
use super::modrm::ModRmFields;
use super::opcodes::OpcodeClass;
use super::prefix::PrefixState;

/// One decoded x86_64 instruction.
///
/// Holds only scalar fields, so it stays valid after the cursor that
/// produced it moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// Logical address of the first byte (prefixes included).
    pub address: u64,
    /// Total length in bytes.
    pub length: usize,
    /// Opcode map and raw opcode byte.
    pub opcode: OpcodeClass,
    pub prefixes: PrefixState,
    /// ModR/M (and SIB) fields, for opcodes that take them.
    pub modrm: Option<ModRmFields>,
    /// Sign-extended memory displacement.
    pub displacement: Option<i32>,
    /// Trailing immediate, relative branch offset or moffs address.
    pub immediate: Option<Immediate>,
}

impl Instruction {
    /// Address of the instruction that follows this one.
    pub fn next_address(&self) -> u64 {
        self.address.wrapping_add(self.length as u64)
    }

    /// Escape bytes consumed before the opcode (0, 1 or 2).
    pub fn escape_depth(&self) -> u8 {
        self.opcode.escape_depth()
    }

    pub fn is_rip_relative(&self) -> bool {
        self.modrm.map_or(false, |fields| fields.rip_relative)
    }

    /// Absolute target of a RIP-relative memory operand.
    pub fn rip_target(&self) -> Option<u64> {
        if !self.is_rip_relative() {
            return None;
        }
        let displacement = self.displacement.unwrap_or(0) as i64;
        Some(self.next_address().wrapping_add(displacement as u64))
    }

    /// The instruction's bytes within `region`, whose first byte lives at
    /// `logical_base`. Addresses wrap like [`Cursor::logical_address`].
    /// `None` if the instruction is not inside the region.
    ///
    /// [`Cursor::logical_address`]: crate::Cursor::logical_address
    pub fn bytes<'a>(&self, region: &'a [u8], logical_base: u64) -> Option<&'a [u8]> {
        let start = usize::try_from(self.address.wrapping_sub(logical_base)).ok()?;
        region.get(start..start.checked_add(self.length)?)
    }
}
