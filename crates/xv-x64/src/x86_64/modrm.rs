//! ModR/M, SIB and displacement decoding.

use super::opcodes::ModRmUsage;
use super::prefix::Rex;
use crate::cursor::{Lookahead, OutOfBounds};

/// Decoded ModR/M byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModRM {
    /// Mod field (2 bits)
    pub mod_: u8,
    /// Reg field (3 bits, extended by REX.R)
    pub reg: u8,
    /// R/M field (3 bits, extended by REX.B)
    pub rm: u8,
}

impl ModRM {
    /// Parse a ModR/M byte with REX extension.
    pub fn parse(byte: u8, rex: Rex) -> Self {
        Self {
            mod_: (byte >> 6) & 0x3,
            reg: ((byte >> 3) & 0x7) | ((rex.r as u8) << 3),
            rm: (byte & 0x7) | ((rex.b as u8) << 3),
        }
    }

    /// Returns true if this ModR/M encodes a register operand (mod=11).
    pub fn is_register(&self) -> bool {
        self.mod_ == 0b11
    }

    /// Returns true if this ModR/M requires a SIB byte.
    pub fn needs_sib(&self) -> bool {
        self.mod_ != 0b11 && (self.rm & 0x7) == 0b100
    }

    /// Returns true for the RIP-relative form (mod=00, rm=101, no SIB).
    pub fn is_rip_relative(&self) -> bool {
        self.mod_ == 0b00 && (self.rm & 0x7) == 0b101
    }
}

/// Decoded SIB byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sib {
    /// Scale (2 bits) - actual scale is 1 << scale
    pub scale: u8,
    /// Index register (3 bits, extended by REX.X)
    pub index: u8,
    /// Base register (3 bits, extended by REX.B)
    pub base: u8,
}

impl Sib {
    /// Parse a SIB byte with REX extension.
    pub fn parse(byte: u8, rex: Rex) -> Self {
        Self {
            scale: (byte >> 6) & 0x3,
            index: ((byte >> 3) & 0x7) | ((rex.x as u8) << 3),
            base: (byte & 0x7) | ((rex.b as u8) << 3),
        }
    }

    /// Returns the actual scale factor (1, 2, 4, or 8).
    pub fn scale_factor(&self) -> u8 {
        1 << self.scale
    }

    /// Index register number, or `None` for the "no index" encoding
    /// (index=100 without REX.X).
    pub fn index_register(&self) -> Option<u8> {
        (self.index != 0b100).then_some(self.index)
    }
}

/// Size of the displacement that follows ModR/M (and SIB).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplacementSize {
    #[default]
    None,
    /// disp8, sign-extended
    Byte,
    /// disp32, sign-extended
    Dword,
}

impl DisplacementSize {
    pub fn bytes(self) -> usize {
        match self {
            Self::None => 0,
            Self::Byte => 1,
            Self::Dword => 4,
        }
    }
}

/// Everything the ModR/M stage decoded for one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModRmFields {
    pub modrm: ModRM,
    pub sib: Option<Sib>,
    pub displacement_size: DisplacementSize,
    /// Effective address is relative to the next instruction.
    pub rip_relative: bool,
    /// The r/m operand names a register. Also set for opcodes that ignore
    /// the mod field.
    pub register_direct: bool,
}

impl ModRmFields {
    pub fn is_register(&self) -> bool {
        self.register_direct
    }

    pub fn is_memory(&self) -> bool {
        !self.register_direct
    }

    /// Base register of a memory operand. `None` for RIP-relative and
    /// SIB no-base (absolute disp32) forms, and for register operands.
    pub fn base_register(&self) -> Option<u8> {
        if self.register_direct || self.rip_relative {
            return None;
        }
        match self.sib {
            Some(sib) if self.modrm.mod_ == 0b00 && (sib.base & 0x7) == 0b101 => None,
            Some(sib) => Some(sib.base),
            None => Some(self.modrm.rm),
        }
    }

    /// Index register of a memory operand, if any.
    pub fn index_register(&self) -> Option<u8> {
        self.sib.and_then(|sib| sib.index_register())
    }
}

/// Reads ModR/M, the optional SIB byte and the displacement.
///
/// Returns the decoded fields and the sign-extended displacement, if the
/// addressing form has one.
pub(crate) fn decode(
    input: &mut Lookahead<'_>,
    rex: Rex,
    usage: ModRmUsage,
) -> Result<(ModRmFields, Option<i32>), OutOfBounds> {
    let modrm = ModRM::parse(input.next_u8()?, rex);

    if usage == ModRmUsage::RegisterOnly || modrm.is_register() {
        let fields = ModRmFields {
            modrm,
            sib: None,
            displacement_size: DisplacementSize::None,
            rip_relative: false,
            register_direct: true,
        };
        return Ok((fields, None));
    }

    let mut rip_relative = false;
    let mut sib = None;
    let displacement_size = if modrm.needs_sib() {
        let parsed = Sib::parse(input.next_u8()?, rex);
        sib = Some(parsed);
        match modrm.mod_ {
            // SIB base=101 with mod=00: no base register, disp32
            0b00 if (parsed.base & 0x7) == 0b101 => DisplacementSize::Dword,
            0b00 => DisplacementSize::None,
            0b01 => DisplacementSize::Byte,
            _ => DisplacementSize::Dword,
        }
    } else {
        match modrm.mod_ {
            0b00 if modrm.is_rip_relative() => {
                rip_relative = true;
                DisplacementSize::Dword
            }
            0b00 => DisplacementSize::None,
            0b01 => DisplacementSize::Byte,
            _ => DisplacementSize::Dword,
        }
    };

    let displacement = match displacement_size {
        DisplacementSize::None => None,
        DisplacementSize::Byte => Some(input.next_u8()? as i8 as i32),
        DisplacementSize::Dword => Some(input.read_le(4)? as u32 as i32),
    };

    let fields = ModRmFields {
        modrm,
        sib,
        displacement_size,
        rip_relative,
        register_direct: false,
    };
    Ok((fields, displacement))
}
