//! Three-byte opcode table for the 0x0F 0x3A escape.
//!
//! Legacy-encoded instructions in this map all take ModR/M plus an imm8
//! (a selector, shuffle control or rounding mode).

use super::immediate::ImmediateKind;
use super::opcodes::{fill, OpcodeEntry};

/// 0x0F 0x3A opcode table.
pub static OPCODE_TABLE_0F3A: [OpcodeEntry; 256] = {
    let mut table = [OpcodeEntry::INVALID; 256];
    let entry = OpcodeEntry::modrm().with_imm(ImmediateKind::Byte);

    // ROUNDPS/PD/SS/SD, BLENDPS/PD, PBLENDW, PALIGNR
    table = fill(table, 0x08, 0x0F, entry);
    // PEXTRB/W/D/Q, EXTRACTPS
    table = fill(table, 0x14, 0x17, entry);
    // PINSRB, INSERTPS, PINSRD/Q
    table = fill(table, 0x20, 0x22, entry);
    // DPPS, DPPD, MPSADBW
    table = fill(table, 0x40, 0x42, entry);
    // PCLMULQDQ
    table[0x44] = entry;
    // PCMPESTRM/I, PCMPISTRM/I
    table = fill(table, 0x60, 0x63, entry);
    // SHA1RNDS4
    table[0xCC] = entry;
    // GF2P8AFFINEQB, GF2P8AFFINEINVQB
    table[0xCE] = entry;
    table[0xCF] = entry;
    // AESKEYGENASSIST
    table[0xDF] = entry;

    table
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86_64::opcodes::ModRmUsage;

    #[test]
    fn test_defined_entries_take_modrm_and_imm8() {
        let defined: Vec<_> = OPCODE_TABLE_0F3A.iter().filter(|e| e.is_defined()).collect();
        assert_eq!(defined.len(), 27);
        for entry in defined {
            assert_eq!(entry.modrm, ModRmUsage::Present);
            assert_eq!(entry.immediate, ImmediateKind::Byte);
        }
    }

    #[test]
    fn test_palignr() {
        assert!(OPCODE_TABLE_0F3A[0x0F].is_defined());
        assert!(!OPCODE_TABLE_0F3A[0x00].is_defined());
    }
}
