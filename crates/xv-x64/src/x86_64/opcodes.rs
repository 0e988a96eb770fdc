//! x86_64 opcode maps, escape resolution and per-opcode operand tables.
//!
//! Each map is a flat 256-entry table recording only what the length of an
//! instruction depends on: whether a ModR/M byte follows the opcode and
//! which immediate comes after the memory operand.

use std::fmt;

use super::immediate::ImmediateKind;
use super::opcodes_0f38::OPCODE_TABLE_0F38;
use super::opcodes_0f3a::OPCODE_TABLE_0F3A;
use crate::cursor::{Lookahead, OutOfBounds};
use crate::error::{Fault, Malformed};

/// The four byte-selected opcode maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpcodeMap {
    /// One-byte map
    OneByte,
    /// 0x0F map
    TwoByte,
    /// 0x0F 0x38 map
    ThreeByte38,
    /// 0x0F 0x3A map
    ThreeByte3A,
}

impl OpcodeMap {
    /// Number of escape bytes that select this map.
    pub fn escape_depth(self) -> u8 {
        match self {
            Self::OneByte => 0,
            Self::TwoByte => 1,
            Self::ThreeByte38 | Self::ThreeByte3A => 2,
        }
    }

    /// The escape bytes that select this map.
    pub fn escape_bytes(self) -> &'static [u8] {
        match self {
            Self::OneByte => &[],
            Self::TwoByte => &[0x0F],
            Self::ThreeByte38 => &[0x0F, 0x38],
            Self::ThreeByte3A => &[0x0F, 0x3A],
        }
    }

    /// Operand table for this map.
    pub fn table(self) -> &'static [OpcodeEntry; 256] {
        match self {
            Self::OneByte => &OPCODE_TABLE,
            Self::TwoByte => &OPCODE_TABLE_0F,
            Self::ThreeByte38 => &OPCODE_TABLE_0F38,
            Self::ThreeByte3A => &OPCODE_TABLE_0F3A,
        }
    }
}

/// A resolved opcode: the map it belongs to and its raw byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpcodeClass {
    OneByte(u8),
    TwoByte(u8),
    ThreeByte38(u8),
    ThreeByte3A(u8),
}

impl OpcodeClass {
    pub fn new(map: OpcodeMap, opcode: u8) -> Self {
        match map {
            OpcodeMap::OneByte => Self::OneByte(opcode),
            OpcodeMap::TwoByte => Self::TwoByte(opcode),
            OpcodeMap::ThreeByte38 => Self::ThreeByte38(opcode),
            OpcodeMap::ThreeByte3A => Self::ThreeByte3A(opcode),
        }
    }

    /// The raw opcode byte, after any escape bytes.
    pub fn opcode(self) -> u8 {
        match self {
            Self::OneByte(op) | Self::TwoByte(op) | Self::ThreeByte38(op) | Self::ThreeByte3A(op) => {
                op
            }
        }
    }

    pub fn map(self) -> OpcodeMap {
        match self {
            Self::OneByte(_) => OpcodeMap::OneByte,
            Self::TwoByte(_) => OpcodeMap::TwoByte,
            Self::ThreeByte38(_) => OpcodeMap::ThreeByte38,
            Self::ThreeByte3A(_) => OpcodeMap::ThreeByte3A,
        }
    }

    /// Escape bytes consumed before the opcode (0, 1 or 2).
    pub fn escape_depth(self) -> u8 {
        self.map().escape_depth()
    }

    /// Table entry for this opcode.
    pub fn entry(self) -> OpcodeEntry {
        self.map().table()[self.opcode() as usize]
    }
}

impl fmt::Display for OpcodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for escape in self.map().escape_bytes() {
            write!(f, "{escape:02x} ")?;
        }
        write!(f, "{:02x}", self.opcode())
    }
}

/// Reads the escape bytes and the opcode.
///
/// Escape detection is positional: a 0x0F at this position always selects
/// the two-byte map, whatever prefixes came before.
pub(crate) fn resolve(input: &mut Lookahead<'_>) -> Result<OpcodeClass, OutOfBounds> {
    let first = input.next_u8()?;
    if first != 0x0F {
        return Ok(OpcodeClass::OneByte(first));
    }

    match input.next_u8()? {
        0x38 => Ok(OpcodeClass::ThreeByte38(input.next_u8()?)),
        0x3A => Ok(OpcodeClass::ThreeByte3A(input.next_u8()?)),
        opcode => Ok(OpcodeClass::TwoByte(opcode)),
    }
}

/// Table entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// No instruction is defined (or it is invalid in long mode).
    Invalid,
    /// A prefix byte; only reachable in opcode position after REX.
    Prefix,
    /// An escape byte into another map.
    Escape,
    /// Lead byte of an encoding family outside these maps (VEX, EVEX).
    Unsupported,
    /// A defined instruction.
    Defined,
}

/// How an opcode uses the ModR/M byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModRmUsage {
    /// No ModR/M byte follows.
    Absent,
    /// ModR/M with the full register/memory addressing forms.
    Present,
    /// ModR/M whose mod field is ignored and always names a register
    /// (MOV to/from control and debug registers).
    RegisterOnly,
}

/// Opcode table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub kind: EntryKind,
    pub modrm: ModRmUsage,
    pub immediate: ImmediateKind,
}

impl OpcodeEntry {
    pub const INVALID: Self = Self::of_kind(EntryKind::Invalid);
    pub const PREFIX: Self = Self::of_kind(EntryKind::Prefix);
    pub const ESCAPE: Self = Self::of_kind(EntryKind::Escape);
    pub const UNSUPPORTED: Self = Self::of_kind(EntryKind::Unsupported);

    const fn of_kind(kind: EntryKind) -> Self {
        Self {
            kind,
            modrm: ModRmUsage::Absent,
            immediate: ImmediateKind::None,
        }
    }

    /// A defined opcode with no ModR/M byte and no immediate.
    pub const fn plain() -> Self {
        Self::of_kind(EntryKind::Defined)
    }

    /// A defined opcode followed by ModR/M.
    pub const fn modrm() -> Self {
        Self {
            kind: EntryKind::Defined,
            modrm: ModRmUsage::Present,
            immediate: ImmediateKind::None,
        }
    }

    pub const fn with_imm(mut self, immediate: ImmediateKind) -> Self {
        self.immediate = immediate;
        self
    }

    pub const fn register_only(mut self) -> Self {
        self.modrm = ModRmUsage::RegisterOnly;
        self
    }

    pub fn is_defined(&self) -> bool {
        self.kind == EntryKind::Defined
    }

    /// Operand layout of a defined opcode, or the fault its kind implies.
    pub(crate) fn operands(&self, class: OpcodeClass) -> Result<(ModRmUsage, ImmediateKind), Fault> {
        match self.kind {
            EntryKind::Defined => Ok((self.modrm, self.immediate)),
            EntryKind::Prefix => Err(Fault::PrefixConflict(class.opcode())),
            EntryKind::Unsupported => Err(Malformed::Unsupported {
                byte: class.opcode(),
            }
            .into()),
            EntryKind::Invalid | EntryKind::Escape => Err(Malformed::UnmappedOpcode { class }.into()),
        }
    }
}

/// Stores `entry` at every index in `lo..=hi`.
pub(super) const fn fill(
    mut table: [OpcodeEntry; 256],
    lo: usize,
    hi: usize,
    entry: OpcodeEntry,
) -> [OpcodeEntry; 256] {
    let mut i = lo;
    while i <= hi {
        table[i] = entry;
        i += 1;
    }
    table
}

/// One-byte opcode table.
pub static OPCODE_TABLE: [OpcodeEntry; 256] = {
    use ImmediateKind::*;
    let mut table = [OpcodeEntry::INVALID; 256];

    // ADD OR ADC SBB AND SUB XOR CMP: four ModR/M forms, then AL/rAX, imm
    let mut row = 0x00;
    while row <= 0x38 {
        table = fill(table, row, row + 3, OpcodeEntry::modrm());
        table[row + 4] = OpcodeEntry::plain().with_imm(Byte);
        table[row + 5] = OpcodeEntry::plain().with_imm(OperandSized);
        row += 8;
    }

    table[0x0F] = OpcodeEntry::ESCAPE;

    // Segment overrides; the neighbouring PUSH/POP seg and BCD opcodes are
    // invalid in long mode and stay INVALID.
    table[0x26] = OpcodeEntry::PREFIX;
    table[0x2E] = OpcodeEntry::PREFIX;
    table[0x36] = OpcodeEntry::PREFIX;
    table[0x3E] = OpcodeEntry::PREFIX;

    // REX
    table = fill(table, 0x40, 0x4F, OpcodeEntry::PREFIX);

    // PUSH/POP r64
    table = fill(table, 0x50, 0x5F, OpcodeEntry::plain());

    // EVEX
    table[0x62] = OpcodeEntry::UNSUPPORTED;
    // MOVSXD
    table[0x63] = OpcodeEntry::modrm();
    table = fill(table, 0x64, 0x67, OpcodeEntry::PREFIX);

    // PUSH imm, IMUL r, r/m, imm
    table[0x68] = OpcodeEntry::plain().with_imm(OperandSized);
    table[0x69] = OpcodeEntry::modrm().with_imm(OperandSized);
    table[0x6A] = OpcodeEntry::plain().with_imm(Byte);
    table[0x6B] = OpcodeEntry::modrm().with_imm(Byte);
    // INS/OUTS
    table = fill(table, 0x6C, 0x6F, OpcodeEntry::plain());

    // Jcc rel8
    table = fill(table, 0x70, 0x7F, OpcodeEntry::plain().with_imm(Byte));

    // Group 1
    table[0x80] = OpcodeEntry::modrm().with_imm(Byte);
    table[0x81] = OpcodeEntry::modrm().with_imm(OperandSized);
    table[0x83] = OpcodeEntry::modrm().with_imm(Byte);

    // TEST, XCHG, MOV, MOV sreg, LEA, POP r/m
    table = fill(table, 0x84, 0x8F, OpcodeEntry::modrm());

    // NOP/XCHG, CBW, CWD
    table = fill(table, 0x90, 0x99, OpcodeEntry::plain());
    // FWAIT, PUSHF, POPF, SAHF, LAHF
    table = fill(table, 0x9B, 0x9F, OpcodeEntry::plain());

    // MOV AL/rAX, moffs
    table = fill(table, 0xA0, 0xA3, OpcodeEntry::plain().with_imm(MemoryOffset));
    // MOVS, CMPS
    table = fill(table, 0xA4, 0xA7, OpcodeEntry::plain());
    table[0xA8] = OpcodeEntry::plain().with_imm(Byte);
    table[0xA9] = OpcodeEntry::plain().with_imm(OperandSized);
    // STOS, LODS, SCAS
    table = fill(table, 0xAA, 0xAF, OpcodeEntry::plain());

    // MOV r8, imm8 / MOV r, imm
    table = fill(table, 0xB0, 0xB7, OpcodeEntry::plain().with_imm(Byte));
    table = fill(table, 0xB8, 0xBF, OpcodeEntry::plain().with_imm(OperandSizedFull));

    // Group 2 by imm8
    table[0xC0] = OpcodeEntry::modrm().with_imm(Byte);
    table[0xC1] = OpcodeEntry::modrm().with_imm(Byte);
    // RET imm16, RET
    table[0xC2] = OpcodeEntry::plain().with_imm(Word);
    table[0xC3] = OpcodeEntry::plain();
    // VEX
    table[0xC4] = OpcodeEntry::UNSUPPORTED;
    table[0xC5] = OpcodeEntry::UNSUPPORTED;
    // Group 11 (MOV r/m, imm; XABORT; XBEGIN)
    table[0xC6] = OpcodeEntry::modrm().with_imm(Byte);
    table[0xC7] = OpcodeEntry::modrm().with_imm(OperandSized);
    table[0xC8] = OpcodeEntry::plain().with_imm(Enter);
    table[0xC9] = OpcodeEntry::plain();
    table[0xCA] = OpcodeEntry::plain().with_imm(Word);
    table[0xCB] = OpcodeEntry::plain();
    table[0xCC] = OpcodeEntry::plain();
    table[0xCD] = OpcodeEntry::plain().with_imm(Byte);
    table[0xCF] = OpcodeEntry::plain();

    // Group 2 by 1 / CL
    table = fill(table, 0xD0, 0xD3, OpcodeEntry::modrm());
    // XLAT
    table[0xD7] = OpcodeEntry::plain();
    // x87
    table = fill(table, 0xD8, 0xDF, OpcodeEntry::modrm());

    // LOOPcc, JRCXZ, IN/OUT imm8
    table = fill(table, 0xE0, 0xE7, OpcodeEntry::plain().with_imm(Byte));
    // CALL/JMP rel32
    table[0xE8] = OpcodeEntry::plain().with_imm(Dword);
    table[0xE9] = OpcodeEntry::plain().with_imm(Dword);
    table[0xEB] = OpcodeEntry::plain().with_imm(Byte);
    // IN/OUT DX
    table = fill(table, 0xEC, 0xEF, OpcodeEntry::plain());

    table[0xF0] = OpcodeEntry::PREFIX;
    table[0xF1] = OpcodeEntry::plain();
    table[0xF2] = OpcodeEntry::PREFIX;
    table[0xF3] = OpcodeEntry::PREFIX;
    table[0xF4] = OpcodeEntry::plain();
    table[0xF5] = OpcodeEntry::plain();
    // Group 3: only TEST (/0, /1) carries an immediate
    table[0xF6] = OpcodeEntry::modrm().with_imm(TestByte);
    table[0xF7] = OpcodeEntry::modrm().with_imm(TestOperandSized);
    // CLC STC CLI STI CLD STD
    table = fill(table, 0xF8, 0xFD, OpcodeEntry::plain());
    // Groups 4 and 5
    table[0xFE] = OpcodeEntry::modrm();
    table[0xFF] = OpcodeEntry::modrm();

    table
};

/// Two-byte (0x0F) opcode table.
pub static OPCODE_TABLE_0F: [OpcodeEntry; 256] = {
    use ImmediateKind::*;
    let mut table = [OpcodeEntry::INVALID; 256];

    // Groups 6 and 7, LAR, LSL
    table = fill(table, 0x00, 0x03, OpcodeEntry::modrm());
    // SYSCALL CLTS SYSRET INVD WBINVD
    table = fill(table, 0x05, 0x09, OpcodeEntry::plain());
    // UD2
    table[0x0B] = OpcodeEntry::plain();
    // PREFETCHW group
    table[0x0D] = OpcodeEntry::modrm();
    // FEMMS
    table[0x0E] = OpcodeEntry::plain();
    // 3DNow!: the opcode is an imm8 suffix after the memory operand
    table[0x0F] = OpcodeEntry::modrm().with_imm(Byte);

    // SSE moves, hint NOPs, prefetch, ENDBR
    table = fill(table, 0x10, 0x1F, OpcodeEntry::modrm());

    // MOV CRn/DRn
    table = fill(table, 0x20, 0x23, OpcodeEntry::modrm().register_only());
    table = fill(table, 0x28, 0x2F, OpcodeEntry::modrm());

    // WRMSR RDTSC RDMSR RDPMC SYSENTER SYSEXIT, GETSEC
    table = fill(table, 0x30, 0x35, OpcodeEntry::plain());
    table[0x37] = OpcodeEntry::plain();
    table[0x38] = OpcodeEntry::ESCAPE;
    table[0x3A] = OpcodeEntry::ESCAPE;

    // CMOVcc, SSE/MMX arithmetic
    table = fill(table, 0x40, 0x6F, OpcodeEntry::modrm());
    // PSHUF, shift groups 12-14
    table = fill(table, 0x70, 0x73, OpcodeEntry::modrm().with_imm(Byte));
    table = fill(table, 0x74, 0x76, OpcodeEntry::modrm());
    // EMMS
    table[0x77] = OpcodeEntry::plain();
    // VMREAD; EXTRQ/INSERTQ under 66/F2. VMWRITE
    table[0x78] = OpcodeEntry::modrm().with_imm(ByteExtract);
    table[0x79] = OpcodeEntry::modrm();
    table = fill(table, 0x7C, 0x7F, OpcodeEntry::modrm());

    // Jcc rel32
    table = fill(table, 0x80, 0x8F, OpcodeEntry::plain().with_imm(Dword));
    // SETcc
    table = fill(table, 0x90, 0x9F, OpcodeEntry::modrm());

    // PUSH/POP FS, CPUID
    table = fill(table, 0xA0, 0xA2, OpcodeEntry::plain());
    table[0xA3] = OpcodeEntry::modrm();
    table[0xA4] = OpcodeEntry::modrm().with_imm(Byte);
    table[0xA5] = OpcodeEntry::modrm();
    // PUSH/POP GS, RSM
    table = fill(table, 0xA8, 0xAA, OpcodeEntry::plain());
    table[0xAB] = OpcodeEntry::modrm();
    table[0xAC] = OpcodeEntry::modrm().with_imm(Byte);
    // SHRD CL, group 15, IMUL
    table = fill(table, 0xAD, 0xAF, OpcodeEntry::modrm());

    // CMPXCHG, LSS, BTR, LFS, LGS, MOVZX, POPCNT, UD1
    table = fill(table, 0xB0, 0xB9, OpcodeEntry::modrm());
    // Group 8
    table[0xBA] = OpcodeEntry::modrm().with_imm(Byte);
    // BTC, BSF, BSR, MOVSX
    table = fill(table, 0xBB, 0xBF, OpcodeEntry::modrm());

    // XADD
    table[0xC0] = OpcodeEntry::modrm();
    table[0xC1] = OpcodeEntry::modrm();
    // CMPPS
    table[0xC2] = OpcodeEntry::modrm().with_imm(Byte);
    // MOVNTI
    table[0xC3] = OpcodeEntry::modrm();
    // PINSRW, PEXTRW, SHUFPS
    table = fill(table, 0xC4, 0xC6, OpcodeEntry::modrm().with_imm(Byte));
    // Group 9
    table[0xC7] = OpcodeEntry::modrm();
    // BSWAP
    table = fill(table, 0xC8, 0xCF, OpcodeEntry::plain());

    // MMX/SSE2, UD0
    table = fill(table, 0xD0, 0xFF, OpcodeEntry::modrm());

    table
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;

    fn resolve_bytes(bytes: &[u8]) -> (Result<OpcodeClass, OutOfBounds>, usize) {
        let cursor = Cursor::new(bytes, 0);
        let mut input = cursor.lookahead();
        let result = resolve(&mut input);
        (result, input.consumed())
    }

    #[test]
    fn test_resolve_one_byte() {
        assert_eq!(resolve_bytes(&[0x90]), (Ok(OpcodeClass::OneByte(0x90)), 1));
    }

    #[test]
    fn test_resolve_two_byte() {
        let (class, consumed) = resolve_bytes(&[0x0F, 0x05]);
        let class = class.unwrap();
        assert_eq!(class, OpcodeClass::TwoByte(0x05));
        assert_eq!(class.escape_depth(), 1);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_resolve_three_byte() {
        let (class, consumed) = resolve_bytes(&[0x0F, 0x38, 0x00, 0xC1]);
        assert_eq!(class, Ok(OpcodeClass::ThreeByte38(0x00)));
        assert_eq!(consumed, 3);

        let (class, _) = resolve_bytes(&[0x0F, 0x3A, 0x0F, 0xC1, 0x08]);
        let class = class.unwrap();
        assert_eq!(class, OpcodeClass::ThreeByte3A(0x0F));
        assert_eq!(class.escape_depth(), 2);
    }

    #[test]
    fn test_resolve_truncated_escape() {
        assert!(resolve_bytes(&[]).0.is_err());
        assert!(resolve_bytes(&[0x0F]).0.is_err());
        assert!(resolve_bytes(&[0x0F, 0x38]).0.is_err());
        assert!(resolve_bytes(&[0x0F, 0x3A]).0.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(OpcodeClass::OneByte(0x89).to_string(), "89");
        assert_eq!(OpcodeClass::TwoByte(0x05).to_string(), "0f 05");
        assert_eq!(OpcodeClass::ThreeByte38(0xF0).to_string(), "0f 38 f0");
        assert_eq!(OpcodeClass::ThreeByte3A(0x0F).to_string(), "0f 3a 0f");
    }

    #[test]
    fn test_class_roundtrips_map() {
        for map in [
            OpcodeMap::OneByte,
            OpcodeMap::TwoByte,
            OpcodeMap::ThreeByte38,
            OpcodeMap::ThreeByte3A,
        ] {
            let class = OpcodeClass::new(map, 0x42);
            assert_eq!(class.map(), map);
            assert_eq!(class.opcode(), 0x42);
            assert_eq!(class.escape_depth() as usize, map.escape_bytes().len());
        }
    }

    #[test]
    fn test_prefix_bytes_marked_in_one_byte_map() {
        for byte in 0u8..=0xFF {
            let is_prefix = OPCODE_TABLE[byte as usize].kind == EntryKind::Prefix;
            let expected = super::super::prefix::is_legacy_prefix(byte)
                || super::super::prefix::Rex::is_rex(byte);
            assert_eq!(is_prefix, expected, "{byte:#04x}");
        }
    }

    #[test]
    fn test_long_mode_invalid_opcodes() {
        for byte in [
            0x06, 0x07, 0x0E, 0x16, 0x17, 0x1E, 0x1F, 0x27, 0x2F, 0x37, 0x3F, 0x60, 0x61, 0x82,
            0x9A, 0xCE, 0xD4, 0xD5, 0xD6, 0xEA,
        ] {
            assert_eq!(OPCODE_TABLE[byte].kind, EntryKind::Invalid, "{byte:#04x}");
        }
    }

    #[test]
    fn test_alu_rows() {
        for row in (0x00..=0x38).step_by(8) {
            assert_eq!(OPCODE_TABLE[row + 1].modrm, ModRmUsage::Present);
            assert_eq!(OPCODE_TABLE[row + 4].immediate, ImmediateKind::Byte);
            assert_eq!(OPCODE_TABLE[row + 5].immediate, ImmediateKind::OperandSized);
        }
    }

    #[test]
    fn test_escape_entries() {
        assert_eq!(OPCODE_TABLE[0x0F].kind, EntryKind::Escape);
        assert_eq!(OPCODE_TABLE_0F[0x38].kind, EntryKind::Escape);
        assert_eq!(OPCODE_TABLE_0F[0x3A].kind, EntryKind::Escape);
    }

    #[test]
    fn test_entry_operands() {
        let class = OpcodeClass::OneByte(0x66);
        assert_eq!(class.entry().operands(class), Err(Fault::PrefixConflict(0x66)));

        let class = OpcodeClass::OneByte(0xC5);
        assert_eq!(
            class.entry().operands(class),
            Err(Fault::Malformed(Malformed::Unsupported { byte: 0xC5 }))
        );

        let class = OpcodeClass::TwoByte(0x04);
        assert_eq!(
            class.entry().operands(class),
            Err(Fault::Malformed(Malformed::UnmappedOpcode { class }))
        );

        let class = OpcodeClass::TwoByte(0x1F);
        assert_eq!(
            class.entry().operands(class),
            Ok((ModRmUsage::Present, ImmediateKind::None))
        );
    }
}
