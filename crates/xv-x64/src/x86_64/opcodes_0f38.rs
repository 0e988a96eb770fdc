//! Three-byte opcode table for the 0x0F 0x38 escape.
//!
//! Every legacy-encoded instruction in this map takes a ModR/M operand and
//! no immediate; the table only records which opcodes exist.

use super::opcodes::{fill, OpcodeEntry};

/// 0x0F 0x38 opcode table.
pub static OPCODE_TABLE_0F38: [OpcodeEntry; 256] = {
    let mut table = [OpcodeEntry::INVALID; 256];
    let modrm = OpcodeEntry::modrm();

    // SSSE3: PSHUFB .. PMULHRSW
    table = fill(table, 0x00, 0x0B, modrm);
    // SSE4.1: PBLENDVB, BLENDVPS/PD, PTEST
    table[0x10] = modrm;
    table[0x14] = modrm;
    table[0x15] = modrm;
    table[0x17] = modrm;
    // PABSB/W/D
    table = fill(table, 0x1C, 0x1E, modrm);
    // PMOVSX*
    table = fill(table, 0x20, 0x25, modrm);
    // PMULDQ, PCMPEQQ, MOVNTDQA, PACKUSDW
    table = fill(table, 0x28, 0x2B, modrm);
    // PMOVZX*
    table = fill(table, 0x30, 0x35, modrm);
    // PCMPGTQ, PMIN*/PMAX*, PMULLD, PHMINPOSUW
    table = fill(table, 0x37, 0x41, modrm);
    // INVEPT, INVVPID, INVPCID
    table = fill(table, 0x80, 0x82, modrm);
    // SHA1/SHA256
    table = fill(table, 0xC8, 0xCD, modrm);
    // GF2P8MULB
    table[0xCF] = modrm;
    // AESIMC, AESENC(LAST), AESDEC(LAST)
    table = fill(table, 0xDB, 0xDF, modrm);
    // MOVBE/CRC32, WRSS(D/Q), ADCX/ADOX/WRSS
    table = fill(table, 0xF0, 0xF1, modrm);
    table = fill(table, 0xF5, 0xF6, modrm);
    // MOVDIR64B/ENQCMD, MOVDIRI
    table[0xF8] = modrm;
    table[0xF9] = modrm;
    // AADD/AAND/AOR/AXOR
    table[0xFC] = modrm;

    table
};
