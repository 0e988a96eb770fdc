//! x86_64 long-mode instruction decoder.
//!
//! Each decode call runs a fixed pipeline over an uncommitted lookahead:
//! - Legacy prefixes (LOCK, REP/REPNE, segment overrides, operand/address size)
//! - REX prefix, which must immediately precede the opcode
//! - Escape bytes selecting the one-byte, 0x0F, 0x0F38 or 0x0F3A map
//! - ModR/M, SIB and displacement
//! - Immediate operand
//!
//! The cursor only moves once the whole instruction has been measured.

mod decoder;
mod immediate;
mod instruction;
mod modrm;
mod opcodes;
mod opcodes_0f38;
mod opcodes_0f3a;
mod prefix;

pub use decoder::{decode, Decoder};
pub use immediate::{Immediate, ImmediateKind};
pub use instruction::Instruction;
pub use modrm::{DisplacementSize, ModRM, ModRmFields, Sib};
pub use opcodes::{
    EntryKind, ModRmUsage, OpcodeClass, OpcodeEntry, OpcodeMap, OPCODE_TABLE, OPCODE_TABLE_0F,
};
pub use opcodes_0f38::OPCODE_TABLE_0F38;
pub use opcodes_0f3a::OPCODE_TABLE_0F3A;
pub use prefix::{is_legacy_prefix, PrefixState, Repeat, Rex, Segment};
