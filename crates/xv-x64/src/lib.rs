//! # xv-x64
//!
//! x86-64 long-mode instruction decoder.
//!
//! Given a flat region of machine code, the decoder determines for each
//! position which instruction starts there, how long it is, and its raw
//! encoding fields (prefixes, opcode map, ModR/M, SIB, displacement,
//! immediate). It does not render mnemonics or interpret semantics.
//!
//! ```
//! use xv_x64::{Cursor, Decoder, DecodeStatus};
//!
//! let code = [0x48, 0x89, 0xC3, 0x0F, 0x05];
//! let decoder = Decoder::new();
//! let mut cursor = Cursor::new(&code, 0x401000);
//!
//! let mov = decoder.decode(&mut cursor).unwrap();
//! assert_eq!(mov.length, 3);
//!
//! let syscall = decoder.decode(&mut cursor).unwrap();
//! assert_eq!(syscall.address, 0x401003);
//! assert_eq!(syscall.escape_depth(), 1);
//!
//! let end = decoder.decode(&mut cursor);
//! assert_eq!(DecodeStatus::of(&end), DecodeStatus::EndOfInput);
//! ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod iter;
pub mod status;
pub mod x86_64;

pub use config::{DecoderConfig, RexPolicy, MAX_INSTRUCTION_LENGTH};
pub use cursor::{Cursor, Lookahead, OutOfBounds};
pub use error::{DecodeError, Malformed};
pub use iter::Instructions;
pub use status::DecodeStatus;
pub use x86_64::{decode, Decoder, Instruction, OpcodeClass};
