//! x86_64 instruction decoder.

use log::{debug, trace};

use super::immediate;
use super::instruction::Instruction;
use super::modrm;
use super::opcodes::{resolve, ModRmUsage, OpcodeClass};
use super::prefix::PrefixState;
use crate::config::DecoderConfig;
use crate::cursor::{Cursor, Lookahead};
use crate::error::{DecodeError, Fault, Malformed};
use crate::iter::Instructions;

/// x86_64 instruction decoder.
///
/// Holds configuration only; all per-instruction state lives on the stack
/// of one [`Decoder::decode`] call.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a decoder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes the instruction at the cursor.
    ///
    /// On success the cursor advances by exactly `Instruction::length`. On
    /// failure it stays where it was, so a repeated call reports the same
    /// error.
    pub fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Instruction, DecodeError> {
        let address = cursor.logical_address();
        if cursor.is_at_end() {
            return Err(DecodeError::end_of_input(address));
        }

        let mut input = cursor.lookahead();
        let instruction = self
            .decode_fields(&mut input, address)
            .map_err(|fault| self.report(fault, address, cursor))?;

        cursor
            .advance(instruction.length)
            .map_err(|_| DecodeError::end_of_input(address))?;

        trace!(
            "{:#x}: {} ({} bytes)",
            instruction.address,
            instruction.opcode,
            instruction.length
        );
        Ok(instruction)
    }

    /// Decodes one instruction from the start of `bytes`, located at
    /// `address`.
    pub fn decode_at(&self, bytes: &[u8], address: u64) -> Result<Instruction, DecodeError> {
        self.decode(&mut Cursor::new(bytes, address))
    }

    /// Lazily decodes instructions from the cursor until the first failure.
    pub fn instructions<'d, 'c, 'a>(&'d self, cursor: &'c mut Cursor<'a>) -> Instructions<'d, 'c, 'a> {
        Instructions::new(self, cursor)
    }

    /// Decodes a whole block.
    ///
    /// Malformed encodings and prefix conflicts are recorded and skipped one
    /// byte at a time. Decoding stops at the first end-of-input or truncation
    /// error, which is recorded as the last entry.
    pub fn decode_all(&self, bytes: &[u8], address: u64) -> Vec<Result<Instruction, DecodeError>> {
        let mut cursor = Cursor::new(bytes, address);
        let mut results = Vec::new();

        while !cursor.is_at_end() {
            match self.decode(&mut cursor) {
                Ok(instruction) => results.push(Ok(instruction)),
                Err(err) if err.is_resynchronizable() => {
                    results.push(Err(err));
                    if cursor.advance(1).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    results.push(Err(err));
                    break;
                }
            }
        }

        results
    }

    /// Runs the pipeline through the lookahead without touching the cursor.
    fn decode_fields(&self, input: &mut Lookahead<'_>, address: u64) -> Result<Instruction, Fault> {
        let max_length = self.config.length_limit();

        let prefixes = PrefixState::scan(input, self.config.rex_policy, max_length)?;
        let opcode = resolve(input)?;
        let (usage, immediate_kind) = opcode.entry().operands(opcode)?;

        // 8F is POP r/m only with reg = 0; any other reg field starts an XOP prefix
        if opcode == OpcodeClass::OneByte(0x8F) && input.peek_u8()? & 0x38 != 0 {
            return Err(Malformed::Unsupported { byte: 0x8F }.into());
        }

        let (modrm, displacement) = match usage {
            ModRmUsage::Absent => (None, None),
            usage => {
                let (fields, displacement) = modrm::decode(input, prefixes.rex_or_default(), usage)?;
                (Some(fields), displacement)
            }
        };

        let immediate = immediate::read(input, immediate_kind, &prefixes, modrm.as_ref())?;

        let length = input.consumed();
        if length > max_length {
            return Err(Malformed::TooLong {
                length,
                max: max_length,
            }
            .into());
        }

        Ok(Instruction {
            address,
            length,
            opcode,
            prefixes,
            modrm,
            displacement,
            immediate,
        })
    }

    fn report(&self, fault: Fault, address: u64, cursor: &Cursor<'_>) -> DecodeError {
        let err = match fault {
            Fault::OutOfBounds(bounds) if self.config.report_truncation => {
                let needed = bounds.offset.saturating_sub(cursor.position()) + bounds.needed;
                DecodeError::truncated(address, needed, cursor.remaining())
            }
            Fault::OutOfBounds(_) => DecodeError::end_of_input(address),
            Fault::Malformed(reason) => DecodeError::malformed(address, reason),
            Fault::PrefixConflict(byte) => DecodeError::prefix_conflict(address, byte),
        };
        debug!("decode failed: {err}");
        err
    }
}

/// Decodes the instruction at the cursor with the default configuration.
pub fn decode(cursor: &mut Cursor<'_>) -> Result<Instruction, DecodeError> {
    Decoder::new().decode(cursor)
}
