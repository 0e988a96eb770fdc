//! Property-based tests for the x86_64 decoder.
//!
//! These tests verify invariants that should hold for all inputs:
//! - Decoding never panics on arbitrary input
//! - Decoded length is within the architectural bounds
//! - The cursor moves by exactly the decoded length, or not at all
//! - Failures are idempotent
//! - Deterministic decoding (same input → same output)

use proptest::prelude::*;

use xv_x64::{Cursor, DecodeError, DecodeStatus, Decoder, DecoderConfig, RexPolicy};

// =============================================================================
// Pipeline Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10000))]

    /// Decoding arbitrary bytes should never panic.
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..32)) {
        let _ = Decoder::new().decode_at(&bytes, 0x1000);
    }

    /// Successfully decoded instructions have valid length.
    #[test]
    fn decoded_length_is_valid(bytes in prop::collection::vec(any::<u8>(), 1..32)) {
        if let Ok(insn) = Decoder::new().decode_at(&bytes, 0x1000) {
            prop_assert!(insn.length >= 1, "Instruction length must be at least 1");
            prop_assert!(insn.length <= 15, "Instruction length must be at most 15");
            prop_assert!(insn.length <= bytes.len(), "Instruction length cannot exceed input length");
        }
    }

    /// The cursor advances by the decoded length on success and stays put on failure.
    #[test]
    fn cursor_moves_by_length(
        bytes in prop::collection::vec(any::<u8>(), 0..32),
        start in 0usize..8,
    ) {
        let start = start.min(bytes.len());
        let mut cursor = Cursor::new(&bytes, 0x40_0000);
        cursor.seek(start).unwrap();

        match Decoder::new().decode(&mut cursor) {
            Ok(insn) => {
                prop_assert_eq!(cursor.position() - start, insn.length);
                prop_assert_eq!(insn.address, 0x40_0000 + start as u64);
            }
            Err(_) => prop_assert_eq!(cursor.position(), start),
        }
    }

    /// Calling decode twice at a failing position yields the same error.
    #[test]
    fn failure_is_idempotent(bytes in prop::collection::vec(any::<u8>(), 0..16)) {
        let decoder = Decoder::new();
        let mut cursor = Cursor::new(&bytes, 0);
        if let Err(first) = decoder.decode(&mut cursor) {
            let second = decoder.decode(&mut cursor);
            prop_assert_eq!(Err(first), second);
        }
    }

    /// Decoding is deterministic: same input always produces same output.
    #[test]
    fn decode_is_deterministic(bytes in prop::collection::vec(any::<u8>(), 1..32)) {
        let decoder = Decoder::new();
        prop_assert_eq!(decoder.decode_at(&bytes, 0x1000), decoder.decode_at(&bytes, 0x1000));
    }

    /// Bytes after the instruction never influence it.
    #[test]
    fn trailing_bytes_do_not_change_result(
        bytes in prop::collection::vec(any::<u8>(), 1..16),
        tail in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let decoder = Decoder::new();
        if let Ok(insn) = decoder.decode_at(&bytes, 0) {
            let mut extended = bytes.clone();
            extended.extend_from_slice(&tail);
            prop_assert_eq!(decoder.decode_at(&extended, 0), Ok(insn));
        }
    }

    /// Every strict prefix of a decodable instruction reports end of input.
    #[test]
    fn truncated_instruction_is_end_of_input(bytes in prop::collection::vec(any::<u8>(), 1..16)) {
        let decoder = Decoder::new();
        if let Ok(insn) = decoder.decode_at(&bytes, 0) {
            for len in 0..insn.length {
                prop_assert_eq!(
                    decoder.decode_at(&bytes[..len], 0),
                    Err(DecodeError::EndOfInput { address: 0 })
                );
            }
        }
    }

    /// Decoded address matches the cursor's logical address.
    #[test]
    fn decoded_address_matches(
        bytes in prop::collection::vec(any::<u8>(), 1..32),
        addr in 0x1000u64..0xFFFF_FFFF_FFFF_0000u64
    ) {
        if let Ok(insn) = Decoder::new().decode_at(&bytes, addr) {
            prop_assert_eq!(insn.address, addr, "Decoded address should match input address");
        }
    }

    /// Sequential decoding covers all bytes (no gaps or overlaps).
    #[test]
    fn sequential_decode_covers_all_bytes(bytes in prop::collection::vec(any::<u8>(), 16..128)) {
        let results = Decoder::new().decode_all(&bytes, 0x1000);
        let mut covered = vec![false; bytes.len()];

        for result in &results {
            match result {
                Ok(insn) => {
                    let start = (insn.address - 0x1000) as usize;
                    for (i, covered_byte) in covered[start..start + insn.length].iter_mut().enumerate() {
                        prop_assert!(!*covered_byte, "Byte {} covered twice", start + i);
                        *covered_byte = true;
                    }
                }
                Err(err) if err.is_resynchronizable() => {
                    let offset = (err.address() - 0x1000) as usize;
                    prop_assert!(!covered[offset]);
                    covered[offset] = true;
                }
                Err(err) => {
                    // Only the tail may be left undecoded
                    let offset = (err.address() - 0x1000) as usize;
                    prop_assert!(covered[offset..].iter().all(|c| !c));
                    for c in &mut covered[offset..] {
                        *c = true;
                    }
                }
            }
        }

        for (i, &c) in covered.iter().enumerate() {
            prop_assert!(c, "Byte {} was not covered", i);
        }
    }
}

// =============================================================================
// Specific Encoding Pattern Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Register-direct ModR/M forms never read a SIB byte or displacement.
    #[test]
    fn register_direct_modrm_is_one_byte(
        rex in 0x40u8..=0x4F,
        opcode in prop::sample::select(vec![0x01u8, 0x03, 0x09, 0x21, 0x29, 0x31, 0x39, 0x85, 0x89, 0x8B]),
        low in 0u8..64,
    ) {
        let modrm = 0xC0 | low;
        let insn = Decoder::new().decode_at(&[rex, opcode, modrm], 0).unwrap();
        prop_assert_eq!(insn.length, 3);
        let fields = insn.modrm.unwrap();
        prop_assert!(fields.is_register());
        prop_assert!(fields.sib.is_none());
        prop_assert_eq!(insn.displacement, None);
    }

    /// REX.R and REX.B extend reg and rm.
    #[test]
    fn rex_extends_modrm_fields(rex in 0x40u8..=0x4F, modrm in 0xC0u8..=0xFF) {
        let insn = Decoder::new().decode_at(&[rex, 0x89, modrm], 0).unwrap();
        let fields = insn.modrm.unwrap();
        prop_assert_eq!(fields.modrm.reg >> 3, (rex >> 2) & 1);
        prop_assert_eq!(fields.modrm.rm >> 3, rex & 1);
    }

    /// A legacy prefix after REX is a conflict under the strict policy and
    /// accepted under the lenient one.
    #[test]
    fn legacy_prefix_after_rex(
        rex in 0x40u8..=0x4F,
        prefix in prop::sample::select(vec![0x26u8, 0x2E, 0x36, 0x3E, 0x64, 0x65, 0x66, 0x67, 0xF0, 0xF2, 0xF3]),
    ) {
        let bytes = [rex, prefix, 0x90];
        let strict = Decoder::new().decode_at(&bytes, 0);
        prop_assert_eq!(DecodeStatus::of(&strict), DecodeStatus::PrefixConflict);

        let lenient = Decoder::with_config(DecoderConfig::new().with_rex_policy(RexPolicy::Lenient));
        let insn = lenient.decode_at(&bytes, 0).unwrap();
        prop_assert_eq!(insn.length, 3);
        prop_assert!(insn.prefixes.rex.is_none());
    }

    /// Any number of legacy prefixes is accepted until the length limit.
    #[test]
    fn prefix_runs_up_to_limit(
        prefixes in prop::collection::vec(
            prop::sample::select(vec![0x26u8, 0x2E, 0x36, 0x3E, 0x64, 0x65, 0x66, 0x67, 0xF0, 0xF2, 0xF3]),
            0..20,
        ),
    ) {
        let mut bytes = prefixes.clone();
        bytes.push(0x90);
        let result = Decoder::new().decode_at(&bytes, 0);
        if prefixes.len() < 15 {
            prop_assert_eq!(result.map(|insn| insn.length), Ok(prefixes.len() + 1));
        } else {
            prop_assert!(
                matches!(result, Err(DecodeError::MalformedEncoding { .. })),
                "expected length-limit error, got {:?}",
                result
            );
        }
    }
}
