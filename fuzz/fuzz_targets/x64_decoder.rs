#![no_main]

use libfuzzer_sys::fuzz_target;
use xv_x64::{Cursor, Decoder, DecoderConfig, RexPolicy};

fuzz_target!(|data: &[u8]| {
    // First byte picks the configuration, the rest is code
    let Some((&selector, code)) = data.split_first() else {
        return;
    };
    let config = DecoderConfig::new()
        .with_rex_policy(if selector & 1 == 0 {
            RexPolicy::Strict
        } else {
            RexPolicy::Lenient
        })
        .with_report_truncation(selector & 2 != 0)
        .with_max_length(usize::from(selector >> 4).max(1));
    let decoder = Decoder::with_config(config);

    let mut cursor = Cursor::new(code, 0x1000);
    loop {
        let before = cursor.position();
        match decoder.decode(&mut cursor) {
            Ok(insn) => {
                assert!(insn.length >= 1 && insn.length <= config.max_length);
                assert_eq!(cursor.position(), before + insn.length);
                assert_eq!(insn.bytes(code, 0x1000).map(<[u8]>::len), Some(insn.length));
            }
            Err(err) => {
                assert_eq!(cursor.position(), before);
                if !err.is_resynchronizable() || cursor.advance(1).is_err() {
                    break;
                }
            }
        }
    }
});
