// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Property suite for the code generation engine: determinism, size
//! stability, displacement symmetry and relative-branch range behavior.

use proptest::prelude::*;

use z80forge::{CodegenErrorKind, LiteralEval, Z80Codegen};

proptest! {
    #[test]
    fn re_resolving_is_byte_for_byte_deterministic(value in 0u16..=0xffff) {
        let codegen = Z80Codegen::new();
        let operand = format!("hl,${value:04x}");
        let first = codegen
            .encode_instruction("ld", &operand, 0, &LiteralEval)
            .expect("ld hl,nn always encodes");
        let second = codegen
            .encode_instruction("ld", &operand, 0, &LiteralEval)
            .expect("ld hl,nn always encodes");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn size_is_constant_while_bytes_vary(value in 0u16..=0xffff) {
        let codegen = Z80Codegen::new();
        let enc = codegen
            .encode_instruction("call", &format!("${value:04x}"), 0, &LiteralEval)
            .expect("call nn always encodes");
        prop_assert_eq!(enc.size, 3);
        prop_assert_eq!(enc.bytes[0], 0xcd);
        prop_assert_eq!(enc.bytes[1], (value & 0xff) as u8);
        prop_assert_eq!(enc.bytes[2], (value >> 8) as u8);
    }

    #[test]
    fn displacement_survives_the_round_trip(d in any::<i8>()) {
        let codegen = Z80Codegen::new();
        let operand = format!("a,(ix{:+})", d);
        let enc = codegen
            .encode_instruction("ld", &operand, 0, &LiteralEval)
            .expect("in-range displacement always encodes");
        prop_assert_eq!(enc.bytes, vec![0xdd, 0x7e, d as u8]);

        let sign = if d < 0 { '-' } else { '+' };
        let expected = format!("ld a,(ix{sign}${:02x})", d.unsigned_abs());
        prop_assert_eq!(enc.text, expected);
    }

    #[test]
    fn relative_branches_fail_outside_the_signed_byte_window(
        target in 0u16..=0xffff,
        pc in 0u16..=0xffff,
    ) {
        let codegen = Z80Codegen::new();
        let operand = format!("${target:04x}");
        let result = codegen.encode_instruction("jr", &operand, pc, &LiteralEval);

        let displacement = i64::from(target) - (i64::from(pc) + 2);
        if (-128..=127).contains(&displacement) {
            let enc = result.expect("in-window relative branch must encode");
            prop_assert_eq!(enc.bytes, vec![0x18, displacement as i8 as u8]);
            prop_assert_eq!(enc.size, 2);
        } else {
            let err = result.expect_err("out-of-window relative branch must fail");
            prop_assert_eq!(err.kind(), CodegenErrorKind::Overflow);
        }
    }
}
