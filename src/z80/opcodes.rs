// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Z80 opcode table.
//!
//! Maps canonical disassembly text (mnemonic plus operand template with
//! placeholder markers) to an encoding descriptor. The table is built once
//! on first use and never mutated; the regular register files are expanded
//! by loops over the standard 3-bit register codes while irregular
//! instructions are literal rows.
//!
//! The table is deliberately asymmetric: 8-bit immediate forms live only
//! under `$12` keys and 16-bit forms only under `$1234` keys. `lookup`
//! bridges the gap with a single narrowing retry; callers must not
//! special-case it. Unifying the keys would change which instructions
//! resolve.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::render::{BYTE_MARK, WORD_MARK};

/// Instruction-set family a table row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuVariant {
    /// Documented Z80 instruction.
    Z80,
    /// Undocumented but stable form (`sll`, index-register halves,
    /// `DD CB` register copies).
    Z80Undoc,
}

/// One fully-specified instruction encoding.
///
/// `value` holds the fixed opcode byte(s) with the low-order byte emitted
/// first; prefixes sit in their emission position.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub size: u8,
    pub value: u32,
    pub variant: CpuVariant,
}

/// Canonical-text keyed opcode map.
pub struct OpcodeTable {
    map: HashMap<String, OpcodeEntry>,
}

impl OpcodeTable {
    fn add(&mut self, text: impl Into<String>, size: u8, value: u32, variant: CpuVariant) {
        let text = text.into();
        let prev = self.map.insert(
            text.clone(),
            OpcodeEntry {
                size,
                value,
                variant,
            },
        );
        debug_assert!(prev.is_none(), "duplicate opcode entry: {text}");
    }

    /// Exact lookup, then one retry with the 16-bit placeholder narrowed
    /// to the 8-bit placeholder. Returns the entry together with the key
    /// that actually resolved; the caller re-binds to that key.
    pub fn lookup(&self, canonical: &str) -> Option<(&OpcodeEntry, String)> {
        if let Some(entry) = self.map.get(canonical) {
            return Some((entry, canonical.to_string()));
        }
        if canonical.contains(WORD_MARK) {
            let narrowed = canonical.replacen(WORD_MARK, BYTE_MARK, 1);
            if let Some(entry) = self.map.get(&narrowed) {
                return Some((entry, narrowed));
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &OpcodeEntry)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Structural prefix length of an opcode value: `CB`/`ED` take one byte,
/// `DD`/`FD` one, or two when combined with a further `CB`.
pub fn prefix_size(value: u32) -> u8 {
    match value & 0xff {
        0xcb | 0xed => 1,
        0xdd | 0xfd => {
            if (value >> 8) & 0xff == 0xcb {
                2
            } else {
                1
            }
        }
        _ => 0,
    }
}

pub static OPCODE_TABLE: Lazy<OpcodeTable> = Lazy::new(build_table);

const REG8: &[(&str, u32)] = &[
    ("b", 0),
    ("c", 1),
    ("d", 2),
    ("e", 3),
    ("h", 4),
    ("l", 5),
    ("(hl)", 6),
    ("a", 7),
];

const REG16: &[(&str, u32)] = &[("bc", 0), ("de", 1), ("hl", 2), ("sp", 3)];

const COND: &[(&str, u32)] = &[
    ("nz", 0),
    ("z", 1),
    ("nc", 2),
    ("c", 3),
    ("po", 4),
    ("pe", 5),
    ("p", 6),
    ("m", 7),
];

const INDEX: &[(&str, u32)] = &[("ix", 0xdd), ("iy", 0xfd)];

/// ALU operations over the accumulator: canonical operand prefix and the
/// register-form base. Immediate forms are `base + 0x46`, `(hl)`/indexed
/// forms `base | 6`.
const ALU: &[(&str, u32, &str)] = &[
    ("add", 0x80, "a,"),
    ("adc", 0x88, "a,"),
    ("sub", 0x90, ""),
    ("sbc", 0x98, "a,"),
    ("and", 0xa0, ""),
    ("xor", 0xa8, ""),
    ("or", 0xb0, ""),
    ("cp", 0xb8, ""),
];

const CB_SHIFT: &[(&str, u32, bool)] = &[
    ("rlc", 0x00, false),
    ("rrc", 0x08, false),
    ("rl", 0x10, false),
    ("rr", 0x18, false),
    ("sla", 0x20, false),
    ("sra", 0x28, false),
    ("sll", 0x30, true),
    ("srl", 0x38, false),
];

const BIT_OPS: &[(&str, u32)] = &[("bit", 0x40), ("res", 0x80), ("set", 0xc0)];

fn build_table() -> OpcodeTable {
    use CpuVariant::{Z80, Z80Undoc};

    let mut t = OpcodeTable {
        map: HashMap::new(),
    };

    // No-operand forms.
    for (text, value) in [
        ("nop", 0x00),
        ("rlca", 0x07),
        ("rrca", 0x0f),
        ("rla", 0x17),
        ("rra", 0x1f),
        ("daa", 0x27),
        ("cpl", 0x2f),
        ("scf", 0x37),
        ("ccf", 0x3f),
        ("halt", 0x76),
        ("exx", 0xd9),
        ("di", 0xf3),
        ("ei", 0xfb),
        ("ret", 0xc9),
    ] {
        t.add(text, 1, value, Z80);
    }
    for (text, op) in [
        ("neg", 0x44),
        ("retn", 0x45),
        ("reti", 0x4d),
        ("rrd", 0x67),
        ("rld", 0x6f),
        ("ldi", 0xa0),
        ("cpi", 0xa1),
        ("ini", 0xa2),
        ("outi", 0xa3),
        ("ldd", 0xa8),
        ("cpd", 0xa9),
        ("ind", 0xaa),
        ("outd", 0xab),
        ("ldir", 0xb0),
        ("cpir", 0xb1),
        ("inir", 0xb2),
        ("otir", 0xb3),
        ("lddr", 0xb8),
        ("cpdr", 0xb9),
        ("indr", 0xba),
        ("otdr", 0xbb),
    ] {
        t.add(text, 2, 0xed | op << 8, Z80);
    }
    for (mode, op) in [(0u32, 0x46u32), (1, 0x56), (2, 0x5e)] {
        t.add(format!("im {mode}"), 2, 0xed | op << 8, Z80);
    }

    // 8-bit loads.
    for (dst, dc) in REG8 {
        for (src, sc) in REG8 {
            if *dst == "(hl)" && *src == "(hl)" {
                continue; // 0x76 is halt
            }
            t.add(format!("ld {dst},{src}"), 1, 0x40 | dc << 3 | sc, Z80);
        }
        t.add(format!("ld {dst},$12"), 2, 0x06 | dc << 3, Z80);
    }
    t.add("ld a,(bc)", 1, 0x0a, Z80);
    t.add("ld a,(de)", 1, 0x1a, Z80);
    t.add("ld (bc),a", 1, 0x02, Z80);
    t.add("ld (de),a", 1, 0x12, Z80);
    t.add("ld a,($1234)", 3, 0x3a, Z80);
    t.add("ld ($1234),a", 3, 0x32, Z80);
    t.add("ld a,i", 2, 0xed | 0x57 << 8, Z80);
    t.add("ld a,r", 2, 0xed | 0x5f << 8, Z80);
    t.add("ld i,a", 2, 0xed | 0x47 << 8, Z80);
    t.add("ld r,a", 2, 0xed | 0x4f << 8, Z80);

    // 16-bit loads.
    for (rr, c) in REG16 {
        t.add(format!("ld {rr},$1234"), 3, 0x01 | c << 4, Z80);
        if *rr != "hl" {
            t.add(format!("ld {rr},($1234)"), 4, 0xed | (0x4b | c << 4) << 8, Z80);
            t.add(format!("ld ($1234),{rr}"), 4, 0xed | (0x43 | c << 4) << 8, Z80);
        }
    }
    t.add("ld hl,($1234)", 3, 0x2a, Z80);
    t.add("ld ($1234),hl", 3, 0x22, Z80);
    t.add("ld sp,hl", 1, 0xf9, Z80);

    // Index register loads and indexed memory forms.
    for (x, p) in INDEX {
        t.add(format!("ld {x},$1234"), 4, p | 0x21 << 8, Z80);
        t.add(format!("ld {x},($1234)"), 4, p | 0x2a << 8, Z80);
        t.add(format!("ld ($1234),{x}"), 4, p | 0x22 << 8, Z80);
        t.add(format!("ld sp,{x}"), 2, p | 0xf9 << 8, Z80);
        for (r, rc) in REG8 {
            if *r == "(hl)" {
                continue;
            }
            t.add(format!("ld {r},({x}+$12)"), 3, p | (0x46 | rc << 3) << 8, Z80);
            t.add(format!("ld ({x}+$12),{r}"), 3, p | (0x70 | rc) << 8, Z80);
        }
        t.add(format!("ld ({x}+$12),$34"), 4, p | 0x36 << 8, Z80);
        t.add(format!("inc ({x}+$12)"), 3, p | 0x34 << 8, Z80);
        t.add(format!("dec ({x}+$12)"), 3, p | 0x35 << 8, Z80);
        t.add(format!("inc {x}"), 2, p | 0x23 << 8, Z80);
        t.add(format!("dec {x}"), 2, p | 0x2b << 8, Z80);
        t.add(format!("push {x}"), 2, p | 0xe5 << 8, Z80);
        t.add(format!("pop {x}"), 2, p | 0xe1 << 8, Z80);
        t.add(format!("ex (sp),{x}"), 2, p | 0xe3 << 8, Z80);
        t.add(format!("jp ({x})"), 2, p | 0xe9 << 8, Z80);
        for (rr, c) in [("bc", 0u32), ("de", 1), (*x, 2), ("sp", 3)] {
            t.add(format!("add {x},{rr}"), 2, p | (0x09 | c << 4) << 8, Z80);
        }
    }

    // Exchanges, stack.
    t.add("ex de,hl", 1, 0xeb, Z80);
    t.add("ex af,af'", 1, 0x08, Z80);
    t.add("ex (sp),hl", 1, 0xe3, Z80);
    for (rr, c) in [("bc", 0u32), ("de", 1), ("hl", 2), ("af", 3)] {
        t.add(format!("push {rr}"), 1, 0xc5 | c << 4, Z80);
        t.add(format!("pop {rr}"), 1, 0xc1 | c << 4, Z80);
    }

    // 8-bit arithmetic and logic.
    for (op, base, acc) in ALU {
        for (r, rc) in REG8 {
            t.add(format!("{op} {acc}{r}"), 1, base | rc, Z80);
        }
        t.add(format!("{op} {acc}$12"), 2, base + 0x46, Z80);
        for (x, p) in INDEX {
            t.add(format!("{op} {acc}({x}+$12)"), 3, p | (base | 6) << 8, Z80);
        }
    }
    for (r, rc) in REG8 {
        t.add(format!("inc {r}"), 1, 0x04 | rc << 3, Z80);
        t.add(format!("dec {r}"), 1, 0x05 | rc << 3, Z80);
    }

    // 16-bit arithmetic.
    for (rr, c) in REG16 {
        t.add(format!("add hl,{rr}"), 1, 0x09 | c << 4, Z80);
        t.add(format!("adc hl,{rr}"), 2, 0xed | (0x4a | c << 4) << 8, Z80);
        t.add(format!("sbc hl,{rr}"), 2, 0xed | (0x42 | c << 4) << 8, Z80);
        t.add(format!("inc {rr}"), 1, 0x03 | c << 4, Z80);
        t.add(format!("dec {rr}"), 1, 0x0b | c << 4, Z80);
    }

    // CB-prefixed rotates and shifts.
    for (op, base, undoc) in CB_SHIFT {
        let variant = if *undoc { Z80Undoc } else { Z80 };
        for (r, rc) in REG8 {
            t.add(format!("{op} {r}"), 2, 0xcb | (base | rc) << 8, variant);
        }
        for (x, p) in INDEX {
            t.add(
                format!("{op} ({x}+$12)"),
                4,
                p | 0xcb << 8 | (base | 6) << 16,
                variant,
            );
            for (r, rc) in REG8 {
                if *r == "(hl)" {
                    continue;
                }
                t.add(
                    format!("{op} ({x}+$12),{r}"),
                    4,
                    p | 0xcb << 8 | (base | rc) << 16,
                    Z80Undoc,
                );
            }
        }
    }

    // CB-prefixed bit operations.
    for (op, base) in BIT_OPS {
        for bit in 0u32..8 {
            for (r, rc) in REG8 {
                t.add(
                    format!("{op} {bit},{r}"),
                    2,
                    0xcb | (base | bit << 3 | rc) << 8,
                    Z80,
                );
            }
            for (x, p) in INDEX {
                t.add(
                    format!("{op} {bit},({x}+$12)"),
                    4,
                    p | 0xcb << 8 | (base | bit << 3 | 6) << 16,
                    Z80,
                );
                for (r, rc) in REG8 {
                    if *r == "(hl)" {
                        continue;
                    }
                    t.add(
                        format!("{op} {bit},({x}+$12),{r}"),
                        4,
                        p | 0xcb << 8 | (base | bit << 3 | rc) << 16,
                        Z80Undoc,
                    );
                }
            }
        }
    }

    // Jumps, calls, returns.
    t.add("jp $1234", 3, 0xc3, Z80);
    t.add("jp (hl)", 1, 0xe9, Z80);
    t.add("call $1234", 3, 0xcd, Z80);
    for (cc, c) in COND {
        t.add(format!("jp {cc},$1234"), 3, 0xc2 | c << 3, Z80);
        t.add(format!("call {cc},$1234"), 3, 0xc4 | c << 3, Z80);
        t.add(format!("ret {cc}"), 1, 0xc0 | c << 3, Z80);
    }
    t.add("jr $1234", 2, 0x18, Z80);
    for (cc, c) in &COND[..4] {
        t.add(format!("jr {cc},$1234"), 2, 0x20 | c << 3, Z80);
    }
    t.add("djnz $1234", 2, 0x10, Z80);
    for target in (0u32..=0x38).step_by(8) {
        t.add(format!("rst ${target:02x}"), 1, 0xc7 | target, Z80);
    }

    // Input/output.
    t.add("in a,($12)", 2, 0xdb, Z80);
    t.add("out ($12),a", 2, 0xd3, Z80);
    for (r, rc) in REG8 {
        if *r == "(hl)" {
            continue;
        }
        t.add(format!("in {r},(c)"), 2, 0xed | (0x40 | rc << 3) << 8, Z80);
        t.add(format!("out (c),{r}"), 2, 0xed | (0x41 | rc << 3) << 8, Z80);
    }

    // Undocumented index-register halves. Plain h/l partners are absent:
    // the prefix redirects those register codes to the halves themselves.
    for (x, p) in INDEX {
        let halves = [(format!("{x}h"), 4u32), (format!("{x}l"), 5u32)];
        let others = [("b", 0u32), ("c", 1), ("d", 2), ("e", 3), ("a", 7)];
        for (half, hc) in &halves {
            for (r, rc) in others {
                t.add(format!("ld {half},{r}"), 2, p | (0x40 | hc << 3 | rc) << 8, Z80Undoc);
                t.add(format!("ld {r},{half}"), 2, p | (0x40 | rc << 3 | hc) << 8, Z80Undoc);
            }
            for (half2, h2c) in &halves {
                t.add(
                    format!("ld {half},{half2}"),
                    2,
                    p | (0x40 | hc << 3 | h2c) << 8,
                    Z80Undoc,
                );
            }
            t.add(format!("ld {half},$12"), 3, p | (0x06 | hc << 3) << 8, Z80Undoc);
            t.add(format!("inc {half}"), 2, p | (0x04 | hc << 3) << 8, Z80Undoc);
            t.add(format!("dec {half}"), 2, p | (0x05 | hc << 3) << 8, Z80Undoc);
            for (op, base, acc) in ALU {
                t.add(format!("{op} {acc}{half}"), 2, p | (base | hc) << 8, Z80Undoc);
            }
        }
    }

    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::z80::render::{first_placeholder, has_second_placeholder, Placeholder};

    #[test]
    fn spot_check_core_encodings() {
        let (entry, _) = OPCODE_TABLE.lookup("ld bc,$1234").unwrap();
        assert_eq!((entry.size, entry.value), (3, 0x01));

        let (entry, _) = OPCODE_TABLE.lookup("ld (ix+$12),a").unwrap();
        assert_eq!((entry.size, entry.value), (3, 0x77dd));

        let (entry, _) = OPCODE_TABLE.lookup("bit 0,(ix+$12),b").unwrap();
        assert_eq!((entry.size, entry.value), (4, 0x40cbdd));
        assert_eq!(entry.variant, CpuVariant::Z80Undoc);

        let (entry, _) = OPCODE_TABLE.lookup("jr $1234").unwrap();
        assert_eq!((entry.size, entry.value), (2, 0x18));

        let (entry, _) = OPCODE_TABLE.lookup("neg").unwrap();
        assert_eq!((entry.size, entry.value), (2, 0x44ed));
    }

    #[test]
    fn narrowing_fallback_resolves_eight_bit_forms() {
        let (entry, key) = OPCODE_TABLE.lookup("ld b,$1234").unwrap();
        assert_eq!(key, "ld b,$12");
        assert_eq!((entry.size, entry.value), (2, 0x06));

        let (entry, key) = OPCODE_TABLE.lookup("in a,($1234)").unwrap();
        assert_eq!(key, "in a,($12)");
        assert_eq!((entry.size, entry.value), (2, 0xdb));

        assert!(OPCODE_TABLE.lookup("ld q,$1234").is_none());
    }

    #[test]
    fn half_registers_never_pair_with_h_or_l() {
        assert!(OPCODE_TABLE.lookup("ld ixh,b").is_some());
        assert!(OPCODE_TABLE.lookup("ld ixh,h").is_none());
        assert!(OPCODE_TABLE.lookup("ld l,iyl").is_none());
    }

    #[test]
    fn table_rows_are_internally_consistent() {
        for (text, entry) in OPCODE_TABLE.entries() {
            let operand_bytes: u8 = match first_placeholder(text) {
                Placeholder::WordHex => 2,
                Placeholder::ByteHex | Placeholder::Displacement => 1,
                _ => 0,
            } + u8::from(has_second_placeholder(text));
            let opcode_len = entry.size - operand_bytes;
            assert!(opcode_len >= 1, "no room for an opcode byte: {text}");
            assert!(
                opcode_len == 4 || entry.value >> (8 * u32::from(opcode_len)) == 0,
                "opcode value wider than its slot: {text}"
            );
            assert!(
                prefix_size(entry.value) + 1 + operand_bytes <= entry.size,
                "prefix/operand bytes exceed declared size: {text}"
            );
        }
    }

    #[test]
    fn documented_and_undocumented_rows_coexist() {
        let documented = OPCODE_TABLE
            .entries()
            .filter(|(_, e)| e.variant == CpuVariant::Z80)
            .count();
        let undocumented = OPCODE_TABLE.len() - documented;
        assert!(documented > 600);
        assert!(undocumented > 300);
    }
}
