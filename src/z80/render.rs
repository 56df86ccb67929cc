// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Placeholder markers and disassembly text rendering.
//!
//! Canonical opcode text uses three literal markers: `$12` for the first
//! 8-bit slot, `$34` for the second 8-bit slot, and `$1234` for a 16-bit
//! slot. An indexed displacement is the `$12` marker preceded by the
//! template's `+` sign, which flips to `-` when the evaluated value is
//! negative. The renderer substitutes evaluated values back into the
//! canonical text; the result doubles as the listing output.

/// First 8-bit placeholder.
pub const BYTE_MARK: &str = "$12";
/// Second 8-bit placeholder (indexed-store-immediate forms).
pub const BYTE2_MARK: &str = "$34";
/// 16-bit placeholder.
pub const WORD_MARK: &str = "$1234";
/// Indexed-displacement placeholder, sign included.
pub const DISP_MARK: &str = "+$12";

/// Kind of the slot a canonical template reserves for a sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// No substitution slot.
    None,
    /// 8-bit immediate, rendered `$xx`.
    ByteHex,
    /// 16-bit immediate or address, rendered `$xxxx`.
    WordHex,
    /// Signed indexed displacement, rendered `+$xx` / `-$xx`.
    Displacement,
    /// Pre-evaluated decimal literal folded into the template (bit index).
    LiteralDecimal,
}

/// Classify the first-expression slot of a canonical template.
///
/// The 16-bit marker is checked first; `$12` is its prefix.
pub fn first_placeholder(canonical: &str) -> Placeholder {
    if canonical.contains(WORD_MARK) {
        Placeholder::WordHex
    } else if canonical.contains(DISP_MARK) {
        Placeholder::Displacement
    } else if canonical.contains(BYTE_MARK) {
        Placeholder::ByteHex
    } else {
        Placeholder::None
    }
}

/// Whether the template reserves the second 8-bit slot.
pub fn has_second_placeholder(canonical: &str) -> bool {
    canonical.contains(BYTE2_MARK)
}

/// An evaluated first sub-expression, ready for substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatedExpr {
    Byte(u8),
    Word(u16),
    Displacement(i8),
}

/// Substitute evaluated values into canonical text.
///
/// The displacement substitution keeps the human-readable sign and
/// magnitude rather than the wrapped two's-complement byte.
pub fn render_text(canonical: &str, expr1: Option<EvaluatedExpr>, expr2: Option<u8>) -> String {
    let mut text = canonical.to_string();
    match expr1 {
        Some(EvaluatedExpr::Word(value)) => {
            text = text.replacen(WORD_MARK, &format!("${value:04x}"), 1);
        }
        Some(EvaluatedExpr::Displacement(value)) => {
            let sign = if value < 0 { '-' } else { '+' };
            let magnitude = value.unsigned_abs();
            text = text.replacen(DISP_MARK, &format!("{sign}${magnitude:02x}"), 1);
        }
        Some(EvaluatedExpr::Byte(value)) => {
            text = text.replacen(BYTE_MARK, &format!("${value:02x}"), 1);
        }
        None => {}
    }
    if let Some(value) = expr2 {
        text = text.replacen(BYTE2_MARK, &format!("${value:02x}"), 1);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_marker_wins_over_its_byte_prefix() {
        assert_eq!(first_placeholder("ld bc,$1234"), Placeholder::WordHex);
        assert_eq!(first_placeholder("ld b,$12"), Placeholder::ByteHex);
        assert_eq!(first_placeholder("ld (ix+$12),a"), Placeholder::Displacement);
        assert_eq!(first_placeholder("nop"), Placeholder::None);
    }

    #[test]
    fn renders_word_and_byte_values() {
        assert_eq!(
            render_text("ld bc,$1234", Some(EvaluatedExpr::Word(0xabc)), None),
            "ld bc,$0abc"
        );
        assert_eq!(
            render_text("ld b,$12", Some(EvaluatedExpr::Byte(0x0a)), None),
            "ld b,$0a"
        );
    }

    #[test]
    fn renders_displacement_sign_and_magnitude() {
        assert_eq!(
            render_text("ld (ix+$12),a", Some(EvaluatedExpr::Displacement(-5)), None),
            "ld (ix-$05),a"
        );
        assert_eq!(
            render_text("ld (ix+$12),a", Some(EvaluatedExpr::Displacement(18)), None),
            "ld (ix+$12),a"
        );
        assert_eq!(
            render_text(
                "ld (iy+$12),a",
                Some(EvaluatedExpr::Displacement(-128)),
                None
            ),
            "ld (iy-$80),a"
        );
    }

    #[test]
    fn renders_both_slots_of_indexed_store_immediate() {
        assert_eq!(
            render_text(
                "ld (ix+$12),$34",
                Some(EvaluatedExpr::Displacement(3)),
                Some(0x7f)
            ),
            "ld (ix+$03),$7f"
        );
    }
}
