// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand pattern rules.
//!
//! Free-form operand text is matched against a fixed-priority list of shape
//! rules; the first structural match wins and later rules are never
//! consulted. Each rule normalizes the text into an [`OperandFormat`]: a
//! canonical template carrying placeholder markers plus the raw
//! sub-expression strings extracted from the text. Specific shapes sit
//! before generic ones so that `(hl)` resolves as a register indirect and
//! not as an expression falling through to the absolute catch-all.

use crate::core::error::CodegenError;
use crate::core::eval::ExprEval;

/// The resolved shape of one instruction's operand text.
///
/// A placeholder in `template` always has the corresponding sub-expression
/// populated; a template without one leaves it empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandFormat {
    pub template: String,
    pub expr1: String,
    pub expr2: String,
}

impl OperandFormat {
    fn new(template: String) -> Self {
        Self {
            template,
            expr1: String::new(),
            expr2: String::new(),
        }
    }

    fn with_expr1(template: String, expr1: String) -> Self {
        Self {
            template,
            expr1,
            expr2: String::new(),
        }
    }
}

/// One operand-shape recognizer.
///
/// `e` is a sub-expression, `r` a register/condition token (parenthesized
/// indirects included), `(xy±e)` an indexed displacement form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRule {
    /// `e,(xy±e),r` — bit operation on an indexed target, register copy.
    BitIndexedReg,
    /// `e,(xy±e)` — bit operation on an indexed target.
    BitIndexed,
    /// `r,r`
    RegReg,
    /// `r,(xy±e)`
    RegIndexed,
    /// `(xy±e),r`
    IndexedReg,
    /// `(xy±e),e` — indexed store of an immediate.
    IndexedImm,
    /// `r,(e)` — parentheses kept in the template.
    RegIndirect,
    /// `(e),r` — parentheses kept in the template.
    IndirectReg,
    /// `r,e`
    RegImm,
    /// `e,r` — bit operation on a register target.
    BitReg,
    /// `(xy±e)` alone.
    Indexed,
    /// `r` alone.
    Register,
    /// Catch-all: any single remaining expression, absolute/immediate.
    Absolute,
}

/// Rule list in priority order. First structural match wins.
pub static OPERAND_RULES: &[OperandRule] = &[
    OperandRule::BitIndexedReg,
    OperandRule::BitIndexed,
    OperandRule::RegReg,
    OperandRule::RegIndexed,
    OperandRule::IndexedReg,
    OperandRule::IndexedImm,
    OperandRule::RegIndirect,
    OperandRule::IndirectReg,
    OperandRule::RegImm,
    OperandRule::BitReg,
    OperandRule::Indexed,
    OperandRule::Register,
    OperandRule::Absolute,
];

/// Register and condition lexicon, parenthesized indirects included.
const REGISTER_TOKENS: &[&str] = &[
    "a", "b", "c", "d", "e", "h", "l", "i", "r", "ixh", "ixl", "iyh", "iyl", "af", "af'", "bc",
    "de", "hl", "sp", "ix", "iy", "nz", "z", "nc", "po", "pe", "p", "m", "(bc)", "(de)", "(hl)",
    "(sp)", "(c)", "(ix)", "(iy)",
];

/// Run the rule table over operand text.
///
/// Returns `Ok(None)` when no rule matches (a malformed operand); an error
/// only surfaces from the eager bit-index evaluation of a structurally
/// matched bit shape.
pub fn resolve_operand(
    operand: &str,
    eval: &dyn ExprEval,
) -> Result<Option<OperandFormat>, CodegenError> {
    let parts = split_top_level(operand);
    if parts.is_empty() {
        return Ok(None);
    }
    for rule in OPERAND_RULES {
        if let Some(format) = rule.apply(&parts, eval)? {
            return Ok(Some(format));
        }
    }
    Ok(None)
}

impl OperandRule {
    fn apply(
        &self,
        parts: &[String],
        eval: &dyn ExprEval,
    ) -> Result<Option<OperandFormat>, CodegenError> {
        match self {
            OperandRule::BitIndexedReg => {
                if parts.len() != 3 || !is_expr(&parts[0]) {
                    return Ok(None);
                }
                let (Some((base, disp)), Some(reg)) =
                    (index_token(&parts[1]), reg_token(&parts[2]))
                else {
                    return Ok(None);
                };
                let bit = eval_bit_index(&parts[0], eval)?;
                Ok(Some(OperandFormat {
                    template: format!("{bit},({base}+$12),{reg}"),
                    expr1: disp,
                    expr2: parts[0].clone(),
                }))
            }
            OperandRule::BitIndexed => {
                if parts.len() != 2 || !is_expr(&parts[0]) {
                    return Ok(None);
                }
                let Some((base, disp)) = index_token(&parts[1]) else {
                    return Ok(None);
                };
                let bit = eval_bit_index(&parts[0], eval)?;
                Ok(Some(OperandFormat {
                    template: format!("{bit},({base}+$12)"),
                    expr1: disp,
                    expr2: parts[0].clone(),
                }))
            }
            OperandRule::RegReg => {
                if parts.len() != 2 {
                    return Ok(None);
                }
                let (Some(r1), Some(r2)) = (reg_token(&parts[0]), reg_token(&parts[1])) else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::new(format!("{r1},{r2}"))))
            }
            OperandRule::RegIndexed => {
                if parts.len() != 2 {
                    return Ok(None);
                }
                let (Some(r1), Some((base, disp))) =
                    (reg_token(&parts[0]), index_token(&parts[1]))
                else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::with_expr1(
                    format!("{r1},({base}+$12)"),
                    disp,
                )))
            }
            OperandRule::IndexedReg => {
                if parts.len() != 2 {
                    return Ok(None);
                }
                let (Some((base, disp)), Some(r2)) =
                    (index_token(&parts[0]), reg_token(&parts[1]))
                else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::with_expr1(
                    format!("({base}+$12),{r2}"),
                    disp,
                )))
            }
            OperandRule::IndexedImm => {
                if parts.len() != 2 || !is_expr(&parts[1]) {
                    return Ok(None);
                }
                let Some((base, disp)) = index_token(&parts[0]) else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat {
                    template: format!("({base}+$12),$34"),
                    expr1: disp,
                    expr2: parts[1].clone(),
                }))
            }
            OperandRule::RegIndirect => {
                if parts.len() != 2 || !fully_enclosed(&parts[1]) {
                    return Ok(None);
                }
                let Some(r1) = reg_token(&parts[0]) else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::with_expr1(
                    format!("{r1},($1234)"),
                    strip_parens(&parts[1]),
                )))
            }
            OperandRule::IndirectReg => {
                if parts.len() != 2 || !fully_enclosed(&parts[0]) {
                    return Ok(None);
                }
                if reg_token(&parts[0]).is_some() || index_token(&parts[0]).is_some() {
                    return Ok(None);
                }
                let Some(r2) = reg_token(&parts[1]) else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::with_expr1(
                    format!("($1234),{r2}"),
                    strip_parens(&parts[0]),
                )))
            }
            OperandRule::RegImm => {
                if parts.len() != 2 || !is_expr(&parts[1]) {
                    return Ok(None);
                }
                let Some(r1) = reg_token(&parts[0]) else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::with_expr1(
                    format!("{r1},$1234"),
                    parts[1].clone(),
                )))
            }
            OperandRule::BitReg => {
                if parts.len() != 2 || !is_expr(&parts[0]) || fully_enclosed(&parts[0]) {
                    return Ok(None);
                }
                let Some(r2) = reg_token(&parts[1]) else {
                    return Ok(None);
                };
                let bit = eval_bit_index(&parts[0], eval)?;
                Ok(Some(OperandFormat {
                    template: format!("{bit},{r2}"),
                    expr1: String::new(),
                    expr2: parts[0].clone(),
                }))
            }
            OperandRule::Indexed => {
                if parts.len() != 1 {
                    return Ok(None);
                }
                let Some((base, disp)) = index_token(&parts[0]) else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::with_expr1(
                    format!("({base}+$12)"),
                    disp,
                )))
            }
            OperandRule::Register => {
                if parts.len() != 1 {
                    return Ok(None);
                }
                let Some(r1) = reg_token(&parts[0]) else {
                    return Ok(None);
                };
                Ok(Some(OperandFormat::new(r1)))
            }
            OperandRule::Absolute => {
                if parts.len() != 1 || parts[0].is_empty() {
                    return Ok(None);
                }
                Ok(Some(OperandFormat::with_expr1(
                    "$1234".to_string(),
                    parts[0].clone(),
                )))
            }
        }
    }
}

/// Split operand text at commas outside parentheses; parts are trimmed.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    let last = current.trim().to_string();
    if !(parts.is_empty() && last.is_empty()) {
        parts.push(last);
    }
    parts
}

/// Normalize a part to a register/condition token, or `None`.
fn reg_token(part: &str) -> Option<String> {
    let normalized: String = part
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    REGISTER_TOKENS
        .contains(&normalized.as_str())
        .then_some(normalized)
}

/// Match `(ix±e)` / `(iy±e)`, returning the base register and the
/// sub-expression with its sign attached. Whitespace after the sign is
/// insignificant.
fn index_token(part: &str) -> Option<(String, String)> {
    let trimmed = part.trim();
    if !fully_enclosed(trimmed) {
        return None;
    }
    let inner = trimmed[1..trimmed.len() - 1].trim();
    let base = match inner.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ix") => "ix",
        Some(prefix) if prefix.eq_ignore_ascii_case("iy") => "iy",
        _ => return None,
    };
    let rest = inner[2..].trim_start();
    let (sign, magnitude) = match rest.chars().next() {
        Some('+') => ('+', &rest[1..]),
        Some('-') => ('-', &rest[1..]),
        _ => return None,
    };
    let magnitude = magnitude.trim_start();
    if magnitude.is_empty() {
        return None;
    }
    Some((base.to_string(), format!("{sign}{magnitude}")))
}

/// A part that is an expression: non-empty and not a register token.
fn is_expr(part: &str) -> bool {
    !part.is_empty() && reg_token(part).is_none()
}

/// Whether one outer parenthesis pair encloses the whole part.
fn fully_enclosed(part: &str) -> bool {
    let part = part.trim();
    if part.len() < 2 || !part.starts_with('(') || !part.ends_with(')') {
        return false;
    }
    let mut depth = 0i32;
    for (i, ch) in part.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != part.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn strip_parens(part: &str) -> String {
    let trimmed = part.trim();
    trimmed[1..trimmed.len() - 1].trim().to_string()
}

fn eval_bit_index(expr: &str, eval: &dyn ExprEval) -> Result<String, CodegenError> {
    let value = eval
        .eval_range(expr, 0, 7)
        .map_err(|err| CodegenError::eval(&err.message))?;
    if !(0..=7).contains(&value) {
        return Err(CodegenError::overflow(
            "Bit index out of range (0-7)",
            Some(expr),
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CodegenErrorKind;
    use crate::core::eval::LiteralEval;

    fn resolve(operand: &str) -> Option<OperandFormat> {
        resolve_operand(operand, &LiteralEval).expect("no eager evaluation expected to fail")
    }

    #[test]
    fn register_pair_shapes_win_over_expressions() {
        let fmt = resolve("b , c").unwrap();
        assert_eq!(fmt.template, "b,c");
        assert!(fmt.expr1.is_empty());

        let fmt = resolve("a,(bc)").unwrap();
        assert_eq!(fmt.template, "a,(bc)");

        let fmt = resolve("( sp ),hl").unwrap();
        assert_eq!(fmt.template, "(sp),hl");

        let fmt = resolve("af,af'").unwrap();
        assert_eq!(fmt.template, "af,af'");
    }

    #[test]
    fn bare_register_indirect_is_not_the_catch_all() {
        let fmt = resolve("(hl)").unwrap();
        assert_eq!(fmt.template, "(hl)");
        assert!(fmt.expr1.is_empty());
    }

    #[test]
    fn indexed_forms_capture_sign_and_magnitude() {
        let fmt = resolve("(ix+$12),a").unwrap();
        assert_eq!(fmt.template, "(ix+$12),a");
        assert_eq!(fmt.expr1, "+$12");

        let fmt = resolve("a,(iy - 5)").unwrap();
        assert_eq!(fmt.template, "a,(iy+$12)");
        assert_eq!(fmt.expr1, "-5");
    }

    #[test]
    fn indexed_store_immediate_captures_both_expressions() {
        let fmt = resolve("(ix+1),$7f").unwrap();
        assert_eq!(fmt.template, "(ix+$12),$34");
        assert_eq!(fmt.expr1, "+1");
        assert_eq!(fmt.expr2, "$7f");
    }

    #[test]
    fn indirect_absolute_keeps_parentheses_in_template() {
        let fmt = resolve("($4000),a").unwrap();
        assert_eq!(fmt.template, "($1234),a");
        assert_eq!(fmt.expr1, "$4000");

        let fmt = resolve("a,($fe)").unwrap();
        assert_eq!(fmt.template, "a,($1234)");
        assert_eq!(fmt.expr1, "$fe");
    }

    #[test]
    fn immediate_defaults_to_the_word_placeholder() {
        let fmt = resolve("b,$12").unwrap();
        assert_eq!(fmt.template, "b,$1234");
        assert_eq!(fmt.expr1, "$12");

        let fmt = resolve("$8000").unwrap();
        assert_eq!(fmt.template, "$1234");
        assert_eq!(fmt.expr1, "$8000");
    }

    #[test]
    fn bit_index_is_folded_as_a_decimal_literal() {
        let fmt = resolve("0,(ix+$12),b").unwrap();
        assert_eq!(fmt.template, "0,(ix+$12),b");
        assert_eq!(fmt.expr1, "+$12");

        let fmt = resolve("7,(iy-3)").unwrap();
        assert_eq!(fmt.template, "7,(iy+$12)");
        assert_eq!(fmt.expr1, "-3");

        let fmt = resolve("%101,a").unwrap();
        assert_eq!(fmt.template, "5,a");
        assert!(fmt.expr1.is_empty());
    }

    #[test]
    fn bit_index_out_of_range_is_an_overflow() {
        let err = resolve_operand("9,b", &LiteralEval).unwrap_err();
        assert_eq!(err.kind(), CodegenErrorKind::Overflow);
    }

    #[test]
    fn unmatched_multi_part_text_is_no_match() {
        assert!(resolve("b,c,d").is_none());
        assert!(resolve("1,2").is_none());
    }

    #[test]
    fn condition_codes_are_register_tokens() {
        let fmt = resolve("nz,$1000").unwrap();
        assert_eq!(fmt.template, "nz,$1234");
        assert_eq!(fmt.expr1, "$1000");

        let fmt = resolve("po").unwrap();
        assert_eq!(fmt.template, "po");
    }
}
