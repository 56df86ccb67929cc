// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Z80 instruction resolver.
//!
//! Drives the operand pattern rules, the opcode table and the expression
//! evaluator to turn `(mnemonic, operand text, pc)` into machine code and
//! canonical disassembly text. The resolver holds no state of its own; the
//! shared tables are immutable and safe for concurrent use, so a multi-pass
//! driver may call it once per line per pass and simply observe different
//! bytes as forward references settle.

pub mod opcodes;
pub mod render;
pub mod rules;

#[cfg(test)]
mod tests;

use crate::core::error::CodegenError;
use crate::core::eval::ExprEval;

use self::opcodes::{prefix_size, OPCODE_TABLE};
use self::render::{
    first_placeholder, has_second_placeholder, render_text, EvaluatedExpr, Placeholder,
};
use self::rules::{resolve_operand, OperandFormat};

/// Mnemonics whose canonical operand form drops an explicit accumulator
/// destination: a trailing `,a` is stripped before rule matching so that
/// `and a,a` and `and a` resolve identically.
const IMPLIED_ACC_MNEMONICS: &[&str] = &["and", "cp", "or", "sub", "xor"];

/// Mnemonics that encode their 16-bit target as a signed displacement
/// relative to the instruction's end address.
const RELATIVE_MNEMONICS: &[&str] = &["jr", "djnz"];

/// One resolved instruction: exact machine code, canonical disassembly
/// text, and the encoded length. `size` is stable across passes for a given
/// canonical form even while `bytes` still carry provisional values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInstruction {
    pub bytes: Vec<u8>,
    pub text: String,
    pub size: u8,
}

/// The Z80 code generation engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct Z80Codegen;

impl Z80Codegen {
    pub fn new() -> Self {
        Self
    }

    /// Resolve one instruction to bytes and canonical text.
    ///
    /// `pc` is the address of the instruction's first byte, used only for
    /// relative branches. Sub-expressions go through `eval`; any failure is
    /// scoped to this instruction and leaves the engine unchanged.
    pub fn encode_instruction(
        &self,
        mnemonic: &str,
        operand: &str,
        pc: u16,
        eval: &dyn ExprEval,
    ) -> Result<EncodedInstruction, CodegenError> {
        let mnemonic = mnemonic.trim().to_ascii_lowercase();
        let operand = operand.trim();

        // rst and im have no register addressing modes at all; their
        // operand is evaluated directly into the canonical text.
        if (mnemonic == "rst" || mnemonic == "im") && !operand.is_empty() {
            return encode_direct_value(&mnemonic, operand, eval);
        }

        let format = if operand.is_empty() {
            OperandFormat {
                template: String::new(),
                expr1: String::new(),
                expr2: String::new(),
            }
        } else {
            let operand = strip_implied_accumulator(&mnemonic, operand);
            match resolve_operand(operand, eval)? {
                Some(format) => format,
                None => return Err(CodegenError::malformed_operand(operand)),
            }
        };

        let canonical = if format.template.is_empty() {
            mnemonic.clone()
        } else {
            format!("{mnemonic} {}", format.template)
        };
        let Some((entry, canonical)) = OPCODE_TABLE.lookup(&canonical) else {
            return Err(CodegenError::unknown_instruction(&canonical));
        };

        // The entry's canonical text is authoritative from here on; the
        // rule's template was only a lookup aid. Placeholder kinds are read
        // off the resolved key so the narrowing fallback re-binds the
        // expression to the 8-bit slot.
        let mut operand_bytes: Vec<u8> = Vec::new();
        let mut rendered1 = None;
        match first_placeholder(&canonical) {
            Placeholder::Displacement => {
                let value = eval_checked(eval, &format.expr1, -128, 127)?;
                let displacement = value as i8;
                operand_bytes.push(displacement as u8);
                rendered1 = Some(EvaluatedExpr::Displacement(displacement));
            }
            Placeholder::WordHex => {
                let value = eval_checked(eval, &format.expr1, -32768, 65535)?;
                let target = (value & 0xffff) as u16;
                if RELATIVE_MNEMONICS.contains(&mnemonic.as_str()) {
                    let origin = i64::from(pc) + i64::from(entry.size);
                    let displacement = i64::from(target) - origin;
                    if !(-128..=127).contains(&displacement) {
                        return Err(CodegenError::overflow(
                            "Relative jump out of range",
                            Some(&canonical),
                        ));
                    }
                    operand_bytes.push(displacement as i8 as u8);
                } else {
                    operand_bytes.extend_from_slice(&target.to_le_bytes());
                }
                rendered1 = Some(EvaluatedExpr::Word(target));
            }
            Placeholder::ByteHex => {
                let value = eval_checked(eval, &format.expr1, -128, 255)?;
                let byte = (value & 0xff) as u8;
                operand_bytes.push(byte);
                rendered1 = Some(EvaluatedExpr::Byte(byte));
            }
            Placeholder::None | Placeholder::LiteralDecimal => {}
        }
        let mut rendered2 = None;
        if has_second_placeholder(&canonical) {
            let value = eval_checked(eval, &format.expr2, 0, 255)?;
            let byte = (value & 0xff) as u8;
            operand_bytes.push(byte);
            rendered2 = Some(byte);
        }

        // Structural size validation: prefix bytes, the opcode byte and the
        // evaluated operand bytes must fit the declared size. A mismatch
        // means the operand shape contradicts the opcode slot.
        let operand_len = operand_bytes.len() as u8;
        let prefix = prefix_size(entry.value);
        if prefix + 1 + operand_len > entry.size {
            return Err(CodegenError::unknown_instruction(&canonical));
        }

        let opcode_len = (entry.size - operand_len) as usize;
        let mut bytes = entry.value.to_le_bytes()[..opcode_len].to_vec();
        if prefix == 2 && operand_len == 1 {
            // DD CB / FD CB: the displacement sits between the prefix pair
            // and the final opcode byte.
            bytes.insert(2, operand_bytes[0]);
        } else {
            bytes.extend_from_slice(&operand_bytes);
        }

        let text = render_text(&canonical, rendered1, rendered2);
        Ok(EncodedInstruction {
            bytes,
            text,
            size: entry.size,
        })
    }
}

/// `rst`/`im` path: operand evaluated straight to a value, canonical text
/// built as `"<mnemonic> <value>"` (hex for rst, decimal for im) and looked
/// up directly.
fn encode_direct_value(
    mnemonic: &str,
    operand: &str,
    eval: &dyn ExprEval,
) -> Result<EncodedInstruction, CodegenError> {
    let canonical = if mnemonic == "im" {
        let value = eval_checked(eval, operand, 0, 2)?;
        format!("im {value}")
    } else {
        let value = eval_checked(eval, operand, 0, 0x38)?;
        format!("rst ${value:02x}")
    };
    let Some((entry, canonical)) = OPCODE_TABLE.lookup(&canonical) else {
        return Err(CodegenError::unknown_instruction(&canonical));
    };
    let bytes = entry.value.to_le_bytes()[..entry.size as usize].to_vec();
    Ok(EncodedInstruction {
        bytes,
        text: canonical,
        size: entry.size,
    })
}

/// Strip a trailing `,a` from the operand text of implied-accumulator
/// mnemonics.
fn strip_implied_accumulator<'a>(mnemonic: &str, operand: &'a str) -> &'a str {
    if !IMPLIED_ACC_MNEMONICS.contains(&mnemonic) {
        return operand;
    }
    let mut depth = 0i32;
    let mut last_comma = None;
    for (i, ch) in operand.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => last_comma = Some(i),
            _ => {}
        }
    }
    if let Some(idx) = last_comma {
        if operand[idx + 1..].trim().eq_ignore_ascii_case("a") {
            return operand[..idx].trim_end();
        }
    }
    operand
}

fn eval_checked(
    eval: &dyn ExprEval,
    expr: &str,
    min: i64,
    max: i64,
) -> Result<i64, CodegenError> {
    let value = eval
        .eval_range(expr, min, max)
        .map_err(|err| CodegenError::eval(&err.message))?;
    if value < min || value > max {
        return Err(CodegenError::overflow("Value out of range", Some(expr)));
    }
    Ok(value)
}
