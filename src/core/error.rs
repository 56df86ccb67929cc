// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types for the code generation engine.
//!
//! Every failure is scoped to the single instruction being resolved and is
//! reported to the caller as a value; the engine never aborts a run. The
//! kinds mirror the recovery choices a driver has: skip the line (malformed
//! operand, unknown instruction) or surface a user arithmetic error
//! (overflow, evaluator failure). The engine treats an evaluator failure
//! exactly like an overflow and does not interpret its cause.

use std::fmt;

/// Categories of code generation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// No operand pattern rule matched the operand text.
    MalformedOperand,
    /// The operand matched structurally but no opcode exists for the
    /// resulting canonical text, or the encoded sizes contradict.
    UnknownInstruction,
    /// A sub-expression evaluated outside its permitted range.
    Overflow,
    /// The expression evaluator reported a failure of its own.
    Eval,
}

impl CodegenErrorKind {
    /// Diagnostic code used by listing drivers.
    pub fn diagnostic_code(self) -> &'static str {
        match self {
            CodegenErrorKind::MalformedOperand => "z80201",
            CodegenErrorKind::UnknownInstruction => "z80202",
            CodegenErrorKind::Overflow => "z80203",
            CodegenErrorKind::Eval => "z80204",
        }
    }
}

/// A code generation error with a kind and message.
#[derive(Debug, Clone)]
pub struct CodegenError {
    kind: CodegenErrorKind,
    message: String,
}

impl CodegenError {
    pub fn new(kind: CodegenErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
        }
    }

    pub fn malformed_operand(operand: &str) -> Self {
        Self::new(
            CodegenErrorKind::MalformedOperand,
            "Malformed operand",
            Some(operand),
        )
    }

    pub fn unknown_instruction(canonical: &str) -> Self {
        Self::new(
            CodegenErrorKind::UnknownInstruction,
            "Unknown instruction",
            Some(canonical),
        )
    }

    pub fn overflow(msg: &str, param: Option<&str>) -> Self {
        Self::new(CodegenErrorKind::Overflow, msg, param)
    }

    pub fn eval(msg: &str) -> Self {
        Self::new(CodegenErrorKind::Eval, msg, None)
    }

    pub fn kind(&self) -> CodegenErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CodegenError {}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_includes_parameter() {
        let err = CodegenError::unknown_instruction("ld ixh,h");
        assert_eq!(err.message(), "Unknown instruction: ld ixh,h");
        assert_eq!(err.kind(), CodegenErrorKind::UnknownInstruction);
    }

    #[test]
    fn kinds_map_to_distinct_diagnostic_codes() {
        let codes = [
            CodegenErrorKind::MalformedOperand,
            CodegenErrorKind::UnknownInstruction,
            CodegenErrorKind::Overflow,
            CodegenErrorKind::Eval,
        ]
        .map(CodegenErrorKind::diagnostic_code);
        for (i, code) in codes.iter().enumerate() {
            for other in &codes[i + 1..] {
                assert_ne!(code, other);
            }
        }
    }
}
