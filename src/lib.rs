// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Z80 machine-code generation core.
//!
//! Given a mnemonic and raw operand text, the engine resolves the addressing
//! mode, evaluates embedded sub-expressions through a caller-supplied
//! evaluator, and produces the exact byte sequence plus a canonical
//! disassembly string. Symbol resolution, program-counter management and
//! multi-pass control stay with the caller; the engine is pure and may be
//! re-invoked per pass with updated evaluator results.

pub mod core;
pub mod z80;

pub use crate::core::error::{CodegenError, CodegenErrorKind};
pub use crate::core::eval::{EvalError, ExprEval, LiteralEval};
pub use crate::z80::{EncodedInstruction, Z80Codegen};
