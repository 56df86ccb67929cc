// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing driver for the Z80 code generation engine.
//!
//! Reads assembly lines from a file or standard input, resolves each
//! instruction at a running program counter and prints an address, byte and
//! disassembly listing. This stands in for the excluded multi-pass driver
//! just far enough to make the engine runnable: single pass, numeric
//! literals only, one diagnostic per failing line.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};

use z80forge::core::eval::parse_number;
use z80forge::{LiteralEval, Z80Codegen};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "z80forge",
    version = VERSION,
    about = "Z80 cross-assembler code generation core with a line-by-line listing driver"
)]
struct Cli {
    /// Input assembly file; standard input when omitted.
    input: Option<PathBuf>,
    /// Origin address for the first instruction (any literal notation).
    #[arg(short = 'g', long = "org", default_value = "0")]
    org: String,
    /// Suppress the listing; only report diagnostics.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let source = match read_source(cli.input.as_deref()) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("ERROR - cannot read input: {err}");
            process::exit(2);
        }
    };
    let org = match parse_number(&cli.org) {
        Some(org) if (0..=0xffff).contains(&org) => org as u16,
        _ => {
            eprintln!("ERROR - invalid origin address: {}", cli.org);
            process::exit(2);
        }
    };

    let errors = run(&source, org, cli.quiet);
    if errors > 0 {
        process::exit(1);
    }
}

fn read_source(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn run(source: &str, org: u16, quiet: bool) -> u32 {
    let codegen = Z80Codegen::new();
    let mut pc = org;
    let mut errors = 0;

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let Some((mnemonic, operand)) = split_statement(raw) else {
            continue;
        };
        match codegen.encode_instruction(mnemonic, operand, pc, &LiteralEval) {
            Ok(enc) => {
                if !quiet {
                    let hex: String = enc.bytes.iter().map(|b| format!("{b:02x} ")).collect();
                    println!("{pc:04x}  {:<12} {}", hex.trim_end(), enc.text);
                }
                pc = pc.wrapping_add(u16::from(enc.size));
            }
            Err(err) => {
                eprintln!(
                    "{line_no}: ERROR [{}] - {}",
                    err.kind().diagnostic_code(),
                    err.message()
                );
                errors += 1;
            }
        }
    }
    errors
}

/// Split a raw source line into mnemonic and operand text. Comments,
/// blanks and label-only lines yield nothing; a leading `label:` is
/// dropped. The operand keeps its internal spacing for the engine.
fn split_statement(raw: &str) -> Option<(&str, &str)> {
    let code = raw.split(';').next().unwrap_or("");
    let mut stmt = code.trim();
    if let Some((_, rest)) = stmt.split_once(':') {
        stmt = rest.trim();
    }
    if stmt.is_empty() {
        return None;
    }
    match stmt.split_once(char::is_whitespace) {
        Some((mnemonic, operand)) => Some((mnemonic, operand.trim())),
        None => Some((stmt, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::split_statement;

    #[test]
    fn statements_are_split_from_labels_and_comments() {
        assert_eq!(split_statement("  ld a,5 ; load"), Some(("ld", "a,5")));
        assert_eq!(split_statement("loop: djnz loop"), Some(("djnz", "loop")));
        assert_eq!(split_statement("halt"), Some(("halt", "")));
        assert_eq!(split_statement("; only a comment"), None);
        assert_eq!(split_statement("label:"), None);
        assert_eq!(split_statement(""), None);
    }
}
