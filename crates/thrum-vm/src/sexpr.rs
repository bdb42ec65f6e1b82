//! Text form of bytecode listings and frames.
//!
//! Listings are line-oriented: one instruction per line, with `.name` label
//! lines marking function starts. Frames are brace-delimited sample lists
//! (`{ 1 2 3 }`). Both round-trip: parsing a stringified value yields a
//! structurally equal value.

use std::fmt;

use thrum_foundation::Symbol;

use crate::frame::Frame;
use crate::instruction::{Instruction, Opcode, Operand, Package};

/// Error parsing a bytecode listing or frame text.
#[derive(Debug, Clone, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Parse a bytecode listing into a package.
pub fn parse_package(source: &str) -> Result<Package, ParseError> {
    let mut package = Package::new();

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(label) = line.strip_prefix('.') {
            let label = label.trim();
            if label.is_empty() {
                return Err(ParseError::new(line_no, "empty label"));
            }
            package
                .symbols
                .insert(Symbol::from(label), package.code.len() as u32);
            continue;
        }

        package.code.push(parse_instruction(line, line_no)?);
    }

    Ok(package)
}

fn parse_instruction(line: &str, line_no: usize) -> Result<Instruction, ParseError> {
    let mut parts = line.split_whitespace();
    let mnemonic = parts.next().expect("line is non-empty");
    let op = Opcode::from_mnemonic(mnemonic)
        .ok_or_else(|| ParseError::new(line_no, format!("unknown opcode `{mnemonic}`")))?;

    let inst = match op {
        Opcode::Push => {
            let tag = parts
                .next()
                .ok_or_else(|| ParseError::new(line_no, "push requires a typed operand"))?;
            let text = parts
                .next()
                .ok_or_else(|| ParseError::new(line_no, "push requires an operand value"))?;
            match tag {
                "f32" => Instruction::with_f32(op, parse_number(text, line_no)?),
                "u32" => Instruction::with_u32(op, parse_u32(text, line_no)?),
                other => {
                    return Err(ParseError::new(
                        line_no,
                        format!("unknown push operand type `{other}`"),
                    ))
                }
            }
        }
        Opcode::PushSym => {
            let name = parts
                .next()
                .ok_or_else(|| ParseError::new(line_no, "push_sym requires a symbol operand"))?;
            Instruction::with_sym(op, Symbol::from(name))
        }
        Opcode::Copy
        | Opcode::RefVec
        | Opcode::DropS
        | Opcode::DropV
        | Opcode::Call
        | Opcode::AddVv
        | Opcode::AddSv
        | Opcode::AddVs
        | Opcode::AddSs
        | Opcode::MulVv
        | Opcode::MulSv
        | Opcode::MulVs
        | Opcode::MulSs => {
            let text = parts.next().ok_or_else(|| {
                ParseError::new(line_no, format!("`{mnemonic}` requires a u32 operand"))
            })?;
            Instruction::with_u32(op, parse_u32(text, line_no)?)
        }
        Opcode::Fill | Opcode::Ret | Opcode::Exit => Instruction::bare(op),
    };

    if let Some(extra) = parts.next() {
        return Err(ParseError::new(
            line_no,
            format!("unexpected trailing token `{extra}`"),
        ));
    }
    Ok(inst)
}

fn parse_number(text: &str, line_no: usize) -> Result<f32, ParseError> {
    text.parse()
        .map_err(|_| ParseError::new(line_no, format!("invalid number `{text}`")))
}

fn parse_u32(text: &str, line_no: usize) -> Result<u32, ParseError> {
    text.parse()
        .map_err(|_| ParseError::new(line_no, format!("invalid slot count `{text}`")))
}

/// Parse frame text of the form `{ v0 v1 … }`.
pub fn parse_frame(source: &str) -> Result<Frame, ParseError> {
    let text = source.trim();
    let inner = text
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| ParseError::new(1, "frame data must be wrapped in `{ … }`"))?;

    let samples = inner
        .split_whitespace()
        .map(|token| parse_number(token, 1))
        .collect::<Result<Vec<f32>, ParseError>>()?;
    Ok(Frame::from_samples(samples))
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{}", self.op),
            Operand::F32(value) => write!(f, "{} f32 {value}", self.op),
            Operand::U32(value) if self.op == Opcode::Push => {
                write!(f, "{} u32 {value}", self.op)
            }
            Operand::U32(value) => write!(f, "{} {value}", self.op),
            Operand::Sym(symbol) => write!(f, "{} {symbol}", self.op),
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (offset, inst) in self.code.iter().enumerate() {
            let mut first_label = true;
            for (symbol, start) in &self.symbols {
                if *start == offset as u32 {
                    if first_label {
                        writeln!(f)?;
                        first_label = false;
                    }
                    writeln!(f, ".{symbol}")?;
                }
            }
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
.main
push f32 1
ret
drop_s 1
exit
";

    #[test]
    fn test_parse_listing() {
        let package = parse_package(LISTING).unwrap();
        assert_eq!(package.code.len(), 4);
        assert_eq!(package.symbols.get("main"), Some(&0));
        assert_eq!(package.code[0], Instruction::with_f32(Opcode::Push, 1.0));
        assert_eq!(package.code[2], Instruction::with_u32(Opcode::DropS, 1));
    }

    #[test]
    fn test_listing_round_trip() {
        let package = parse_package(LISTING).unwrap();
        let reparsed = parse_package(&package.to_string()).unwrap();
        assert_eq!(package, reparsed);
    }

    #[test]
    fn test_mangled_labels_round_trip() {
        let source = "\
.+_[vF32:vF32:vF32]
ref_vec 2
ref_vec 2
ret
add_vv 2
exit
.main
push_sym +_[vF32:vF32:vF32]
ret
call 1
exit
";
        let package = parse_package(source).unwrap();
        assert_eq!(package.symbols.len(), 2);
        let reparsed = parse_package(&package.to_string()).unwrap();
        assert_eq!(package, reparsed);
    }

    #[test]
    fn test_unknown_opcode_reports_line() {
        let err = parse_package("ret\nbogus 1\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("bogus"));
    }

    #[test]
    fn test_parse_frame() {
        let frame = parse_frame("{ 1 2.5 -3 }").unwrap();
        assert_eq!(frame.samples(), &[1.0, 2.5, -3.0]);
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = parse_frame("{ 0.25 4 }").unwrap();
        assert_eq!(parse_frame(&frame.to_string()).unwrap(), frame);
    }

    #[test]
    fn test_frame_requires_braces() {
        assert!(parse_frame("1 2 3").is_err());
    }
}
