//! Simple assembler for RPU programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! START:              ; Define a label (byte address)
//!     LOAD FLAGS.3    ; Load bit 3 of the byte at FLAGS
//!     STORE 0x40      ; Store to bit address 0x40
//!
//!     ORG 0x100       ; Pad with zeros up to byte offset 0x100
//! FLAGS:
//!     DB 0b1000, 0xFF ; Raw data bytes
//! ```
//!
//! Numeric operands are bit addresses. A bare label operand means bit 0 of
//! the labeled byte.

use crate::cpu::decode::{encode, Instruction, Opcode, MAX_OPERAND};
use crate::cpu::memory::MEMORY_SIZE;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a memory image.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// An operand waiting for its label to be defined.
struct PendingRef {
    /// Offset of the instruction's first byte in the output.
    offset: usize,
    opcode: Opcode,
    label: String,
    bit: u8,
    line: usize,
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> byte address).
    symbols: HashMap<String, usize>,
    /// Forward references to patch in pass 2.
    pending: Vec<PendingRef>,
    /// Output image.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve label operands
        self.resolve_references()?;

        if self.output.len() > MEMORY_SIZE {
            return Err(AssemblerError::AddressOverflow { size: self.output.len() });
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some((label, rest)) = line.split_once(':') {
            self.define_label(label.trim(), line_num)?;

            let rest = rest.trim();
            if !rest.is_empty() {
                return self.process_statement(rest, line_num);
            }
            return Ok(());
        }

        self.process_statement(line, line_num)
    }

    fn define_label(&mut self, label: &str, line_num: usize) -> Result<(), AssemblerError> {
        if !is_identifier(label) {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid label '{}'", label),
            });
        }

        let label = label.to_uppercase();
        if self.symbols.insert(label.clone(), self.output.len()).is_some() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("duplicate label '{}'", label),
            });
        }
        Ok(())
    }

    fn process_statement(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, operand) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m.to_uppercase(), Some(rest.trim())),
            None => (line.to_uppercase(), None),
        };

        match mnemonic.as_str() {
            // Directives
            "ORG" => {
                let target = self.parse_number(required(operand, "ORG requires address", line_num)?, line_num)?;
                let target = usize::try_from(target)
                    .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value: target })?;
                if target < self.output.len() {
                    return Err(AssemblerError::SyntaxError {
                        line: line_num,
                        message: format!("ORG {:#x} is behind current address {:#x}", target, self.output.len()),
                    });
                }
                if target > MEMORY_SIZE {
                    return Err(AssemblerError::AddressOverflow { size: target });
                }
                self.output.resize(target, 0);
            }

            "DB" | "BYTE" => {
                let values = required(operand, "DB requires at least one value", line_num)?;
                for value in values.split(',') {
                    let value = self.parse_number(value.trim(), line_num)?;
                    let byte = u8::try_from(value)
                        .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })?;
                    self.output.push(byte);
                }
            }

            // Instructions
            "LOAD" | "LD" => self.emit_instruction(Opcode::Load, operand, line_num)?,
            "STORE" | "ST" => self.emit_instruction(Opcode::Store, operand, line_num)?,

            _ => return Err(AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic,
            }),
        }

        Ok(())
    }

    fn emit_instruction(&mut self, opcode: Opcode, operand: Option<&str>, line_num: usize)
        -> Result<(), AssemblerError>
    {
        let operand = required(operand, &format!("{} requires an operand", opcode), line_num)?;

        let address = if operand.starts_with(|c: char| c.is_ascii_digit()) {
            self.parse_number(operand, line_num)?
        } else {
            // Label reference, patched in pass 2
            let (label, bit) = parse_label_operand(operand, line_num)?;
            self.pending.push(PendingRef {
                offset: self.output.len(),
                opcode,
                label,
                bit,
                line: line_num,
            });
            0
        };

        let instr = make_instruction(opcode, address, line_num)?;
        self.output.extend_from_slice(&encode(&instr));
        Ok(())
    }

    fn parse_number(&self, text: &str, line_num: usize) -> Result<i64, AssemblerError> {
        let text = text.trim();
        let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            (hex, 16)
        } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
            (bin, 2)
        } else {
            (text, 10)
        };

        i64::from_str_radix(&digits.replace('_', ""), radix)
            .map_err(|_| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid number '{}'", text),
            })
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for pending in &self.pending {
            let base = self.symbols.get(&pending.label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: pending.line,
                    label: pending.label.clone(),
                })?;

            let address = (*base as i64) * 8 + i64::from(pending.bit);
            let instr = make_instruction(pending.opcode, address, pending.line)?;
            self.output[pending.offset..pending.offset + 2].copy_from_slice(&encode(&instr));
        }
        Ok(())
    }
}

fn required<'a>(operand: Option<&'a str>, message: &str, line_num: usize) -> Result<&'a str, AssemblerError> {
    operand
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AssemblerError::SyntaxError { line: line_num, message: message.into() })
}

fn make_instruction(opcode: Opcode, address: i64, line_num: usize) -> Result<Instruction, AssemblerError> {
    u16::try_from(address)
        .ok()
        .filter(|a| *a <= MAX_OPERAND)
        .and_then(|a| Instruction::new(opcode, a).ok())
        .ok_or(AssemblerError::ValueOutOfRange { line: line_num, value: address })
}

/// Split `LABEL` or `LABEL.bit` into the symbol name and bit offset.
fn parse_label_operand(operand: &str, line_num: usize) -> Result<(String, u8), AssemblerError> {
    let (label, bit) = match operand.split_once('.') {
        Some((label, bit)) => {
            let bit = bit.trim().parse::<u8>()
                .ok()
                .filter(|b| *b < 8)
                .ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("bit index in '{}' must be 0-7", operand),
                })?;
            (label.trim(), bit)
        }
        None => (operand, 0),
    };

    if !is_identifier(label) {
        return Err(AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid operand '{}'", operand),
        });
    }
    Ok((label.to_uppercase(), bit))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("program of {size} bytes does not fit in memory")]
    AddressOverflow { size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            LOAD 5
            STORE 0
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0x00, 0x05, 0x80, 0x00]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:
            LOAD FLAGS.3    ; forward reference
            STORE FLAGS
        FLAGS: DB 0b1000
        "#;

        let result = assemble(source).unwrap();
        // FLAGS is byte 4 -> bit addresses 35 and 32
        assert_eq!(result, vec![0x00, 35, 0x80, 32, 0x08]);
    }

    #[test]
    fn test_assemble_org_and_data() {
        let source = r#"
            LD 0x10
            ORG 6
            DB 1, 0xFF, 0b11
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0x00, 0x10, 0, 0, 0, 0, 1, 0xFF, 3]);
    }

    #[test]
    fn test_assemble_errors() {
        assert!(matches!(
            assemble("JMP 4"),
            Err(AssemblerError::UnknownMnemonic { line: 1, .. })
        ));
        assert!(matches!(
            assemble("\nLOAD 0x8000"),
            Err(AssemblerError::ValueOutOfRange { line: 2, value: 0x8000 })
        ));
        assert!(matches!(
            assemble("LOAD NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 1, .. })
        ));
        assert!(matches!(
            assemble("DB 256"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        ));
        assert!(matches!(
            assemble("DB 1, 2\nORG 1"),
            Err(AssemblerError::SyntaxError { line: 2, .. })
        ));
        assert!(matches!(
            assemble("A:\nA:"),
            Err(AssemblerError::SyntaxError { line: 2, .. })
        ));
        assert!(matches!(
            assemble("STORE X.8\nX:"),
            Err(AssemblerError::SyntaxError { line: 1, .. })
        ));
        assert!(matches!(
            assemble("ORG 4097"),
            Err(AssemblerError::AddressOverflow { size: 4097 })
        ));
    }
}
