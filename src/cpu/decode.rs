//! Instruction decoder for the RPU.
//!
//! Every instruction is one 16-bit word stored as two bytes:
//!
//! ```text
//!   first byte          second byte
//!   7   6 ........ 0    7 ........ 0
//!   op  operand[14:8]   operand[7:0]
//! ```
//!
//! The opcode bit selects LOAD (0) or STORE (1). The 15-bit operand is a
//! bit address into memory.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Width of one instruction in bytes.
pub const INSTRUCTION_WIDTH: usize = 2;

/// Largest operand a 15-bit field can hold.
pub const MAX_OPERAND: u16 = 0x7FFF;

/// The two RPU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Accumulator := bit at operand
    Load,
    /// Bit at operand := accumulator
    Store,
}

impl Opcode {
    /// Create from the opcode bit.
    pub fn from_bit(bit: bool) -> Self {
        if bit { Opcode::Store } else { Opcode::Load }
    }

    /// The opcode bit (0 for LOAD, 1 for STORE).
    pub fn bit(self) -> u8 {
        match self {
            Opcode::Load => 0,
            Opcode::Store => 1,
        }
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded RPU instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Bit address, always in `0..=MAX_OPERAND`.
    pub operand: u16,
}

impl Instruction {
    /// Build an instruction, rejecting operands wider than 15 bits.
    pub fn new(opcode: Opcode, operand: u16) -> Result<Self, DecodeError> {
        if operand > MAX_OPERAND {
            return Err(DecodeError::OperandOutOfRange(operand));
        }
        Ok(Self { opcode, operand })
    }

    /// Shorthand for a LOAD.
    pub fn load(operand: u16) -> Result<Self, DecodeError> {
        Self::new(Opcode::Load, operand)
    }

    /// Shorthand for a STORE.
    pub fn store(operand: u16) -> Result<Self, DecodeError> {
        Self::new(Opcode::Store, operand)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:#06x}", self.opcode, self.operand)
    }
}

/// Decode a 2-byte instruction word.
///
/// Every bit pattern is a valid instruction, so decoding cannot fail.
pub fn decode(word: [u8; 2]) -> Instruction {
    let [high, low] = word;
    Instruction {
        opcode: Opcode::from_bit(high & 0x80 != 0),
        operand: (u16::from(high & 0x7F) << 8) | u16::from(low),
    }
}

/// Encode an instruction back to its 2-byte word.
pub fn encode(instr: &Instruction) -> [u8; 2] {
    let operand = instr.operand & MAX_OPERAND;
    let high = (instr.opcode.bit() << 7) | (operand >> 8) as u8;
    [high, (operand & 0xFF) as u8]
}

/// Errors that can occur when building instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("operand {0:#x} does not fit in 15 bits")]
    OperandOutOfRange(u16),
}
