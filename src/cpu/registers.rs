//! RPU registers.
//!
//! The RPU has only two pieces of scalar state:
//! - IP: byte offset of the next instruction
//! - ACC: one-bit accumulator

use crate::cpu::decode::INSTRUCTION_WIDTH;
use crate::cpu::memory::Bit;
use serde::{Serialize, Deserialize};

/// The RPU register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Instruction pointer (byte offset into memory)
    pub ip: usize,

    /// One-bit accumulator
    pub acc: Bit,
}

impl Registers {
    /// Create a register file with IP at 0 and the accumulator clear.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move IP past the current instruction.
    /// Returns the old value.
    pub fn advance_ip(&mut self) -> usize {
        let old = self.ip;
        self.ip = self.ip.saturating_add(INSTRUCTION_WIDTH);
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_ip() {
        let mut regs = Registers::new();
        regs.ip = 10;

        let old = regs.advance_ip();
        assert_eq!(old, 10);
        assert_eq!(regs.ip, 12);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers { ip: 40, acc: Bit::One };
        regs.reset();
        assert_eq!(regs, Registers::new());
    }
}
