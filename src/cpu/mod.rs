//! CPU emulation for the RPU.
//!
//! This module implements the whole RPU architecture:
//! - 4096 bytes of bit-addressable memory
//! - 2 registers: IP (instruction pointer) and ACC (one-bit accumulator)
//! - 2 instructions, LOAD and STORE, each a 16-bit word

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod snapshot;

pub use memory::{Bit, Memory, MemoryError, MEMORY_SIZE};
pub use registers::Registers;
pub use decode::{Instruction, Opcode, DecodeError, INSTRUCTION_WIDTH, MAX_OPERAND};
pub use execute::{Rpu, RpuError, RpuState, Run, Step, TraceRecord};
pub use snapshot::{RpuSnapshot, SnapshotError};
