//! # RPU Emulator
//!
//! An emulator for the RPU (Reduced Processing Unit), a toy machine with a
//! single-bit accumulator and bit-addressed memory.
//!
//! Each 16-bit instruction carries a one-bit opcode (LOAD or STORE) and a
//! 15-bit operand naming one bit of the 4096-byte memory. There are no
//! branches: a program runs straight through memory and halts when the
//! instruction pointer walks off the end.

pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{
    Bit, Memory, MemoryError, Registers, Instruction, Opcode,
    Rpu, RpuError, RpuState, RpuSnapshot, Step, TraceRecord, MEMORY_SIZE,
};
pub use asm::{assemble, disassemble, AssemblerError, ImageError, load_image, save_image};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
