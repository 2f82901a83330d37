//! Program tooling for the RPU.
//!
//! This module provides:
//! - A simple two-pass assembler (text → raw memory image)
//! - A disassembler (raw image → readable text)
//! - Image file loading and saving

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_instruction};
pub use image::{load_image, save_image, ImageError};
