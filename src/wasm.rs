//! WebAssembly bindings for the RPU emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Rpu, Step};
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_instruction;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly RPU wrapper.
#[wasm_bindgen]
pub struct WasmRpu {
    rpu: Rpu,
    image: Vec<u8>,
}

#[wasm_bindgen]
impl WasmRpu {
    /// Create an RPU with zeroed memory.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            rpu: Rpu::default(),
            image: Vec::new(),
        }
    }

    /// Load a raw memory image. Returns the number of bytes loaded.
    #[wasm_bindgen]
    pub fn load_image(&mut self, bytes: &[u8]) -> usize {
        self.image = bytes.to_vec();
        self.rpu = Rpu::new(&self.image);
        bytes.len().min(self.rpu.mem.capacity())
    }

    /// Load a program from assembly source code.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let image = assemble(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(self.load_image(&image))
    }

    /// Step one instruction. Returns the trace line, or "halted".
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        match self.rpu.step() {
            Ok(Step::Executed(record)) => Ok(record.to_string()),
            Ok(Step::Halted) => Ok("halted".to_string()),
            Err(e) => Err(JsError::new(&format!("{}", e))),
        }
    }

    /// Run until halt or max cycles.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.rpu.run_limited(u64::from(max_cycles))
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(self.rpu.cycles)
    }

    /// Rebuild the RPU from the loaded image.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.rpu = Rpu::new(&self.image);
    }

    /// Check if the RPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.rpu.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.rpu.cycles
    }

    /// Get instruction pointer.
    #[wasm_bindgen]
    pub fn ip(&self) -> usize {
        self.rpu.current_ip()
    }

    /// Get accumulator (0 or 1).
    #[wasm_bindgen]
    pub fn accumulator(&self) -> u8 {
        self.rpu.current_accumulator().to_u8()
    }

    /// Get memory byte at offset (0 past the end).
    #[wasm_bindgen]
    pub fn memory_at(&self, offset: usize) -> u8 {
        self.rpu.mem.read_byte(offset).unwrap_or(0)
    }

    /// Copy all of memory into a JS byte array.
    #[wasm_bindgen]
    pub fn memory_dump(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.rpu.mem.as_bytes())
    }

    /// Get the whole machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        self.rpu.snapshot().to_json()
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmRpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the image size in bytes.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let image = assemble(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(image.len())
}

/// Disassemble a single instruction word.
#[wasm_bindgen]
pub fn wasm_disassemble(high: u8, low: u8) -> String {
    disassemble_instruction([high, low])
}
