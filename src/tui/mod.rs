//! TUI debugger for the RPU emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register view (IP, accumulator, cycle count)
//! - Hex memory view highlighting IP and the last operand's byte
//! - Step/run/breakpoint controls
//! - Disassembly view

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
