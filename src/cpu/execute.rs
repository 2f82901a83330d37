//! CPU execution engine for the RPU.
//!
//! Implements the fetch-decode-execute cycle. Each step reads the word at
//! IP, decodes it, performs the LOAD or STORE, and advances IP by one
//! instruction width. A fetch that would read past the end of memory halts
//! the machine; that is the only way a program ends.

use crate::cpu::{Bit, Memory, Registers};
use crate::cpu::decode::{self, Instruction, Opcode};
use crate::cpu::memory::{MemoryError, MEMORY_SIZE};
use serde::{Serialize, Deserialize};
use std::iter::FusedIterator;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpuState {
    /// CPU is running normally.
    Running,
    /// Fetch ran off the end of memory.
    Halted,
    /// Execution hit a memory fault.
    Error,
}

/// One executed cycle, as seen by a tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// IP before the step.
    pub ip: usize,
    /// The instruction fetched from `ip`.
    pub instruction: Instruction,
}

impl std::fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:x}: {:x} {:04x}",
            self.ip,
            self.instruction.opcode.bit(),
            self.instruction.operand
        )
    }
}

/// Outcome of a single [`Rpu::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction was executed.
    Executed(TraceRecord),
    /// The machine is halted; nothing was executed.
    Halted,
}

/// The RPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Rpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: RpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    pub(crate) last_instr: Option<Instruction>,
}

impl Rpu {
    /// Create an RPU with default-sized memory initialized from `image`.
    pub fn new(image: &[u8]) -> Self {
        Self::with_capacity(MEMORY_SIZE, image)
    }

    /// Create an RPU with `capacity` bytes of memory initialized from `image`.
    pub fn with_capacity(capacity: usize, image: &[u8]) -> Self {
        Self::from_parts(Registers::new(), Memory::with_capacity(capacity, image))
    }

    pub(crate) fn from_parts(regs: Registers, mem: Memory) -> Self {
        Self {
            regs,
            mem,
            state: RpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Execute a single instruction.
    ///
    /// Returns the executed cycle's trace record, or [`Step::Halted`] once
    /// fetch runs out of memory. A halted machine stays halted.
    pub fn step(&mut self) -> Result<Step, RpuError> {
        match self.state {
            RpuState::Running => {}
            RpuState::Halted => return Ok(Step::Halted),
            RpuState::Error => return Err(RpuError::NotRunning(self.state)),
        }

        // Fetch
        let ip = self.regs.ip;
        let word = match self.mem.read_word(ip) {
            Ok(word) => word,
            Err(_) => {
                self.state = RpuState::Halted;
                tracing::debug!(ip, cycles = self.cycles, "fetch past end of memory, halting");
                return Ok(Step::Halted);
            }
        };

        // Decode
        let instr = decode::decode(word);

        // Execute
        if let Err(e) = self.execute(instr) {
            self.state = RpuState::Error;
            return Err(e);
        }

        // Advance
        self.regs.advance_ip();
        self.cycles += 1;
        self.last_instr = Some(instr);

        tracing::trace!(ip, %instr, acc = %self.regs.acc, "step");

        Ok(Step::Executed(TraceRecord { ip, instruction: instr }))
    }

    /// Lazily run up to `max_cycles` instructions.
    ///
    /// The returned iterator yields one trace record per executed cycle and
    /// ends when the machine halts, the cap is reached, or after yielding
    /// the first error.
    pub fn run(&mut self, max_cycles: u64) -> Run<'_> {
        Run {
            rpu: self,
            remaining: max_cycles,
            done: false,
        }
    }

    /// Run for at most `max_cycles` instructions.
    ///
    /// Returns the number of instructions executed.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, RpuError> {
        let start_cycles = self.cycles;
        for record in self.run(max_cycles) {
            record?;
        }
        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), RpuError> {
        let address = usize::from(instr.operand);
        match instr.opcode {
            Opcode::Load => {
                self.regs.acc = self.mem.read_bit(address)?;
            }
            Opcode::Store => {
                self.mem.set_bit(address, self.regs.acc)?;
            }
        }
        Ok(())
    }

    /// Byte offset of the next instruction.
    pub fn current_ip(&self) -> usize {
        self.regs.ip
    }

    /// Accumulator contents.
    pub fn current_accumulator(&self) -> Bit {
        self.regs.acc
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == RpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == RpuState::Running
    }
}

impl Default for Rpu {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl std::fmt::Debug for Rpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Iterator returned by [`Rpu::run`].
#[derive(Debug)]
pub struct Run<'a> {
    rpu: &'a mut Rpu,
    remaining: u64,
    done: bool,
}

impl Iterator for Run<'_> {
    type Item = Result<TraceRecord, RpuError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        match self.rpu.step() {
            Ok(Step::Executed(record)) => Some(Ok(record)),
            Ok(Step::Halted) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Run<'_> {}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(RpuState),

    #[error("memory error: {0}")]
    MemoryError(#[from] MemoryError),
}
