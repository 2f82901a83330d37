//! Debugger application state and logic.

use crate::{Rpu, Step};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::INSTRUCTION_WIDTH;
use std::collections::HashSet;

/// Bytes shown per memory view row.
pub const BYTES_PER_ROW: usize = 8;

/// Debugger application state.
pub struct DebuggerApp {
    /// The RPU being debugged.
    pub rpu: Rpu,
    /// Original image for reset.
    pub image: Vec<u8>,
    /// Breakpoints (by IP).
    pub breakpoints: HashSet<usize>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded image.
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            rpu: Rpu::new(&image),
            image,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        match self.rpu.step() {
            Ok(Step::Executed(record)) => {
                self.status = format!(
                    "IP={:04x}: {}  ACC={}",
                    record.ip,
                    record.instruction,
                    self.rpu.current_accumulator()
                );
            }
            Ok(Step::Halted) => {
                self.status = format!("Halted after {} cycles", self.rpu.cycles);
                self.running = false;
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        // Check for breakpoint
        let ip = self.rpu.current_ip();
        if self.breakpoints.contains(&ip) {
            self.running = false;
            self.status = format!("Breakpoint at IP={:04x}", ip);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current IP.
    pub fn toggle_breakpoint(&mut self) {
        let ip = self.rpu.current_ip();
        if self.breakpoints.remove(&ip) {
            self.status = format!("Removed breakpoint at IP={:04x}", ip);
        } else {
            self.breakpoints.insert(ip);
            self.status = format!("Set breakpoint at IP={:04x}", ip);
        }
    }

    /// Rebuild the RPU from the loaded image.
    pub fn reset(&mut self) {
        self.rpu = Rpu::new(&self.image);
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Scroll the memory view, clamped to the last row.
    pub fn scroll_memory(&mut self, delta: isize) {
        let max_row = self.rpu.mem.capacity().div_ceil(BYTES_PER_ROW).saturating_sub(1);
        self.mem_scroll = self.mem_scroll.saturating_add_signed(delta).min(max_row);
    }

    /// Get disassembly around current IP.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let ip = self.rpu.current_ip();
        let start = ip.saturating_sub((lines / 2) * INSTRUCTION_WIDTH);

        (0..lines)
            .map(|i| start + i * INSTRUCTION_WIDTH)
            .filter_map(|addr| {
                let word = self.rpu.mem.read_word(addr).ok()?;
                Some((addr, disassemble_instruction(word), addr == ip))
            })
            .collect()
    }

    /// Byte offset holding the last instruction's operand bit, if any.
    pub fn last_operand_byte(&self) -> Option<usize> {
        self.rpu.last_instruction().map(|i| usize::from(i.operand) / 8)
    }
}

/// Run the debugger with an image.
pub fn run_debugger(image: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create app
    let mut app = DebuggerApp::new(image);

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_memory(-1),
                        KeyCode::Down => app.scroll_memory(1),
                        KeyCode::PageUp => app.scroll_memory(-16),
                        KeyCode::PageDown => app.scroll_memory(16),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = DebuggerApp::new(vec![0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);
        app.step();
        app.toggle_breakpoint();
        assert!(app.breakpoints.contains(&2));

        app.run();
        app.tick();

        assert!(!app.running);
        assert_eq!(app.rpu.current_ip(), 2);
    }

    #[test]
    fn test_disassembly_window_is_aligned() {
        let mut app = DebuggerApp::new(vec![]);
        app.rpu.regs.ip = 10;

        let lines = app.get_disassembly(4);

        assert_eq!(lines.first().map(|l| l.0), Some(6));
        assert!(lines.iter().any(|(addr, _, current)| *addr == 10 && *current));
    }

    #[test]
    fn test_reset_restores_image() {
        let mut app = DebuggerApp::new(vec![0x80, 0x00]);
        app.rpu.mem.write_byte(0, 0).unwrap();
        app.reset();
        assert_eq!(app.rpu.mem.read_byte(0).unwrap(), 0x80);
    }
}
