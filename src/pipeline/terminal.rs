//! Terminal mode handle.
//!
//! Raw mode is process-wide state. It is owned by one [`TerminalSession`]
//! value so that entering, suspending and restoring are explicit and the
//! terminal is put back on drop, including on early returns and panics.

use std::io::{self, IsTerminal};

use crossterm::terminal;

/// Fallback width when the terminal size is unknown (pipes, tests).
pub const DEFAULT_WIDTH: usize = 80;

/// Owned raw-mode state of the controlling terminal.
#[derive(Debug)]
pub struct TerminalSession {
    is_tty: bool,
    is_raw: bool,
}

impl TerminalSession {
    /// Put stdin into raw mode. Without a TTY this is a no-op session.
    pub fn enter() -> io::Result<Self> {
        let mut session = Self {
            is_tty: io::stdin().is_terminal(),
            is_raw: false,
        };
        session.resume()?;
        Ok(session)
    }

    /// Hand the terminal back in cooked mode (for a child process).
    pub fn suspend(&mut self) -> io::Result<()> {
        if self.is_raw {
            terminal::disable_raw_mode()?;
            self.is_raw = false;
        }
        Ok(())
    }

    /// Re-enter raw mode after [`suspend`](Self::suspend).
    pub fn resume(&mut self) -> io::Result<()> {
        if self.is_tty && !self.is_raw {
            terminal::enable_raw_mode()?;
            self.is_raw = true;
        }
        Ok(())
    }

    pub fn is_raw(&self) -> bool {
        self.is_raw
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Current width in columns.
    pub fn width(&self) -> usize {
        terminal_width()
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Err(err) = self.suspend() {
            tracing::warn!(%err, "failed to restore terminal mode");
        }
    }
}

/// Width of the controlling terminal, or [`DEFAULT_WIDTH`].
pub fn terminal_width() -> usize {
    match terminal::size() {
        Ok((cols, _)) if cols > 0 => cols as usize,
        _ => DEFAULT_WIDTH,
    }
}
