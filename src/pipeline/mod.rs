//! Terminal session management.

pub mod terminal;

pub use terminal::{DEFAULT_WIDTH, TerminalSession, terminal_width};
