//! ANSI escape sequences used by the block renderer.
//!
//! Only relative cursor movement is used: the block lives in the normal
//! scrollback, so absolute rows are unknown.

use std::io::Write;

// =============================================================================
// Constants
// =============================================================================

/// Bright white foreground (selected row, active prompt).
pub const BRIGHT_WHITE: &str = "\x1b[97m";

/// Dim/faint text (inactive rows).
pub const DIM: &str = "\x1b[2m";

/// Yellow foreground (echoed commands).
pub const YELLOW: &str = "\x1b[33m";

/// Reset all attributes.
pub const RESET: &str = "\x1b[0m";

// =============================================================================
// Cursor Movement
// =============================================================================

/// Move cursor up by n rows.
#[inline]
pub fn cursor_up<W: Write>(w: &mut W, n: usize) -> std::io::Result<()> {
    if n > 0 {
        write!(w, "\x1b[{}A", n)
    } else {
        Ok(())
    }
}

/// Move cursor down by n rows.
#[inline]
pub fn cursor_down<W: Write>(w: &mut W, n: usize) -> std::io::Result<()> {
    if n > 0 {
        write!(w, "\x1b[{}B", n)
    } else {
        Ok(())
    }
}

/// Move cursor to a 0-indexed column on the current row.
#[inline]
pub fn cursor_to_column<W: Write>(w: &mut W, col: usize) -> std::io::Result<()> {
    write!(w, "\x1b[{}G", col + 1)
}

/// Move cursor to beginning of line.
#[inline]
pub fn cursor_column_zero<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[G")
}

/// Show cursor.
#[inline]
pub fn cursor_show<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?25h")
}

/// Back to normal cursor-key mode (DECCKM off).
///
/// Full-screen programs switch to application mode, after which arrows
/// arrive as `ESC O A` instead of `ESC [ A`.
#[inline]
pub fn normal_cursor_keys<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?1l")
}

// =============================================================================
// Erasing
// =============================================================================

/// Erase from cursor to end of screen.
#[inline]
pub fn erase_down<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[J")
}

// =============================================================================
// Tests
// =============================================================================
