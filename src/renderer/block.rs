//! Inline block renderer.
//!
//! Owns a fixed region at the bottom of the normal scrollback. Each render
//! moves back to the top of the previous block, clears downward and writes the
//! new lines. The renderer tracks where the real cursor sits relative to the
//! top of the block so the next repaint knows how far to climb.

use std::io::{self, Write};

use super::ansi;
use super::output::OutputBuffer;
use crate::text_measure::display_width;

/// Line separator. Raw mode disables output post-processing, so a bare
/// `\n` would not return to column 0.
pub const NEWLINE: &str = "\r\n";

/// Repaints a block of lines and positions the cursor inside it.
pub struct BlockRenderer<W: Write> {
    out: W,
    output: OutputBuffer,
    active_rows: usize,
    /// Display width of each line of the current block.
    line_widths: Vec<usize>,
    cursor_row: usize,
    cursor_col: usize,
    writes_disabled: bool,
}

impl<W: Write> BlockRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            output: OutputBuffer::new(),
            active_rows: 0,
            line_widths: Vec::new(),
            cursor_row: 0,
            cursor_col: 0,
            writes_disabled: false,
        }
    }

    // =========================================================================
    // Write suppression
    // =========================================================================

    /// Drop all output until [`enable_writes`](Self::enable_writes).
    ///
    /// Tracking is left untouched.
    pub fn disable_writes(&mut self) {
        self.writes_disabled = true;
    }

    pub fn enable_writes(&mut self) {
        self.writes_disabled = false;
    }

    pub fn writes_enabled(&self) -> bool {
        !self.writes_disabled
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Replace the previous block with `lines`.
    ///
    /// With a target row or column the cursor is moved there afterwards,
    /// clamped into the block and to the end of the target line. Otherwise it stays after the last line.
    pub fn render_block(
        &mut self,
        lines: &[String],
        cursor_row: Option<usize>,
        cursor_col: Option<usize>,
    ) -> io::Result<()> {
        if self.writes_disabled {
            return Ok(());
        }

        self.move_to_top_of_block()?;
        if self.active_rows > 0 {
            ansi::erase_down(&mut self.output)?;
        }

        for (i, line) in lines.iter().enumerate() {
            self.output.write_str(line);
            if i + 1 < lines.len() {
                self.output.write_str(NEWLINE);
            }
        }

        self.active_rows = lines.len();
        self.line_widths = lines.iter().map(|l| display_width(l)).collect();
        self.cursor_row = self.active_rows.saturating_sub(1);
        self.cursor_col = self.line_widths.last().copied().unwrap_or(0);

        if cursor_row.is_some() || cursor_col.is_some() {
            let row = cursor_row.unwrap_or(self.cursor_row);
            let col = cursor_col.unwrap_or(self.cursor_col);
            self.queue_move(row, col)?;
        }

        self.output.flush_to(&mut self.out)
    }

    /// Move from the tracked position to `(row, col)` of the current block.
    pub fn move_cursor_to(&mut self, row: usize, col: usize) -> io::Result<()> {
        if self.writes_disabled || self.active_rows == 0 {
            return Ok(());
        }
        self.queue_move(row, col)?;
        self.output.flush_to(&mut self.out)
    }

    fn queue_move(&mut self, row: usize, col: usize) -> io::Result<()> {
        let row = row.min(self.active_rows.saturating_sub(1));
        let col = col.min(self.line_widths.get(row).copied().unwrap_or(0));
        if row < self.cursor_row {
            ansi::cursor_up(&mut self.output, self.cursor_row - row)?;
        } else {
            ansi::cursor_down(&mut self.output, row - self.cursor_row)?;
        }
        ansi::cursor_to_column(&mut self.output, col)?;
        self.cursor_row = row;
        self.cursor_col = col;
        Ok(())
    }

    fn move_to_top_of_block(&mut self) -> io::Result<()> {
        if self.active_rows == 0 {
            return Ok(());
        }
        ansi::cursor_column_zero(&mut self.output)?;
        ansi::cursor_up(&mut self.output, self.cursor_row)?;
        self.cursor_row = 0;
        self.cursor_col = 0;
        Ok(())
    }

    /// Forget the block after something else wrote to the terminal.
    pub fn reset_block_tracking(&mut self) {
        self.active_rows = 0;
        self.line_widths.clear();
        self.cursor_row = 0;
        self.cursor_col = 0;
    }

    // =========================================================================
    // Out-of-band output
    // =========================================================================

    /// Write text outside the block. Callers usually follow with
    /// [`reset_block_tracking`](Self::reset_block_tracking).
    pub fn write_text(&mut self, text: &str) -> io::Result<()> {
        if self.writes_disabled {
            return Ok(());
        }
        self.output.write_str(text);
        self.output.flush_to(&mut self.out)
    }

    /// Restore normal cursor-key mode after a child process.
    pub fn reset(&mut self) -> io::Result<()> {
        self.emit(ansi::normal_cursor_keys)
    }

    pub fn show_cursor(&mut self) -> io::Result<()> {
        self.emit(ansi::cursor_show)
    }

    fn emit(&mut self, seq: fn(&mut OutputBuffer) -> io::Result<()>) -> io::Result<()> {
        if self.writes_disabled {
            return Ok(());
        }
        seq(&mut self.output)?;
        self.output.flush_to(&mut self.out)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn active_rows(&self) -> usize {
        self.active_rows
    }

    /// Tracked `(row, col)` of the real cursor within the block.
    pub fn cursor_position(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_col)
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn take(r: &mut BlockRenderer<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(r.writer_mut())).unwrap()
    }

    #[test]
    fn test_first_render_writes_lines_only() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["a", "bc", "def"]), None, None).unwrap();
        assert_eq!(take(&mut r), "a\r\nbc\r\ndef");
        assert_eq!(r.active_rows(), 3);
        assert_eq!(r.cursor_position(), (2, 3));
    }

    #[test]
    fn test_rerender_climbs_and_clears() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["a", "b", "c"]), None, None).unwrap();
        take(&mut r);

        r.render_block(&lines(&["x", "y"]), None, None).unwrap();
        assert_eq!(take(&mut r), "\x1b[G\x1b[2A\x1b[Jx\r\ny");
        assert_eq!(r.active_rows(), 2);
    }

    #[test]
    fn test_cursor_target_after_render() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["top", "$> ls", "bottom"]), Some(1), Some(5))
            .unwrap();
        assert_eq!(take(&mut r), "top\r\n$> ls\r\nbottom\x1b[1A\x1b[6G");
        assert_eq!(r.cursor_position(), (1, 5));

        // Climbing starts from the tracked row, not the last line.
        r.render_block(&lines(&["only"]), None, None).unwrap();
        assert_eq!(take(&mut r), "\x1b[G\x1b[1A\x1b[Jonly");
    }

    #[test]
    fn test_cursor_target_is_clamped() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["a", "b"]), Some(9), None).unwrap();
        assert_eq!(r.cursor_position(), (1, 1));
        assert_eq!(take(&mut r), "a\r\nb\x1b[2G");
    }

    #[test]
    fn test_move_cursor_to_emits_only_deltas() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["abcdef", "b", "cde"]), None, None).unwrap();
        take(&mut r);

        r.move_cursor_to(0, 4).unwrap();
        assert_eq!(take(&mut r), "\x1b[2A\x1b[5G");
        r.move_cursor_to(2, 0).unwrap();
        assert_eq!(take(&mut r), "\x1b[2B\x1b[1G");
        r.move_cursor_to(2, 3).unwrap();
        assert_eq!(take(&mut r), "\x1b[4G");
    }

    #[test]
    fn test_move_without_block_is_noop() {
        let mut r = BlockRenderer::new(Vec::new());
        r.move_cursor_to(3, 3).unwrap();
        assert!(take(&mut r).is_empty());
    }

    #[test]
    fn test_disabled_writes_keep_tracking() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["a", "b"]), Some(0), Some(0)).unwrap();
        take(&mut r);

        r.disable_writes();
        r.render_block(&lines(&["x", "y", "z"]), None, None).unwrap();
        r.write_text("noise").unwrap();
        r.reset().unwrap();
        assert!(take(&mut r).is_empty());
        assert_eq!(r.active_rows(), 2);
        assert_eq!(r.cursor_position(), (0, 0));

        r.enable_writes();
        r.reset().unwrap();
        assert_eq!(take(&mut r), "\x1b[?1l");
    }

    #[test]
    fn test_reset_block_tracking_skips_erase() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["a", "b"]), None, None).unwrap();
        r.write_text(NEWLINE).unwrap();
        r.reset_block_tracking();
        take(&mut r);

        r.render_block(&lines(&["c"]), None, None).unwrap();
        assert_eq!(take(&mut r), "c");
    }

    #[test]
    fn test_tracked_column_ignores_color() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["\x1b[2mab界\x1b[0m"]), None, None).unwrap();
        assert_eq!(r.cursor_position(), (0, 4));
    }

    #[test]
    fn test_cursor_column_is_clamped_to_line() {
        let mut r = BlockRenderer::new(Vec::new());
        r.render_block(&lines(&["\x1b[2mH> ls\x1b[0m", "$> abc"]), Some(0), Some(40))
            .unwrap();
        assert_eq!(r.cursor_position(), (0, 5));
        assert!(take(&mut r).ends_with("\x1b[1A\x1b[6G"));

        r.move_cursor_to(1, 99).unwrap();
        assert_eq!(take(&mut r), "\x1b[1B\x1b[7G");
        assert_eq!(r.cursor_position(), (1, 6));
    }
}
