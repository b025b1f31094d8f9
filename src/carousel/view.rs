//! Row virtualization and formatting.
//!
//! The window always shows `top_row_count + 1 + bottom_row_count` virtual
//! rows centered on the selection, except that row 0 expands into every
//! line of the prompt.

use super::lines::{clamp_to_char_boundary, line_info_at};
use super::model::Carousel;
use crate::renderer::ansi::{BRIGHT_WHITE, DIM, RESET};
use crate::text_measure::{display_width, truncate_to_width};

pub const PROMPT_MARKER: &str = "$> ";
pub const CONTINUATION_MARKER: &str = " > ";
pub const SELECTED_MARKER: &str = "=> ";
/// Shown for an empty suggestion slot: nothing more in that direction.
pub const EMPTY_MARKER: &str = "---";

/// Formatted lines plus where the cursor belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    pub lines: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
}

/// Lay out the carousel for a terminal `width` columns wide.
pub fn render_rows(carousel: &Carousel, width: usize) -> RenderedBlock {
    let selection = carousel.selection_index();
    let top = carousel.top_row_count() as isize;
    let bottom = carousel.bottom_row_count() as isize;
    let max_width = width.saturating_sub(1);

    let mut lines = Vec::new();
    let mut cursor_row = 0;
    let mut cursor_col = 0;

    let first = selection + top;
    let last = selection - bottom;
    for index in (last..=first).rev() {
        if index == 0 {
            let buffer = carousel.input_buffer();
            let color = if selection == 0 { BRIGHT_WHITE } else { DIM };
            let info = line_info_at(buffer, carousel.cursor_index());
            for (i, text) in info.lines.iter().enumerate() {
                let marker = if i == 0 { PROMPT_MARKER } else { CONTINUATION_MARKER };
                if selection == 0 && i == info.line_index {
                    let before = &buffer[info.line_start..carousel.cursor_index().max(info.line_start)];
                    cursor_row = lines.len();
                    cursor_col = display_width(marker) + display_width(before);
                }
                lines.push(styled(color, marker, text, max_width));
            }
            continue;
        }

        let text = carousel.get_row(index).replace('\n', " ");
        if index == selection {
            let cursor = clamp_to_char_boundary(&text, carousel.cursor_index());
            cursor_row = lines.len();
            cursor_col = display_width(SELECTED_MARKER) + display_width(&text[..cursor]);
            lines.push(styled(BRIGHT_WHITE, SELECTED_MARKER, &text, max_width));
        } else if text.is_empty() {
            lines.push(styled(DIM, EMPTY_MARKER, "", max_width));
        } else {
            let marker = carousel
                .source_for_row(index)
                .map(|s| format!("{} ", s.prefix()))
                .unwrap_or_default();
            lines.push(styled(DIM, &marker, &text, max_width));
        }
    }

    RenderedBlock {
        lines,
        cursor_row,
        cursor_col,
    }
}

fn styled(color: &str, marker: &str, text: &str, max_width: usize) -> String {
    let body = truncate_to_width(&format!("{color}{marker}{text}"), max_width);
    format!("{body}{RESET}")
}
