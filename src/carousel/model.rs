//! The input model: edit buffer, cursor and the signed selection index.
//!
//! Rows are addressed by one signed index:
//!
//! ```text
//!   +2   top.latest()[1]
//!   +1   top.latest()[0]
//!    0   input buffer (editable prompt)
//!   -1   bottom.latest()[0]
//!   -2   bottom.latest()[1]
//! ```
//!
//! Suggestion rows are read-only. An edit while one is selected first
//! *adopts* it: its text is copied into the buffer and the selection returns
//! to 0. The cursor is a byte offset into the active row and always sits on a
//! char boundary.

use std::sync::Arc;

use super::lines::{
    LineInfo, WordInfo, clamp_to_char_boundary, line_info_at, next_char_boundary,
    offset_for_column, prev_char_boundary, word_info_at, word_left, word_right,
};
use super::suggester::{RenderNotifier, SuggestionQuery, Suggester};

/// Row counts of the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselConfig {
    pub top_row_count: usize,
    pub bottom_row_count: usize,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            top_row_count: 2,
            bottom_row_count: 2,
        }
    }
}

pub struct Carousel {
    input_buffer: String,
    cursor_index: usize,
    selection_index: isize,
    top: Arc<dyn Suggester>,
    bottom: Arc<dyn Suggester>,
    /// Every source ever attached, consulted for AI context.
    suggesters: Vec<Arc<dyn Suggester>>,
    top_row_count: usize,
    bottom_row_count: usize,
    notifier: RenderNotifier,
}

impl Carousel {
    pub fn new(config: CarouselConfig, top: Arc<dyn Suggester>, bottom: Arc<dyn Suggester>) -> Self {
        Self {
            input_buffer: String::new(),
            cursor_index: 0,
            selection_index: 0,
            suggesters: vec![top.clone(), bottom.clone()],
            top,
            bottom,
            top_row_count: config.top_row_count,
            bottom_row_count: config.bottom_row_count,
            notifier: RenderNotifier::detached(),
        }
    }

    /// Where refreshed sources send their repaint requests.
    pub fn set_notifier(&mut self, notifier: RenderNotifier) {
        self.notifier = notifier;
    }

    /// Attach a source that contributes AI context without being displayed.
    pub fn register(&mut self, suggester: Arc<dyn Suggester>) {
        if !self.suggesters.iter().any(|s| Arc::ptr_eq(s, &suggester)) {
            self.suggesters.push(suggester);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor_index
    }

    pub fn selection_index(&self) -> isize {
        self.selection_index
    }

    pub fn top_row_count(&self) -> usize {
        self.top_row_count
    }

    pub fn bottom_row_count(&self) -> usize {
        self.bottom_row_count
    }

    pub fn top(&self) -> &Arc<dyn Suggester> {
        &self.top
    }

    pub fn bottom(&self) -> &Arc<dyn Suggester> {
        &self.bottom
    }

    /// Every attached source, displayed or not.
    pub fn suggesters(&self) -> &[Arc<dyn Suggester>] {
        &self.suggesters
    }

    /// Source that owns virtual row `index`, or `None` for the prompt.
    pub fn source_for_row(&self, index: isize) -> Option<&Arc<dyn Suggester>> {
        match index {
            0 => None,
            i if i > 0 => Some(&self.top),
            _ => Some(&self.bottom),
        }
    }

    /// Text of virtual row `index`; empty when out of range.
    pub fn get_row(&self, index: isize) -> String {
        match index {
            0 => self.input_buffer.clone(),
            i if i > 0 => self
                .top
                .latest()
                .into_iter()
                .nth((i - 1) as usize)
                .unwrap_or_default(),
            i => self
                .bottom
                .latest()
                .into_iter()
                .nth((-i - 1) as usize)
                .unwrap_or_default(),
        }
    }

    pub fn current_row(&self) -> String {
        self.get_row(self.selection_index)
    }

    /// Cursor clamped into the active row.
    fn cursor_in(&self, row: &str) -> usize {
        clamp_to_char_boundary(row, self.cursor_index)
    }

    // =========================================================================
    // Adoption
    // =========================================================================

    /// Copy the selected suggestion into the buffer. No-op on the prompt.
    pub fn adopt(&mut self) {
        if self.selection_index == 0 {
            return;
        }
        let row = self.current_row();
        self.cursor_index = clamp_to_char_boundary(&row, self.cursor_index);
        self.input_buffer = row;
        self.selection_index = 0;
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn insert_at_cursor(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.adopt();
        let at = self.cursor_in(&self.input_buffer);
        self.input_buffer.insert_str(at, text);
        self.cursor_index = at + text.len();
    }

    pub fn delete_before_cursor(&mut self) {
        self.adopt();
        let at = self.cursor_in(&self.input_buffer);
        if at == 0 {
            return;
        }
        let start = prev_char_boundary(&self.input_buffer, at);
        self.input_buffer.replace_range(start..at, "");
        self.cursor_index = start;
    }

    pub fn delete_at_cursor(&mut self) {
        self.adopt();
        let at = self.cursor_in(&self.input_buffer);
        if at >= self.input_buffer.len() {
            return;
        }
        let end = next_char_boundary(&self.input_buffer, at);
        self.input_buffer.replace_range(at..end, "");
        self.cursor_index = at;
    }

    /// Ctrl-U: remove from the start of the current logical line to the cursor.
    pub fn delete_to_line_start(&mut self) {
        self.adopt();
        let at = self.cursor_in(&self.input_buffer);
        let info = line_info_at(&self.input_buffer, at);
        if info.line_start == at {
            return;
        }
        self.input_buffer.replace_range(info.line_start..at, "");
        self.cursor_index = info.line_start;
    }

    /// Replace the word touching the cursor and put the cursor after it.
    pub fn replace_word_at_cursor(&mut self, replacement: &str) {
        self.adopt();
        let info = self.word_info_at_cursor();
        self.input_buffer
            .replace_range(info.start..info.end, replacement);
        self.cursor_index = info.start + replacement.len();
    }

    /// Adopt, then empty the buffer and return to the prompt.
    pub fn clear_input(&mut self) {
        self.adopt();
        self.input_buffer.clear();
        self.cursor_index = 0;
        self.selection_index = 0;
    }

    // =========================================================================
    // Cursor movement
    // =========================================================================

    /// One char left within the active row. Does not adopt.
    pub fn move_cursor_left(&mut self) {
        let row = self.current_row();
        self.cursor_index = prev_char_boundary(&row, self.cursor_index);
    }

    /// One char right within the active row. Does not adopt.
    pub fn move_cursor_right(&mut self) {
        let row = self.current_row();
        self.cursor_index = next_char_boundary(&row, self.cursor_index);
    }

    pub fn move_cursor_word_left(&mut self) {
        self.adopt();
        self.cursor_index = word_left(&self.input_buffer, self.cursor_index);
    }

    pub fn move_cursor_word_right(&mut self) {
        self.adopt();
        self.cursor_index = word_right(&self.input_buffer, self.cursor_index);
    }

    /// Start of the current logical line.
    pub fn move_cursor_home(&mut self) {
        self.adopt();
        self.cursor_index = self.input_line_info_at_cursor().line_start;
    }

    /// End of the current logical line.
    pub fn move_cursor_end(&mut self) {
        self.adopt();
        self.cursor_index = self.input_line_info_at_cursor().line_end;
    }

    pub fn should_up_move_multiline_cursor(&self) -> bool {
        self.selection_index == 0 && !self.input_line_info_at_cursor().is_first_line()
    }

    pub fn should_down_move_multiline_cursor(&self) -> bool {
        self.selection_index == 0 && !self.input_line_info_at_cursor().is_last_line()
    }

    /// Same column on the previous logical line. Returns whether it moved.
    pub fn move_multiline_cursor_up(&mut self) -> bool {
        if !self.should_up_move_multiline_cursor() {
            return false;
        }
        let info = self.input_line_info_at_cursor();
        let target = &info.lines[info.line_index - 1];
        let target_start = info.line_start - target.len() - 1;
        self.cursor_index = target_start + offset_for_column(target, info.column);
        true
    }

    /// Same column on the next logical line. Returns whether it moved.
    pub fn move_multiline_cursor_down(&mut self) -> bool {
        if !self.should_down_move_multiline_cursor() {
            return false;
        }
        let info = self.input_line_info_at_cursor();
        let target = &info.lines[info.line_index + 1];
        let target_start = info.line_end + 1;
        self.cursor_index = target_start + offset_for_column(target, info.column);
        true
    }

    // =========================================================================
    // Carousel navigation
    // =========================================================================

    /// Toward the top source.
    pub fn up(&mut self) {
        let top_len = self.top.latest().len() as isize;
        if self.selection_index < top_len {
            self.select(self.selection_index + 1);
        }
    }

    /// Toward the bottom source.
    pub fn down(&mut self) {
        let bottom_len = self.bottom.latest().len() as isize;
        if self.selection_index > -bottom_len {
            self.select(self.selection_index - 1);
        }
    }

    /// Change the active row, keeping the cursor inside it. A cursor at the
    /// end of the old row stays at the end of the new one.
    fn select(&mut self, index: isize) {
        let old = self.current_row();
        let at_end = self.cursor_index >= old.len();
        self.selection_index = index;
        let new = self.current_row();
        self.cursor_index = if at_end {
            new.len()
        } else {
            clamp_to_char_boundary(&new, self.cursor_index)
        };
    }

    /// Pull the selection back into `[-bottom_len, top_len]` after the
    /// snapshots changed.
    pub fn clamp_selection(&mut self) {
        let top_len = self.top.latest().len() as isize;
        let bottom_len = self.bottom.latest().len() as isize;
        let clamped = self.selection_index.clamp(-bottom_len, top_len);
        if clamped != self.selection_index {
            self.selection_index = clamped;
        }
        let row = self.current_row();
        self.cursor_index = clamp_to_char_boundary(&row, self.cursor_index);
    }

    /// Hot-swap the top source.
    pub fn set_top_suggester(&mut self, next: Arc<dyn Suggester>) {
        self.register(next.clone());
        self.top = next;
        if self.selection_index > 0 {
            self.clamp_selection();
        }
    }

    // =========================================================================
    // Suggestions
    // =========================================================================

    /// Snapshot of the state sources refresh against.
    pub fn query(&self) -> SuggestionQuery {
        let current_row = self.current_row();
        let cursor = self.cursor_in(&current_row);
        SuggestionQuery {
            word: word_info_at(&current_row, cursor),
            context: self
                .suggesters
                .iter()
                .map(|s| s.description_for_ai())
                .filter(|d| !d.is_empty())
                .collect(),
            current_row,
            cursor,
        }
    }

    /// Start a refresh of both visible sources without waiting for either.
    ///
    /// Needs a tokio runtime; without one this only logs.
    pub fn update_suggestions(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, skipping suggestion refresh");
            return;
        };
        let query = self.query();
        for (source, rows) in [
            (self.top.clone(), self.top_row_count),
            (self.bottom.clone(), self.bottom_row_count),
        ] {
            let ticket = source.begin_refresh();
            let query = query.clone();
            let notifier = self.notifier.clone();
            handle.spawn(async move {
                source.refresh_suggestions(ticket, query, rows, notifier).await;
            });
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn word_info_at_cursor(&self) -> WordInfo {
        word_info_at(&self.input_buffer, self.cursor_index)
    }

    pub fn input_line_info_at_cursor(&self) -> LineInfo {
        line_info_at(&self.input_buffer, self.cursor_index)
    }
}
