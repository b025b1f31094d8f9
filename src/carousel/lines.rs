//! Line and word queries over a multiline buffer.
//!
//! All offsets are byte offsets kept on char boundaries. Columns are counted
//! in chars so vertical movement lines up across multi-byte text.

/// The logical line containing a cursor. Derived on demand, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo {
    /// The buffer split on `\n`.
    pub lines: Vec<String>,
    pub line_index: usize,
    pub line_text: String,
    /// Absolute offset of the first byte of the line.
    pub line_start: usize,
    /// Absolute offset just past the last byte of the line (before `\n`).
    pub line_end: usize,
    /// Char column of the cursor within the line.
    pub column: usize,
}

impl LineInfo {
    pub fn is_first_line(&self) -> bool {
        self.line_index == 0
    }

    pub fn is_last_line(&self) -> bool {
        self.line_index + 1 >= self.lines.len()
    }
}

/// The contiguous non-whitespace run touching a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordInfo {
    pub start: usize,
    pub end: usize,
    /// Text from `start` up to the cursor.
    pub prefix: String,
    /// Text from `start` to `end`.
    pub word: String,
}

/// Largest char boundary `<= pos`, clamped to the text length.
pub fn clamp_to_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Offset of the char before `pos`, or 0.
pub fn prev_char_boundary(text: &str, pos: usize) -> usize {
    let pos = clamp_to_char_boundary(text, pos);
    text[..pos]
        .chars()
        .next_back()
        .map_or(0, |c| pos - c.len_utf8())
}

/// Offset just past the char at `pos`, or the text length.
pub fn next_char_boundary(text: &str, pos: usize) -> usize {
    let pos = clamp_to_char_boundary(text, pos);
    text[pos..]
        .chars()
        .next()
        .map_or(text.len(), |c| pos + c.len_utf8())
}

/// Line information for `cursor` within `text`.
pub fn line_info_at(text: &str, cursor: usize) -> LineInfo {
    let cursor = clamp_to_char_boundary(text, cursor);
    let lines: Vec<String> = text.split('\n').map(str::to_string).collect();

    let mut line_start = 0;
    let mut line_index = 0;
    for (i, line) in lines.iter().enumerate() {
        let line_end = line_start + line.len();
        if cursor <= line_end || i + 1 == lines.len() {
            line_index = i;
            break;
        }
        line_start = line_end + 1;
    }

    let line_text = lines[line_index].clone();
    let line_end = line_start + line_text.len();
    let column = text[line_start..cursor].chars().count();

    LineInfo {
        lines,
        line_index,
        line_text,
        line_start,
        line_end,
        column,
    }
}

/// Offset of the `column`-th char of `line`, clamped to the line length.
pub fn offset_for_column(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map_or(line.len(), |(offset, _)| offset)
}

/// Word boundaries around `cursor` (whitespace-delimited).
pub fn word_info_at(text: &str, cursor: usize) -> WordInfo {
    let cursor = clamp_to_char_boundary(text, cursor);

    let mut start = cursor;
    while let Some(c) = text[..start].chars().next_back() {
        if c.is_whitespace() {
            break;
        }
        start -= c.len_utf8();
    }

    let mut end = cursor;
    while let Some(c) = text[end..].chars().next() {
        if c.is_whitespace() {
            break;
        }
        end += c.len_utf8();
    }

    WordInfo {
        start,
        end,
        prefix: text[start..cursor].to_string(),
        word: text[start..end].to_string(),
    }
}

/// Skip whitespace, then the non-whitespace run, moving left.
pub fn word_left(text: &str, cursor: usize) -> usize {
    let mut pos = clamp_to_char_boundary(text, cursor);
    while let Some(c) = text[..pos].chars().next_back().filter(|c| c.is_whitespace()) {
        pos -= c.len_utf8();
    }
    while let Some(c) = text[..pos].chars().next_back().filter(|c| !c.is_whitespace()) {
        pos -= c.len_utf8();
    }
    pos
}

/// Skip whitespace, then the non-whitespace run, moving right.
pub fn word_right(text: &str, cursor: usize) -> usize {
    let mut pos = clamp_to_char_boundary(text, cursor);
    while let Some(c) = text[pos..].chars().next().filter(|c| c.is_whitespace()) {
        pos += c.len_utf8();
    }
    while let Some(c) = text[pos..].chars().next().filter(|c| !c.is_whitespace()) {
        pos += c.len_utf8();
    }
    pos
}
