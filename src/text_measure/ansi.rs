//! ANSI escape sequence tokenizing.
//!
//! Splits a string into escape sequences and printable runs. Handles:
//! - CSI sequences: `ESC [` ... final byte (0x40-0x7E)
//! - OSC sequences: `ESC ]` ... BEL (0x07) or ST (ESC \)
//! - DCS/PM/APC sequences: `ESC P`/`ESC ^`/`ESC _` ... ST
//! - Two-character sequences: `ESC` + single char

use std::borrow::Cow;

/// One token of a string that may contain escape sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiSegment<'a> {
    /// A complete (or unterminated trailing) escape sequence.
    Escape(&'a str),
    /// Printable text with no ESC byte in it.
    Text(&'a str),
}

/// Iterator over the [`AnsiSegment`]s of a string.
pub struct AnsiSegments<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> AnsiSegments<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }
}

impl<'a> Iterator for AnsiSegments<'a> {
    type Item = AnsiSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.s.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        if bytes[start] == 0x1B {
            self.pos = skip_escape_sequence(bytes, start);
            // ESC and every terminator byte are ASCII, so `pos` is a char boundary.
            return Some(AnsiSegment::Escape(&self.s[start..self.pos]));
        }

        let mut end = start;
        while end < bytes.len() && bytes[end] != 0x1B {
            end += 1;
        }
        self.pos = end;
        Some(AnsiSegment::Text(&self.s[start..end]))
    }
}

/// Strip ANSI escape sequences from a string.
///
/// Returns `Cow::Borrowed` when no escape sequences are present.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.as_bytes().contains(&0x1B) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    for segment in AnsiSegments::new(s) {
        if let AnsiSegment::Text(text) = segment {
            result.push_str(text);
        }
    }
    Cow::Owned(result)
}

/// Byte index just past the escape sequence starting at `pos` (an ESC byte).
fn skip_escape_sequence(bytes: &[u8], pos: usize) -> usize {
    let next = pos + 1;
    if next >= bytes.len() {
        return bytes.len();
    }

    match bytes[next] {
        b'[' => skip_csi(bytes, next + 1),
        b']' | b'P' | b'^' | b'_' => skip_string_terminated(bytes, next + 1),
        b if b.is_ascii() => next + 1,
        // ESC followed by a multi-byte char: only the ESC is the sequence.
        _ => next,
    }
}

/// Skip parameter/intermediate bytes up to and including the final byte.
fn skip_csi(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() {
        let b = bytes[i];
        if (0x40..=0x7E).contains(&b) {
            return i + 1;
        }
        if !(0x20..=0x7E).contains(&b) {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// Skip until BEL or ST (`ESC \`).
fn skip_string_terminated(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            0x07 => return i + 1,
            0x1B if i + 1 < bytes.len() && bytes[i + 1] == b'\\' => return i + 2,
            _ => i += 1,
        }
    }
    bytes.len()
}
