//! Incremental key decoder.
//!
//! Accumulates input and resolves it against [`KEYMAP`](super::keymap::KEYMAP):
//!
//! 1. While the buffer is a strict prefix of a longer entry, wait.
//! 2. Exact match of the whole buffer → emit and consume.
//! 3. Longest entry the buffer starts with → emit and consume that entry.
//! 4. Otherwise the leading char is not part of any sequence: drop it if it is
//!    a control character (other than Tab), else emit it as `char`.
//!
//! A genuine ESC press is indistinguishable from the start of a sequence until
//! more input arrives, so the caller invokes [`KeyDecoder::flush_pending`] once
//! input has been idle for [`ESCAPE_TIMEOUT`].

use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::Duration;

use super::keymap::{KeyEvent, is_strict_prefix, longest_prefix_match, lookup};

/// Idle time after which a pending prefix is resolved as-is.
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(10);

// =============================================================================
// Decoder
// =============================================================================

/// Byte stream → [`KeyEvent`] state machine.
#[derive(Debug)]
pub struct KeyDecoder {
    buf: String,
    /// Incomplete UTF-8 bytes carried over to the next chunk.
    utf8_tail: Vec<u8>,
    capturing: bool,
}

impl KeyDecoder {
    /// A decoder with capture enabled.
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(32),
            utf8_tail: Vec::with_capacity(4),
            capturing: true,
        }
    }

    /// Resume decoding. Calling this while already capturing is a no-op.
    pub fn enable_capture(&mut self) {
        self.capturing = true;
    }

    /// Stop decoding and forget any partially received sequence.
    pub fn disable_capture(&mut self) {
        self.capturing = false;
        self.buf.clear();
        self.utf8_tail.clear();
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// True when a prefix is waiting for more input.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty() || !self.utf8_tail.is_empty()
    }

    /// Feed raw bytes, returning every event that became unambiguous.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        if !self.capturing || bytes.is_empty() {
            return Vec::new();
        }
        self.decode_utf8(bytes);
        self.drain(true)
    }

    /// Feed already-decoded text.
    pub fn feed_str(&mut self, text: &str) -> Vec<KeyEvent> {
        self.feed(text.as_bytes())
    }

    /// Resolve whatever is buffered without waiting for more input.
    pub fn flush_pending(&mut self) -> Vec<KeyEvent> {
        if !self.capturing {
            return Vec::new();
        }
        self.utf8_tail.clear();
        self.drain(false)
    }

    fn decode_utf8(&mut self, bytes: &[u8]) {
        let mut pending = std::mem::take(&mut self.utf8_tail);
        pending.extend_from_slice(bytes);

        let mut rest: &[u8] = &pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buf.push_str(text);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&rest[..valid]) {
                        self.buf.push_str(text);
                    }
                    match err.error_len() {
                        // Invalid bytes are dropped.
                        Some(bad) => rest = &rest[valid + bad..],
                        // Truncated char: keep for the next chunk.
                        None => {
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }
        self.utf8_tail = rest.to_vec();
    }

    fn drain(&mut self, wait_for_more: bool) -> Vec<KeyEvent> {
        let mut events = Vec::new();

        while !self.buf.is_empty() {
            if wait_for_more && is_strict_prefix(&self.buf) {
                break;
            }

            let (consumed, event) = if let Some((name, modifiers)) = lookup(&self.buf) {
                let seq = self.buf.clone();
                (seq.len(), Some(KeyEvent::new(name, seq, modifiers)))
            } else if let Some((seq, name, modifiers)) = longest_prefix_match(&self.buf) {
                (seq.len(), Some(KeyEvent::new(name, seq, modifiers)))
            } else {
                let Some(c) = self.buf.chars().next() else {
                    break;
                };
                let event = if (c as u32) < 0x20 && c != '\t' {
                    None
                } else {
                    Some(KeyEvent::char(c))
                };
                (c.len_utf8(), event)
            };

            self.buf.drain(..consumed);
            if let Some(event) = event {
                if !event.name.is_swallowed() {
                    events.push(event);
                }
            }
        }

        events
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Lazy event stream
// =============================================================================

/// Unbounded iterator of key events decoded from a reader.
///
/// End of input flushes any pending prefix before the iterator ends.
pub struct Keys<R> {
    reader: R,
    decoder: KeyDecoder,
    queue: VecDeque<KeyEvent>,
    done: bool,
}

impl<R: Read> Keys<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: KeyDecoder::new(),
            queue: VecDeque::new(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for Keys<R> {
    type Item = io::Result<KeyEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.done = true;
                    self.queue.extend(self.decoder.flush_pending());
                }
                Ok(n) => self.queue.extend(self.decoder.feed(&chunk[..n])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keymap::{KEYMAP, KeyName, Modifiers};

    fn names(events: &[KeyEvent]) -> Vec<KeyName> {
        events.iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_printable_text_is_char_events() {
        let mut decoder = KeyDecoder::new();
        let events = decoder.feed(b"ls -la");
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.name == KeyName::Char));
        let text: String = events.iter().map(|e| e.sequence.as_str()).collect();
        assert_eq!(text, "ls -la");
    }

    #[test]
    fn test_every_entry_emits_only_on_final_byte() {
        for &(seq, name, modifiers) in KEYMAP {
            if seq == "\x1b" {
                continue;
            }
            let mut decoder = KeyDecoder::new();
            let bytes = seq.as_bytes();
            for (i, byte) in bytes.iter().enumerate() {
                let events = decoder.feed(std::slice::from_ref(byte));
                if i + 1 < bytes.len() {
                    assert!(events.is_empty(), "{seq:?} emitted early at byte {i}");
                } else if name.is_swallowed() {
                    assert!(events.is_empty(), "{seq:?} should be swallowed");
                } else {
                    assert_eq!(events, vec![KeyEvent::new(name, seq, modifiers)]);
                }
            }
            assert!(!decoder.has_pending());
        }
    }

    #[test]
    fn test_arrow_up_byte_by_byte() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.feed(b"\x1b").is_empty());
        assert!(decoder.feed(b"[").is_empty());
        let events = decoder.feed(b"A");
        assert_eq!(names(&events), vec![KeyName::Up]);
        assert_eq!(events[0].sequence, "\x1b[A");
    }

    #[test]
    fn test_bare_escape_waits_then_flushes() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.feed(b"\x1b").is_empty());
        assert!(decoder.has_pending());
        let events = decoder.flush_pending();
        assert_eq!(names(&events), vec![KeyName::Escape]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_stray_escape_resolves_once_no_longer_a_prefix() {
        let mut decoder = KeyDecoder::new();
        let events = decoder.feed(b"\x1b[Zx");
        assert_eq!(
            names(&events),
            vec![KeyName::Escape, KeyName::Char, KeyName::Char, KeyName::Char]
        );
        assert_eq!(events[1].sequence, "[");
        assert_eq!(events[2].sequence, "Z");
        assert_eq!(events[3].sequence, "x");
    }

    #[test]
    fn test_longest_match_then_rest() {
        let mut decoder = KeyDecoder::new();
        let events = decoder.feed(b"\x1b[Ahi\r");
        assert_eq!(
            names(&events),
            vec![KeyName::Up, KeyName::Char, KeyName::Char, KeyName::Enter]
        );
    }

    #[test]
    fn test_word_jump_variants() {
        let mut decoder = KeyDecoder::new();
        let events = decoder.feed(b"\x1b[1;5D\x1bf\x1b\x1b[D");
        assert_eq!(
            names(&events),
            vec![KeyName::CtrlLeft, KeyName::CtrlRight, KeyName::CtrlLeft]
        );
        assert!(events[0].ctrl());
        assert!(events[1].meta());
        assert!(events[2].meta());
    }

    #[test]
    fn test_control_chars_are_dropped_but_tab_survives() {
        let mut decoder = KeyDecoder::new();
        let events = decoder.feed(b"a\x01\x02b\t");
        assert_eq!(names(&events), vec![KeyName::Char, KeyName::Char, KeyName::Tab]);
    }

    #[test]
    fn test_focus_reports_never_surface() {
        let mut decoder = KeyDecoder::new();
        let events = decoder.feed(b"\x1b[Ia\x1b[O");
        assert_eq!(events, vec![KeyEvent::char('a')]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut decoder = KeyDecoder::new();
        let bytes = "界".as_bytes();
        assert!(decoder.feed(&bytes[..1]).is_empty());
        assert!(decoder.feed(&bytes[1..2]).is_empty());
        let events = decoder.feed(&bytes[2..]);
        assert_eq!(events, vec![KeyEvent::char('界')]);
    }

    #[test]
    fn test_invalid_utf8_is_dropped() {
        let mut decoder = KeyDecoder::new();
        let events = decoder.feed(&[b'a', 0xFF, b'b']);
        assert_eq!(events, vec![KeyEvent::char('a'), KeyEvent::char('b')]);
    }

    #[test]
    fn test_disabling_capture_clears_partial_sequence() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.feed(b"\x1b[").is_empty());
        decoder.disable_capture();
        assert!(!decoder.has_pending());
        assert!(decoder.feed(b"ignored").is_empty());

        decoder.enable_capture();
        decoder.enable_capture();
        let events = decoder.feed(b"A");
        assert_eq!(events, vec![KeyEvent::char('A')]);
    }

    #[test]
    fn test_keys_iterator_reads_lazily_and_flushes_at_eof() {
        let input = std::io::Cursor::new(b"x\x1b[B\x1b".to_vec());
        let events: Vec<KeyEvent> = Keys::new(input).map(|r| r.unwrap()).collect();
        assert_eq!(
            names(&events),
            vec![KeyName::Char, KeyName::Down, KeyName::Escape]
        );
        assert_eq!(events[2].modifiers, Modifiers::NONE);
    }
}
