//! Static table of fixed control/escape sequences.

use std::fmt;

// =============================================================================
// Types
// =============================================================================

/// Semantic key names understood by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    Char,
    Enter,
    Backspace,
    Delete,
    Escape,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    CtrlC,
    CtrlD,
    CtrlU,
    CtrlLeft,
    CtrlRight,
    FocusIn,
    FocusOut,
}

impl KeyName {
    /// Focus reports are recognized so they never leak as text, but are never emitted.
    pub fn is_swallowed(self) -> bool {
        matches!(self, KeyName::FocusIn | KeyName::FocusOut)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyName::Char => "char",
            KeyName::Enter => "enter",
            KeyName::Backspace => "backspace",
            KeyName::Delete => "delete",
            KeyName::Escape => "escape",
            KeyName::Tab => "tab",
            KeyName::Up => "up",
            KeyName::Down => "down",
            KeyName::Left => "left",
            KeyName::Right => "right",
            KeyName::Home => "home",
            KeyName::End => "end",
            KeyName::CtrlC => "ctrl-c",
            KeyName::CtrlD => "ctrl-d",
            KeyName::CtrlU => "ctrl-u",
            KeyName::CtrlLeft => "ctrl-left",
            KeyName::CtrlRight => "ctrl-right",
            KeyName::FocusIn => "focus-in",
            KeyName::FocusOut => "focus-out",
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Modifier flags carried alongside a key name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const NONE  = 0;
        const CTRL  = 1 << 0;
        const META  = 1 << 1;
        const SHIFT = 1 << 2;
    }
}

/// One decoded key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub name: KeyName,
    /// The exact input consumed for this event.
    pub sequence: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(name: KeyName, sequence: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            name,
            sequence: sequence.into(),
            modifiers,
        }
    }

    /// A literal character.
    pub fn char(c: char) -> Self {
        Self::new(KeyName::Char, c.to_string(), Modifiers::NONE)
    }

    pub fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    pub fn meta(&self) -> bool {
        self.modifiers.contains(Modifiers::META)
    }

    pub fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

// =============================================================================
// Table
// =============================================================================

/// Every fixed sequence the decoder recognizes.
///
/// Entries that share a prefix (`ESC`, `ESC [`, `ESC [ 1`) are resolved by
/// the decoder: it waits while the buffer can still grow into a longer entry.
pub const KEYMAP: &[(&str, KeyName, Modifiers)] = &[
    // Control keys
    ("\x03", KeyName::CtrlC, Modifiers::CTRL),
    ("\x04", KeyName::CtrlD, Modifiers::CTRL),
    ("\x15", KeyName::CtrlU, Modifiers::CTRL),
    ("\t", KeyName::Tab, Modifiers::NONE),
    ("\r", KeyName::Enter, Modifiers::NONE),
    ("\n", KeyName::Enter, Modifiers::NONE),
    ("\x7f", KeyName::Backspace, Modifiers::NONE),
    ("\x08", KeyName::Backspace, Modifiers::NONE),
    ("\x1b", KeyName::Escape, Modifiers::NONE),
    // Arrows, normal and application cursor mode
    ("\x1b[A", KeyName::Up, Modifiers::NONE),
    ("\x1b[B", KeyName::Down, Modifiers::NONE),
    ("\x1b[C", KeyName::Right, Modifiers::NONE),
    ("\x1b[D", KeyName::Left, Modifiers::NONE),
    ("\x1bOA", KeyName::Up, Modifiers::NONE),
    ("\x1bOB", KeyName::Down, Modifiers::NONE),
    ("\x1bOC", KeyName::Right, Modifiers::NONE),
    ("\x1bOD", KeyName::Left, Modifiers::NONE),
    // Home / End / Delete
    ("\x1b[H", KeyName::Home, Modifiers::NONE),
    ("\x1b[F", KeyName::End, Modifiers::NONE),
    ("\x1bOH", KeyName::Home, Modifiers::NONE),
    ("\x1bOF", KeyName::End, Modifiers::NONE),
    ("\x1b[1~", KeyName::Home, Modifiers::NONE),
    ("\x1b[4~", KeyName::End, Modifiers::NONE),
    ("\x1b[7~", KeyName::Home, Modifiers::NONE),
    ("\x1b[8~", KeyName::End, Modifiers::NONE),
    ("\x1b[3~", KeyName::Delete, Modifiers::NONE),
    // Word jumps: Ctrl+Arrow
    ("\x1b[1;5D", KeyName::CtrlLeft, Modifiers::CTRL),
    ("\x1b[1;5C", KeyName::CtrlRight, Modifiers::CTRL),
    ("\x1b[5D", KeyName::CtrlLeft, Modifiers::CTRL),
    ("\x1b[5C", KeyName::CtrlRight, Modifiers::CTRL),
    // Word jumps: Option/Alt (meta) forms
    ("\x1b[1;3D", KeyName::CtrlLeft, Modifiers::META),
    ("\x1b[1;3C", KeyName::CtrlRight, Modifiers::META),
    ("\x1b\x1b[D", KeyName::CtrlLeft, Modifiers::META),
    ("\x1b\x1b[C", KeyName::CtrlRight, Modifiers::META),
    ("\x1bb", KeyName::CtrlLeft, Modifiers::META),
    ("\x1bf", KeyName::CtrlRight, Modifiers::META),
    // Focus reporting
    ("\x1b[I", KeyName::FocusIn, Modifiers::NONE),
    ("\x1b[O", KeyName::FocusOut, Modifiers::NONE),
];

/// Exact table lookup.
pub fn lookup(sequence: &str) -> Option<(KeyName, Modifiers)> {
    KEYMAP
        .iter()
        .find(|(seq, _, _)| *seq == sequence)
        .map(|&(_, name, modifiers)| (name, modifiers))
}

/// Longest table entry that `buf` starts with.
pub fn longest_prefix_match(buf: &str) -> Option<(&'static str, KeyName, Modifiers)> {
    KEYMAP
        .iter()
        .filter(|(seq, _, _)| buf.starts_with(seq))
        .max_by_key(|(seq, _, _)| seq.len())
        .copied()
}

/// True when `buf` could still grow into a longer table entry.
pub fn is_strict_prefix(buf: &str) -> bool {
    KEYMAP
        .iter()
        .any(|(seq, _, _)| seq.len() > buf.len() && seq.starts_with(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_has_no_duplicate_sequences() {
        let mut seen = HashSet::new();
        for (seq, _, _) in KEYMAP {
            assert!(seen.insert(*seq), "duplicate entry {seq:?}");
        }
    }

    #[test]
    fn test_lookup_exact() {
        assert_eq!(lookup("\x1b[A"), Some((KeyName::Up, Modifiers::NONE)));
        assert_eq!(lookup("\x03"), Some((KeyName::CtrlC, Modifiers::CTRL)));
        assert_eq!(lookup("\x1b[Z"), None);
    }

    #[test]
    fn test_longest_prefix_prefers_longer_entries() {
        let (seq, name, _) = longest_prefix_match("\x1b[Axyz").unwrap();
        assert_eq!(seq, "\x1b[A");
        assert_eq!(name, KeyName::Up);

        let (seq, name, _) = longest_prefix_match("\x1bz").unwrap();
        assert_eq!(seq, "\x1b");
        assert_eq!(name, KeyName::Escape);
    }

    #[test]
    fn test_strict_prefix_detection() {
        assert!(is_strict_prefix("\x1b"));
        assert!(is_strict_prefix("\x1b["));
        assert!(is_strict_prefix("\x1b[1;5"));
        assert!(!is_strict_prefix("\x1b[A"));
        assert!(!is_strict_prefix("a"));
    }

    #[test]
    fn test_focus_reports_are_swallowed() {
        assert!(KeyName::FocusIn.is_swallowed());
        assert!(KeyName::FocusOut.is_swallowed());
        assert!(!KeyName::Escape.is_swallowed());
        assert_eq!(KeyName::CtrlLeft.to_string(), "ctrl-left");
    }
}
