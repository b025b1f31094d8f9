//! Column width of characters, grapheme clusters and whole rows.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use super::ansi::strip_ansi;

/// Display width of a single codepoint.
///
/// - `0` for control characters, combining marks, zero-width characters
/// - `1` for normal-width characters
/// - `2` for wide characters (CJK ideographs, fullwidth forms, pictographs)
#[inline]
pub fn char_width(c: char) -> usize {
    match c as u32 {
        // Misc symbols and dingbats (⌛ ✨ ⚡) render wide in emoji-capable terminals.
        0x231A..=0x231B | 0x2600..=0x27BF => 2,
        0x1F300..=0x1F5FF => 2,
        0x1F600..=0x1F64F => 2,
        0x1F680..=0x1F6FF => 2,
        0x1F900..=0x1F9FF => 2,
        0x1FA70..=0x1FAFF => 2,
        _ => c.width().unwrap_or(0),
    }
}

/// Display width of one grapheme cluster.
///
/// - `é` (e + combining acute) → 1
/// - `👨‍👩‍👧‍👦` (ZWJ family) → 2
/// - `🇺🇸` (regional indicator pair) → 2
/// - `👍🏽` (skin tone) → 2
pub fn grapheme_width(grapheme: &str) -> usize {
    let mut chars = grapheme.chars();
    let Some(first) = chars.next() else {
        return 0;
    };

    if grapheme.len() == first.len_utf8() {
        return char_width(first);
    }

    if (0x1F1E6..=0x1F1FF).contains(&(first as u32)) {
        return 2;
    }

    for c in chars {
        match c as u32 {
            0x200D | 0xFE0F | 0x20E3 => return 2,
            0x1F3FB..=0x1F3FF => return 2,
            _ => {}
        }
    }

    // Base + combining marks collapse to the base.
    char_width(first)
}

/// Rendered column width of `s`.
///
/// Escape sequences are zero-width, combining marks fold into the preceding
/// base character, wide characters count as 2.
pub fn display_width(s: &str) -> usize {
    if s.is_empty() {
        return 0;
    }

    if s.is_ascii() && !s.as_bytes().contains(&0x1B) {
        return s.bytes().filter(|&b| (0x20..0x7F).contains(&b)).count();
    }

    strip_ansi(s).graphemes(true).map(grapheme_width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_width_basics() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width(' '), 1);
        assert_eq!(char_width('\t'), 0);
        assert_eq!(char_width('\x7F'), 0);
        assert_eq!(char_width('\u{0301}'), 0);
    }

    #[test]
    fn test_char_width_wide() {
        assert_eq!(char_width('界'), 2);
        assert_eq!(char_width('한'), 2);
        assert_eq!(char_width('Ａ'), 2);
        assert_eq!(char_width('🙂'), 2);
        assert_eq!(char_width('🚀'), 2);
        assert_eq!(char_width('⌛'), 2);
    }

    #[test]
    fn test_grapheme_clusters() {
        assert_eq!(grapheme_width("e\u{0301}"), 1);
        assert_eq!(grapheme_width("👨\u{200D}👩\u{200D}👧\u{200D}👦"), 2);
        assert_eq!(grapheme_width("👍\u{1F3FD}"), 2);
        assert_eq!(grapheme_width("🇺🇸"), 2);
        assert_eq!(grapheme_width("1\u{FE0F}\u{20E3}"), 2);
        assert_eq!(grapheme_width(""), 0);
    }

    #[test]
    fn test_display_width_examples() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("\u{1b}[31mred\u{1b}[0m"), 3);
        assert_eq!(display_width("e\u{0301}"), 1);
        assert_eq!(display_width("界"), 2);
        assert_eq!(display_width("🙂"), 2);
    }

    #[test]
    fn test_display_width_mixed_rows() {
        assert_eq!(display_width(""), 0);
        assert_eq!(display_width("$> ls"), 5);
        assert_eq!(display_width("\x1b[2m📂 src/\x1b[0m"), 7);
        assert_eq!(display_width("hi你好🙂"), 2 + 4 + 2);
        assert_eq!(display_width("a\tb"), 2);
    }
}
