//! Width-bounded truncation that keeps escape sequences intact.

use unicode_segmentation::UnicodeSegmentation;

use super::ansi::{AnsiSegment, AnsiSegments};
use super::width::{display_width, grapheme_width};

/// Cut `text` so that it occupies at most `max_width` columns.
///
/// Escape sequences are copied through untouched (including those after the
/// cut point, so a trailing color reset still reaches the terminal). A wide
/// grapheme that would straddle the limit is dropped whole.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if display_width(text) <= max_width {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut used = 0usize;
    let mut full = false;

    for segment in AnsiSegments::new(text) {
        match segment {
            AnsiSegment::Escape(seq) => result.push_str(seq),
            AnsiSegment::Text(_) if full => {}
            AnsiSegment::Text(run) => {
                for grapheme in run.graphemes(true) {
                    let w = grapheme_width(grapheme);
                    if used + w > max_width {
                        full = true;
                        break;
                    }
                    result.push_str(grapheme);
                    used += w;
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_unchanged() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello", 5), "hello");
        assert_eq!(truncate_to_width("", 0), "");
    }

    #[test]
    fn test_plain_cut() {
        assert_eq!(truncate_to_width("hello world", 5), "hello");
        assert_eq!(truncate_to_width("hello", 0), "");
    }

    #[test]
    fn test_wide_chars_never_straddle() {
        assert_eq!(truncate_to_width("你好世界", 5), "你好");
        assert_eq!(truncate_to_width("a🙂b", 2), "a");
    }

    #[test]
    fn test_colors_do_not_count_and_survive() {
        let row = "\x1b[2mabcdef\x1b[0m";
        let cut = truncate_to_width(row, 3);
        assert_eq!(cut, "\x1b[2mabc\x1b[0m");
        assert_eq!(display_width(&cut), 3);
    }

    #[test]
    fn test_combining_marks_stay_with_base() {
        let cut = truncate_to_width("cafe\u{0301}xyz", 4);
        assert_eq!(cut, "cafe\u{0301}");
    }
}
