//! Display-width measurement for terminal rows.
//!
//! Rows handed to the block renderer carry color escapes, emoji prefixes and
//! whatever the user typed, so both truncation and cursor placement have to
//! work in terminal columns rather than bytes or chars.
//!
//! - **Escapes**: CSI / OSC / two-byte sequences are opaque, zero-width tokens
//! - **Graphemes**: combining marks collapse into their base character
//! - **Wide characters**: CJK ideographs and pictographic emoji take 2 columns
//!
//! Built on `unicode-width` (East Asian Width) and `unicode-segmentation`
//! (UAX #29 grapheme clusters).

mod ansi;
mod truncate;
mod width;

pub use ansi::{AnsiSegment, AnsiSegments, strip_ansi};
pub use truncate::truncate_to_width;
pub use width::{char_width, display_width, grapheme_width};
