//! Raw terminal input → semantic key events.
//!
//! ```text
//! stdin thread ──bytes──▶ KeyDecoder ──KeyEvent──▶ App dispatch
//!  (reader)               (keymap table,
//!                          prefix wait,
//!                          timeout flush)
//! ```
//!
//! The decoder knows nothing about editing. It only guarantees that an event
//! is emitted once a sequence is unambiguous, and that printable text amid
//! noise still arrives character by character in order.

pub mod decoder;
pub mod keymap;
pub mod reader;

pub use decoder::{ESCAPE_TIMEOUT, KeyDecoder, Keys};
pub use keymap::{KEYMAP, KeyEvent, KeyName, Modifiers};
pub use reader::{StdinMessage, StdinReader};
