//! # caroushell
//!
//! Interactive shell front-end with a live suggestion carousel.
//!
//! History rows sit above the prompt and AI rows below it. Arrow keys scroll
//! through them, editing a row adopts it into the prompt, and Enter hands the
//! line to `bash`.
//!
//! ```text
//!   ⌛ git status
//!   ⌛ cargo test
//!   $> git co|
//!   🤖 git commit -m "..."
//!   🤖 git checkout main
//! ```
//!
//! ## Modules
//!
//! - [`input`] - raw bytes to key events
//! - [`carousel`] - edit buffer, selection and row layout
//! - [`renderer`] - flicker-free block repaint
//! - [`text_measure`] - display width and truncation
//! - [`suggesters`] - history, filename and AI sources
//! - [`shell`] - built-ins and command execution
//! - [`app`] - key dispatch and the event loop

pub mod app;
pub mod carousel;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod pipeline;
pub mod renderer;
pub mod shell;
pub mod suggesters;
pub mod text_measure;

pub use app::{App, AppParts, Flow};
pub use carousel::{Carousel, CarouselConfig, RenderedBlock, Suggester};
pub use error::CarouselError;
pub use input::{KeyDecoder, KeyEvent, KeyName};
pub use renderer::BlockRenderer;
pub use text_measure::{display_width, truncate_to_width};
