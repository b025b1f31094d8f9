//! Terminal output: escape sequences, batching and the block renderer.

pub mod ansi;
pub mod block;
pub mod output;

pub use block::BlockRenderer;
pub use output::OutputBuffer;
