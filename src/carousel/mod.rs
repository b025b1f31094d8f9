//! The carousel: an editable prompt with suggestion rows above and below.

pub mod lines;
pub mod model;
pub mod suggester;
pub mod view;

pub use lines::{LineInfo, WordInfo};
pub use model::{Carousel, CarouselConfig};
pub use suggester::{RenderNotifier, SnapshotSlot, SuggestionQuery, Suggester, Ticket};
pub use view::{RenderedBlock, render_rows};
