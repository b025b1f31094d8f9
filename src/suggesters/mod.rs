//! Suggestion sources: command history, filenames and AI completions.

pub mod ai;
pub mod files;
pub mod history;

pub use ai::AiSuggester;
pub use files::FileSuggester;
pub use history::HistorySuggester;
