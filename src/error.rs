//! Typed failures of the shell's collaborators.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarouselError {
    #[error("config at {path} is missing {fields}; set apiUrl, apiKey and model (or just GEMINI_API_KEY)")]
    MissingConfig { path: PathBuf, fields: String },

    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("AI request failed with status {status}")]
    AiStatus { status: reqwest::StatusCode },

    #[error("history file {path}: {source}")]
    HistoryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no such directory: {0}")]
    NoSuchDirectory(String),
}

pub type Result<T> = std::result::Result<T, CarouselError>;
