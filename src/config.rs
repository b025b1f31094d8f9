//! Configuration: `~/.caroushell/config.toml` plus environment overrides.
//!
//! ```toml
//! apiUrl = "https://openrouter.ai/api/v1"
//! apiKey = "sk-..."
//! model = "mistralai/mistral-small"
//! topRows = 2
//! bottomRows = 2
//! ```
//!
//! A lone `GEMINI_API_KEY` is enough: URL and model default to Gemini's
//! OpenAI-compatible endpoint.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::CarouselError;

pub const GEMINI_DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

const DEFAULT_ROWS: usize = 2;

/// `~/.caroushell/<subpath>`.
pub fn config_folder(subpath: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".caroushell").join(subpath))
}

/// `$CAROUSHELL_CONFIG_PATH` or `~/.caroushell/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    match std::env::var_os("CAROUSHELL_CONFIG_PATH") {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => config_folder("config.toml"),
    }
}

/// Raw file contents. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,
    pub top_rows: Option<usize>,
    pub bottom_rows: Option<usize>,
}

/// Environment variables consulted when the file leaves a key unset.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            api_key: var("CAROUSHELL_API_KEY"),
            gemini_api_key: var("GEMINI_API_KEY"),
            api_url: var("CAROUSHELL_API_URL"),
            model: var("CAROUSHELL_MODEL"),
        }
    }
}

/// Connection settings for the AI source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` when the AI source has nothing to talk to.
    pub ai: Option<AiConfig>,
    pub top_rows: usize,
    pub bottom_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai: None,
            top_rows: DEFAULT_ROWS,
            bottom_rows: DEFAULT_ROWS,
        }
    }
}

impl Config {
    /// Load from the default location. Never fails: problems are logged and
    /// the AI source is disabled.
    pub fn load() -> Self {
        let env = EnvOverrides::from_env();
        let Some(path) = config_path() else {
            tracing::warn!("no home directory, using environment only");
            return Self::resolve(ConfigFile::default(), &env, Path::new("<env>")).unwrap_or_default();
        };

        let file = match Self::read_file(&path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "ignoring config file");
                ConfigFile::default()
            }
        };

        match Self::resolve(file.clone(), &env, &path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "AI suggestions disabled");
                Self {
                    ai: None,
                    ..Self::rows_only(&file)
                }
            }
        }
    }

    /// Parse `path`. A missing file is an empty config.
    pub fn read_file(path: &Path) -> anyhow::Result<ConfigFile> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        let file = toml::from_str(&raw).map_err(|source| CarouselError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(file)
    }

    /// Merge file and environment. File values win over the environment.
    pub fn resolve(file: ConfigFile, env: &EnvOverrides, path: &Path) -> crate::error::Result<Self> {
        let gemini_key = file.gemini_api_key.clone().or_else(|| env.gemini_api_key.clone());

        let api_key = file
            .api_key
            .clone()
            .or_else(|| file.gemini_api_key.clone())
            .or_else(|| env.api_key.clone())
            .or_else(|| env.gemini_api_key.clone());
        let mut api_url = file.api_url.clone().or_else(|| env.api_url.clone());
        let mut model = file.model.clone().or_else(|| env.model.clone());

        if gemini_key.is_some() {
            api_url.get_or_insert_with(|| GEMINI_DEFAULT_API_URL.to_string());
            model.get_or_insert_with(|| GEMINI_DEFAULT_MODEL.to_string());
        }

        let rows = Self::rows_only(&file);
        match (api_url, api_key, model) {
            (Some(api_url), Some(api_key), Some(model)) => Ok(Self {
                ai: Some(AiConfig {
                    api_url: api_url.trim_end_matches('/').to_string(),
                    api_key,
                    model,
                }),
                ..rows
            }),
            (api_url, api_key, model) => {
                let missing: Vec<&str> = [
                    ("apiUrl", api_url.is_none()),
                    ("apiKey", api_key.is_none()),
                    ("model", model.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(CarouselError::MissingConfig {
                    path: path.to_path_buf(),
                    fields: missing.join(", "),
                })
            }
        }
    }

    fn rows_only(file: &ConfigFile) -> Self {
        Self {
            ai: None,
            top_rows: file.top_rows.unwrap_or(DEFAULT_ROWS),
            bottom_rows: file.bottom_rows.unwrap_or(DEFAULT_ROWS),
        }
    }
}
