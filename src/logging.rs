//! File logging.
//!
//! The TTY belongs to the carousel, so log output goes to
//! `~/.caroushell/logs/MM-DD.txt` (one file per day, appended).
//! Verbosity follows `CAROUSHELL_LOG`, default `info`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CAROUSHELL_LOG";

/// `~/.caroushell/logs`.
pub fn log_dir() -> Option<PathBuf> {
    crate::config::config_folder("logs")
}

/// Log file for the day of `when`.
pub fn log_file_path(dir: &Path, when: DateTime<Local>) -> PathBuf {
    dir.join(when.format("%m-%d.txt").to_string())
}

/// Install the global subscriber writing to today's file in `dir`.
///
/// Returns the file in use. Installing twice is an error.
pub fn init(dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = log_file_path(dir, Local::now());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("installing log subscriber")?;

    Ok(path)
}
