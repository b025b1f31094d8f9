//! Command history source.
//!
//! File format, appended one entry at a time:
//!
//! ```text
//!
//! # 2024-03-07T10:00:00.000Z
//! +first line of the command
//! +second line of the command
//! ```
//!
//! Any line not starting with `+` ends the current entry.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::carousel::{RenderNotifier, SnapshotSlot, SuggestionQuery, Suggester, Ticket};
use crate::error::CarouselError;

pub const HISTORY_PREFIX: &str = "⌛";
pub const MAX_ITEMS: usize = 1000;
const MAX_AI_LINES: usize = 20;

pub struct HistorySuggester {
    path: PathBuf,
    /// Newest first.
    items: Mutex<Vec<String>>,
    slot: SnapshotSlot,
}

impl HistorySuggester {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: Mutex::new(Vec::new()),
            slot: SnapshotSlot::new(),
        }
    }

    /// `~/.caroushell/history`.
    pub fn default_path() -> Option<PathBuf> {
        crate::config::config_folder("history")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn items(&self) -> MutexGuard<'_, Vec<String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a command, newest first. An immediate repeat is not stored
    /// again.
    pub async fn add(&self, command: &str) -> anyhow::Result<()> {
        if command.trim().is_empty() {
            return Ok(());
        }
        {
            let mut items = self.items();
            if items.first().map(String::as_str) == Some(command) {
                return Ok(());
            }
            items.insert(0, command.to_string());
            items.truncate(MAX_ITEMS);
        }
        self.append(&serialize_entry(command, &timestamp())).await
    }

    async fn append(&self, entry: &str) -> anyhow::Result<()> {
        let io_err = |source| CarouselError::HistoryIo {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(entry.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(())
    }

    /// All stored commands, newest first.
    pub fn items_snapshot(&self) -> Vec<String> {
        self.items().clone()
    }
}

#[async_trait]
impl Suggester for HistorySuggester {
    fn prefix(&self) -> &str {
        HISTORY_PREFIX
    }

    async fn init(&self) {
        let items = match fs::read_to_string(&self.path).await {
            Ok(data) => parse_history(&data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "could not read history");
                Vec::new()
            }
        };
        tracing::info!(entries = items.len(), "history loaded");
        *self.items() = items.clone();
        self.slot.replace(items);
    }

    fn begin_refresh(&self) -> Ticket {
        self.slot.begin()
    }

    async fn refresh_suggestions(
        &self,
        ticket: Ticket,
        query: SuggestionQuery,
        _max_displayed: usize,
        notifier: RenderNotifier,
    ) {
        let filtered = filter_items(&self.items(), &query.current_row);
        if self.slot.commit(ticket, filtered) {
            notifier.request_render();
        }
    }

    fn latest(&self) -> Vec<String> {
        self.slot.latest()
    }

    fn description_for_ai(&self) -> String {
        let items = self.items();
        let recent: Vec<&String> = items.iter().take(MAX_AI_LINES).collect();
        let mut lines = Vec::new();
        if let Some(first) = recent.first() {
            lines.push(format!("The most recent command is: \"{first}\""));
        }
        if recent.len() > 1 {
            lines.push("The most recent commands are (from recent to oldest):".to_string());
            for (i, cmd) in recent.iter().enumerate() {
                lines.push(format!("  {}. {cmd}", i + 1));
            }
        }
        lines.join("\n")
    }

    async fn on_command_ran(&self, command: &str) -> anyhow::Result<()> {
        self.add(command).await
    }
}

/// Case-insensitive substring filter keeping the first (newest) copy of
/// each command. An empty query returns everything.
pub fn filter_items(items: &[String], query: &str) -> Vec<String> {
    if query.is_empty() {
        return items.to_vec();
    }
    let needle = query.to_lowercase();
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .filter(|item| item.to_lowercase().contains(&needle))
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Entries of a history file, newest first, capped at [`MAX_ITEMS`].
pub fn parse_history(data: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for raw in data.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        match line.strip_prefix('+') {
            Some(rest) => current.push(rest),
            None if !current.is_empty() => entries.push(std::mem::take(&mut current).join("\n")),
            None => {}
        }
    }
    if !current.is_empty() {
        entries.push(current.join("\n"));
    }

    let skip = entries.len().saturating_sub(MAX_ITEMS);
    entries.into_iter().skip(skip).rev().collect()
}

pub fn serialize_entry(command: &str, timestamp: &str) -> String {
    let body: Vec<String> = command.split('\n').map(|l| format!("+{l}")).collect();
    format!("\n# {timestamp}\n{}\n", body.join("\n"))
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_reads_newest_first_with_multiline_entries() {
        let data = "\n# t1\n+ls\n\n# t2\n+echo a\\\r\n+b\n\n# t3\n+pwd\n";
        assert_eq!(parse_history(data), strings(&["pwd", "echo a\\\nb", "ls"]));
    }

    #[test]
    fn test_parse_keeps_only_newest_entries() {
        let data: String = (0..MAX_ITEMS + 5).map(|i| serialize_entry(&format!("cmd{i}"), "t")).collect();
        let items = parse_history(&data);
        assert_eq!(items.len(), MAX_ITEMS);
        assert_eq!(items[0], format!("cmd{}", MAX_ITEMS + 4));
        assert_eq!(items[MAX_ITEMS - 1], "cmd5");
    }

    #[test]
    fn test_serialize_prefixes_every_line() {
        assert_eq!(serialize_entry("a\nb", "T"), "\n# T\n+a\n+b\n");
    }

    #[test]
    fn test_filter_is_case_insensitive_and_dedups() {
        let items = strings(&["git Push", "ls", "git status", "git Push"]);
        assert_eq!(filter_items(&items, "GIT"), strings(&["git Push", "git status"]));
        assert_eq!(filter_items(&items, ""), items);
        assert!(filter_items(&items, "cargo").is_empty());
    }

    #[tokio::test]
    async fn test_add_persists_and_skips_immediate_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("history");
        let history = HistorySuggester::new(&path);
        history.init().await;
        assert!(history.latest().is_empty());

        history.add("ls").await.unwrap();
        history.add("ls").await.unwrap();
        history.add("  ").await.unwrap();
        history.add("pwd").await.unwrap();
        history.add("ls").await.unwrap();
        assert_eq!(history.items_snapshot(), strings(&["ls", "pwd", "ls"]));

        let reloaded = HistorySuggester::new(&path);
        reloaded.init().await;
        assert_eq!(reloaded.latest(), strings(&["ls", "pwd", "ls"]));
    }

    #[tokio::test]
    async fn test_refresh_filters_by_current_row() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistorySuggester::new(dir.path().join("history"));
        for cmd in ["make test", "ls", "make build"] {
            history.on_command_ran(cmd).await.unwrap();
        }

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let query = SuggestionQuery {
            current_row: "MAKE".into(),
            cursor: 4,
            word: Default::default(),
            context: Vec::new(),
        };
        history.refresh_suggestions(history.begin_refresh(), query, 2, RenderNotifier::new(tx)).await;
        assert_eq!(rx.recv().await, Some(()));
        assert_eq!(history.latest(), strings(&["make build", "make test"]));
    }

    #[tokio::test]
    async fn test_description_lists_recent_commands() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistorySuggester::new(dir.path().join("history"));
        assert_eq!(history.description_for_ai(), "");

        history.add("ls").await.unwrap();
        history.add("cd src").await.unwrap();
        let description = history.description_for_ai();
        assert!(description.starts_with("The most recent command is: \"cd src\""));
        assert!(description.contains("  1. cd src\n  2. ls"));
    }
}
