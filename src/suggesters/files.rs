//! Filename completion source.
//!
//! Completes the word at the cursor against the directory it names:
//! `src/ma` lists `src/` entries starting with `ma`, `~/` resolves against
//! the home directory, a bare word lists the working directory.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::fs;

use crate::carousel::{RenderNotifier, SnapshotSlot, SuggestionQuery, Suggester, Ticket};

pub const FILES_PREFIX: &str = "📂";
const MAX_AI_FILES: usize = 10;

/// A completion query split at its last path separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    /// Directory part as typed, including the trailing separator.
    pub dir_display: String,
    /// Name fragment after the separator.
    pub fragment: String,
    pub dir_path: PathBuf,
}

pub struct FileSuggester {
    /// Directory relative paths resolve against. `None` means the process
    /// working directory, which follows `cd`.
    base: Option<PathBuf>,
    /// Entries of the working directory, for AI context.
    files: Mutex<Vec<String>>,
    slot: SnapshotSlot,
}

impl Default for FileSuggester {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSuggester {
    pub fn new() -> Self {
        Self {
            base: None,
            files: Mutex::new(Vec::new()),
            slot: SnapshotSlot::new(),
        }
    }

    /// Resolve relative paths against `base` instead of the working directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
            ..Self::new()
        }
    }

    fn cwd(&self) -> PathBuf {
        self.base
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn files(&self) -> MutexGuard<'_, Vec<String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn parse_query(&self, query: &str) -> PathQuery {
        match query.rfind(['/', '\\']) {
            None => PathQuery {
                dir_display: String::new(),
                fragment: query.to_string(),
                dir_path: self.cwd(),
            },
            Some(sep) => {
                let dir_display = &query[..=sep];
                PathQuery {
                    dir_display: dir_display.to_string(),
                    fragment: query[sep + 1..].to_string(),
                    dir_path: self.resolve_directory(dir_display),
                }
            }
        }
    }

    fn resolve_directory(&self, dir_display: &str) -> PathBuf {
        if let Some(rest) = dir_display.strip_prefix('~') {
            let rest = rest.trim_start_matches(['/', '\\']);
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        let path = Path::new(dir_display);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd().join(path)
        }
    }

    /// Completions for `query`, sorted, each carrying the typed directory part.
    pub async fn matching_files(&self, query: &str) -> Vec<String> {
        let cwd_entries = read_directory(&self.cwd()).await;
        *self.files() = cwd_entries;

        let parsed = self.parse_query(query.trim());
        let needle = parsed.fragment.to_lowercase();
        read_directory(&parsed.dir_path)
            .await
            .into_iter()
            .filter(|entry| entry.to_lowercase().starts_with(&needle))
            .map(|entry| format!("{}{entry}", parsed.dir_display))
            .collect()
    }
}

/// Entry names of `dir`, sorted case-insensitively. Unreadable means empty.
async fn read_directory(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), %err, "cannot list directory");
            return names;
        }
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names
}

#[async_trait]
impl Suggester for FileSuggester {
    fn prefix(&self) -> &str {
        FILES_PREFIX
    }

    async fn init(&self) {
        *self.files() = read_directory(&self.cwd()).await;
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
        let matches = self.matching_files(&query.word.prefix).await;
        if self.slot.commit(ticket, matches) {
            notifier.request_render();
        }
    }

    fn latest(&self) -> Vec<String> {
        self.slot.latest()
    }

    fn description_for_ai(&self) -> String {
        let files = self.files();
        let list = if files.is_empty() {
            "(directory is empty)".to_string()
        } else {
            files.iter().take(MAX_AI_FILES).cloned().collect::<Vec<_>>().join("\n")
        };
        format!(
            "# File context\n\nThe current directory is {}.\n\nThe files in the current directory are:\n\n{list}",
            self.cwd().display()
        )
    }

    async fn find_unique_match(&self, prefix: &str) -> Option<String> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return None;
        }
        let mut matches = self.matching_files(prefix).await;
        if matches.len() == 1 { matches.pop() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carousel::WordInfo;

    fn fixture() -> (tempfile::TempDir, FileSuggester) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src").join("main.rs"), "").unwrap();
        std::fs::write(dir.path().join("src").join("model.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        std::fs::write(dir.path().join("cargo.lock"), "").unwrap();
        let files = FileSuggester::with_base(dir.path());
        (dir, files)
    }

    #[test]
    fn test_parse_query_splits_at_last_separator() {
        let files = FileSuggester::with_base("/work");
        let q = files.parse_query("src/bin/ma");
        assert_eq!(q.dir_display, "src/bin/");
        assert_eq!(q.fragment, "ma");
        assert_eq!(q.dir_path, PathBuf::from("/work/src/bin/"));

        let q = files.parse_query("Car");
        assert_eq!(q.dir_display, "");
        assert_eq!(q.dir_path, PathBuf::from("/work"));

        let q = files.parse_query("/etc/ho");
        assert_eq!(q.dir_path, PathBuf::from("/etc/"));
    }

    #[test]
    fn test_parse_query_expands_home() {
        let Some(home) = dirs::home_dir() else { return };
        let files = FileSuggester::new();
        let q = files.parse_query("~/Doc");
        assert_eq!(q.dir_display, "~/");
        assert_eq!(q.dir_path, home);
    }

    #[tokio::test]
    async fn test_matches_are_case_insensitive_and_sorted() {
        let (_dir, files) = fixture();
        assert_eq!(files.matching_files("car").await, vec!["cargo.lock", "Cargo.toml"]);
        assert_eq!(files.matching_files("src/m").await, vec!["src/main.rs", "src/model.rs"]);
        assert!(files.matching_files("nope/").await.is_empty());
    }

    #[tokio::test]
    async fn test_unique_match_requires_exactly_one() {
        let (_dir, files) = fixture();
        assert_eq!(files.find_unique_match("READ").await, Some("README.md".into()));
        assert_eq!(files.find_unique_match("src/ma").await, Some("src/main.rs".into()));
        assert_eq!(files.find_unique_match("src/m").await, None);
        assert_eq!(files.find_unique_match("  ").await, None);
    }

    #[tokio::test]
    async fn test_refresh_uses_word_prefix() {
        let (_dir, files) = fixture();
        let query = SuggestionQuery {
            current_row: "vim src/mo".into(),
            cursor: 10,
            word: WordInfo {
                start: 4,
                end: 10,
                prefix: "src/mo".into(),
                word: "src/mo".into(),
            },
            context: Vec::new(),
        };
        files.refresh_suggestions(files.begin_refresh(), query, 2, RenderNotifier::detached()).await;
        assert_eq!(files.latest(), vec!["src/model.rs"]);
        assert!(files.description_for_ai().contains("README.md"));
    }
}
