//! The suggestion source capability and its debounce bookkeeping.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::lines::WordInfo;

// =============================================================================
// Capability
// =============================================================================

/// State of the carousel captured when a refresh is requested.
///
/// Refreshes run on background tasks, so they get a snapshot instead of a
/// reference to the live model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionQuery {
    /// Text of the active row (prompt buffer or selected suggestion).
    pub current_row: String,
    pub cursor: usize,
    /// Whitespace-delimited word touching the cursor.
    pub word: WordInfo,
    /// Non-empty `description_for_ai` blurbs of every registered source.
    pub context: Vec<String>,
}

/// A pluggable source of carousel rows (history, AI, filesystem).
#[async_trait]
pub trait Suggester: Send + Sync {
    /// Icon shown next to this source's rows.
    fn prefix(&self) -> &str;

    /// One-time setup. Failures degrade to an empty source.
    async fn init(&self) {}

    /// Reserve the generation of a refresh that is about to be requested.
    ///
    /// The carousel calls this on its own task before spawning the refresh,
    /// so generations follow request order.
    fn begin_refresh(&self) -> Ticket;

    /// Recompute the snapshot and call `notifier.request_render()` when it
    /// changes. May be invoked again before a previous call finished; only
    /// the newest `ticket` may commit.
    async fn refresh_suggestions(
        &self,
        ticket: Ticket,
        query: SuggestionQuery,
        max_displayed: usize,
        notifier: RenderNotifier,
    );

    /// Current snapshot. Its length bounds the selection index.
    fn latest(&self) -> Vec<String>;

    /// Context contributed to AI prompts. Empty means no contribution.
    fn description_for_ai(&self) -> String {
        String::new()
    }

    /// Called after a confirmed command ran.
    async fn on_command_ran(&self, _command: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// The single completion for `prefix`, when there is exactly one.
    async fn find_unique_match(&self, _prefix: &str) -> Option<String> {
        None
    }
}

// =============================================================================
// Render notification
// =============================================================================

/// Handle a source uses to ask the event loop for a repaint.
///
/// Only the event loop renders; this just enqueues a request.
#[derive(Debug, Clone, Default)]
pub struct RenderNotifier {
    tx: Option<UnboundedSender<()>>,
}

impl RenderNotifier {
    pub fn new(tx: UnboundedSender<()>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A notifier that goes nowhere.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn request_render(&self) {
        if let Some(tx) = &self.tx {
            // Receiver gone means the loop is shutting down.
            let _ = tx.send(());
        }
    }
}

// =============================================================================
// Snapshot slot
// =============================================================================

/// Generation of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct SlotState {
    items: Vec<String>,
    issued: u64,
}

/// A source's visible snapshot plus a generation counter.
///
/// Every refresh request takes a [`Ticket`] before any slow work is started
/// and commits with it afterwards. Only the most recently issued ticket may commit; results of
/// superseded requests are dropped.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    state: Mutex<SlotState>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a new generation, superseding all earlier ones.
    pub fn begin(&self) -> Ticket {
        let mut state = self.lock();
        state.issued += 1;
        Ticket(state.issued)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.lock().issued == ticket.0
    }

    /// Apply `items` if `ticket` is still the latest. Returns whether it applied.
    pub fn commit(&self, ticket: Ticket, items: Vec<String>) -> bool {
        let mut state = self.lock();
        if state.issued != ticket.0 {
            tracing::debug!(stale = ticket.0, latest = state.issued, "dropping stale suggestions");
            return false;
        }
        state.items = items;
        true
    }

    /// Set the snapshot outside of any refresh (initial load).
    pub fn replace(&self, items: Vec<String>) {
        self.lock().items = items;
    }

    pub fn latest(&self) -> Vec<String> {
        self.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
