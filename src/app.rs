//! The interactive shell: key dispatch, suggestion scheduling and command
//! execution around one carousel.
//!
//! All editing and rendering happens on the task that drives [`App::run`].
//! Suggestion refreshes run on their own tasks and only *request* a repaint
//! through a channel, so two repaints never interleave.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;

use crate::carousel::{Carousel, CarouselConfig, RenderNotifier, RenderedBlock, Suggester, render_rows};
use crate::input::{ESCAPE_TIMEOUT, KeyDecoder, KeyEvent, KeyName, StdinMessage};
use crate::pipeline::{TerminalSession, terminal_width};
use crate::renderer::ansi::{RESET, YELLOW};
use crate::renderer::block::NEWLINE;
use crate::renderer::BlockRenderer;
use crate::shell::{CommandOutcome, CommandRunner, collapse_line_continuations};
use crate::text_measure::display_width;

/// Quiet time after an edit before suggestions are refreshed.
pub const SUGGESTION_DEBOUNCE: Duration = Duration::from_millis(120);

/// Whether the event loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Collaborators an [`App`] is assembled from.
pub struct AppParts<W> {
    pub out: W,
    pub history: Arc<dyn Suggester>,
    pub ai: Arc<dyn Suggester>,
    pub files: Arc<dyn Suggester>,
    pub runner: Box<dyn CommandRunner>,
    pub config: CarouselConfig,
}

pub struct App<W: Write> {
    carousel: Carousel,
    renderer: BlockRenderer<W>,
    decoder: KeyDecoder,
    history: Arc<dyn Suggester>,
    files: Arc<dyn Suggester>,
    runner: Box<dyn CommandRunner>,
    session: Option<TerminalSession>,
    render_rx: UnboundedReceiver<()>,
    suggestions_due: Option<Instant>,
    fixed_width: Option<usize>,
    last_block: Option<RenderedBlock>,
    /// Set when a command ran since the last chunk was fed.
    ran_command: bool,
}

impl<W: Write> App<W> {
    pub fn new(parts: AppParts<W>) -> Self {
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let mut carousel = Carousel::new(parts.config, parts.history.clone(), parts.ai);
        carousel.register(parts.files.clone());
        carousel.set_notifier(RenderNotifier::new(render_tx));

        Self {
            carousel,
            renderer: BlockRenderer::new(parts.out),
            decoder: KeyDecoder::new(),
            history: parts.history,
            files: parts.files,
            runner: parts.runner,
            session: None,
            render_rx,
            suggestions_due: None,
            fixed_width: None,
            last_block: None,
            ran_command: false,
        }
    }

    /// Render at a fixed width instead of asking the terminal.
    pub fn with_width(mut self, width: usize) -> Self {
        self.fixed_width = Some(width);
        self
    }

    /// Hand the raw-mode session to the app so commands can suspend it.
    pub fn with_session(mut self, session: TerminalSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn renderer(&self) -> &BlockRenderer<W> {
        &self.renderer
    }

    /// The block most recently painted.
    pub fn last_block(&self) -> Option<&RenderedBlock> {
        self.last_block.as_ref()
    }

    /// When the debounced refresh fires, if one is scheduled.
    pub fn suggestions_due(&self) -> Option<Instant> {
        self.suggestions_due
    }

    fn width(&self) -> usize {
        self.fixed_width.unwrap_or_else(terminal_width)
    }

    fn top_is_files(&self) -> bool {
        Arc::ptr_eq(self.carousel.top(), &self.files)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initialize every source, request first suggestions and paint.
    pub async fn init(&mut self) -> anyhow::Result<()> {
        let suggesters = self.carousel.suggesters().to_vec();
        for suggester in suggesters {
            suggester.init().await;
        }
        self.carousel.update_suggestions();
        self.render()?;
        Ok(())
    }

    /// Drive the app from raw stdin chunks until the user exits.
    pub async fn run(&mut self, mut input: UnboundedReceiver<StdinMessage>) -> anyhow::Result<()> {
        self.init().await?;

        loop {
            let escape_due = self
                .decoder
                .has_pending()
                .then(|| Instant::now() + ESCAPE_TIMEOUT);
            let suggestions_due = self.suggestions_due;

            let flow = tokio::select! {
                message = input.recv() => match message {
                    Some(StdinMessage::Data(bytes)) => match self.feed(&bytes).await? {
                        Flow::Continue if std::mem::take(&mut self.ran_command) => {
                            discard_typeahead(&mut input)
                        }
                        flow => flow,
                    },
                    Some(StdinMessage::Closed) | None => Flow::Exit,
                },
                Some(()) = self.render_rx.recv() => {
                    self.drain_render_requests()?;
                    Flow::Continue
                }
                _ = tokio::time::sleep_until(escape_due.unwrap_or_else(Instant::now)), if escape_due.is_some() => {
                    self.flush_pending().await?
                }
                _ = tokio::time::sleep_until(suggestions_due.unwrap_or_else(Instant::now)), if suggestions_due.is_some() => {
                    self.fire_suggestions();
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }

        self.shutdown()
    }

    /// Leave the cursor below the block with a visible cursor.
    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(block) = &self.last_block {
            let last_row = block.lines.len().saturating_sub(1);
            let last_col = block.lines.last().map_or(0, |l| display_width(l));
            self.renderer.move_cursor_to(last_row, last_col)?;
        }
        self.renderer.write_text(NEWLINE)?;
        self.renderer.reset_block_tracking();
        self.renderer.show_cursor()?;
        tracing::info!("shell exiting");
        Ok(())
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Decode raw bytes and handle every complete key.
    pub async fn feed(&mut self, bytes: &[u8]) -> anyhow::Result<Flow> {
        let keys = self.decoder.feed(bytes);
        self.dispatch(keys).await
    }

    /// Resolve a pending escape prefix after the input went idle.
    pub async fn flush_pending(&mut self) -> anyhow::Result<Flow> {
        let keys = self.decoder.flush_pending();
        self.dispatch(keys).await
    }

    async fn dispatch(&mut self, keys: Vec<KeyEvent>) -> anyhow::Result<Flow> {
        for key in keys {
            if self.handle_key(key).await? == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Apply one key and repaint.
    pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<Flow> {
        let c = &mut self.carousel;
        let mut edited = true;

        match key.name {
            KeyName::Char => c.insert_at_cursor(&key.sequence),
            KeyName::Enter => return self.confirm().await,
            KeyName::Backspace => c.delete_before_cursor(),
            KeyName::Delete => c.delete_at_cursor(),
            KeyName::CtrlU => c.delete_to_line_start(),
            KeyName::CtrlC => {
                if c.current_row().is_empty() {
                    return Ok(Flow::Exit);
                }
                c.clear_input();
            }
            KeyName::CtrlD => {
                if c.current_row().is_empty() {
                    return Ok(Flow::Exit);
                }
                c.delete_at_cursor();
            }
            KeyName::Up => {
                if !c.move_multiline_cursor_up() {
                    c.up();
                }
                edited = false;
            }
            KeyName::Down => {
                if !c.move_multiline_cursor_down() {
                    c.down();
                }
                edited = false;
            }
            KeyName::Left => {
                c.move_cursor_left();
                edited = false;
            }
            KeyName::Right => {
                c.move_cursor_right();
                edited = false;
            }
            KeyName::Home => {
                c.move_cursor_home();
                edited = false;
            }
            KeyName::End => {
                c.move_cursor_end();
                edited = false;
            }
            KeyName::CtrlLeft => {
                c.move_cursor_word_left();
                edited = false;
            }
            KeyName::CtrlRight => {
                c.move_cursor_word_right();
                edited = false;
            }
            KeyName::Tab => {
                self.complete().await;
                edited = false;
            }
            KeyName::Escape => {
                if self.top_is_files() {
                    self.carousel.set_top_suggester(self.history.clone());
                    self.carousel.update_suggestions();
                }
                edited = false;
            }
            KeyName::FocusIn | KeyName::FocusOut => return Ok(Flow::Continue),
        }

        if edited {
            self.schedule_suggestions();
        }
        self.render()?;
        Ok(Flow::Continue)
    }

    /// Tab: complete a unique filename, otherwise toggle history/files.
    async fn complete(&mut self) {
        let prefix = self.carousel.query().word.prefix;
        if let Some(found) = self.files.find_unique_match(&prefix).await {
            self.carousel.replace_word_at_cursor(&found);
            self.schedule_suggestions();
            return;
        }

        let next = if self.top_is_files() {
            self.history.clone()
        } else {
            self.files.clone()
        };
        self.carousel.set_top_suggester(next);
        self.carousel.update_suggestions();
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Enter: continue a `\` line, or run the whole buffer.
    async fn confirm(&mut self) -> anyhow::Result<Flow> {
        self.carousel.adopt();
        if self.carousel.input_line_info_at_cursor().line_text.ends_with('\\') {
            self.carousel.move_cursor_end();
            self.carousel.insert_at_cursor("\n");
            self.render()?;
            return Ok(Flow::Continue);
        }

        let command = collapse_line_continuations(self.carousel.input_buffer());
        self.echo(&command)?;

        let outcome = self.run_command(&command).await;
        self.ran_command = true;
        self.carousel.clear_input();

        let flow = match outcome {
            Ok(CommandOutcome::Exit) => return Ok(Flow::Exit),
            Ok(outcome) => {
                if outcome.should_record() {
                    self.notify_command_ran(&command).await;
                }
                Flow::Continue
            }
            Err(err) => {
                tracing::warn!(%command, error = %format!("{err:#}"), "command failed");
                self.renderer.write_text(&format!("{err:#}{NEWLINE}"))?;
                self.renderer.reset_block_tracking();
                Flow::Continue
            }
        };

        self.suggestions_due = None;
        self.carousel.update_suggestions();
        self.render()?;
        Ok(flow)
    }

    /// Replace the live block with the command being run.
    fn echo(&mut self, command: &str) -> anyhow::Result<()> {
        let shown = command.replace('\n', NEWLINE);
        self.renderer
            .render_block(&[format!("{YELLOW}$> {shown}{RESET}")], None, None)?;
        self.renderer.write_text(NEWLINE)?;
        self.renderer.reset_block_tracking();
        self.last_block = None;
        Ok(())
    }

    /// Run with capture and writes suspended. Both are restored on every
    /// exit path, including a failing or panicking runner.
    async fn run_command(&mut self, command: &str) -> anyhow::Result<CommandOutcome> {
        tracing::info!(%command, "running command");
        let _bracket = SubprocessBracket::enter(
            &mut self.decoder,
            &mut self.renderer,
            self.session.as_mut(),
        );
        self.runner.run_user_command(command).await
    }

    async fn notify_command_ran(&self, command: &str) {
        for suggester in self.carousel.suggesters() {
            if let Err(err) = suggester.on_command_ran(command).await {
                tracing::warn!(source = suggester.prefix(), error = %format!("{err:#}"), "on_command_ran failed");
            }
        }
    }

    // =========================================================================
    // Suggestions and rendering
    // =========================================================================

    fn schedule_suggestions(&mut self) {
        self.suggestions_due = Some(Instant::now() + SUGGESTION_DEBOUNCE);
    }

    /// Start the debounced refresh now.
    pub fn fire_suggestions(&mut self) {
        self.suggestions_due = None;
        self.carousel.update_suggestions();
    }

    /// Coalesce queued repaint requests into one repaint.
    pub fn drain_render_requests(&mut self) -> anyhow::Result<bool> {
        let mut requested = false;
        while self.render_rx.try_recv().is_ok() {
            requested = true;
        }
        self.render()?;
        Ok(requested)
    }

    /// Repaint the carousel from current state.
    pub fn render(&mut self) -> anyhow::Result<()> {
        self.carousel.clamp_selection();
        let block = render_rows(&self.carousel, self.width());
        self.renderer
            .render_block(&block.lines, Some(block.cursor_row), Some(block.cursor_col))?;
        self.last_block = Some(block);
        Ok(())
    }
}

/// Drop stdin chunks that queued up while a child owned the terminal.
///
/// The reader thread keeps reading during a command, so those keys would
/// otherwise be replayed into the prompt once capture is back on.
fn discard_typeahead(input: &mut UnboundedReceiver<StdinMessage>) -> Flow {
    let mut dropped = 0;
    loop {
        match input.try_recv() {
            Ok(StdinMessage::Data(bytes)) => dropped += bytes.len(),
            Ok(StdinMessage::Closed) | Err(TryRecvError::Disconnected) => return Flow::Exit,
            Err(TryRecvError::Empty) => break,
        }
    }
    if dropped > 0 {
        tracing::debug!(bytes = dropped, "discarded input typed during command");
    }
    Flow::Continue
}

// =============================================================================
// Subprocess bracket
// =============================================================================

/// Suspends key capture, renderer writes and raw mode while a child process
/// owns the terminal, and restores all three on drop.
struct SubprocessBracket<'a, W: Write> {
    decoder: &'a mut KeyDecoder,
    renderer: &'a mut BlockRenderer<W>,
    session: Option<&'a mut TerminalSession>,
}

impl<'a, W: Write> SubprocessBracket<'a, W> {
    fn enter(
        decoder: &'a mut KeyDecoder,
        renderer: &'a mut BlockRenderer<W>,
        mut session: Option<&'a mut TerminalSession>,
    ) -> Self {
        decoder.disable_capture();
        renderer.disable_writes();
        if let Some(session) = session.as_deref_mut() {
            if let Err(err) = session.suspend() {
                tracing::warn!(%err, "could not leave raw mode");
            }
        }
        Self {
            decoder,
            renderer,
            session,
        }
    }
}

impl<W: Write> Drop for SubprocessBracket<'_, W> {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_deref_mut() {
            if let Err(err) = session.resume() {
                tracing::warn!(%err, "could not re-enter raw mode");
            }
        }
        self.renderer.enable_writes();
        if let Err(err) = self.renderer.reset().and_then(|_| self.renderer.show_cursor()) {
            tracing::warn!(%err, "could not reset terminal modes");
        }
        self.renderer.reset_block_tracking();
        self.decoder.enable_capture();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::carousel::{SnapshotSlot, SuggestionQuery, Ticket};
    use crate::input::Modifiers;

    struct ListSuggester {
        prefix: &'static str,
        slot: SnapshotSlot,
        unique: Option<String>,
    }

    impl ListSuggester {
        fn new(prefix: &'static str, items: &[&str]) -> Self {
            let slot = SnapshotSlot::new();
            slot.replace(items.iter().map(|s| s.to_string()).collect());
            Self {
                prefix,
                slot,
                unique: None,
            }
        }
    }

    #[async_trait]
    impl Suggester for ListSuggester {
        fn prefix(&self) -> &str {
            self.prefix
        }

        fn begin_refresh(&self) -> Ticket {
            self.slot.begin()
        }

        async fn refresh_suggestions(&self, _t: Ticket, _q: SuggestionQuery, _m: usize, notifier: RenderNotifier) {
            notifier.request_render();
        }

        fn latest(&self) -> Vec<String> {
            self.slot.latest()
        }

        async fn find_unique_match(&self, prefix: &str) -> Option<String> {
            self.unique.clone().filter(|u| u.starts_with(prefix) && !prefix.is_empty())
        }
    }

    #[derive(Default)]
    struct Recorder {
        commands: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl CommandRunner for Recorder {
        async fn run_user_command(&mut self, command: &str) -> anyhow::Result<CommandOutcome> {
            self.commands.lock().unwrap().push(command.to_string());
            if self.fail {
                anyhow::bail!("boom");
            }
            if command == "exit" {
                return Ok(CommandOutcome::Exit);
            }
            Ok(CommandOutcome::Completed {
                record: !command.trim().is_empty(),
            })
        }
    }

    fn app_with(runner: Recorder, files: ListSuggester) -> App<Vec<u8>> {
        App::new(AppParts {
            out: Vec::new(),
            history: Arc::new(ListSuggester::new("H>", &["history 2", "history 1"])),
            ai: Arc::new(ListSuggester::new("A>", &["ai suggestion"])),
            files: Arc::new(files),
            runner: Box::new(runner),
            config: CarouselConfig::default(),
        })
        .with_width(80)
    }

    fn app() -> App<Vec<u8>> {
        app_with(Recorder::default(), ListSuggester::new("F>", &["a.txt", "b.txt"]))
    }

    fn key(name: KeyName) -> KeyEvent {
        KeyEvent::new(name, "", Modifiers::NONE)
    }

    #[tokio::test]
    async fn test_typing_schedules_debounced_refresh() {
        let mut app = app();
        app.init().await.unwrap();
        assert!(app.suggestions_due().is_none());

        app.feed(b"ls").await.unwrap();
        assert_eq!(app.carousel().input_buffer(), "ls");
        assert!(app.suggestions_due().is_some());

        app.feed(b"\x1b[D").await.unwrap();
        assert_eq!(app.carousel().cursor_index(), 1);

        app.fire_suggestions();
        assert!(app.suggestions_due().is_none());
    }

    #[tokio::test]
    async fn test_ctrl_c_clears_then_exits() {
        let mut app = app();
        app.feed(b"abc").await.unwrap();
        assert_eq!(app.feed(b"\x03").await.unwrap(), Flow::Continue);
        assert_eq!(app.carousel().input_buffer(), "");
        assert_eq!(app.feed(b"\x03").await.unwrap(), Flow::Exit);
    }

    #[tokio::test]
    async fn test_ctrl_d_deletes_or_exits() {
        let mut app = app();
        app.feed(b"ab\x1b[D").await.unwrap();
        assert_eq!(app.feed(b"\x04").await.unwrap(), Flow::Continue);
        assert_eq!(app.carousel().input_buffer(), "a");
        app.feed(b"\x7f").await.unwrap();
        assert_eq!(app.feed(b"\x04").await.unwrap(), Flow::Exit);
    }

    #[tokio::test]
    async fn test_lone_escape_resolves_after_flush() {
        let mut app = app();
        app.feed(b"\t").await.unwrap();
        assert!(app.top_is_files());

        app.feed(b"\x1b").await.unwrap();
        assert!(app.top_is_files());
        app.flush_pending().await.unwrap();
        assert!(!app.top_is_files());
    }

    #[tokio::test]
    async fn test_tab_completes_unique_file() {
        let mut files = ListSuggester::new("F>", &[]);
        files.unique = Some("Cargo.toml".into());
        let mut app = app_with(Recorder::default(), files);

        app.feed(b"cat Ca").await.unwrap();
        app.handle_key(key(KeyName::Tab)).await.unwrap();
        assert_eq!(app.carousel().input_buffer(), "cat Cargo.toml");
        assert!(!app.top_is_files());
    }

    #[tokio::test]
    async fn test_enter_runs_and_clears() {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let runner = Recorder {
            commands: commands.clone(),
            fail: false,
        };
        let mut app = app_with(runner, ListSuggester::new("F>", &[]));
        app.feed(b"echo hi\r").await.unwrap();

        assert_eq!(*commands.lock().unwrap(), vec!["echo hi"]);
        assert_eq!(app.carousel().input_buffer(), "");
        assert!(app.renderer().writes_enabled());
        let out = String::from_utf8_lossy(app.renderer().writer()).into_owned();
        assert!(out.contains("$> echo hi"));
    }

    #[tokio::test]
    async fn test_failing_runner_restores_capture_and_writes() {
        let runner = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut app = app_with(runner, ListSuggester::new("F>", &[]));
        assert_eq!(app.feed(b"false\r").await.unwrap(), Flow::Continue);
        assert!(app.renderer().writes_enabled());

        app.feed(b"x").await.unwrap();
        assert_eq!(app.carousel().input_buffer(), "x");
        let out = String::from_utf8_lossy(app.renderer().writer()).into_owned();
        assert!(out.contains("boom"));
    }

    #[tokio::test]
    async fn test_exit_command_stops_the_loop() {
        let mut app = app();
        assert_eq!(app.feed(b"exit\r").await.unwrap(), Flow::Exit);
    }

    #[tokio::test]
    async fn test_navigation_does_not_schedule_refresh() {
        let mut app = app();
        app.feed(b"\x1b[A\x1b[A\x1b[B").await.unwrap();
        assert_eq!(app.carousel().selection_index(), 1);
        assert!(app.suggestions_due().is_none());
        assert_eq!(app.last_block().unwrap().cursor_row, 2);
    }

    #[tokio::test]
    async fn test_render_requests_are_coalesced() {
        let mut app = app();
        app.init().await.unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(app.drain_render_requests().unwrap());
        assert!(!app.drain_render_requests().unwrap());
    }
}
