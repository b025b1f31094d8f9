use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use caroushell::app::{App, AppParts};
use caroushell::carousel::CarouselConfig;
use caroushell::config::Config;
use caroushell::input::StdinReader;
use caroushell::logging;
use caroushell::pipeline::TerminalSession;
use caroushell::shell::ShellRunner;
use caroushell::suggesters::{AiSuggester, FileSuggester, HistorySuggester};

#[derive(Parser)]
#[command(name = "caroushell", version)]
#[command(about = "Shell prompt with history and AI suggestions above and below the line", long_about = None)]
struct Cli {
    /// Suggestion rows shown above the prompt.
    #[arg(long)]
    top_rows: Option<usize>,

    /// Suggestion rows shown below the prompt.
    #[arg(long)]
    bottom_rows: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(dir) = logging::log_dir() {
        if let Err(err) = logging::init(&dir) {
            eprintln!("caroushell: file logging disabled: {err:#}");
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "caroushell starting");

    let config = Config::load();
    let rows = CarouselConfig {
        top_row_count: cli.top_rows.unwrap_or(config.top_rows),
        bottom_row_count: cli.bottom_rows.unwrap_or(config.bottom_rows),
    };

    let history_path = HistorySuggester::default_path().unwrap_or_else(|| PathBuf::from(".caroushell_history"));
    let parts = AppParts {
        out: std::io::stdout(),
        history: Arc::new(HistorySuggester::new(history_path)),
        ai: Arc::new(AiSuggester::new(config.ai.clone())),
        files: Arc::new(FileSuggester::new()),
        runner: Box::new(ShellRunner::new()),
        config: rows,
    };

    let session = TerminalSession::enter()?;
    let (_reader, input) = StdinReader::spawn()?;
    let mut app = App::new(parts).with_session(session);

    let result = app.run(input).await;
    // Dropping the app restores the terminal before any error is printed.
    drop(app);
    result
}
