//! Running confirmed command lines.
//!
//! A handful of built-ins change the shell's own state (`cd`, the directory
//! stack, `exit`). Everything else goes to `/bin/bash -lc` with the terminal
//! handed over to the child.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;

use crate::error::CarouselError;

#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd.exe", "/c");
#[cfg(not(windows))]
const SHELL: (&str, &str) = ("/bin/bash", "-lc");

/// Result of running one command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran (successfully or not).
    Completed { record: bool },
    /// The user asked the shell to quit.
    Exit,
}

impl CommandOutcome {
    /// Whether the line belongs in history.
    pub fn should_record(&self) -> bool {
        matches!(self, Self::Completed { record: true })
    }
}

/// Executes confirmed command lines for the app.
#[async_trait]
pub trait CommandRunner: Send {
    async fn run_user_command(&mut self, command: &str) -> anyhow::Result<CommandOutcome>;
}

/// Join backslash-continued lines into one command.
///
/// The trailing `\` of a continued line is dropped and the following line
/// loses its leading whitespace. Lines without a trailing `\` keep their
/// newline.
pub fn collapse_line_continuations(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = String::with_capacity(text.len());
    let mut continued = false;

    for (i, line) in lines.iter().enumerate() {
        let line = if continued { line.trim_start() } else { line };
        let is_last = i + 1 == lines.len();
        match line.strip_suffix('\\') {
            Some(head) if !is_last => {
                out.push_str(head);
                continued = true;
            }
            _ => {
                out.push_str(line);
                if !is_last {
                    out.push('\n');
                }
                continued = false;
            }
        }
    }
    out
}

// =============================================================================
// ShellRunner
// =============================================================================

/// What a built-in produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Output(String),
    Silent,
    Exit,
}

/// Runs built-ins in-process and everything else through the system shell.
#[derive(Debug, Default)]
pub struct ShellRunner {
    /// `pushd` stack, most recent first. The working directory itself is
    /// not stored.
    stack: VecDeque<PathBuf>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `line` as a built-in. `None` when it is not one.
    pub fn builtin(&mut self, line: &str) -> Option<anyhow::Result<Builtin>> {
        let line = line.trim();
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let arg = unquote(arg);
        let result = match name {
            "cd" if arg.is_empty() => cwd().map(|dir| Builtin::Output(display(&dir))),
            "cd" => change_dir(arg).map(|_| Builtin::Silent),
            "pushd" => self.pushd(arg),
            "popd" => self.popd(),
            "dirs" => self.dirs().map(Builtin::Output),
            "exit" => Ok(Builtin::Exit),
            _ => return None,
        };
        Some(result)
    }

    fn pushd(&mut self, arg: &str) -> anyhow::Result<Builtin> {
        let here = cwd()?;
        if arg.is_empty() {
            let Some(top) = self.stack.pop_front() else {
                anyhow::bail!("pushd: no other directory");
            };
            change_dir_path(&top)?;
            self.stack.push_front(here);
        } else {
            change_dir(arg)?;
            self.stack.push_front(here);
        }
        self.dirs().map(Builtin::Output)
    }

    fn popd(&mut self) -> anyhow::Result<Builtin> {
        let Some(top) = self.stack.front().cloned() else {
            anyhow::bail!("popd: directory stack empty");
        };
        change_dir_path(&top)?;
        self.stack.pop_front();
        self.dirs().map(Builtin::Output)
    }

    /// Working directory followed by the stack, space separated.
    fn dirs(&self) -> anyhow::Result<String> {
        let mut parts = vec![display(&cwd()?)];
        parts.extend(self.stack.iter().map(|p| display(p)));
        Ok(parts.join(" "))
    }

    async fn spawn(&self, command: &str) -> anyhow::Result<()> {
        let (shell, flag) = SHELL;
        let status = Command::new(shell)
            .arg(flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("spawning {shell}"))?;
        tracing::info!(%command, code = ?status.code(), "command finished");
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run_user_command(&mut self, command: &str) -> anyhow::Result<CommandOutcome> {
        if command.trim().is_empty() {
            return Ok(CommandOutcome::Completed { record: false });
        }

        match self.builtin(command) {
            Some(Ok(Builtin::Exit)) => return Ok(CommandOutcome::Exit),
            Some(Ok(Builtin::Output(text))) => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{text}")?;
                out.flush()?;
            }
            Some(Ok(Builtin::Silent)) => {}
            Some(Err(err)) => {
                eprintln!("{err}");
            }
            None => self.spawn(command).await?,
        }
        Ok(CommandOutcome::Completed { record: true })
    }
}

fn cwd() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("reading working directory")
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn change_dir(arg: &str) -> anyhow::Result<()> {
    change_dir_path(&expand_home(arg))
}

fn change_dir_path(path: &Path) -> anyhow::Result<()> {
    std::env::set_current_dir(path)
        .map_err(|_| CarouselError::NoSuchDirectory(display(path)))?;
    Ok(())
}

/// `~` and `~/x` resolve against the home directory.
fn expand_home(arg: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (arg, home) {
        ("~", Some(home)) => home,
        (arg, Some(home)) if arg.starts_with("~/") => home.join(&arg[2..]),
        (arg, _) => PathBuf::from(arg),
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(arg: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = arg.strip_prefix(quote).and_then(|a| a.strip_suffix(quote)) {
            return inner;
        }
    }
    arg
}
