//! Invoking the external toolchain.
//!
//! The executor never spawns processes itself; it hands each
//! [`ActionDescriptor`] to an [`ActionRunner`]. [`ProcessRunner`] is the real
//! one. Tests substitute a recording runner.

use std::future::Future;
use std::io;

use tokio::process::Command;
use tracing::{debug, info};

use crate::target::ActionDescriptor;

/// What an action produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutput {
  pub success: bool,
  /// Exit code, if the process exited normally.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl ActionOutput {
  /// A successful completion with no output.
  pub fn ok() -> Self {
    Self {
      success: true,
      code: Some(0),
      ..Self::default()
    }
  }

  /// An unsuccessful completion.
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      success: false,
      code: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  /// Diagnostic text for error reports: stderr, or stdout when stderr is
  /// empty.
  pub fn diagnostics(&self) -> &str {
    if self.stderr.trim().is_empty() {
      self.stdout.trim()
    } else {
      self.stderr.trim()
    }
  }
}

/// Runs one action to completion.
///
/// An `Err` means the process could not be started at all; a started process
/// that fails is an `Ok` with `success == false`.
pub trait ActionRunner: Send + Sync {
  fn run(&self, action: &ActionDescriptor) -> impl Future<Output = io::Result<ActionOutput>> + Send;
}

/// Spawns the action's program directly, without a shell.
///
/// The child inherits the current environment plus the descriptor's extra
/// variables, and its stdout and stderr are captured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ActionRunner for ProcessRunner {
  async fn run(&self, action: &ActionDescriptor) -> io::Result<ActionOutput> {
    info!(cmd = %action.command_line(), "executing action");

    let mut command = Command::new(action.program());
    command.args(action.args()).envs(action.env()).kill_on_drop(true);

    if let Some(cwd) = action.cwd() {
      command.current_dir(cwd);
    }

    debug!(program = ?action.program(), cwd = ?action.cwd(), "spawning process");

    let output = command.output().await?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !stderr.trim().is_empty() {
      debug!(stderr = %stderr.trim(), "action stderr");
    }
    if !stdout.trim().is_empty() {
      debug!(stdout = %stdout.trim(), "action stdout");
    }

    Ok(ActionOutput {
      success: output.status.success(),
      code: output.status.code(),
      stdout,
      stderr,
    })
  }
}
