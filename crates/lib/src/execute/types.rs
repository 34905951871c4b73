//! Types for target execution.
//!
//! This module defines the error type, the per-run configuration and the
//! report produced by the [`Executor`](super::Executor).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::artifact::ResolveError;
use crate::graph::GraphError;

/// Errors that abort a build run.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The external toolchain exited unsuccessfully or could not be started.
  #[error("target '{target}' failed: `{command}` {}{}", describe_code(.code), indent(.diagnostics))]
  ActionFailed {
    target: String,
    command: String,
    code: Option<i32>,
    diagnostics: String,
  },

  /// The action succeeded but did not produce every declared output.
  #[error("target '{target}' did not produce expected outputs: {}", join_paths(.paths))]
  MissingOutput { target: String, paths: Vec<PathBuf> },

  /// A declared output could not be resolved to a path.
  #[error("cannot resolve outputs of target '{target}': {source}")]
  Resolve {
    target: String,
    #[source]
    source: ResolveError,
  },

  /// The graph could not be ordered.
  #[error(transparent)]
  Graph(#[from] GraphError),
}

impl ExecuteError {
  /// Name of the target the error is attributed to, if any.
  pub fn target(&self) -> Option<&str> {
    match self {
      ExecuteError::ActionFailed { target, .. }
      | ExecuteError::MissingOutput { target, .. }
      | ExecuteError::Resolve { target, .. } => Some(target),
      ExecuteError::Graph(_) => None,
    }
  }
}

fn describe_code(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exited with status {code}"),
    None => "did not complete".to_string(),
  }
}

fn indent(diagnostics: &str) -> String {
  let trimmed = diagnostics.trim();
  if trimmed.is_empty() {
    return String::new();
  }
  trimmed.lines().fold(String::new(), |mut out, line| {
    out.push_str("\n  ");
    out.push_str(line);
    out
  })
}

fn join_paths(paths: &[PathBuf]) -> String {
  paths
    .iter()
    .map(|p| p.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Configuration for a build run.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of actions running at once. `1` runs strictly in
  /// topological order.
  pub jobs: usize,

  /// Treat every target as always-rebuild.
  pub force: bool,

  /// Decide and report, but never invoke an action.
  pub dry_run: bool,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      jobs: 1,
      force: false,
      dry_run: false,
    }
  }
}

impl ExecuteConfig {
  /// Set how many actions may run at once. `0` means one per CPU.
  pub fn with_jobs(mut self, jobs: usize) -> Self {
    self.jobs = if jobs == 0 { num_cpus() } else { jobs };
    self
  }
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// What happened to a target during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOutcome {
  /// The action ran and produced every expected output.
  Built,
  /// Every expected output already existed; the action was skipped.
  Cached,
  /// Dry run: the action would have been invoked.
  WouldBuild,
}

impl fmt::Display for TargetOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TargetOutcome::Built => "built",
      TargetOutcome::Cached => "cached",
      TargetOutcome::WouldBuild => "would build",
    })
  }
}

/// Result of processing one target.
#[derive(Debug, Clone)]
pub struct TargetReport {
  pub name: String,
  pub outcome: TargetOutcome,
  /// Expected outputs, in declaration order.
  pub outputs: Vec<PathBuf>,
  pub duration: Duration,
}

/// Result of a successful run: every target, in completion order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
  targets: Vec<TargetReport>,
}

impl RunReport {
  pub(crate) fn push(&mut self, report: TargetReport) {
    self.targets.push(report);
  }

  pub fn targets(&self) -> &[TargetReport] {
    &self.targets
  }

  /// Outcome recorded for a target.
  pub fn outcome(&self, name: &str) -> Option<TargetOutcome> {
    self.targets.iter().find(|t| t.name == name).map(|t| t.outcome)
  }

  /// Target names in completion order.
  pub fn order(&self) -> Vec<&str> {
    self.targets.iter().map(|t| t.name.as_str()).collect()
  }

  pub fn count(&self, outcome: TargetOutcome) -> usize {
    self.targets.iter().filter(|t| t.outcome == outcome).count()
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }
}
