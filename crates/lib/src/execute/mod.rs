//! Target execution.
//!
//! The [`Executor`] walks a [`TargetGraph`] in dependency order. For every
//! target it:
//! 1. Resolves the declared artifacts to expected output paths
//! 2. Skips the action if it is not always-rebuild and every output exists
//! 3. Otherwise invokes the action through an [`ActionRunner`]
//! 4. Verifies every expected output exists afterwards
//!
//! The first failure aborts the run. With `jobs > 1`, independent targets run
//! concurrently on a [`JoinSet`], throttled by a [`Semaphore`].

pub mod runner;
pub mod types;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::artifact;
use crate::config::BuildConfig;
use crate::graph::TargetGraph;
use crate::metadata::VersionMetadata;
use crate::target::BuildTarget;

pub use runner::{ActionOutput, ActionRunner, ProcessRunner};
pub use types::{ExecuteConfig, ExecuteError, RunReport, TargetOutcome, TargetReport};

/// Why a target's action is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
  AlwaysRebuild,
  Forced,
  /// The target declares no outputs active in this configuration.
  NoOutputs,
  /// These expected outputs do not exist.
  Missing(Vec<PathBuf>),
}

impl fmt::Display for RebuildReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RebuildReason::AlwaysRebuild => f.write_str("always rebuild"),
      RebuildReason::Forced => f.write_str("forced"),
      RebuildReason::NoOutputs => f.write_str("no declared outputs"),
      RebuildReason::Missing(paths) => write!(f, "{} output(s) missing", paths.len()),
    }
  }
}

/// The cache decision for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Cached,
  Run(RebuildReason),
}

#[derive(Debug)]
struct TargetPlan {
  outputs: Vec<PathBuf>,
  decision: Decision,
  started: Instant,
}

impl TargetPlan {
  /// Directories the target writes into.
  fn dirs(&self) -> impl Iterator<Item = &Path> {
    self.outputs.iter().filter_map(|p| p.parent())
  }
}

/// Runs the targets of a graph.
pub struct Executor<R = ProcessRunner> {
  runner: Arc<R>,
  versions: VersionMetadata,
  build: BuildConfig,
  config: ExecuteConfig,
}

impl Executor<ProcessRunner> {
  /// An executor that spawns real processes.
  pub fn new(versions: VersionMetadata, build: BuildConfig) -> Self {
    Self::with_runner(Arc::new(ProcessRunner), versions, build)
  }
}

impl<R: ActionRunner + 'static> Executor<R> {
  pub fn with_runner(runner: Arc<R>, versions: VersionMetadata, build: BuildConfig) -> Self {
    Self {
      runner,
      versions,
      build,
      config: ExecuteConfig::default(),
    }
  }

  pub fn with_config(mut self, config: ExecuteConfig) -> Self {
    self.config = config;
    self
  }

  /// Expected output paths of a target, resolved under the configuration the
  /// target's action selects.
  pub fn expected_outputs(&self, target: &BuildTarget) -> Result<Vec<PathBuf>, ExecuteError> {
    let config = target.effective_config(&self.build);
    artifact::resolve_all(target.outputs(), &self.versions, &config).map_err(|source| ExecuteError::Resolve {
      target: target.name().to_string(),
      source,
    })
  }

  /// Decide whether a target's action has to run.
  pub fn decide(&self, target: &BuildTarget) -> Result<Decision, ExecuteError> {
    self.plan(target).map(|plan| plan.decision)
  }

  fn plan(&self, target: &BuildTarget) -> Result<TargetPlan, ExecuteError> {
    let started = Instant::now();
    let outputs = self.expected_outputs(target)?;

    let decision = if target.action().is_always_rebuild() {
      Decision::Run(RebuildReason::AlwaysRebuild)
    } else if self.config.force {
      Decision::Run(RebuildReason::Forced)
    } else if outputs.is_empty() {
      Decision::Run(RebuildReason::NoOutputs)
    } else {
      let missing = missing_paths(&outputs);
      if missing.is_empty() {
        Decision::Cached
      } else {
        debug!(target_name = %target.name(), missing = ?missing, "expected outputs not found");
        Decision::Run(RebuildReason::Missing(missing))
      }
    };

    match &decision {
      Decision::Cached => info!(target_name = %target.name(), outputs = outputs.len(), "outputs present, skipping action"),
      Decision::Run(reason) if self.config.dry_run => {
        info!(target_name = %target.name(), reason = %reason, "dry run, action not invoked")
      }
      Decision::Run(reason) => info!(target_name = %target.name(), reason = %reason, "action required"),
    }

    Ok(TargetPlan {
      outputs,
      decision,
      started,
    })
  }

  /// Whether a planned target needs a worker.
  fn invokes(&self, plan: &TargetPlan) -> bool {
    matches!(plan.decision, Decision::Run(_)) && !self.config.dry_run
  }

  /// Run every target of the graph.
  ///
  /// # Errors
  ///
  /// Fails on the first cycle, unresolvable artifact, failed action or
  /// missing output. Nothing is retried.
  pub async fn run(&self, graph: &TargetGraph) -> Result<RunReport, ExecuteError> {
    let order = graph.topological_order()?;

    info!(
      target_count = order.len(),
      jobs = self.config.jobs,
      dry_run = self.config.dry_run,
      "starting build"
    );

    let report = if self.config.jobs > 1 {
      self.run_parallel(graph).await?
    } else {
      self.run_sequential(&order).await?
    };

    info!(
      built = report.count(TargetOutcome::Built),
      cached = report.count(TargetOutcome::Cached),
      would_build = report.count(TargetOutcome::WouldBuild),
      "build complete"
    );

    Ok(report)
  }

  async fn run_sequential(&self, order: &[&BuildTarget]) -> Result<RunReport, ExecuteError> {
    let mut report = RunReport::default();

    for target in order {
      let plan = self.plan(target)?;

      let outcome = if !self.invokes(&plan) {
        settled_outcome(&plan)
      } else {
        log_launch(target, &plan);
        let result = self.runner.run(target.action()).await;
        check_completion(target, result, &plan.outputs)?;
        TargetOutcome::Built
      };

      report.push(TargetReport {
        name: target.name().to_string(),
        outcome,
        outputs: plan.outputs,
        duration: plan.started.elapsed(),
      });
    }

    Ok(report)
  }

  /// Readiness-counter scheduler.
  ///
  /// The coordinator owns all bookkeeping; workers only run actions. A ready
  /// target is launched in registration order unless one of its output
  /// directories is held by a running target.
  async fn run_parallel(&self, graph: &TargetGraph) -> Result<RunReport, ExecuteError> {
    let targets: Vec<&BuildTarget> = graph.targets().collect();
    let position: HashMap<&str, usize> = targets.iter().enumerate().map(|(i, t)| (t.name(), i)).collect();

    let mut remaining = Vec::with_capacity(targets.len());
    let mut dependents = vec![Vec::new(); targets.len()];
    for (i, target) in targets.iter().enumerate() {
      let deps = graph.dependencies(target.name())?;
      remaining.push(deps.len());
      for dep in deps {
        dependents[position[dep.name()]].push(i);
      }
    }

    let mut ready: BTreeSet<usize> = (0..targets.len()).filter(|&i| remaining[i] == 0).collect();
    let mut plans: HashMap<usize, TargetPlan> = HashMap::new();
    let mut held: HashSet<PathBuf> = HashSet::new();
    let mut running: HashMap<usize, TargetPlan> = HashMap::new();
    let mut tasks: JoinSet<(usize, io::Result<ActionOutput>)> = JoinSet::new();
    let semaphore = Arc::new(Semaphore::new(self.config.jobs));
    let mut report = RunReport::default();
    let mut failure: Option<ExecuteError> = None;

    loop {
      // Launch everything that can start now.
      while failure.is_none() {
        let mut next = None;

        for &pos in &ready {
          if !plans.contains_key(&pos) {
            match self.plan(targets[pos]) {
              Ok(plan) => {
                plans.insert(pos, plan);
              }
              Err(e) => {
                failure = Some(e);
                break;
              }
            }
          }

          let plan = &plans[&pos];
          if !self.invokes(plan) {
            next = Some((pos, None));
            break;
          }
          if plan.dirs().any(|dir| held.contains(dir)) {
            debug!(target_name = %targets[pos].name(), "output directory busy, deferring");
            continue;
          }
          if let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() {
            next = Some((pos, Some(permit)));
            break;
          }
        }

        let Some((pos, permit)) = next else {
          break;
        };
        ready.remove(&pos);
        let Some(plan) = plans.remove(&pos) else {
          continue;
        };
        let target = targets[pos];

        match permit {
          None => {
            report.push(TargetReport {
              name: target.name().to_string(),
              outcome: settled_outcome(&plan),
              outputs: plan.outputs,
              duration: plan.started.elapsed(),
            });
            release(pos, &dependents, &mut remaining, &mut ready);
          }
          Some(permit) => {
            held.extend(plan.dirs().map(Path::to_path_buf));
            log_launch(target, &plan);

            let runner = Arc::clone(&self.runner);
            let action = target.action().clone();
            tasks.spawn(async move {
              let _permit = permit;
              (pos, runner.run(&action).await)
            });

            running.insert(pos, plan);
          }
        }
      }

      let Some(joined) = tasks.join_next().await else {
        break;
      };

      // tasks are never aborted, so a join error is a panic in the runner
      let (pos, result) = match joined {
        Ok(done) => done,
        Err(e) => {
          error!(error = %e, "worker task panicked");
          std::panic::resume_unwind(e.into_panic());
        }
      };

      let Some(plan) = running.remove(&pos) else {
        continue;
      };
      let target = targets[pos];

      for dir in plan.dirs() {
        held.remove(dir);
      }

      match check_completion(target, result, &plan.outputs) {
        Ok(()) => {
          report.push(TargetReport {
            name: target.name().to_string(),
            outcome: TargetOutcome::Built,
            outputs: plan.outputs,
            duration: plan.started.elapsed(),
          });
          release(pos, &dependents, &mut remaining, &mut ready);
        }
        Err(e) if failure.is_none() => {
          info!(running = running.len(), "stopping new launches after failure");
          failure = Some(e);
        }
        Err(e) => warn!(error = %e, "additional failure while draining"),
      }
    }

    match failure {
      Some(e) => Err(e),
      None => Ok(report),
    }
  }
}

fn log_launch(target: &BuildTarget, plan: &TargetPlan) {
  if let Decision::Run(reason) = &plan.decision {
    info!(target_name = %target.name(), reason = %reason, "running action");
  }
}

/// Outcome of a target whose action is not invoked.
fn settled_outcome(plan: &TargetPlan) -> TargetOutcome {
  match plan.decision {
    Decision::Cached => TargetOutcome::Cached,
    Decision::Run(_) => TargetOutcome::WouldBuild,
  }
}

/// Mark a target complete and queue dependents whose dependencies are all
/// complete.
fn release(pos: usize, dependents: &[Vec<usize>], remaining: &mut [usize], ready: &mut BTreeSet<usize>) {
  for &dependent in &dependents[pos] {
    remaining[dependent] -= 1;
    if remaining[dependent] == 0 {
      ready.insert(dependent);
    }
  }
}

fn missing_paths(outputs: &[PathBuf]) -> Vec<PathBuf> {
  outputs.iter().filter(|p| !p.exists()).cloned().collect()
}

/// Turn an action result into success or the error it represents, then check
/// the expected outputs.
fn check_completion(
  target: &BuildTarget,
  result: io::Result<ActionOutput>,
  outputs: &[PathBuf],
) -> Result<(), ExecuteError> {
  let output = match result {
    Ok(output) => output,
    Err(e) => {
      error!(target_name = %target.name(), error = %e, "failed to start action");
      return Err(ExecuteError::ActionFailed {
        target: target.name().to_string(),
        command: target.action().command_line(),
        code: None,
        diagnostics: e.to_string(),
      });
    }
  };

  if !output.success {
    error!(target_name = %target.name(), code = ?output.code, "action failed");
    return Err(ExecuteError::ActionFailed {
      target: target.name().to_string(),
      command: target.action().command_line(),
      code: output.code,
      diagnostics: output.diagnostics().to_string(),
    });
  }

  let missing = missing_paths(outputs);
  if !missing.is_empty() {
    error!(target_name = %target.name(), missing = ?missing, "action did not produce expected outputs");
    return Err(ExecuteError::MissingOutput {
      target: target.name().to_string(),
      paths: missing,
    });
  }

  Ok(())
}
