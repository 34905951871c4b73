//! Implementation of the `kiln build` command.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use kiln_lib::execute::{ExecuteConfig, Executor, RunReport, TargetOutcome};

use super::PlanFileArgs;
use crate::output::{OutputFormat, Status, format_duration, print_json, print_stat, print_status};

#[derive(Args, Debug)]
pub struct BuildArgs {
  #[command(flatten)]
  pub plan: PlanFileArgs,

  /// Number of actions to run at once (0 = one per CPU)
  #[arg(short, long, default_value_t = 1)]
  pub jobs: usize,

  /// Run every action, even when its outputs exist
  #[arg(short, long)]
  pub force: bool,

  /// Decide what would run without running it
  #[arg(long)]
  pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct BuildOutput {
  platform: String,
  configuration: String,
  output_root: String,
  dry_run: bool,
  built: usize,
  cached: usize,
  would_build: usize,
  elapsed_ms: u128,
  targets: Vec<TargetOutput>,
}

#[derive(Debug, Serialize)]
struct TargetOutput {
  name: String,
  outcome: TargetOutcome,
  outputs: Vec<String>,
  duration_ms: u128,
}

/// Execute the build command.
///
/// Loads the plan file, then runs every target in dependency order and prints
/// one line per target plus a summary.
pub fn cmd_build(args: &BuildArgs, format: OutputFormat) -> Result<()> {
  let (build, plan) = args.plan.load()?;

  let config = ExecuteConfig {
    force: args.force,
    dry_run: args.dry_run,
    ..ExecuteConfig::default()
  }
  .with_jobs(args.jobs);

  let platform = build.platform().to_string();
  let configuration = build.configuration().to_string();
  let output_root = build.output_root().display().to_string();
  let executor = Executor::new(plan.versions, build).with_config(config);

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(executor.run(&plan.graph))
    .map_err(kiln_lib::Error::from)
    .context("Build failed")?;
  let elapsed = started.elapsed();

  info!(targets = report.len(), elapsed = ?elapsed, "build finished");

  if format.is_json() {
    return print_json(&BuildOutput {
      platform,
      configuration,
      output_root,
      dry_run: args.dry_run,
      built: report.count(TargetOutcome::Built),
      cached: report.count(TargetOutcome::Cached),
      would_build: report.count(TargetOutcome::WouldBuild),
      elapsed_ms: elapsed.as_millis(),
      targets: report
        .targets()
        .iter()
        .map(|t| TargetOutput {
          name: t.name.clone(),
          outcome: t.outcome,
          outputs: t.outputs.iter().map(|p| p.display().to_string()).collect(),
          duration_ms: t.duration.as_millis(),
        })
        .collect(),
    });
  }

  print_report(&report);

  println!();
  let summary = if args.dry_run {
    format!(
      "Dry run complete: {} would build, {} cached",
      report.count(TargetOutcome::WouldBuild),
      report.count(TargetOutcome::Cached)
    )
  } else {
    format!(
      "Build complete: {} built, {} cached",
      report.count(TargetOutcome::Built),
      report.count(TargetOutcome::Cached)
    )
  };
  print_status(Status::Done, &summary);
  print_stat("Platform", &platform);
  print_stat("Configuration", &configuration);
  print_stat("Output", &output_root);
  print_stat("Elapsed", &format_duration(elapsed));

  Ok(())
}

fn print_report(report: &RunReport) {
  for target in report.targets() {
    match target.outcome {
      TargetOutcome::Built => print_status(
        Status::Done,
        &format!("{} built in {}", target.name, format_duration(target.duration)),
      ),
      TargetOutcome::Cached => print_status(Status::Skipped, &format!("{} cached", target.name)),
      TargetOutcome::WouldBuild => print_status(Status::Pending, &format!("{} would build", target.name)),
    }
  }
}
