//! Implementation of the `kiln plan` command.
//!
//! Prints the targets in execution order with their dependencies, the command
//! each would run, and the outputs it is expected to produce.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use kiln_lib::artifact;

use super::PlanFileArgs;
use crate::output::{OutputFormat, Status, print_json, print_stat, print_status};

#[derive(Args, Debug)]
pub struct PlanArgs {
  #[command(flatten)]
  pub plan: PlanFileArgs,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
  platform: String,
  configuration: String,
  output_root: String,
  versions: Vec<VersionOutput>,
  targets: Vec<TargetOutput>,
}

#[derive(Debug, Serialize)]
struct VersionOutput {
  package: String,
  version: String,
}

#[derive(Debug, Serialize)]
struct TargetOutput {
  name: String,
  depends_on: Vec<String>,
  command: String,
  configuration: String,
  always_rebuild: bool,
  outputs: Vec<OutputEntry>,
}

#[derive(Debug, Serialize)]
struct OutputEntry {
  path: String,
  exists: bool,
}

pub fn cmd_plan(args: &PlanArgs, format: OutputFormat) -> Result<()> {
  let (build, plan) = args.plan.load()?;

  let order = plan
    .graph
    .topological_order()
    .map_err(kiln_lib::Error::from)
    .context("Cannot order targets")?;

  let mut targets = Vec::with_capacity(order.len());
  for target in order {
    let config = target.effective_config(&build);
    let paths = artifact::resolve_all(target.outputs(), &plan.versions, &config)
      .map_err(kiln_lib::Error::from)
      .with_context(|| format!("Cannot resolve outputs of target '{}'", target.name()))?;

    let depends_on = plan
      .graph
      .dependencies(target.name())
      .map_err(kiln_lib::Error::from)?
      .iter()
      .map(|dep| dep.name().to_string())
      .collect();

    targets.push(TargetOutput {
      name: target.name().to_string(),
      depends_on,
      command: target.action().command_line(),
      configuration: config.configuration().to_string(),
      always_rebuild: target.action().is_always_rebuild(),
      outputs: paths
        .iter()
        .map(|p| OutputEntry {
          path: p.display().to_string(),
          exists: p.exists(),
        })
        .collect(),
    });
  }

  let result = PlanOutput {
    platform: build.platform().to_string(),
    configuration: build.configuration().to_string(),
    output_root: build.output_root().display().to_string(),
    versions: plan
      .versions
      .iter()
      .map(|(package, version)| VersionOutput {
        package: package.to_string(),
        version: version.to_string(),
      })
      .collect(),
    targets,
  };

  if format.is_json() {
    return print_json(&result);
  }

  print_status(
    Status::Skipped,
    &format!("{} target(s) in execution order", result.targets.len()),
  );
  print_stat("Platform", &result.platform);
  print_stat("Configuration", &result.configuration);
  print_stat("Output", &result.output_root);
  for version in &result.versions {
    print_stat(&version.package, &version.version);
  }

  for (index, target) in result.targets.iter().enumerate() {
    println!();
    println!("{}. {}", index + 1, target.name);
    if !target.depends_on.is_empty() {
      print_stat("after", &target.depends_on.join(", "));
    }
    print_stat("run", &target.command);
    for entry in &target.outputs {
      let marker = if entry.exists {
        Status::Done.symbol()
      } else {
        Status::Pending.symbol()
      };
      println!("    {} {}", marker, entry.path);
    }
  }

  Ok(())
}
