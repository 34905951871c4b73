mod build;
mod plan;

pub use build::{BuildArgs, cmd_build};
pub use plan::{PlanArgs, cmd_plan};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use kiln_lib::config::{BuildConfig, CONFIGURATION_ENV, Configuration, OUT_DIR_ENV, PLATFORM_ENV};
use kiln_lib::manifest::{BuildPlan, Manifest};
use kiln_lib::platform;
use tracing::debug;

/// Options shared by every command that loads a plan file.
#[derive(Args, Debug)]
pub struct PlanFileArgs {
  /// Path to the plan file
  #[arg(default_value = "kiln.json")]
  pub file: PathBuf,

  /// Platform label passed to actions (default: the host platform)
  #[arg(long, env = PLATFORM_ENV)]
  pub platform: Option<String>,

  /// Build configuration
  #[arg(short, long, env = CONFIGURATION_ENV, default_value = "debug")]
  pub configuration: Configuration,

  /// Build output root (default: `bin` next to the plan file)
  #[arg(long, env = OUT_DIR_ENV)]
  pub out_dir: Option<PathBuf>,
}

impl PlanFileArgs {
  /// Assemble the build configuration from flags, environment and defaults.
  pub fn build_config(&self, base_dir: &Path) -> Result<BuildConfig> {
    let platform = self.platform.clone().unwrap_or_else(platform::host_label);
    let out_dir = self.out_dir.clone().unwrap_or_else(|| base_dir.join("bin"));

    BuildConfig::new(platform, self.configuration, out_dir)
      .map_err(kiln_lib::Error::from)
      .context("Invalid build configuration")
  }

  /// Load the plan file and everything it references.
  pub fn load(&self) -> Result<(BuildConfig, BuildPlan)> {
    let file = std::path::absolute(&self.file)
      .with_context(|| format!("Cannot resolve plan file path {}", self.file.display()))?;
    let base_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();

    let config = self.build_config(&base_dir)?;
    debug!(
      file = %file.display(),
      platform = %config.platform(),
      configuration = %config.configuration(),
      output_root = %config.output_root().display(),
      "loading plan"
    );

    let plan = Manifest::load(&file)
      .and_then(|manifest| manifest.plan(&config, &base_dir))
      .map_err(kiln_lib::Error::from)
      .with_context(|| format!("Failed to load plan {}", self.file.display()))?;

    Ok((config, plan))
  }
}
