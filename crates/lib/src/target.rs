//! Build targets and the actions that produce them.
//!
//! A [`BuildTarget`] is a named unit of work: the artifacts it declares and the
//! toolchain invocation that produces them. Dependencies between targets are
//! edges of the [`TargetGraph`](crate::graph::TargetGraph), not fields of the
//! target, so the graph stays the only place ordering is decided.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactSpec;
use crate::config::{BuildConfig, Configuration};
use crate::metadata::VersionMetadata;
use crate::placeholder::{self, PlaceholderError, TemplateContext};

/// How to invoke the external toolchain for one target.
///
/// Built once, then read-only: the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
  program: PathBuf,
  args: Vec<String>,
  cwd: Option<PathBuf>,
  configuration: Option<Configuration>,
  always_rebuild: bool,
  env: BTreeMap<String, String>,
}

impl ActionDescriptor {
  pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
      cwd: None,
      configuration: None,
      always_rebuild: false,
      env: BTreeMap::new(),
    }
  }

  pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
    self.cwd = Some(cwd.into());
    self
  }

  pub fn with_configuration(mut self, configuration: Configuration) -> Self {
    self.configuration = Some(configuration);
    self
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  /// Bypass existence-based skipping for this action.
  pub fn always_rebuild(mut self) -> Self {
    self.always_rebuild = true;
    self
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  pub fn args(&self) -> &[String] {
    &self.args
  }

  pub fn cwd(&self) -> Option<&Path> {
    self.cwd.as_deref()
  }

  /// Selected configuration label. `None` follows the build-wide one.
  pub fn configuration(&self) -> Option<Configuration> {
    self.configuration
  }

  pub fn is_always_rebuild(&self) -> bool {
    self.always_rebuild
  }

  pub fn env(&self) -> &BTreeMap<String, String> {
    &self.env
  }

  /// Human-readable command line, for logs and error messages.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.display().to_string())
      .chain(self.args.iter().cloned())
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Declarative form of an [`ActionDescriptor`] as written in a plan file.
///
/// Program, arguments, working directory and environment values may contain
/// `$${platform}`, `$${configuration}` and `$${version:<package>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionTemplate {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cwd: Option<String>,
  /// Pins the configuration regardless of the build-wide one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub configuration: Option<Configuration>,
  #[serde(default)]
  pub always_rebuild: bool,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

impl ActionTemplate {
  /// Bake the configuration into a concrete descriptor.
  ///
  /// A relative working directory is taken relative to `base_dir`.
  pub fn instantiate(
    &self,
    versions: &VersionMetadata,
    config: &BuildConfig,
    base_dir: &Path,
  ) -> Result<ActionDescriptor, PlaceholderError> {
    let config = match self.configuration {
      Some(pinned) => config.with_configuration(pinned),
      None => config.clone(),
    };
    let context = TemplateContext {
      versions,
      package: None,
      config: &config,
    };

    let program = placeholder::substitute(&self.program, &context)?;
    let args = self
      .args
      .iter()
      .map(|arg| placeholder::substitute(arg, &context))
      .collect::<Result<Vec<_>, _>>()?;

    let mut descriptor = ActionDescriptor::new(program, args).with_configuration(config.configuration());

    if let Some(cwd) = &self.cwd {
      descriptor = descriptor.with_cwd(base_dir.join(placeholder::substitute(cwd, &context)?));
    }

    for (key, value) in &self.env {
      descriptor = descriptor.with_env(key.clone(), placeholder::substitute(value, &context)?);
    }

    if self.always_rebuild {
      descriptor = descriptor.always_rebuild();
    }

    Ok(descriptor)
  }
}

/// A named unit of build work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
  name: String,
  outputs: Vec<ArtifactSpec>,
  action: ActionDescriptor,
}

impl BuildTarget {
  pub fn new(name: impl Into<String>, action: ActionDescriptor) -> Self {
    Self {
      name: name.into(),
      outputs: Vec::new(),
      action,
    }
  }

  pub fn with_output(mut self, spec: ArtifactSpec) -> Self {
    self.outputs.push(spec);
    self
  }

  pub fn with_outputs(mut self, specs: impl IntoIterator<Item = ArtifactSpec>) -> Self {
    self.outputs.extend(specs);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Declared output artifacts, in declaration order.
  pub fn outputs(&self) -> &[ArtifactSpec] {
    &self.outputs
  }

  pub fn action(&self) -> &ActionDescriptor {
    &self.action
  }

  /// The build config as seen by this target: its action may pin a
  /// configuration different from the build-wide one.
  pub fn effective_config(&self, config: &BuildConfig) -> BuildConfig {
    match self.action.configuration() {
      Some(configuration) => config.with_configuration(configuration),
      None => config.clone(),
    }
  }
}
