//! Artifact identity.
//!
//! An [`ArtifactSpec`] names one file a target is expected to produce. The name
//! is a template that usually embeds the version of the package the file
//! belongs to (`Acme.NET.Sdk.$${version}.nupkg`); resolution substitutes the
//! version from [`VersionMetadata`] and joins the result under the output
//! directory. Resolution is pure: the filesystem is never touched.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BuildConfig, Configuration};
use crate::metadata::VersionMetadata;
use crate::placeholder::{self, PlaceholderError, TemplateContext};

/// A declared output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSpec {
  /// File name template.
  pub template: String,

  /// Package whose version `$${version}` refers to.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package: Option<String>,

  /// Output directory. Relative directories live under the output root.
  #[serde(rename = "dir", default)]
  pub output_dir: PathBuf,

  /// Configurations this artifact is produced in. Empty means all of them.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub configurations: Vec<Configuration>,
}

impl ArtifactSpec {
  /// An artifact whose name does not depend on a package version.
  pub fn new(template: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      template: template.into(),
      package: None,
      output_dir: output_dir.into(),
      configurations: Vec::new(),
    }
  }

  /// An artifact named after a package version.
  pub fn versioned(package: impl Into<String>, template: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      package: Some(package.into()),
      ..Self::new(template, output_dir)
    }
  }

  /// Restrict the artifact to one more configuration.
  pub fn only_in(mut self, configuration: Configuration) -> Self {
    self.configurations.push(configuration);
    self
  }

  /// Whether the artifact is expected under the given configuration.
  pub fn is_active(&self, configuration: Configuration) -> bool {
    self.configurations.is_empty() || self.configurations.contains(&configuration)
  }
}

/// Errors raised while resolving artifact paths.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("missing version for package '{package}' (artifact '{template}')")]
  MissingVersion { package: String, template: String },

  #[error("artifact '{template}' uses a version placeholder but names no package")]
  NoPackage { template: String },

  #[error("invalid artifact template '{template}': {source}")]
  Placeholder {
    template: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("artifact '{template}' resolves to '{name}', which is not a single file name")]
  InvalidName { template: String, name: String },
}

/// Resolve one artifact to its absolute path.
///
/// # Errors
///
/// Fails with [`ResolveError::MissingVersion`] when the referenced package has
/// no version, and never produces a path with the placeholder left in.
pub fn resolve(spec: &ArtifactSpec, versions: &VersionMetadata, config: &BuildConfig) -> Result<PathBuf, ResolveError> {
  let context = TemplateContext {
    versions,
    package: spec.package.as_deref(),
    config,
  };

  let name = placeholder::substitute(&spec.template, &context).map_err(|e| match e {
    PlaceholderError::UnresolvedVersion(package) => ResolveError::MissingVersion {
      package,
      template: spec.template.clone(),
    },
    PlaceholderError::NoPackage => ResolveError::NoPackage {
      template: spec.template.clone(),
    },
    source => ResolveError::Placeholder {
      template: spec.template.clone(),
      source,
    },
  })?;

  if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
    return Err(ResolveError::InvalidName {
      template: spec.template.clone(),
      name,
    });
  }

  Ok(config.output_root().join(&spec.output_dir).join(name))
}

/// Resolve every artifact active under the config's configuration, in
/// declaration order.
pub fn resolve_all(
  specs: &[ArtifactSpec],
  versions: &VersionMetadata,
  config: &BuildConfig,
) -> Result<Vec<PathBuf>, ResolveError> {
  specs
    .iter()
    .filter(|spec| spec.is_active(config.configuration()))
    .map(|spec| resolve(spec, versions, config))
    .collect()
}
