//! Plan file loading.
//!
//! Turns a [`Manifest`] into the objects a build runs on: the loaded
//! [`VersionMetadata`] and a validated [`TargetGraph`].

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::graph::{GraphError, TargetGraph};
use crate::metadata::{MetadataError, VersionMetadata};
use crate::placeholder::PlaceholderError;
use crate::target::BuildTarget;

/// Errors raised while loading a plan file.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read plan file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid plan file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error(transparent)]
  Metadata(#[from] MetadataError),

  #[error("invalid action for target '{target}': {source}")]
  Action {
    target: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("target '{target}' has an invalid dependency: {source}")]
  Dependency {
    target: String,
    #[source]
    source: GraphError,
  },

  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// Everything a build runs on.
#[derive(Debug, Clone)]
pub struct BuildPlan {
  pub versions: VersionMetadata,
  pub graph: TargetGraph,
}

impl Manifest {
  /// Read and parse a JSON plan file.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let manifest: Manifest = serde_json::from_str(&text).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    debug!(path = ?path, targets = manifest.targets.len(), "loaded plan file");
    Ok(manifest)
  }

  /// Load the version metadata the plan points at. A plan without a metadata
  /// section yields empty metadata.
  pub fn load_versions(&self, base_dir: &Path) -> Result<VersionMetadata, ManifestError> {
    match &self.metadata {
      Some(def) => Ok(VersionMetadata::load(&base_dir.join(&def.path), &def.version_fields())?),
      None => Ok(VersionMetadata::default()),
    }
  }

  /// Build the target graph.
  ///
  /// All targets are registered first, then every declared dependency, so
  /// declaration order does not constrain which targets may be named. The
  /// result is checked for cycles before it is returned.
  pub fn to_graph(
    &self,
    versions: &VersionMetadata,
    config: &BuildConfig,
    base_dir: &Path,
  ) -> Result<TargetGraph, ManifestError> {
    let mut graph = TargetGraph::new();

    for def in &self.targets {
      let action = def
        .action
        .instantiate(versions, config, base_dir)
        .map_err(|source| ManifestError::Action {
          target: def.name.clone(),
          source,
        })?;

      graph.add_target(BuildTarget::new(def.name.clone(), action).with_outputs(def.outputs.iter().cloned()))?;
    }

    for def in &self.targets {
      for dep in &def.depends_on {
        graph
          .add_dependency(&def.name, dep)
          .map_err(|source| ManifestError::Dependency {
            target: def.name.clone(),
            source,
          })?;
      }
    }

    graph.validate()?;
    Ok(graph)
  }

  /// Load metadata and build the graph in one step.
  pub fn plan(&self, config: &BuildConfig, base_dir: &Path) -> Result<BuildPlan, ManifestError> {
    let versions = self.load_versions(base_dir)?;
    let graph = self.to_graph(&versions, config, base_dir)?;

    info!(
      targets = graph.len(),
      packages = versions.len(),
      platform = %config.platform(),
      configuration = %config.configuration(),
      "build plan ready"
    );

    Ok(BuildPlan { versions, graph })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Configuration;
  use crate::graph::Cycle;
  use tempfile::TempDir;

  const PLAN: &str = r#"{
    "metadata": {
      "path": "versions.json",
      "fields": { "pkgA": "pkgA" }
    },
    "targets": [
      {
        "name": "T2",
        "depends_on": ["T1"],
        "outputs": [{ "template": "pkgB.bin", "dir": "out" }],
        "action": { "program": "make", "args": ["pkgB", "PLATFORM=$${platform}"], "cwd": "src" }
      },
      {
        "name": "T1",
        "outputs": [{ "template": "pkgA-$${version}.pkg", "package": "pkgA", "dir": "out" }],
        "action": { "program": "make", "args": ["pkgA", "VERSION=$${version:pkgA}"], "configuration": "release" }
      }
    ]
  }"#;

  fn write_plan(temp: &TempDir, plan: &str) -> PathBuf {
    let path = temp.path().join("kiln.json");
    std::fs::write(&path, plan).unwrap();
    std::fs::write(temp.path().join("versions.json"), r#"{ "pkgA": "1.0.0" }"#).unwrap();
    path
  }

  fn config(temp: &TempDir) -> BuildConfig {
    BuildConfig::new("linuxbsd", Configuration::Debug, temp.path().join("bin")).unwrap()
  }

  fn names(graph: &TargetGraph) -> Vec<String> {
    graph
      .topological_order()
      .unwrap()
      .iter()
      .map(|t| t.name().to_string())
      .collect()
  }

  #[test]
  fn load_and_plan() {
    let temp = TempDir::new().unwrap();
    let path = write_plan(&temp, PLAN);

    let manifest = Manifest::load(&path).unwrap();
    let plan = manifest.plan(&config(&temp), temp.path()).unwrap();

    assert_eq!(plan.versions.get("pkgA"), Some("1.0.0"));
    assert_eq!(names(&plan.graph), vec!["T1", "T2"]);

    let t1 = plan.graph.get("T1").unwrap();
    assert_eq!(t1.action().args(), &["pkgA", "VERSION=1.0.0"]);
    assert_eq!(t1.action().configuration(), Some(Configuration::Release));

    let t2 = plan.graph.get("T2").unwrap();
    assert_eq!(t2.action().args(), &["pkgB", "PLATFORM=linuxbsd"]);
    assert_eq!(t2.action().cwd(), Some(temp.path().join("src").as_path()));
    assert_eq!(t2.outputs().len(), 1);
  }

  #[test]
  fn plan_without_metadata() {
    let manifest: Manifest = serde_json::from_str(
      r#"{ "targets": [{ "name": "lint", "action": { "program": "cargo", "args": ["clippy"] } }] }"#,
    )
    .unwrap();
    let temp = TempDir::new().unwrap();

    let plan = manifest.plan(&config(&temp), temp.path()).unwrap();

    assert!(plan.versions.is_empty());
    assert_eq!(plan.graph.len(), 1);
  }

  #[test]
  fn cyclic_plan_is_rejected() {
    let manifest: Manifest = serde_json::from_str(
      r#"{ "targets": [
        { "name": "A", "depends_on": ["B"], "action": { "program": "true" } },
        { "name": "B", "depends_on": ["A"], "action": { "program": "true" } }
      ] }"#,
    )
    .unwrap();
    let temp = TempDir::new().unwrap();

    let err = manifest
      .to_graph(&VersionMetadata::default(), &config(&temp), temp.path())
      .unwrap_err();

    assert!(matches!(
      err,
      ManifestError::Graph(GraphError::CyclicDependency(Cycle(ref members))) if members == &["A", "B"]
    ));
  }

  #[test]
  fn unknown_dependency_names_the_declaring_target() {
    let manifest: Manifest = serde_json::from_str(
      r#"{ "targets": [{ "name": "app", "depends_on": ["lib"], "action": { "program": "true" } }] }"#,
    )
    .unwrap();
    let temp = TempDir::new().unwrap();

    let err = manifest
      .to_graph(&VersionMetadata::default(), &config(&temp), temp.path())
      .unwrap_err();

    assert_eq!(
      err.to_string(),
      "target 'app' has an invalid dependency: unknown target: lib"
    );
  }

  #[test]
  fn duplicate_target_is_rejected() {
    let manifest: Manifest = serde_json::from_str(
      r#"{ "targets": [
        { "name": "sdk", "action": { "program": "true" } },
        { "name": "sdk", "action": { "program": "true" } }
      ] }"#,
    )
    .unwrap();
    let temp = TempDir::new().unwrap();

    let err = manifest
      .to_graph(&VersionMetadata::default(), &config(&temp), temp.path())
      .unwrap_err();

    assert!(matches!(err, ManifestError::Graph(GraphError::DuplicateTarget(ref n)) if n == "sdk"));
  }

  #[test]
  fn action_with_unknown_package_fails() {
    let manifest: Manifest = serde_json::from_str(
      r#"{ "targets": [{ "name": "sdk", "action": { "program": "pack", "args": ["$${version:Acme.Sdk}"] } }] }"#,
    )
    .unwrap();
    let temp = TempDir::new().unwrap();

    let err = manifest
      .to_graph(&VersionMetadata::default(), &config(&temp), temp.path())
      .unwrap_err();

    assert!(matches!(
      err,
      ManifestError::Action { ref target, source: PlaceholderError::UnresolvedVersion(_) } if target == "sdk"
    ));
  }

  #[test]
  fn missing_metadata_field() {
    let temp = TempDir::new().unwrap();
    let path = write_plan(&temp, &PLAN.replace(r#""pkgA": "pkgA""#, r#""pkgA": "PackageVersion_pkgA""#));

    let err = Manifest::load(&path).unwrap().plan(&config(&temp), temp.path()).unwrap_err();

    assert!(matches!(err, ManifestError::Metadata(MetadataError::MissingField(ref f)) if f == "PackageVersion_pkgA"));
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write_plan(&temp, r#"{ "targets": [], "extra": true }"#);

    let err = Manifest::load(&path).unwrap_err();

    assert!(matches!(err, ManifestError::Parse { .. }));
  }

  #[test]
  fn misspelled_action_key_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write_plan(
      &temp,
      r#"{ "targets": [{ "name": "sdk", "action": { "program": "make", "always_rebuld": true } }] }"#,
    );

    let err = Manifest::load(&path).unwrap_err();

    assert!(matches!(err, ManifestError::Parse { .. }));
    assert!(err.to_string().contains("always_rebuld"));
  }

  #[test]
  fn misspelled_output_key_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write_plan(
      &temp,
      r#"{ "targets": [{
        "name": "sdk",
        "outputs": [{ "template": "Acme.Sdk.nupkg", "dri": "Tools/nupkgs" }],
        "action": { "program": "make" }
      }] }"#,
    );

    let err = Manifest::load(&path).unwrap_err();

    assert!(matches!(err, ManifestError::Parse { .. }));
    assert!(err.to_string().contains("dri"));
  }

  #[test]
  fn missing_plan_file() {
    let temp = TempDir::new().unwrap();

    let err = Manifest::load(&temp.path().join("kiln.json")).unwrap_err();

    assert!(matches!(err, ManifestError::Read { .. }));
  }
}
