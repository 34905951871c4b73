//! Plan file types.
//!
//! A plan file describes everything a build needs: where the version metadata
//! lives, and every target with its outputs, action and dependencies.
//!
//! # Example
//!
//! ```json
//! {
//!   "metadata": {
//!     "path": "SdkPackageVersions.json",
//!     "fields": { "Acme.Sdk": "PropertyGroup.PackageVersion_Acme_Sdk" }
//!   },
//!   "targets": [
//!     {
//!       "name": "sdk",
//!       "outputs": [{ "template": "Acme.Sdk.$${version}.nupkg", "package": "Acme.Sdk", "dir": "Tools/nupkgs" }],
//!       "action": { "program": "dotnet", "args": ["build", "/p:Configuration=$${configuration}"] }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactSpec;
use crate::metadata::VersionField;
use crate::target::ActionTemplate;

/// The complete plan file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
  /// Version metadata source. Without it, no version placeholder resolves.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<MetadataDef>,

  /// Targets in registration order.
  #[serde(default)]
  pub targets: Vec<TargetDef>,
}

/// Where to read version metadata from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataDef {
  /// Metadata document; relative paths are taken from the plan file's
  /// directory.
  pub path: PathBuf,

  /// Package identifier to field path.
  #[serde(default)]
  pub fields: BTreeMap<String, String>,
}

impl MetadataDef {
  pub fn version_fields(&self) -> Vec<VersionField> {
    self
      .fields
      .iter()
      .map(|(package, field)| VersionField::new(package.clone(), field.clone()))
      .collect()
  }
}

/// One target as declared in the plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDef {
  pub name: String,

  /// Names of targets that must complete first.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub outputs: Vec<ArtifactSpec>,

  pub action: ActionTemplate,
}
