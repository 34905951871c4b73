//! Version metadata.
//!
//! A small structured document (JSON, TOML, YAML, or an MSBuild-style XML
//! property file) records the versions of the packages a build produces. The reader extracts a fixed set of named fields,
//! each mapped to the package identifier artifact templates refer to, and
//! rejects the document if any of them is missing or blank.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// An expected version field: where to find it in the document and which
/// package identifier it is recorded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionField {
  /// Package identifier (e.g. `Acme.NET.Sdk`).
  pub package: String,
  /// Dot-separated field path (e.g. `PropertyGroup.PackageVersion_Acme_NET_Sdk`).
  pub field: String,
}

impl VersionField {
  pub fn new(package: impl Into<String>, field: impl Into<String>) -> Self {
    Self {
      package: package.into(),
      field: field.into(),
    }
  }
}

/// Supported on-disk syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
  Json,
  Toml,
  Yaml,
  /// XML property files such as `SdkPackageVersions.props`.
  Xml,
}

impl MetadataFormat {
  /// Pick a format from the file extension.
  pub fn from_path(path: &Path) -> Option<Self> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
      "json" => Some(Self::Json),
      "toml" => Some(Self::Toml),
      "yaml" | "yml" => Some(Self::Yaml),
      "xml" | "props" => Some(Self::Xml),
      _ => None,
    }
  }
}

/// Errors raised while reading version metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
  #[error("failed to read metadata file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed metadata: unsupported document type {0}")]
  UnsupportedFormat(PathBuf),

  #[error("malformed metadata: {0}")]
  Syntax(String),

  #[error("malformed metadata: field '{0}' is missing")]
  MissingField(String),

  #[error("malformed metadata: field '{0}' is empty")]
  EmptyField(String),

  #[error("malformed metadata: field '{0}' is not a string")]
  NotAString(String),
}

/// Package identifier to version string. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMetadata {
  versions: BTreeMap<String, String>,
}

impl VersionMetadata {
  /// Read the document at `path` and extract every expected field.
  ///
  /// # Errors
  ///
  /// Fails if the file cannot be read, its extension names no supported
  /// format, it does not parse, or any expected field is missing, non-string
  /// or blank after trimming.
  pub fn load(path: &Path, fields: &[VersionField]) -> Result<Self, MetadataError> {
    let format = MetadataFormat::from_path(path).ok_or_else(|| MetadataError::UnsupportedFormat(path.to_path_buf()))?;

    let text = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let metadata = Self::parse(&text, format, fields)?;
    debug!(path = ?path, packages = metadata.len(), "loaded version metadata");
    Ok(metadata)
  }

  /// Parse an in-memory document.
  pub fn parse(text: &str, format: MetadataFormat, fields: &[VersionField]) -> Result<Self, MetadataError> {
    let root: Value = match format {
      MetadataFormat::Json => serde_json::from_str(text).map_err(|e| MetadataError::Syntax(e.to_string()))?,
      MetadataFormat::Toml => toml::from_str(text).map_err(|e| MetadataError::Syntax(e.to_string()))?,
      MetadataFormat::Yaml => serde_yaml::from_str(text).map_err(|e| MetadataError::Syntax(e.to_string()))?,
      MetadataFormat::Xml => {
        let doc = roxmltree::Document::parse(text).map_err(|e| MetadataError::Syntax(e.to_string()))?;
        xml_to_value(doc.root_element())
      }
    };

    let mut versions = BTreeMap::new();

    for expected in fields {
      let value = lookup(&root, &expected.field).ok_or_else(|| MetadataError::MissingField(expected.field.clone()))?;

      let version = value
        .as_str()
        .ok_or_else(|| MetadataError::NotAString(expected.field.clone()))?
        .trim();

      if version.is_empty() {
        return Err(MetadataError::EmptyField(expected.field.clone()));
      }

      versions.insert(expected.package.clone(), version.to_string());
    }

    Ok(Self { versions })
  }

  /// Version recorded for a package.
  pub fn get(&self, package: &str) -> Option<&str> {
    self.versions.get(package).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.versions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.versions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.versions.is_empty()
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VersionMetadata {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      versions: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }
}

/// Find a field: a top-level key matching the whole path wins, otherwise the
/// path is walked one dot-separated table at a time.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
  if let Some(value) = root.get(path) {
    return Some(value);
  }

  path.split('.').try_fold(root, |node, key| node.as_object()?.get(key))
}

/// Convert an XML element into the tree [`lookup`] walks. Paths start below
/// the document element, so `PropertyGroup.PackageVersion_X` reads
/// `<Project><PropertyGroup><PackageVersion_X>`.
///
/// Leaf elements become their text. Repeated sibling elements are merged,
/// the first occurrence of a name winning. Namespaces are ignored.
fn xml_to_value(node: roxmltree::Node<'_, '_>) -> Value {
  let mut children = node.children().filter(roxmltree::Node::is_element).peekable();
  if children.peek().is_none() {
    return Value::String(node.text().unwrap_or_default().to_string());
  }

  let mut map = Map::new();
  for child in children {
    let value = xml_to_value(child);
    match map.get_mut(child.tag_name().name()) {
      None => {
        map.insert(child.tag_name().name().to_string(), value);
      }
      Some(Value::Object(existing)) => {
        if let Value::Object(more) = value {
          for (key, v) in more {
            existing.entry(key).or_insert(v);
          }
        }
      }
      Some(_) => {}
    }
  }
  Value::Object(map)
}
