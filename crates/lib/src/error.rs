//! Crate-level error type.
//!
//! Every module owns its own error enum. [`Error`] wraps them for callers that
//! drive a whole build, and [`Error::kind`] classifies any of them into the
//! small set of failure kinds a build can end with.

use std::fmt;

use thiserror::Error;

use crate::artifact::ResolveError;
use crate::config::ConfigError;
use crate::execute::ExecuteError;
use crate::graph::GraphError;
use crate::manifest::ManifestError;
use crate::metadata::MetadataError;
use crate::placeholder::PlaceholderError;

/// Classification of a build failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  DuplicateTarget,
  UnknownTarget,
  CyclicDependency,
  MalformedMetadata,
  MissingVersion,
  ActionFailed,
  MissingOutput,
  /// A template is syntactically invalid.
  Placeholder,
  /// Invalid configuration or plan file.
  Config,
  Io,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ErrorKind::DuplicateTarget => "duplicate target",
      ErrorKind::UnknownTarget => "unknown target",
      ErrorKind::CyclicDependency => "cyclic dependency",
      ErrorKind::MalformedMetadata => "malformed metadata",
      ErrorKind::MissingVersion => "missing version",
      ErrorKind::ActionFailed => "action failed",
      ErrorKind::MissingOutput => "missing output",
      ErrorKind::Placeholder => "invalid placeholder",
      ErrorKind::Config => "configuration error",
      ErrorKind::Io => "i/o error",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Metadata(#[from] MetadataError),

  #[error(transparent)]
  Placeholder(#[from] PlaceholderError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Config(e) => config_kind(e),
      Error::Metadata(e) => metadata_kind(e),
      Error::Placeholder(e) => placeholder_kind(e),
      Error::Resolve(e) => resolve_kind(e),
      Error::Graph(e) => graph_kind(e),
      Error::Execute(e) => execute_kind(e),
      Error::Manifest(e) => manifest_kind(e),
    }
  }
}

fn config_kind(e: &ConfigError) -> ErrorKind {
  match e {
    ConfigError::OutputRoot { .. } => ErrorKind::Io,
    ConfigError::UnknownConfiguration(_) | ConfigError::EmptyPlatform => ErrorKind::Config,
  }
}

fn metadata_kind(e: &MetadataError) -> ErrorKind {
  match e {
    MetadataError::Read { .. } => ErrorKind::Io,
    _ => ErrorKind::MalformedMetadata,
  }
}

fn placeholder_kind(e: &PlaceholderError) -> ErrorKind {
  match e {
    PlaceholderError::UnresolvedVersion(_) | PlaceholderError::NoPackage => ErrorKind::MissingVersion,
    _ => ErrorKind::Placeholder,
  }
}

fn resolve_kind(e: &ResolveError) -> ErrorKind {
  match e {
    ResolveError::MissingVersion { .. } | ResolveError::NoPackage { .. } => ErrorKind::MissingVersion,
    ResolveError::Placeholder { source, .. } => placeholder_kind(source),
    ResolveError::InvalidName { .. } => ErrorKind::Placeholder,
  }
}

fn graph_kind(e: &GraphError) -> ErrorKind {
  match e {
    GraphError::DuplicateTarget(_) => ErrorKind::DuplicateTarget,
    GraphError::UnknownTarget(_) => ErrorKind::UnknownTarget,
    GraphError::CyclicDependency(_) => ErrorKind::CyclicDependency,
  }
}

fn execute_kind(e: &ExecuteError) -> ErrorKind {
  match e {
    ExecuteError::ActionFailed { .. } => ErrorKind::ActionFailed,
    ExecuteError::MissingOutput { .. } => ErrorKind::MissingOutput,
    ExecuteError::Resolve { source, .. } => resolve_kind(source),
    ExecuteError::Graph(source) => graph_kind(source),
  }
}

fn manifest_kind(e: &ManifestError) -> ErrorKind {
  match e {
    ManifestError::Read { .. } => ErrorKind::Io,
    ManifestError::Parse { .. } => ErrorKind::Config,
    ManifestError::Metadata(source) => metadata_kind(source),
    ManifestError::Action { source, .. } => placeholder_kind(source),
    ManifestError::Dependency { source, .. } | ManifestError::Graph(source) => graph_kind(source),
  }
}
