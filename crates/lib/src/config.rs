//! Build configuration.
//!
//! The platform label, the configuration label and the build-output root are
//! supplied once by the harness and threaded explicitly into artifact
//! resolution and action construction. Nothing in the library reads them from
//! the process environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::platform::{self, Platform};

/// Environment variable the harness reads the platform label from.
pub const PLATFORM_ENV: &str = "KILN_PLATFORM";

/// Environment variable the harness reads the configuration label from.
pub const CONFIGURATION_ENV: &str = "KILN_CONFIGURATION";

/// Environment variable the harness reads the output root from.
pub const OUT_DIR_ENV: &str = "KILN_OUT_DIR";

/// Errors raised while assembling a [`BuildConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unknown configuration '{0}' (expected 'debug' or 'release')")]
  UnknownConfiguration(String),

  #[error("platform label must not be empty")]
  EmptyPlatform,

  #[error("cannot make output root {path} absolute: {source}")]
  OutputRoot {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Build configuration label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Configuration {
  #[default]
  Debug,
  Release,
}

impl Configuration {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debug => "debug",
      Self::Release => "release",
    }
  }
}

impl fmt::Display for Configuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Configuration {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "debug" => Ok(Self::Debug),
      "release" => Ok(Self::Release),
      _ => Err(ConfigError::UnknownConfiguration(s.to_string())),
    }
  }
}

/// Explicit configuration record for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
  platform: String,
  configuration: Configuration,
  output_root: PathBuf,
}

impl BuildConfig {
  /// Create a configuration. The output root is made absolute against the
  /// current directory; it does not need to exist yet.
  pub fn new(
    platform: impl Into<String>,
    configuration: Configuration,
    output_root: impl AsRef<Path>,
  ) -> Result<Self, ConfigError> {
    let platform = platform.into().trim().to_string();
    if platform.is_empty() {
      return Err(ConfigError::EmptyPlatform);
    }
    if let Err(e) = platform.parse::<Platform>() {
      warn!(error = %e, "platform label is passed through unchecked");
    }

    let root = output_root.as_ref();
    let absolute = std::path::absolute(root).map_err(|source| ConfigError::OutputRoot {
      path: root.to_path_buf(),
      source,
    })?;

    Ok(Self {
      platform,
      configuration,
      output_root: dunce::simplified(&absolute).to_path_buf(),
    })
  }

  /// Create a configuration targeting the host platform.
  pub fn host(configuration: Configuration, output_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
    Self::new(platform::host_label(), configuration, output_root)
  }

  pub fn platform(&self) -> &str {
    &self.platform
  }

  pub fn configuration(&self) -> Configuration {
    self.configuration
  }

  /// Absolute build-output root.
  pub fn output_root(&self) -> &Path {
    &self.output_root
  }

  /// Same platform and root, different configuration. Used for actions that
  /// pin their own configuration label.
  pub fn with_configuration(&self, configuration: Configuration) -> Self {
    Self {
      configuration,
      ..self.clone()
    }
  }
}
