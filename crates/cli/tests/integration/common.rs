//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding `kiln.json`, the
/// version metadata it points at, and the `bin` output root.
pub struct TestEnv {
  pub temp: TempDir,
  pub plan_path: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file.
  ///
  /// Copies the fixture to `kiln.json` and places `versions.json` next to it.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let plan_path = temp.path().join("kiln.json");
    std::fs::write(&plan_path, fixture_content(name)).unwrap();
    std::fs::write(temp.path().join("versions.json"), fixture_content("versions.json")).unwrap();
    Self { temp, plan_path }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Path under the default output root.
  pub fn bin(&self, relative: &str) -> PathBuf {
    self.path().join("bin").join(relative)
  }

  /// Get a pre-configured Command for the kiln binary.
  ///
  /// Runs inside the temp directory with every `KILN_*` variable cleared so
  /// the host environment cannot leak into the build configuration.
  pub fn kiln_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("kiln");
    cmd.current_dir(self.path());
    cmd.env_remove("KILN_PLATFORM");
    cmd.env_remove("KILN_CONFIGURATION");
    cmd.env_remove("KILN_OUT_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
