//! Host platform detection.
//!
//! Platform labels name the target operating system the way the toolchain's
//! platform selector expects them (`linuxbsd`, `macos`, `windows`, ...). The
//! label reaches actions through the `$${platform}` placeholder; when the
//! harness does not pick one explicitly, the build machine's own label is used.

use std::fmt;
use std::str::FromStr;

/// A platform the build can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
  LinuxBsd,
  MacOs,
  Windows,
  Android,
  Ios,
  Web,
}

impl Platform {
  pub const ALL: [Platform; 6] = [
    Platform::LinuxBsd,
    Platform::MacOs,
    Platform::Windows,
    Platform::Android,
    Platform::Ios,
    Platform::Web,
  ];

  /// The platform of the machine running the build, if it can host one.
  pub fn host() -> Option<Self> {
    match std::env::consts::OS {
      "linux" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" => Some(Self::LinuxBsd),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::LinuxBsd => "linuxbsd",
      Self::MacOs => "macos",
      Self::Windows => "windows",
      Self::Android => "android",
      Self::Ios => "ios",
      Self::Web => "web",
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Platform {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    Self::ALL
      .into_iter()
      .find(|p| p.label().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| format!("unknown platform '{s}'"))
  }
}

/// Label of the build machine, or the raw OS name for hosts that are not a
/// known [`Platform`].
pub fn host_label() -> String {
  Platform::host()
    .map(|p| p.label().to_string())
    .unwrap_or_else(|| std::env::consts::OS.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_round_trip_through_from_str() {
    for platform in Platform::ALL {
      assert_eq!(platform.label().parse::<Platform>(), Ok(platform));
    }
    assert_eq!("  MacOS ".parse::<Platform>(), Ok(Platform::MacOs));
    assert!("amiga".parse::<Platform>().is_err());
  }

  #[test]
  #[cfg(target_os = "linux")]
  fn linux_hosts_build_for_linuxbsd() {
    assert_eq!(Platform::host(), Some(Platform::LinuxBsd));
    assert_eq!(host_label(), "linuxbsd");
  }

  #[test]
  fn host_label_is_never_empty() {
    assert!(!host_label().is_empty());
  }
}
