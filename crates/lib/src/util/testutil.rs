//! Test utilities for kiln-lib.
//!
//! Cross-platform programs for tests that run real processes through the
//! [`ProcessRunner`](crate::execute::ProcessRunner).

use std::path::Path;

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Returns the command and args to print an environment variable.
#[cfg(unix)]
pub fn print_env(var: &str) -> (&'static str, Vec<String>) {
  shell_cmd(&format!("echo \"${var}\""))
}

#[cfg(windows)]
pub fn print_env(var: &str) -> (&'static str, Vec<String>) {
  shell_cmd(&format!("echo %{var}%"))
}

/// Returns the command and args to write `msg` to stderr and exit with `code`.
#[cfg(unix)]
pub fn fail_with(code: i32, msg: &str) -> (&'static str, Vec<String>) {
  shell_cmd(&format!("echo {msg} >&2; exit {code}"))
}

#[cfg(windows)]
pub fn fail_with(code: i32, msg: &str) -> (&'static str, Vec<String>) {
  shell_cmd(&format!("echo {msg} 1>&2 & exit /b {code}"))
}

/// Returns the command and args to create the given files, along with their
/// parent directories.
#[cfg(unix)]
pub fn touch_files(paths: &[&Path]) -> (&'static str, Vec<String>) {
  let script = paths
    .iter()
    .map(|p| {
      let parent = p.parent().unwrap_or(Path::new("."));
      format!("mkdir -p '{}' && touch '{}'", parent.display(), p.display())
    })
    .collect::<Vec<_>>()
    .join(" && ");
  shell_cmd(&script)
}

#[cfg(windows)]
pub fn touch_files(paths: &[&Path]) -> (&'static str, Vec<String>) {
  let script = paths
    .iter()
    .map(|p| format!("New-Item -ItemType File -Path '{}' -Force | Out-Null", p.display()))
    .collect::<Vec<_>>()
    .join("; ");
  (
    "powershell.exe",
    vec!["-NoProfile".to_string(), "-Command".to_string(), script],
  )
}
