//! CLI output formatting utilities.
//!
//! Status lines carry a colored symbol when the stream is a terminal.
//! Durations are rendered by `humantime`, rounded to milliseconds.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Leading symbol of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  /// Work done, or an output that already exists.
  Done,
  /// Nothing to do.
  Skipped,
  /// Work that would happen, or an output still to be produced.
  Pending,
  Failed,
}

impl Status {
  pub fn symbol(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Skipped => "•",
      Status::Pending => "→",
      Status::Failed => "✗",
    }
  }

  fn stream(self) -> Stream {
    match self {
      Status::Failed => Stream::Stderr,
      _ => Stream::Stdout,
    }
  }

  /// The symbol, colored if `stream` supports it.
  fn painted(self) -> impl fmt::Display {
    let symbol = self.symbol();
    let stream = self.stream();
    match self {
      Status::Done => symbol.if_supports_color(stream, |s| s.green()).to_string(),
      Status::Skipped => symbol.if_supports_color(stream, |s| s.blue()).to_string(),
      Status::Pending => symbol.if_supports_color(stream, |s| s.yellow()).to_string(),
      Status::Failed => symbol.if_supports_color(stream, |s| s.red()).to_string(),
    }
  }
}

/// Duration rounded to milliseconds, e.g. `1s 250ms`.
pub fn format_duration(duration: Duration) -> String {
  let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
  if millis == 0 {
    return "0ms".to_string();
  }
  humantime::format_duration(Duration::from_millis(millis)).to_string()
}

/// Print `message` behind the status symbol. Failures go to stderr.
pub fn print_status(status: Status, message: &str) {
  match status {
    Status::Failed => eprintln!(
      "{} {}",
      status.painted(),
      message.if_supports_color(Stream::Stderr, |s| s.red())
    ),
    _ => println!("{} {}", status.painted(), message),
  }
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Report a failed command: the full error chain in red, or a JSON object on
/// stdout in JSON mode.
pub fn print_failure(err: &anyhow::Error, format: OutputFormat) {
  let kind = err.downcast_ref::<kiln_lib::Error>().map(|e| e.kind().to_string());

  if format.is_json() {
    let value = serde_json::json!({ "error": format!("{err:#}"), "kind": kind });
    if print_json(&value).is_ok() {
      return;
    }
  }

  print_status(Status::Failed, &format!("{err:#}"));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_micros(300)), "0ms");
    assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1s 500ms");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }

  #[test]
  fn output_format_is_json() {
    assert!(OutputFormat::Json.is_json());
    assert!(!OutputFormat::default().is_json());
  }

  #[test]
  fn only_failures_go_to_stderr() {
    assert!(matches!(Status::Failed.stream(), Stream::Stderr));
    assert!(matches!(Status::Pending.stream(), Stream::Stdout));
  }
}
