//! Placeholder parsing and substitution for artifact names and action arguments.
//!
//! Artifact name templates and action templates reference values that are only
//! known once the build plan is assembled: package versions read from the
//! metadata document, the target platform, and the active configuration.
//!
//! # Placeholder Formats
//!
//! - `$${version}` - version of the package associated with the artifact
//! - `$${version:<package>}` - version of an explicitly named package
//! - `$${platform}` - the target platform label (e.g. `linuxbsd`)
//! - `$${configuration}` - the configuration label (`debug` / `release`)
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so `$HOME` or MSBuild's
//! `$(Configuration)` survive untouched.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use kiln_lib::placeholder::{parse, Placeholder, Segment};
//!
//! let segments = parse("Acme.Sdk.$${version}.nupkg").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("Acme.Sdk.".to_string()),
//!     Segment::Placeholder(Placeholder::Version(None)),
//!     Segment::Literal(".nupkg".to_string()),
//! ]);
//! ```

use thiserror::Error;

use crate::config::BuildConfig;
use crate::metadata::VersionMetadata;

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `$${version}` (`None`) or `$${version:<package>}`
  Version(Option<String>),

  /// `$${platform}`
  Platform,

  /// `$${configuration}`
  Configuration,
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("no version recorded for package '{0}'")]
  UnresolvedVersion(String),

  #[error("version placeholder used without an associated package")]
  NoPackage,
}

/// Trait for resolving placeholder values.
pub trait Resolver {
  /// Resolve a package version. `None` asks for the caller's own package.
  fn resolve_version(&self, package: Option<&str>) -> Result<&str, PlaceholderError>;

  /// Resolve the target platform label.
  fn resolve_platform(&self) -> Result<&str, PlaceholderError>;

  /// Resolve the active configuration label.
  fn resolve_configuration(&self) -> Result<&str, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed, empty, or of an unknown type.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();

        match chars.peek() {
          Some((_, '$')) => {
            chars.next();

            // $$${ is the escape for a literal $${
            if let Some((_, '{')) = chars.peek() {
              literal.push_str("$${");
              chars.next();
            } else {
              literal.push_str("$$$");
            }
          }
          Some((_, '{')) => {
            chars.next();

            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut content = String::new();
            let mut found_close = false;

            for (_, c) in chars.by_ref() {
              if c == '}' {
                found_close = true;
                break;
              }
              content.push(c);
            }

            if !found_close {
              return Err(PlaceholderError::Unclosed(pos));
            }

            segments.push(Segment::Placeholder(parse_placeholder_content(&content)?));
          }
          _ => literal.push_str("$$"),
        }
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse the content between `$${` and `}`.
fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  let (kind, arg) = match content.split_once(':') {
    Some((kind, arg)) => (kind.trim(), Some(arg.trim())),
    None => (content.trim(), None),
  };

  match (kind, arg) {
    ("", _) => Err(PlaceholderError::Malformed(format!("empty placeholder '{content}'"))),
    ("version", None) => Ok(Placeholder::Version(None)),
    ("version", Some("")) => Err(PlaceholderError::Malformed(format!(
      "version placeholder missing package: '{content}'"
    ))),
    ("version", Some(package)) => Ok(Placeholder::Version(Some(package.to_string()))),
    ("platform", None) => Ok(Placeholder::Platform),
    ("configuration", None) => Ok(Placeholder::Configuration),
    ("platform" | "configuration", Some(_)) => Err(PlaceholderError::Malformed(format!(
      "'{kind}' takes no argument: '{content}'"
    ))),
    _ => Err(PlaceholderError::UnknownType(kind.to_string())),
  }
}

/// Substitute all placeholders in a string using the provided resolver.
///
/// # Errors
///
/// Returns an error if parsing fails or if any placeholder cannot be resolved.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => {
        let value = match p {
          Placeholder::Version(package) => resolver.resolve_version(package.as_deref())?,
          Placeholder::Platform => resolver.resolve_platform()?,
          Placeholder::Configuration => resolver.resolve_configuration()?,
        };
        result.push_str(value);
      }
    }
  }

  Ok(result)
}

/// Resolver over a build's version metadata and configuration.
///
/// `package` is the package bare `$${version}` placeholders refer to; action
/// templates have none.
pub struct TemplateContext<'a> {
  pub versions: &'a VersionMetadata,
  pub package: Option<&'a str>,
  pub config: &'a BuildConfig,
}

impl Resolver for TemplateContext<'_> {
  fn resolve_version(&self, package: Option<&str>) -> Result<&str, PlaceholderError> {
    let package = package.or(self.package).ok_or(PlaceholderError::NoPackage)?;
    self
      .versions
      .get(package)
      .ok_or_else(|| PlaceholderError::UnresolvedVersion(package.to_string()))
  }

  fn resolve_platform(&self) -> Result<&str, PlaceholderError> {
    Ok(self.config.platform())
  }

  fn resolve_configuration(&self) -> Result<&str, PlaceholderError> {
    Ok(self.config.configuration().as_str())
  }
}
