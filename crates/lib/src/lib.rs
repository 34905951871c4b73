//! kiln-lib: core types and logic for kiln
//!
//! This crate turns a declarative set of build targets into an ordered,
//! cache-aware sequence of toolchain invocations:
//! - `VersionMetadata`: package versions read from a metadata document
//! - `ArtifactSpec`: versioned output file names, resolved to paths
//! - `BuildTarget`: outputs plus the action that produces them
//! - `TargetGraph`: dependency edges and the execution order
//! - `Executor`: runs actions, skipping targets whose outputs exist

pub mod artifact;
pub mod config;
pub mod error;
pub mod execute;
pub mod graph;
pub mod manifest;
pub mod metadata;
pub mod placeholder;
pub mod platform;
pub mod target;
#[cfg(test)]
mod util;

pub use error::{Error, ErrorKind, Result};
