//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building configuration; always fatal at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric environment variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// `max_results` must be a positive integer or `infinity`.
    #[error("invalid max_results '{value}': must be a positive integer or 'infinity'")]
    InvalidMaxResults { value: String },

    /// A worker pool cannot be empty.
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    /// The engine needs a non-zero run bound.
    #[error("engine timeout must be greater than zero")]
    ZeroTimeout,

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A classifier recipe could not be parsed or is inconsistent.
    #[error("invalid classifier spec: {reason}")]
    InvalidClassifierSpec { reason: String },

    /// A pipeline layer has no classifiers to vote.
    #[error("pipeline layer {layer} has no classifiers")]
    EmptyPipelineLayer { layer: usize },

    /// A required setting for an oracle backend is missing.
    #[error("missing required setting: {name}")]
    MissingSetting { name: &'static str },
}
