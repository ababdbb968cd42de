use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by the result cache.
pub enum CacheError {
    /// A persisted cache file exists but cannot be parsed. Needs operator attention.
    #[error("cache file {path} is corrupted: {source}")]
    Corrupted {
        /// Offending file.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing a cache file failed.
    #[error("cache I/O failed for {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A structured value could not be encoded.
    #[error("failed to encode cache value: {0}")]
    Encode(#[source] serde_json::Error),

    /// A cached value does not decode into the requested type.
    #[error("cached value for key {key} has unexpected shape: {source}")]
    Decode {
        /// Local key of the entry.
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The cache root exists but is not a directory.
    #[error("cache path is not a directory: {path}")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// A cache file was required to exist (or not be a directory).
    #[error("cache file does not exist or is a directory: {path}")]
    FileUnavailable {
        /// Offending path.
        path: PathBuf,
    },

    /// The blocking task writing a cache file panicked or was cancelled.
    #[error("cache write task failed: {0}")]
    WriteTask(#[source] tokio::task::JoinError),

    /// The remote key/value service failed. Never escapes [`Cache`](super::Cache).
    #[error("remote cache error: {message}")]
    Remote {
        /// Error message.
        message: String,
    },
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
