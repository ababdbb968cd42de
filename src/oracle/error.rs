use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;

#[derive(Debug, Error)]
/// Failures of the external model service.
pub enum OracleError {
    /// The request never produced an HTTP response.
    #[error("oracle transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request exceeded the client timeout.
    #[error("oracle request timed out after {after:?}")]
    Timeout {
        /// Configured timeout.
        after: Duration,
    },

    /// The service answered with a non-success status.
    #[error("oracle returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed oracle response: {reason}")]
    MalformedResponse {
        /// What was missing or wrong.
        reason: String,
    },

    /// Injected failure from a mock oracle.
    #[error("mock oracle failure: {message}")]
    Mock {
        /// Injected message.
        message: String,
    },
}

/// Convenience result type for oracle calls.
pub type OracleResult<T> = Result<T, OracleError>;

#[derive(Debug, Error)]
/// Errors from computing an embedding through the cache.
pub enum EmbedError {
    /// The oracle call failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
