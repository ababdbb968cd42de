use std::time::Duration;

use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::config::ConfigError;
use crate::store::StoreError;

#[derive(Debug, Error)]
/// Reasons an engine run produced no verdict set.
pub enum EngineError {
    /// A worker's classification failed; the run was aborted.
    #[error("classification failed for source '{source_id}': {error}")]
    Classification {
        source_id: String,
        #[source]
        error: ClassifierError,
    },

    /// Candidate retrieval rejected the request.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid engine configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The whole run exceeded its bound.
    #[error("classification run exceeded {after:?}")]
    Timeout { after: Duration },

    /// Shutdown was requested before every source was classified.
    #[error("shutdown requested before the run completed")]
    ShutdownRequested,

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {reason}")]
    TaskFailed { reason: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
