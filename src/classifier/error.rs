use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::oracle::OracleError;

#[derive(Debug, Error)]
/// Errors raised while building or running a classifier.
pub enum ClassifierError {
    /// The oracle call behind a cache miss failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The result cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The classifier recipe is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience result type for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;
