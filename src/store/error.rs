use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
/// Misuse of a [`CandidateStore`](super::CandidateStore). Always a programming error.
pub enum StoreError {
    /// `load` was called on a store that already holds its corpus.
    #[error("candidate store is already loaded")]
    AlreadyLoaded,

    /// The store was queried before `load`.
    #[error("candidate store has not been loaded")]
    NotLoaded,

    /// Items and vectors must pair up 1:1.
    #[error("item count {items} does not match vector count {vectors}")]
    LengthMismatch {
        /// Number of items.
        items: usize,
        /// Number of vectors.
        vectors: usize,
    },

    /// Vector dimension differs from the store's dimension.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Store dimension.
        expected: usize,
        /// Offending dimension.
        actual: usize,
    },

    /// Identifiers must be unique within one store.
    #[error("duplicate item identifier in store: {id}")]
    DuplicateId {
        /// Offending identifier.
        id: String,
    },

    /// Top-k retrieval on a store built for bulk reads.
    #[error("similarity retrieval is disabled on a bulk-read store")]
    RetrievalDisabled,

    /// Bulk reads on a store built for top-k retrieval.
    #[error("bulk reads are disabled on a retrieval store")]
    BulkReadDisabled,
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
