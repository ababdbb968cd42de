use thiserror::Error;

/// Errors raised while wiring items into a forest or walking it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    /// Two items in one batch share an identifier.
    #[error("duplicate item identifier: {id}")]
    DuplicateId { id: String },

    /// An item names a parent that is not part of the batch.
    #[error("item '{id}' references unknown parent '{parent_id}'")]
    UnresolvedParent { id: String, parent_id: String },

    /// An item is its own parent.
    #[error("item '{id}' is its own parent")]
    Cycle { id: String },

    /// A child must be strictly finer-grained than its parent.
    #[error(
        "item '{id}' has granularity {granularity} but its parent has {parent_granularity}"
    )]
    InvalidGranularity {
        id: String,
        granularity: u32,
        parent_granularity: u32,
    },

    /// The identifier is not part of the forest.
    #[error("unknown item: {id}")]
    UnknownItem { id: String },

    /// Walking parents ran out before reaching the requested granularity.
    #[error("item '{id}' has no ancestor at granularity {granularity}")]
    GranularityUnreachable { id: String, granularity: u32 },
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
