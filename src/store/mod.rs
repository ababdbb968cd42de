//! In-memory candidate store with brute-force cosine retrieval.
//!
//! A store runs in exactly one of two modes:
//!
//! - **retrieval**: answers top-k similarity queries (the target side of a run)
//! - **bulk-read**: hands out all of its items (the source side of a run)
//!
//! The corpus is loaded once and is read-only afterwards, so a shared reference is
//! safe to use from any number of workers.

pub mod error;
pub mod similarity;


pub use error::{StoreError, StoreResult};
pub use similarity::cosine_similarity;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::debug;

use crate::config::ConfigError;
use crate::constants::{DEFAULT_MAX_RESULTS, MAX_RESULTS_UNBOUNDED};
use crate::knowledge::Item;

/// How many candidates a similarity query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopK {
    /// At most this many items.
    Limited(NonZeroUsize),
    /// Every stored item.
    Unbounded,
}

impl Default for TopK {
    fn default() -> Self {
        Self::Limited(NonZeroUsize::new(DEFAULT_MAX_RESULTS).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TopK {
    /// Creates a bounded value; `0` is a configuration error.
    pub fn limited(k: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(k)
            .map(Self::Limited)
            .ok_or_else(|| ConfigError::InvalidMaxResults {
                value: k.to_string(),
            })
    }

    /// Parses a positive integer or `infinity` (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(MAX_RESULTS_UNBOUNDED) {
            return Ok(Self::Unbounded);
        }
        value
            .parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self::Limited)
            .ok_or_else(|| ConfigError::InvalidMaxResults {
                value: value.to_string(),
            })
    }

    /// Returns the bound, or `None` when unbounded.
    pub fn get(&self) -> Option<usize> {
        match self {
            Self::Limited(k) => Some(k.get()),
            Self::Unbounded => None,
        }
    }
}

/// Operating mode chosen at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Top-k similarity retrieval with a default bound.
    Retrieval { max_results: TopK },
    /// Bulk reads of all items.
    BulkRead,
}

/// A retrieved item with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: Arc<Item>,
    pub score: f32,
}

#[derive(Debug)]
struct StoredItem {
    item: Arc<Item>,
    vector: Vec<f32>,
}

/// Items paired 1:1 with embeddings.
///
/// Returned vectors are copies; the store stays the sole owner of its data.
#[derive(Debug)]
pub struct CandidateStore {
    mode: StoreMode,
    entries: Vec<StoredItem>,
    by_id: HashMap<String, usize>,
    dimension: Option<usize>,
    loaded: bool,
}

impl CandidateStore {
    /// Creates an empty store in the given mode.
    pub fn new(mode: StoreMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
            by_id: HashMap::new(),
            dimension: None,
            loaded: false,
        }
    }

    /// Creates an empty store for top-k retrieval.
    pub fn retrieval(max_results: TopK) -> Self {
        Self::new(StoreMode::Retrieval { max_results })
    }

    /// Creates an empty store for bulk reads.
    pub fn bulk() -> Self {
        Self::new(StoreMode::BulkRead)
    }

    /// One-time initialization with the corpus.
    pub fn load(&mut self, items: Vec<Arc<Item>>, vectors: Vec<Vec<f32>>) -> StoreResult<()> {
        if self.loaded {
            return Err(StoreError::AlreadyLoaded);
        }
        if items.len() != vectors.len() {
            return Err(StoreError::LengthMismatch {
                items: items.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = vectors.first().map(Vec::len);
        let mut by_id = HashMap::with_capacity(items.len());
        let mut entries = Vec::with_capacity(items.len());
        for (index, (item, vector)) in items.into_iter().zip(vectors).enumerate() {
            if let Some(expected) = dimension
                && vector.len() != expected
            {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            if by_id.insert(item.id().to_string(), index).is_some() {
                return Err(StoreError::DuplicateId {
                    id: item.id().to_string(),
                });
            }
            entries.push(StoredItem { item, vector });
        }

        debug!(
            items = entries.len(),
            dimension = dimension.unwrap_or(0),
            mode = ?self.mode,
            "Candidate store loaded"
        );

        self.entries = entries;
        self.by_id = by_id;
        self.dimension = dimension;
        self.loaded = true;
        Ok(())
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    /// Vector dimension, or `None` while empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retrieves up to the store's configured number of candidates.
    pub fn find_similar(&self, query: &[f32]) -> StoreResult<Vec<ScoredItem>> {
        match self.mode {
            StoreMode::Retrieval { max_results } => self.find_top_k(query, max_results),
            StoreMode::BulkRead => Err(StoreError::RetrievalDisabled),
        }
    }

    /// Ranks compare-flagged items by cosine similarity to `query`, descending.
    ///
    /// Equal scores keep insertion order, so results are reproducible.
    pub fn find_top_k(&self, query: &[f32], k: TopK) -> StoreResult<Vec<ScoredItem>> {
        if self.mode == StoreMode::BulkRead {
            return Err(StoreError::RetrievalDisabled);
        }
        self.ensure_loaded()?;
        if let Some(expected) = self.dimension
            && query.len() != expected
        {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }

        let mut scored: Vec<ScoredItem> = self
            .entries
            .iter()
            .filter(|entry| entry.item.is_compare())
            .map(|entry| ScoredItem {
                item: Arc::clone(&entry.item),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        // sort_by is stable: ties stay in insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        if let Some(limit) = k.get() {
            scored.truncate(limit);
        }
        Ok(scored)
    }

    /// O(1) lookup by identifier.
    pub fn get_by_id(&self, id: &str) -> Option<(Arc<Item>, Vec<f32>)> {
        self.by_id.get(id).map(|&index| {
            let entry = &self.entries[index];
            (Arc::clone(&entry.item), entry.vector.clone())
        })
    }

    /// All items whose parent is `parent_id`, in insertion order.
    pub fn get_by_parent_id(&self, parent_id: &str) -> Vec<(Arc<Item>, Vec<f32>)> {
        self.entries
            .iter()
            .filter(|entry| entry.item.parent_id() == Some(parent_id))
            .map(|entry| (Arc::clone(&entry.item), entry.vector.clone()))
            .collect()
    }

    /// Every item (optionally only compare-flagged ones), bulk-read mode only.
    pub fn get_all(&self, only_compare: bool) -> StoreResult<Vec<(Arc<Item>, Vec<f32>)>> {
        if self.mode != StoreMode::BulkRead {
            return Err(StoreError::BulkReadDisabled);
        }
        self.ensure_loaded()?;
        Ok(self
            .entries
            .iter()
            .filter(|entry| !only_compare || entry.item.is_compare())
            .map(|entry| (Arc::clone(&entry.item), entry.vector.clone()))
            .collect())
    }

    fn ensure_loaded(&self) -> StoreResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(StoreError::NotLoaded)
        }
    }
}
