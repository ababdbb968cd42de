//! Tracelink library crate (used by the binary and integration tests).
//!
//! Recovers trace links between two sets of software artifacts. Candidate
//! pairs are shortlisted by embedding similarity and then judged by a
//! pluggable [`Classifier`], usually one backed by a language-model
//! [`Oracle`]. Every oracle answer goes through a content-addressed
//! [`Cache`], so re-running an experiment costs no oracle calls.
//!
//! ## Modules
//! - [`knowledge`]: [`Item`], [`ItemForest`] and [`TraceLink`]
//! - [`store`]: [`CandidateStore`] with top-k cosine retrieval
//! - [`cache`]: [`CacheKey`], file-backed [`LocalCache`], optional Redis tier,
//!   [`CacheManager`]
//! - [`oracle`]: [`Oracle`] trait, [`OpenAiOracle`], [`CachedEmbedder`]
//! - [`classifier`]: direct, mock and pipeline strategies
//! - [`engine`]: [`ClassificationEngine`], [`VerdictSet`], [`aggregate_any`]
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod engine;
pub mod hashing;
pub mod knowledge;
pub mod oracle;
pub mod store;

#[cfg(any(test, feature = "mock"))]
pub use cache::MemoryRemoteStore;
pub use cache::{
    Cache, CacheError, CacheKey, CacheManager, CacheMode, CacheResult, LocalCache, MergeReport,
    RedisStore, RemoteStore,
};
pub use classifier::{
    Classification, Classifier, ClassifierContext, ClassifierError, ClassifierResult,
    ClassifierSpec, DirectClassifier, DirectSpec, MockClassifier, PipelineClassifier,
    ResponseParser, build_classifier,
};
pub use config::{Config, ConfigError};
pub use engine::{
    ClassificationEngine, ClassificationVerdict, EngineConfig, EngineError, EngineResult,
    ShutdownHandle, VerdictSet, aggregate_any,
};
pub use hashing::{hash_request, normalize_line_endings};
pub use knowledge::{Item, ItemForest, KnowledgeError, KnowledgeResult, TraceLink};
#[cfg(any(test, feature = "mock"))]
pub use oracle::MockOracle;
pub use oracle::{
    CachedEmbedder, ChatMessage, EmbedError, OpenAiConfig, OpenAiOracle, Oracle, OracleError,
    OracleResult, Role,
};
pub use store::{CandidateStore, ScoredItem, StoreError, StoreMode, StoreResult, TopK};
