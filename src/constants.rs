//! Cross-cutting, shared constants.
//!
//! Defaults that more than one module agrees on live here so the engine, the
//! classifiers and the configuration layer cannot drift apart.

use std::time::Duration;

/// Seed passed to the oracle when none is configured.
pub const DEFAULT_SEED: u32 = 133_742_243;

/// Default number of candidates retrieved per source item.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Value of `max_results` that selects every stored item.
pub const MAX_RESULTS_UNBOUNDED: &str = "infinity";

/// Changed cache entries tolerated in memory before a flush is forced.
pub const CACHE_MAX_DIRTY: usize = 50;

/// Upper bound on a whole engine run.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Default engine run bound as a [`Duration`].
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS);

/// Pool size for oracles with high-throughput quotas.
pub const HIGH_THROUGHPUT_THREADS: usize = 100;

/// Default chat model name.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default embedding model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Extension of persisted cache files.
pub const CACHE_FILE_EXTENSION: &str = "json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_matches_secs() {
        assert_eq!(DEFAULT_ENGINE_TIMEOUT.as_secs(), DEFAULT_ENGINE_TIMEOUT_SECS);
    }

    #[test]
    fn test_dirty_threshold_positive() {
        assert!(CACHE_MAX_DIRTY > 0);
    }
}
