//! Embeddings routed through the result cache.

use std::sync::Arc;

use tracing::debug;

use super::Oracle;
use super::error::EmbedError;
use crate::cache::{Cache, CacheKey, CacheManager, CacheResult};
use crate::knowledge::Item;

/// Cache kind used for embedding files.
pub const EMBEDDING_CACHE_KIND: &str = "embedding";

/// Computes embeddings once per `(model, seed, text)` and reuses them afterwards.
#[derive(Debug, Clone)]
pub struct CachedEmbedder {
    oracle: Arc<dyn Oracle>,
    cache: Arc<Cache>,
}

impl CachedEmbedder {
    pub fn new(oracle: Arc<dyn Oracle>, cache: Arc<Cache>) -> Self {
        Self { oracle, cache }
    }

    /// Embedder using the manager's file for the oracle's embedding model.
    pub fn from_manager(oracle: Arc<dyn Oracle>, manager: &CacheManager) -> CacheResult<Self> {
        let cache = manager.cache(EMBEDDING_CACHE_KIND, oracle.embedding_model(), oracle.seed())?;
        Ok(Self::new(oracle, cache))
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let key = CacheKey::embedding(self.oracle.embedding_model(), self.oracle.seed(), text);
        if let Some(vector) = self.cache.get_as::<Vec<f32>>(&key).await? {
            return Ok(vector);
        }

        let vector = self.oracle.embed(key.content()).await?;
        self.cache.put_as(&key, &vector).await?;
        debug!(dimension = vector.len(), "Embedding computed");
        Ok(vector)
    }

    /// Embeds every item's content, preserving order.
    pub async fn embed_items(&self, items: &[Arc<Item>]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(items.len());
        for item in items {
            vectors.push(self.embed(item.content()).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;

    #[tokio::test]
    async fn test_second_embed_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new(dir.path()).unwrap();
        let oracle = Arc::new(MockOracle::always("unused"));
        let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();

        let first = embedder.embed("fn main() {}").await.unwrap();
        let second = embedder.embed("fn main() {}").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(oracle.embed_calls(), 1);
    }

    #[tokio::test]
    async fn test_embeddings_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(MockOracle::always("unused"));
        {
            let manager = CacheManager::new(dir.path()).unwrap();
            let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();
            embedder.embed("text").await.unwrap();
            manager.flush_all().await.unwrap();
        }

        let manager = CacheManager::new(dir.path()).unwrap();
        let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();
        embedder.embed("text").await.unwrap();
        assert_eq!(oracle.embed_calls(), 1);
    }

    #[tokio::test]
    async fn test_embed_items_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new(dir.path()).unwrap();
        let oracle = Arc::new(MockOracle::always("unused"));
        let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();
        let items = vec![
            Arc::new(Item::artifact("a", "req", "first")),
            Arc::new(Item::artifact("b", "req", "second")),
        ];

        let vectors = embedder.embed_items(&items).await.unwrap();
        assert_eq!(vectors[0], embedder.embed("first").await.unwrap());
        assert_eq!(vectors[1], embedder.embed("second").await.unwrap());
    }

    #[tokio::test]
    async fn test_oracle_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new(dir.path()).unwrap();
        let oracle = Arc::new(MockOracle::always("unused"));
        oracle.fail_with("down");
        let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();

        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbedError::Oracle(_))
        ));
    }
}
