use serde::{Deserialize, Serialize};

use crate::hashing::{hash_request, normalize_line_endings};

/// Kind of oracle request a cache entry answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheMode {
    Embedding,
    Chat,
}

impl CacheMode {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Embedding => "EMBEDDING",
            CacheMode::Chat => "CHAT",
        }
    }
}

impl std::fmt::Display for CacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic address of one logical oracle request.
///
/// The key is a pure function of `(model, seed, mode, content)`; `content` is
/// line-ending normalized before hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    model: String,
    seed: u32,
    mode: CacheMode,
    content: String,
    local_key: String,
}

impl CacheKey {
    /// Prefix for keys stored in the remote service.
    pub const REMOTE_PREFIX: &'static str = "tracelink";

    pub fn new(model: impl Into<String>, seed: u32, mode: CacheMode, content: &str) -> Self {
        let model = model.into();
        let content = normalize_line_endings(content).into_owned();
        let local_key = hash_request(&model, seed, mode.as_str(), &content);
        Self {
            model,
            seed,
            mode,
            content,
            local_key,
        }
    }

    /// Key for a chat request.
    pub fn chat(model: impl Into<String>, seed: u32, content: &str) -> Self {
        Self::new(model, seed, CacheMode::Chat, content)
    }

    /// Key for an embedding request.
    pub fn embedding(model: impl Into<String>, seed: u32, content: &str) -> Self {
        Self::new(model, seed, CacheMode::Embedding, content)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// Normalized request text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// 128-bit hex digest used in the local cache file.
    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    /// Key used in the remote service, namespaced by mode.
    pub fn remote_key(&self) -> String {
        format!("{}:{}:{}", Self::REMOTE_PREFIX, self.mode, self.local_key)
    }
}
