//! Scriptable in-process oracle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{OracleError, OracleResult};
use super::{ChatMessage, Oracle};
use crate::constants::DEFAULT_SEED;

type Responder = dyn Fn(&[ChatMessage]) -> String + Send + Sync;

/// Dimension of the vectors returned by [`MockOracle::embed`].
pub const MOCK_EMBEDDING_DIM: usize = 16;

/// Oracle whose chat answers come from a closure.
///
/// Embeddings are derived from a BLAKE3 digest of the text, so equal texts
/// always get equal vectors.
pub struct MockOracle {
    model: String,
    embedding_model: String,
    seed: u32,
    concurrency: usize,
    responder: Arc<Responder>,
    failure: Mutex<Option<String>>,
    chat_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl fmt::Debug for MockOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockOracle")
            .field("model", &self.model)
            .field("seed", &self.seed)
            .field("chat_calls", &self.chat_calls())
            .field("embed_calls", &self.embed_calls())
            .finish()
    }
}

impl MockOracle {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> String + Send + Sync + 'static,
    {
        Self {
            model: "mock-chat".to_string(),
            embedding_model: "mock-embedding".to_string(),
            seed: DEFAULT_SEED,
            concurrency: 1,
            responder: Arc::new(responder),
            failure: Mutex::new(None),
            chat_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }

    /// Answers every chat with `answer`.
    pub fn always(answer: &str) -> Self {
        let answer = answer.to_string();
        Self::new(move |_| answer.clone())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Makes every subsequent call fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::Acquire)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::Acquire)
    }

    fn check_failure(&self) -> OracleResult<()> {
        match self.failure.lock().as_ref() {
            Some(message) => Err(OracleError::Mock {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn embed(&self, text: &str) -> OracleResult<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::AcqRel);
        self.check_failure()?;

        let digest = blake3::hash(text.as_bytes());
        Ok(digest
            .as_bytes()
            .iter()
            .take(MOCK_EMBEDDING_DIM)
            .map(|&b| f32::from(b) / 255.0 + 0.01)
            .collect())
    }

    async fn chat(&self, messages: &[ChatMessage]) -> OracleResult<String> {
        self.chat_calls.fetch_add(1, Ordering::AcqRel);
        self.check_failure()?;
        Ok((self.responder)(messages))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn seed(&self) -> u32 {
        self.seed
    }

    fn max_concurrency(&self) -> usize {
        self.concurrency
    }
}
