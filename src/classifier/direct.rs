//! One cached chat call per (source, target) pair.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::ClassifierResult;
use super::prompt::{REASONING_TEMPLATE, SIMPLE_TEMPLATE, SYSTEM_MESSAGE, render_prompt};
use super::response::ResponseParser;
use super::{Classification, Classifier};
use crate::cache::{Cache, CacheKey};
use crate::knowledge::Item;
use crate::oracle::{ChatMessage, Oracle, render_messages};

/// Asks the oracle about each candidate and keeps the ones it links.
///
/// Answers are cached by `(model, seed, CHAT, rendered conversation)`, so a
/// repeated run issues no oracle calls.
#[derive(Debug, Clone)]
pub struct DirectClassifier {
    oracle: Arc<dyn Oracle>,
    cache: Arc<Cache>,
    template: String,
    parser: ResponseParser,
    system_message: bool,
    threads: usize,
}

impl DirectClassifier {
    pub const KIND: &'static str = "direct";

    /// Classifier with the default template for `parser` and the oracle's
    /// preferred pool size.
    pub fn new(oracle: Arc<dyn Oracle>, cache: Arc<Cache>, parser: ResponseParser) -> Self {
        let template = match parser {
            ResponseParser::TraceTag => REASONING_TEMPLATE,
            ResponseParser::Substring => SIMPLE_TEMPLATE,
        };
        let threads = oracle.max_concurrency().max(1);
        Self {
            oracle,
            cache,
            template: template.to_string(),
            parser,
            system_message: false,
            threads,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_system_message(mut self, enabled: bool) -> Self {
        self.system_message = enabled;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Rebinds the prompt template of this instance only.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn parser(&self) -> ResponseParser {
        self.parser
    }

    fn messages(&self, source: &Item, target: &Item) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if self.system_message {
            messages.push(ChatMessage::system(SYSTEM_MESSAGE));
        }
        messages.push(ChatMessage::user(render_prompt(&self.template, source, target)));
        messages
    }

    /// Raw oracle answer for one pair, from cache when possible.
    async fn answer(&self, source: &Item, target: &Item) -> ClassifierResult<String> {
        let messages = self.messages(source, target);
        let key = CacheKey::chat(
            self.oracle.model(),
            self.oracle.seed(),
            &render_messages(&messages),
        );

        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        info!(
            model = %self.oracle.model(),
            source = %source.id(),
            target = %target.id(),
            "Classifying"
        );
        let response = self.oracle.chat(&messages).await?;
        self.cache.put(&key, &response).await?;
        Ok(response)
    }
}

#[async_trait]
impl Classifier for DirectClassifier {
    async fn classify(
        &self,
        source: &Item,
        targets: &[Arc<Item>],
    ) -> ClassifierResult<Vec<Classification>> {
        let mut related = Vec::new();
        for target in targets {
            let response = self.answer(source, target).await?;
            let linked = self.parser.is_related(&response);
            debug!(source = %source.id(), target = %target.id(), linked, "Pair classified");
            if linked {
                related.push(Classification::linked(Arc::clone(target)));
            }
        }
        Ok(related)
    }

    fn copy_of(&self) -> Box<dyn Classifier> {
        Box::new(self.clone())
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn threads(&self) -> usize {
        self.threads
    }
}
