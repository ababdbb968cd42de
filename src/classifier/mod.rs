//! Classification strategies.
//!
//! A [`Classifier`] decides which of a source item's candidates it is linked
//! to. Strategies are picked at construction time from a serde-tagged
//! [`ClassifierSpec`] through [`build_classifier`].
//!
//! Classifiers may carry per-instance mutable state (a rebindable prompt), so
//! the engine never shares one between workers: every worker classifies with
//! its own [`Classifier::copy_of`], which shares the cache and oracle but
//! nothing mutable.

pub mod direct;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod prompt;
pub mod response;


pub use direct::DirectClassifier;
pub use error::{ClassifierError, ClassifierResult};
pub use mock::MockClassifier;
pub use pipeline::{PipelineClassifier, majority_threshold};
pub use response::ResponseParser;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::CacheManager;
use crate::config::ConfigError;
use crate::knowledge::Item;
use crate::oracle::Oracle;

/// A candidate judged to be linked to the source.
#[derive(Debug, Clone)]
pub struct Classification {
    pub target: Arc<Item>,
    pub confidence: f64,
}

impl Classification {
    /// Positive link with confidence 1.0.
    pub fn linked(target: Arc<Item>) -> Self {
        Self {
            target,
            confidence: 1.0,
        }
    }
}

/// Decides which targets a source is related to.
#[async_trait]
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Returns only the related targets; a missing target means "not related".
    async fn classify(
        &self,
        source: &Item,
        targets: &[Arc<Item>],
    ) -> ClassifierResult<Vec<Classification>>;

    /// Independent instance sharing configuration, cache and oracle.
    fn copy_of(&self) -> Box<dyn Classifier>;

    /// Short strategy name, also used as the cache file prefix.
    fn kind(&self) -> &'static str;

    /// Preferred worker pool size.
    fn threads(&self) -> usize;
}

/// Settings of a [`DirectClassifier`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectSpec {
    /// Chat model; `None` uses the context's default oracle.
    pub model: Option<String>,
    /// Custom prompt template.
    pub template: Option<String>,
    pub parser: ResponseParser,
    /// Prepend the traceability system message.
    pub system_message: bool,
    /// Pool size; `None` uses the oracle's preference.
    pub threads: Option<usize>,
}

/// Serializable classifier recipe.
///
/// ```json
/// {"kind": "pipeline", "layers": [[{"kind": "direct", "parser": "substring"}]]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    Mock,
    Direct(DirectSpec),
    Pipeline { layers: Vec<Vec<ClassifierSpec>> },
}

impl ClassifierSpec {
    /// Parses a JSON recipe.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::InvalidClassifierSpec {
            reason: e.to_string(),
        })
    }
}

/// Shared resources classifiers are built from.
#[derive(Debug, Clone)]
pub struct ClassifierContext {
    caches: Arc<CacheManager>,
    oracle: Arc<dyn Oracle>,
    models: HashMap<String, Arc<dyn Oracle>>,
}

impl ClassifierContext {
    pub fn new(caches: Arc<CacheManager>, oracle: Arc<dyn Oracle>) -> Self {
        let mut models = HashMap::new();
        models.insert(oracle.model().to_string(), Arc::clone(&oracle));
        Self {
            caches,
            oracle,
            models,
        }
    }

    /// Makes another model selectable by name in recipes.
    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.models.insert(oracle.model().to_string(), oracle);
        self
    }

    pub fn caches(&self) -> &Arc<CacheManager> {
        &self.caches
    }

    pub fn oracle(&self) -> &Arc<dyn Oracle> {
        &self.oracle
    }

    fn oracle_for(&self, model: Option<&str>) -> Result<Arc<dyn Oracle>, ConfigError> {
        match model {
            None => Ok(Arc::clone(&self.oracle)),
            Some(name) => self.models.get(name).cloned().ok_or_else(|| {
                ConfigError::InvalidClassifierSpec {
                    reason: format!("no oracle registered for model '{name}'"),
                }
            }),
        }
    }
}

/// Builds a classifier from its recipe.
pub fn build_classifier(
    spec: &ClassifierSpec,
    context: &ClassifierContext,
) -> ClassifierResult<Box<dyn Classifier>> {
    match spec {
        ClassifierSpec::Mock => Ok(Box::new(MockClassifier)),
        ClassifierSpec::Direct(direct) => {
            if direct.threads == Some(0) {
                return Err(ConfigError::ZeroWorkers.into());
            }
            let oracle = context.oracle_for(direct.model.as_deref())?;
            let cache = context
                .caches
                .cache(DirectClassifier::KIND, oracle.model(), oracle.seed())?;

            let mut classifier = DirectClassifier::new(oracle, cache, direct.parser)
                .with_system_message(direct.system_message);
            if let Some(template) = &direct.template {
                classifier = classifier.with_template(template.clone());
            }
            if let Some(threads) = direct.threads {
                classifier = classifier.with_threads(threads);
            }
            Ok(Box::new(classifier))
        }
        ClassifierSpec::Pipeline { layers } => {
            let built = layers
                .iter()
                .map(|layer| {
                    layer
                        .iter()
                        .map(|member| build_classifier(member, context))
                        .collect::<ClassifierResult<Vec<_>>>()
                })
                .collect::<ClassifierResult<Vec<_>>>()?;
            Ok(Box::new(PipelineClassifier::new(built)?))
        }
    }
}
