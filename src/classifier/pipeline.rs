//! Multi-stage classification with a majority vote per layer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{debug, info, instrument};

use super::error::ClassifierResult;
use super::{Classification, Classifier};
use crate::config::ConfigError;
use crate::knowledge::Item;

/// Votes needed to keep a candidate in a layer of `layer_size` classifiers.
///
/// `ceil(n / 2)`: with an even layer a tie keeps the candidate.
pub fn majority_threshold(layer_size: usize) -> usize {
    layer_size.div_ceil(2)
}

/// Ordered layers of independent classifiers.
///
/// Every classifier of a layer votes on the current candidates; a candidate
/// that reaches [`majority_threshold`] moves on to the next layer. The
/// candidate set never grows, and an empty set ends the run early without
/// further oracle calls. Survivors of the last layer are linked with
/// confidence 1.0.
#[derive(Debug)]
pub struct PipelineClassifier {
    layers: Vec<Vec<Box<dyn Classifier>>>,
}

impl PipelineClassifier {
    pub const KIND: &'static str = "pipeline";

    /// Fails when there are no layers or a layer is empty.
    pub fn new(layers: Vec<Vec<Box<dyn Classifier>>>) -> Result<Self, ConfigError> {
        if layers.is_empty() {
            return Err(ConfigError::InvalidClassifierSpec {
                reason: "pipeline needs at least one layer".to_string(),
            });
        }
        if let Some(layer) = layers.iter().position(Vec::is_empty) {
            return Err(ConfigError::EmptyPipelineLayer { layer });
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> usize {
        self.layers.len()
    }

    async fn run_layer(
        layer: &[Box<dyn Classifier>],
        source: &Item,
        candidates: Vec<Arc<Item>>,
    ) -> ClassifierResult<Vec<Arc<Item>>> {
        let ballots = try_join_all(
            layer
                .iter()
                .map(|classifier| classifier.classify(source, &candidates)),
        )
        .await?;

        let mut votes: HashMap<&str, usize> = HashMap::with_capacity(candidates.len());
        for ballot in &ballots {
            for classification in ballot {
                *votes.entry(classification.target.id()).or_default() += 1;
            }
        }

        let threshold = majority_threshold(layer.len());
        let survivors: Vec<Arc<Item>> = candidates
            .iter()
            .filter(|candidate| votes.get(candidate.id()).copied().unwrap_or(0) >= threshold)
            .cloned()
            .collect();
        Ok(survivors)
    }
}

#[async_trait]
impl Classifier for PipelineClassifier {
    #[instrument(skip(self, source, targets), fields(source = %source.id(), candidates = targets.len()))]
    async fn classify(
        &self,
        source: &Item,
        targets: &[Arc<Item>],
    ) -> ClassifierResult<Vec<Classification>> {
        let mut candidates = targets.to_vec();

        for (index, layer) in self.layers.iter().enumerate() {
            if candidates.is_empty() {
                debug!(layer = index, "No candidates left, skipping remaining layers");
                break;
            }
            let before = candidates.len();
            candidates = Self::run_layer(layer, source, candidates).await?;
            info!(
                layer = index,
                classifiers = layer.len(),
                before,
                after = candidates.len(),
                "Layer voted"
            );
        }

        Ok(candidates.into_iter().map(Classification::linked).collect())
    }

    fn copy_of(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            layers: self
                .layers
                .iter()
                .map(|layer| layer.iter().map(|classifier| classifier.copy_of()).collect())
                .collect(),
        })
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    /// Largest pool among the member classifiers.
    fn threads(&self) -> usize {
        self.layers
            .iter()
            .flatten()
            .map(|classifier| classifier.threads())
            .max()
            .unwrap_or(1)
    }
}
