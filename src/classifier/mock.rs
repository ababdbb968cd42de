use std::sync::Arc;

use async_trait::async_trait;

use super::error::ClassifierResult;
use super::{Classification, Classifier};
use crate::knowledge::Item;

/// Links every candidate with confidence 1.0. Uses neither oracle nor cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockClassifier;

impl MockClassifier {
    pub const KIND: &'static str = "mock";
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(
        &self,
        _source: &Item,
        targets: &[Arc<Item>],
    ) -> ClassifierResult<Vec<Classification>> {
        Ok(targets
            .iter()
            .map(|target| Classification::linked(Arc::clone(target)))
            .collect())
    }

    fn copy_of(&self) -> Box<dyn Classifier> {
        Box::new(*self)
    }

    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn threads(&self) -> usize {
        1
    }
}
