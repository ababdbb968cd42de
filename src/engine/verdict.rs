//! Verdicts and their order-independent accumulation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::knowledge::TraceLink;

/// A positive classification of one (source, target) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub source_id: String,
    pub target_id: String,
    /// In `[0, 1]`; `1.0` is a certain link.
    pub confidence: f64,
}

impl ClassificationVerdict {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, confidence: f64) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn trace_link(&self) -> TraceLink {
        TraceLink::new(self.source_id.clone(), self.target_id.clone())
    }
}

/// Verdicts keyed by (source, target), iterated in key order.
///
/// Inserting the same pair twice keeps the higher confidence. Insertion is
/// commutative and associative, so the set does not depend on the order in
/// which workers finish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerdictSet {
    verdicts: BTreeMap<(String, String), f64>,
}

impl VerdictSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, verdict: ClassificationVerdict) {
        let confidence = verdict.confidence;
        self.verdicts
            .entry((verdict.source_id, verdict.target_id))
            .and_modify(|existing| *existing = existing.max(confidence))
            .or_insert(confidence);
    }

    /// Folds `other` into this set.
    pub fn merge(&mut self, other: VerdictSet) {
        for verdict in other {
            self.insert(verdict);
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn contains(&self, source_id: &str, target_id: &str) -> bool {
        self.confidence(source_id, target_id).is_some()
    }

    pub fn confidence(&self, source_id: &str, target_id: &str) -> Option<f64> {
        self.verdicts
            .get(&(source_id.to_string(), target_id.to_string()))
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClassificationVerdict> + '_ {
        self.verdicts
            .iter()
            .map(|((source, target), &confidence)| ClassificationVerdict {
                source_id: source.clone(),
                target_id: target.clone(),
                confidence,
            })
    }

    /// The links with confidence dropped.
    pub fn trace_links(&self) -> BTreeSet<TraceLink> {
        self.verdicts
            .keys()
            .map(|(source, target)| TraceLink::new(source.clone(), target.clone()))
            .collect()
    }
}

impl FromIterator<ClassificationVerdict> for VerdictSet {
    fn from_iter<I: IntoIterator<Item = ClassificationVerdict>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<ClassificationVerdict> for VerdictSet {
    fn extend<I: IntoIterator<Item = ClassificationVerdict>>(&mut self, iter: I) {
        for verdict in iter {
            self.insert(verdict);
        }
    }
}

impl IntoIterator for VerdictSet {
    type Item = ClassificationVerdict;
    type IntoIter = std::vec::IntoIter<ClassificationVerdict>;

    fn into_iter(self) -> Self::IntoIter {
        self.verdicts
            .into_iter()
            .map(|((source_id, target_id), confidence)| ClassificationVerdict {
                source_id,
                target_id,
                confidence,
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}
