//! Lifting fragment-level verdicts to artifact-level trace links.

use std::collections::BTreeSet;

use super::verdict::VerdictSet;
use crate::knowledge::{ItemForest, KnowledgeResult, TraceLink};

/// "Any connection" aggregation.
///
/// Each verdict's source and target are replaced by their ancestors at the
/// requested granularities; one linked fragment pair is enough to link the
/// enclosing items. Duplicates collapse into one link.
pub fn aggregate_any(
    verdicts: &VerdictSet,
    source_forest: &ItemForest,
    target_forest: &ItemForest,
    source_granularity: u32,
    target_granularity: u32,
) -> KnowledgeResult<BTreeSet<TraceLink>> {
    verdicts
        .iter()
        .map(|verdict| -> KnowledgeResult<TraceLink> {
            let source = source_forest.ancestor_at_granularity(&verdict.source_id, source_granularity)?;
            let target = target_forest.ancestor_at_granularity(&verdict.target_id, target_granularity)?;
            Ok(TraceLink::new(source.id(), target.id()))
        })
        .collect()
}
