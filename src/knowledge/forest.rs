use std::collections::HashMap;
use std::sync::Arc;

use super::Item;
use super::error::{KnowledgeError, KnowledgeResult};

/// A batch of items with their parent relations resolved.
///
/// Relations are kept as indices into the batch, never as owning pointers
/// between items.
#[derive(Debug, Clone, Default)]
pub struct ItemForest {
    items: Vec<Arc<Item>>,
    by_id: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl ItemForest {
    /// Second construction phase: resolves every `parent_id` of the batch.
    ///
    /// A child must be strictly finer-grained than its parent, which also rules out
    /// cycles longer than a self-reference.
    pub fn resolve(items: Vec<Item>) -> KnowledgeResult<Self> {
        let items: Vec<Arc<Item>> = items.into_iter().map(Arc::new).collect();

        let mut by_id = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if by_id.insert(item.id().to_string(), index).is_some() {
                return Err(KnowledgeError::DuplicateId {
                    id: item.id().to_string(),
                });
            }
        }

        let mut parents = vec![None; items.len()];
        let mut children = vec![Vec::new(); items.len()];
        for (index, item) in items.iter().enumerate() {
            let Some(parent_id) = item.parent_id() else {
                continue;
            };
            if parent_id == item.id() {
                return Err(KnowledgeError::Cycle {
                    id: item.id().to_string(),
                });
            }
            let parent_index =
                *by_id
                    .get(parent_id)
                    .ok_or_else(|| KnowledgeError::UnresolvedParent {
                        id: item.id().to_string(),
                        parent_id: parent_id.to_string(),
                    })?;
            let parent = &items[parent_index];
            if parent.granularity() >= item.granularity() {
                return Err(KnowledgeError::InvalidGranularity {
                    id: item.id().to_string(),
                    granularity: item.granularity(),
                    parent_granularity: parent.granularity(),
                });
            }
            parents[index] = Some(parent_index);
            children[parent_index].push(index);
        }

        Ok(Self {
            items,
            by_id,
            parents,
            children,
        })
    }

    /// Items in batch order.
    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Item>> {
        self.by_id.get(id).map(|&index| &self.items[index])
    }

    /// Returns the parent of `id`, or `None` for roots and unknown ids.
    pub fn parent(&self, id: &str) -> Option<&Arc<Item>> {
        let index = *self.by_id.get(id)?;
        self.parents[index].map(|p| &self.items[p])
    }

    /// Direct children of `id` in batch order.
    pub fn children(&self, id: &str) -> Vec<&Arc<Item>> {
        self.by_id
            .get(id)
            .map(|&index| {
                self.children[index]
                    .iter()
                    .map(|&c| &self.items[c])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Follows parent links up to the root of `id`'s tree.
    pub fn root_of(&self, id: &str) -> KnowledgeResult<&Arc<Item>> {
        let mut index = self.index_of(id)?;
        while let Some(parent) = self.parents[index] {
            index = parent;
        }
        Ok(&self.items[index])
    }

    /// Lifts `id` to its ancestor whose granularity is at most `granularity`.
    ///
    /// Items already at or below the requested granularity are returned unchanged.
    pub fn ancestor_at_granularity(&self, id: &str, granularity: u32) -> KnowledgeResult<&Arc<Item>> {
        let mut index = self.index_of(id)?;
        while self.items[index].granularity() > granularity {
            index = self.parents[index].ok_or_else(|| KnowledgeError::GranularityUnreachable {
                id: id.to_string(),
                granularity,
            })?;
        }
        Ok(&self.items[index])
    }

    fn index_of(&self, id: &str) -> KnowledgeResult<usize> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| KnowledgeError::UnknownItem { id: id.to_string() })
    }
}
