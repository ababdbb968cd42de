//! Items, oracles and stores used across integration tests.

use std::sync::Arc;

use tracelink::knowledge::Item;
use tracelink::oracle::{CachedEmbedder, ChatMessage, MockOracle};
use tracelink::store::{CandidateStore, TopK};

/// Requirement whose content ends with a `#tag`.
pub fn requirement(id: &str, text: &str, tag: &str) -> Arc<Item> {
    Arc::new(Item::artifact(id, "requirement", &format!("{text} #{tag}")))
}

/// Code artifact whose content ends with a `#tag`.
pub fn code(id: &str, text: &str, tag: &str) -> Arc<Item> {
    Arc::new(Item::artifact(id, "code", &format!("{text} #{tag}")))
}

/// Two requirements, A and B.
pub fn sources() -> Vec<Arc<Item>> {
    vec![
        requirement("A", "Users sign in with a password.", "auth"),
        requirement("B", "Invoices are sent monthly.", "billing"),
    ]
}

/// Three code artifacts; X shares A's tag and Y shares B's.
pub fn targets() -> Vec<Arc<Item>> {
    vec![
        code("X", "class Login {}", "auth"),
        code("Y", "class InvoiceJob {}", "billing"),
        code("Z", "class AuditLog {}", "audit"),
    ]
}

/// `#tag` words of a prompt, with the template's quoting removed.
pub fn tags(prompt: &str) -> Vec<String> {
    prompt
        .split_whitespace()
        .filter_map(|word| word.strip_prefix('#'))
        .map(|tag| tag.trim_end_matches("'''").to_string())
        .collect()
}

/// Oracle answering yes exactly when both artifacts of the prompt share a tag.
pub fn tag_oracle() -> Arc<MockOracle> {
    Arc::new(MockOracle::new(|messages: &[ChatMessage]| {
        let tags = messages
            .last()
            .map(|message| tags(&message.content))
            .unwrap_or_default();
        if tags.len() == 2 && tags[0] == tags[1] {
            "The artifacts share a concern. <trace>yes</trace>".to_string()
        } else {
            "Nothing in common. <trace>no</trace>".to_string()
        }
    }))
}

/// Embeds `items` and loads them into `store`.
pub async fn load_store(
    mut store: CandidateStore,
    items: Vec<Arc<Item>>,
    embedder: &CachedEmbedder,
) -> CandidateStore {
    let vectors = embedder.embed_items(&items).await.unwrap();
    store.load(items, vectors).unwrap();
    store
}

/// Source store in bulk mode and target store retrieving every candidate.
pub async fn stores(embedder: &CachedEmbedder) -> (CandidateStore, CandidateStore) {
    let source_store = load_store(CandidateStore::bulk(), sources(), embedder).await;
    let target_store =
        load_store(CandidateStore::retrieval(TopK::Unbounded), targets(), embedder).await;
    (source_store, target_store)
}
