//! Cache files across restarts and merges.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use tracelink::cache::{CacheKey, CacheManager, LocalCache};

fn key(content: &str) -> CacheKey {
    CacheKey::chat("gpt-4o-mini", 7, content)
}

#[tokio::test]
async fn test_values_survive_restart() {
    let dir = TempDir::new().unwrap();

    {
        let manager = CacheManager::new(dir.path()).unwrap();
        let cache = manager.cache("direct", "gpt-4o-mini", 7).unwrap();
        cache.put(&key("is A linked to X?"), "yes").await.unwrap();
        cache.put(&key("is A linked to Z?"), "no").await.unwrap();
        // no explicit flush: dropping the last handle persists the entries
    }

    let manager = CacheManager::new(dir.path()).unwrap();
    let cache = manager.cache("direct", "gpt-4o-mini", 7).unwrap();
    assert_eq!(cache.get(&key("is A linked to X?")).await.as_deref(), Some("yes"));
    assert_eq!(cache.get(&key("is A linked to Z?")).await.as_deref(), Some("no"));
    assert_eq!(cache.dirty(), 0);
}

#[tokio::test]
async fn test_line_endings_do_not_change_keys() {
    let dir = TempDir::new().unwrap();
    let manager = CacheManager::new(dir.path()).unwrap();
    let cache = manager.cache("direct", "gpt-4o-mini", 7).unwrap();

    cache.put(&key("line one\r\nline two"), "yes").await.unwrap();

    assert_eq!(cache.get(&key("line one\nline two")).await.as_deref(), Some("yes"));
}

#[tokio::test]
async fn test_file_is_flat_json_object() {
    let dir = TempDir::new().unwrap();
    let manager = CacheManager::new(dir.path()).unwrap();
    let cache = manager.cache("direct", "gpt-4o-mini", 7).unwrap();
    let stored = key("prompt");
    cache.put(&stored, "answer").await.unwrap();
    manager.flush_all().await.unwrap();

    let raw = fs::read_to_string(dir.path().join("direct_gpt-4o-mini_7.json")).unwrap();
    let parsed: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();

    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.get(stored.local_key()).map(String::as_str), Some("answer"));
}

#[tokio::test]
async fn test_merge_between_directories() {
    let ours = TempDir::new().unwrap();
    let theirs = TempDir::new().unwrap();

    let our_manager = CacheManager::new(ours.path()).unwrap();
    let our_cache = our_manager.cache("direct", "gpt-4o-mini", 7).unwrap();
    our_cache.put(&key("shared"), "yes").await.unwrap();
    our_cache.put(&key("disputed"), "yes").await.unwrap();
    our_manager.flush_all().await.unwrap();

    let their_manager = CacheManager::new(theirs.path()).unwrap();
    let their_cache = their_manager.cache("direct", "gpt-4o-mini", 7).unwrap();
    their_cache.put(&key("shared"), "yes").await.unwrap();
    their_cache.put(&key("disputed"), "no").await.unwrap();
    their_cache.put(&key("new"), "no").await.unwrap();
    their_manager.flush_all().await.unwrap();

    let source = their_manager
        .open_file(&theirs.path().join("direct_gpt-4o-mini_7.json"), false)
        .unwrap();
    let target = our_manager.open_file(source.local().path(), true).unwrap();

    let refused = target.merge(&source, false).await.unwrap();
    assert!(!refused.applied);
    assert_eq!(refused.conflicts.len(), 1);
    assert!(refused.conflicts.contains(key("disputed").local_key()));
    assert_eq!(target.get(&key("new")).await, None);

    let forced = target.merge(&source, true).await.unwrap();
    assert!(forced.applied);
    assert_eq!(forced.added, 1);
    assert_eq!(forced.overwritten, 1);

    let reopened = LocalCache::open(ours.path().join("direct_gpt-4o-mini_7.json")).unwrap();
    assert_eq!(reopened.get(key("disputed").local_key()).as_deref(), Some("no"));
    assert_eq!(reopened.get(key("new").local_key()).as_deref(), Some("no"));
    assert_eq!(reopened.len(), 3);
}

#[test]
fn test_corrupted_file_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("direct_gpt-4o-mini_7.json"), "{ not json").unwrap();

    let manager = CacheManager::new(dir.path()).unwrap();
    assert!(manager.cache("direct", "gpt-4o-mini", 7).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_share_one_file() {
    let dir = TempDir::new().unwrap();
    let manager = Arc::new(CacheManager::new(dir.path()).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let cache = manager.cache("direct", "gpt-4o-mini", 7).unwrap();
                cache.put(&key(&format!("prompt {i}")), "yes").await.unwrap();
            })
        })
        .collect();
    let results = futures::future::join_all(handles).await;
    assert!(results.iter().all(Result::is_ok));
    manager.flush_all().await.unwrap();

    let reopened = LocalCache::open(dir.path().join("direct_gpt-4o-mini_7.json")).unwrap();
    assert_eq!(reopened.len(), 16);
}
