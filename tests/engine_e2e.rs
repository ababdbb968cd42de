//! End-to-end runs: embed, retrieve, classify, cache, re-run.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::fixtures::{self, tag_oracle};
use tempfile::TempDir;
use tracelink::cache::{CacheManager, MemoryRemoteStore, RemoteStore};
use tracelink::classifier::{ClassifierContext, ClassifierSpec, build_classifier};
use tracelink::engine::{ClassificationEngine, EngineConfig, VerdictSet, aggregate_any};
use tracelink::knowledge::{Item, ItemForest, TraceLink};
use tracelink::oracle::{CachedEmbedder, MockOracle};
use tracelink::store::{CandidateStore, TopK};

const DIRECT_RECIPE: &str = r#"{"kind": "direct", "parser": "trace_tag"}"#;

async fn run_once(manager: Arc<CacheManager>, oracle: Arc<MockOracle>, recipe: &str) -> VerdictSet {
    let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();
    let (source_store, target_store) = fixtures::stores(&embedder).await;

    let context = ClassifierContext::new(Arc::clone(&manager), oracle);
    let spec = ClassifierSpec::from_json(recipe).unwrap();
    let classifier = build_classifier(&spec, &context).unwrap();
    let engine =
        ClassificationEngine::new(classifier, EngineConfig::default().with_workers(2)).unwrap();

    let verdicts = engine
        .run_stores(&source_store, &target_store)
        .await
        .unwrap();
    manager.flush_all().await.unwrap();
    verdicts
}

fn local_manager(dir: &Path) -> Arc<CacheManager> {
    Arc::new(CacheManager::new(dir).unwrap())
}

fn expected() -> Vec<TraceLink> {
    vec![TraceLink::new("A", "X"), TraceLink::new("B", "Y")]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rerun_is_served_from_cache() {
    let dir = TempDir::new().unwrap();

    let first_oracle = tag_oracle();
    let first = run_once(local_manager(dir.path()), first_oracle.clone(), DIRECT_RECIPE).await;

    assert_eq!(first.trace_links().into_iter().collect::<Vec<_>>(), expected());
    assert_eq!(first_oracle.chat_calls(), 6);
    assert_eq!(first_oracle.embed_calls(), 5);

    let second_oracle = tag_oracle();
    let second = run_once(local_manager(dir.path()), second_oracle.clone(), DIRECT_RECIPE).await;

    assert_eq!(second, first);
    assert_eq!(second_oracle.chat_calls(), 0);
    assert_eq!(second_oracle.embed_calls(), 0);
}

#[tokio::test]
async fn test_cache_files_are_named_by_kind_model_and_seed() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(dir.path());
    run_once(Arc::clone(&manager), tag_oracle(), DIRECT_RECIPE).await;

    let names: Vec<String> = manager
        .cache_files()
        .unwrap()
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "direct_mock-chat_133742243.json".to_string(),
            "embedding_mock-embedding_133742243.json".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_remote_tier_serves_fresh_local_directory() {
    let remote = Arc::new(MemoryRemoteStore::new());

    let first_dir = TempDir::new().unwrap();
    let first_manager = Arc::new(
        CacheManager::with_remote(first_dir.path(), remote.clone() as Arc<dyn RemoteStore>).unwrap(),
    );
    let first_oracle = tag_oracle();
    let first = run_once(first_manager, first_oracle.clone(), DIRECT_RECIPE).await;
    assert_eq!(first_oracle.chat_calls(), 6);
    assert_eq!(remote.len(), 11);

    let second_dir = TempDir::new().unwrap();
    let second_manager = Arc::new(
        CacheManager::with_remote(second_dir.path(), remote.clone() as Arc<dyn RemoteStore>)
            .unwrap(),
    );
    let second_oracle = tag_oracle();
    let second = run_once(second_manager, second_oracle.clone(), DIRECT_RECIPE).await;

    assert_eq!(second, first);
    assert_eq!(second_oracle.chat_calls(), 0);
    assert_eq!(second_oracle.embed_calls(), 0);
}

#[tokio::test]
async fn test_unreachable_remote_falls_back_to_local() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_available(false);
    let dir = TempDir::new().unwrap();
    let manager = Arc::new(
        CacheManager::with_remote(dir.path(), remote.clone() as Arc<dyn RemoteStore>).unwrap(),
    );

    let verdicts = run_once(Arc::clone(&manager), tag_oracle(), DIRECT_RECIPE).await;

    assert_eq!(verdicts.trace_links().into_iter().collect::<Vec<_>>(), expected());
    assert!(remote.is_empty());
    assert_eq!(manager.cache_files().unwrap().len(), 2);
}

#[tokio::test]
async fn test_pipeline_recipe_filters_mock_layer() {
    let dir = TempDir::new().unwrap();
    let recipe = r#"{
        "kind": "pipeline",
        "layers": [
            [{"kind": "mock"}],
            [{"kind": "direct"}, {"kind": "direct", "system_message": true}, {"kind": "mock"}]
        ]
    }"#;
    let oracle = tag_oracle();

    let verdicts = run_once(local_manager(dir.path()), oracle.clone(), recipe).await;

    // second layer: 2 of 3 votes for the tagged pairs, 1 of 3 for the rest
    assert_eq!(verdicts.trace_links().into_iter().collect::<Vec<_>>(), expected());
    // both direct members share one cache file but differ in system message
    assert_eq!(oracle.chat_calls(), 12);
}

#[tokio::test]
async fn test_top_k_retrieval_with_mock_classifier() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(dir.path());
    let oracle = tag_oracle();
    let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();

    let source_store = fixtures::load_store(CandidateStore::bulk(), fixtures::sources(), &embedder).await;
    let target_store = fixtures::load_store(
        CandidateStore::retrieval(TopK::limited(2).unwrap()),
        fixtures::targets(),
        &embedder,
    )
    .await;

    let context = ClassifierContext::new(Arc::clone(&manager), oracle.clone());
    let classifier = build_classifier(&ClassifierSpec::Mock, &context).unwrap();
    let engine = ClassificationEngine::new(classifier, EngineConfig::default()).unwrap();

    let verdicts = engine
        .run_stores(&source_store, &target_store)
        .await
        .unwrap();

    assert_eq!(verdicts.len(), 4);
    assert_eq!(oracle.chat_calls(), 0);
}

#[tokio::test]
async fn test_fragment_verdicts_aggregate_to_artifacts() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(dir.path());
    let oracle = tag_oracle();
    let embedder = CachedEmbedder::from_manager(oracle.clone(), &manager).unwrap();

    let docs = vec![
        Item::new("A", "requirement", "Authentication.", 0, None, false),
        Item::fragment("A$0", "sentence", "Users sign in. #auth", 1, "A"),
        Item::fragment("A$1", "sentence", "Sessions expire. #session", 1, "A"),
    ];
    let code = vec![
        Item::new("Login.java", "code", "class Login {}", 0, None, false),
        Item::fragment("Login.java$0", "method", "void signIn() #auth", 1, "Login.java"),
        Item::artifact("Audit.java", "code", "class Audit {} #audit"),
    ];

    let doc_forest = ItemForest::resolve(docs).unwrap();
    let code_forest = ItemForest::resolve(code).unwrap();
    let source_store = fixtures::load_store(
        CandidateStore::bulk(),
        doc_forest.items().to_vec(),
        &embedder,
    )
    .await;
    let target_store = fixtures::load_store(
        CandidateStore::retrieval(TopK::Unbounded),
        code_forest.items().to_vec(),
        &embedder,
    )
    .await;

    let context = ClassifierContext::new(Arc::clone(&manager), oracle.clone());
    let classifier =
        build_classifier(&ClassifierSpec::from_json(DIRECT_RECIPE).unwrap(), &context).unwrap();
    let engine = ClassificationEngine::new(classifier, EngineConfig::default()).unwrap();
    let verdicts = engine
        .run_stores(&source_store, &target_store)
        .await
        .unwrap();

    // two compare sources times two compare targets
    assert_eq!(oracle.chat_calls(), 4);
    assert_eq!(
        verdicts.trace_links().into_iter().collect::<Vec<_>>(),
        vec![TraceLink::new("A$0", "Login.java$0")]
    );

    let links = aggregate_any(&verdicts, &doc_forest, &code_forest, 0, 0).unwrap();
    assert_eq!(
        links.into_iter().collect::<Vec<_>>(),
        vec![TraceLink::new("A", "Login.java")]
    );
}
