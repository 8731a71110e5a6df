//! Debounced document sessions

use std::sync::Arc;
use std::time::Duration;

use dscope::{AnalysisConfig, DocumentSession, ModuleCache, Origin};

fn fast_cache() -> Arc<ModuleCache> {
    let config = AnalysisConfig::new()
        .with_debounce(Duration::from_millis(40))
        .with_poll_interval(Duration::from_millis(5));
    Arc::new(ModuleCache::new(Arc::new(config)))
}

async fn wait(session: &DocumentSession, generation: u64) -> Arc<dscope::SessionSnapshot> {
    tokio::time::timeout(Duration::from_secs(10), session.wait_for(generation))
        .await
        .expect("snapshot in time")
        .expect("worker alive")
}

#[tokio::test]
async fn test_initial_text_is_published_and_cached() {
    let cache = fast_cache();
    let session = DocumentSession::open(Arc::clone(&cache), "scratch", None, "module app; int x;").unwrap();
    let snapshot = wait(&session, 1).await;
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.entry.name, "app");
    assert!(snapshot.errors.is_empty());
    assert!(cache.contains("app"));
    assert_eq!(session.latest().map(|s| s.generation), Some(1));
    session.close().await;
    assert!(cache.contains("app"));
}

#[tokio::test]
async fn test_burst_of_edits_publishes_only_the_latest() {
    let cache = fast_cache();
    let session = DocumentSession::open(Arc::clone(&cache), "doc", None, "int a;").unwrap();
    wait(&session, 1).await;

    let mut last = 0;
    for i in 0..10 {
        last = session.edit(format!("int a{i};"));
    }
    assert_eq!(last, 11);
    assert_eq!(session.generation(), 11);

    let snapshot = wait(&session, last).await;
    assert_eq!(snapshot.generation, 11);
    assert!(snapshot.entry.source.contains("a9"));
    assert!(cache.get("doc").is_some_and(|e| e.source == "int a9;"));
    session.close().await;
}

#[tokio::test]
async fn test_generations_never_go_backwards() {
    let cache = fast_cache();
    let session = DocumentSession::open(Arc::clone(&cache), "doc", None, "int a;").unwrap();
    let mut receiver = session.subscribe();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while receiver.changed().await.is_ok() {
            if let Some(snapshot) = receiver.borrow_and_update().clone() {
                seen.push(snapshot.generation);
            }
        }
        seen
    });

    for i in 0..5 {
        let generation = session.edit(format!("int v{i};"));
        wait(&session, generation).await;
    }
    session.close().await;

    let seen = observer.await.unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&6));
}

#[tokio::test]
async fn test_renamed_module_replaces_old_cache_key() {
    let cache = fast_cache();
    let session = DocumentSession::open(Arc::clone(&cache), "doc", None, "module first; int x;").unwrap();
    wait(&session, 1).await;
    assert!(cache.contains("first"));

    let generation = session.edit("module second; int x;");
    wait(&session, generation).await;
    assert!(cache.contains("second"));
    assert!(!cache.contains("first"));
    session.close().await;
}

#[tokio::test]
async fn test_snapshot_errors_combine_parser_and_semantic_records() {
    let cache = fast_cache();
    let session = DocumentSession::open(Arc::clone(&cache), "doc", None, "Missing m;\nint x = ;").unwrap();
    let snapshot = wait(&session, 1).await;
    let origins: Vec<Origin> = snapshot.errors.iter().map(|r| r.origin).collect();
    assert!(origins.contains(&Origin::Parser), "{origins:?}");
    assert!(origins.contains(&Origin::Semantic), "{origins:?}");
    session.close().await;
}

#[tokio::test]
async fn test_close_stops_worker() {
    let cache = fast_cache();
    let session = DocumentSession::open(cache, "doc", None, "int x;").unwrap();
    wait(&session, 1).await;
    let receiver = session.subscribe();
    session.close().await;
    assert!(receiver.has_changed().is_err());
}
