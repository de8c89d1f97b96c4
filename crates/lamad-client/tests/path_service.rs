//! PathService against the in-memory collaborators.

use std::sync::Arc;

use lamad_client::{
    path_cache_key, paths_cache_key, InMemoryDocumentStore, MockGenerator, PathService, ServiceConfig,
    StaticIdentityProvider, PATHS_COLLECTION,
};
use lamad_path::{LearningPath, PathStatus, StepStatus};
use lamad_sync::{BindOptions, Binding, DataSynchronizer, ErrorKind, FetchCache, SyncState};
use serde::de::DeserializeOwned;
use serde::Serialize;

const OUTLINE: &str = r#"Sure, here it is:
{"name": "Rust basics", "steps": [
  {"title": "Install the toolchain", "resources": [{"type": "documentation", "url": "https://rustup.rs", "durationMinutes": 15}]},
  {"title": "Ownership"},
  {"title": "Traits"}
]}"#;

struct Fixture {
    service: PathService,
    store: Arc<InMemoryDocumentStore>,
    generator: Arc<MockGenerator>,
}

fn fixture_with(generator: MockGenerator) -> Fixture {
    let identity = StaticIdentityProvider::new()
        .with_token("alice-token", "alice")
        .with_token("bob-token", "bob");
    let store = Arc::new(InMemoryDocumentStore::new());
    let generator = Arc::new(generator);
    let sync = DataSynchronizer::new(Arc::new(FetchCache::new()));
    let service = PathService::new(Arc::new(identity), store.clone(), generator.clone(), sync);

    Fixture {
        service,
        store,
        generator,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockGenerator::new(OUTLINE))
}

async fn settled<T>(binding: &Binding<T>) -> SyncState<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let mut rx = binding.subscribe();
    let state = rx
        .wait_for(|state| !matches!(state, SyncState::Idle | SyncState::Loading { .. }))
        .await
        .unwrap();
    state.clone()
}

fn statuses(path: &LearningPath) -> Vec<StepStatus> {
    path.steps.iter().map(|s| s.status).collect()
}

#[tokio::test]
async fn test_generate_path_from_outline() {
    let fx = fixture();

    let path = fx.service.generate_path("alice-token", "  Rust ").await.unwrap();

    assert_eq!(path.owner_id, "alice");
    assert_eq!(path.name, "Rust basics");
    assert_eq!(path.topic.as_deref(), Some("Rust"));
    assert_eq!(
        statuses(&path),
        vec![StepStatus::Available, StepStatus::Locked, StepStatus::Locked]
    );
    assert_eq!(path.progress, 0);
    assert_eq!(fx.store.len(PATHS_COLLECTION), 1);
    assert!(fx.generator.last_prompt().unwrap().contains("Rust"));
}

#[tokio::test]
async fn test_unparseable_output_uses_fallback() {
    let fx = fixture_with(MockGenerator::new("Sorry, I can't produce JSON today."));

    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();

    assert_eq!(path.name, "Learning path: Rust");
    assert_eq!(path.steps.len(), 4);
    assert_eq!(path.steps[0].status, StepStatus::Available);
}

#[tokio::test]
async fn test_generator_failure_is_unknown_and_stores_nothing() {
    let fx = fixture_with(MockGenerator::new(OUTLINE).with_available(false));

    let err = fx.service.generate_path("alice-token", "Rust").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(fx.store.len(PATHS_COLLECTION), 0);
}

#[tokio::test]
async fn test_rejects_bad_token_and_empty_topic() {
    let fx = fixture();

    let err = fx.service.generate_path("nope", "Rust").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    let err = fx.service.generate_path("alice-token", "   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fx.generator.call_count(), 0);
}

#[tokio::test]
async fn test_completing_every_step_completes_path() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();

    let first = fx
        .service
        .complete_step("alice-token", &path.id, &path.steps[0].id)
        .await
        .unwrap();
    assert_eq!(first.progress, 33);
    assert_eq!(
        statuses(&first),
        vec![StepStatus::Completed, StepStatus::Available, StepStatus::Locked]
    );
    assert_eq!(first.status, PathStatus::Active);

    fx.service
        .complete_step("alice-token", &path.id, &path.steps[1].id)
        .await
        .unwrap();
    let last = fx
        .service
        .complete_step("alice-token", &path.id, &path.steps[2].id)
        .await
        .unwrap();

    assert_eq!(last.progress, 100);
    assert_eq!(last.status, PathStatus::Completed);

    let stored = fx.service.get_path("alice-token", &path.id).await.unwrap();
    assert_eq!(stored.status, PathStatus::Completed);
    assert_eq!(stored.completed_count(), 3);
}

#[tokio::test]
async fn test_rejected_transition_leaves_store_unchanged() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();
    let before = fx.service.get_path("alice-token", &path.id).await.unwrap();

    let err = fx
        .service
        .complete_step("alice-token", &path.id, &path.steps[1].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = fx
        .service
        .complete_step("alice-token", &path.id, "no-such-step")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let after = fx.service.get_path("alice-token", &path.id).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_completing_twice_is_conflict() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();
    let step_id = &path.steps[0].id;

    fx.service.complete_step("alice-token", &path.id, step_id).await.unwrap();
    let err = fx
        .service
        .complete_step("alice-token", &path.id, step_id)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_other_users_path_is_forbidden() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();

    let err = fx
        .service
        .complete_step("bob-token", &path.id, &path.steps[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let binding = fx
        .service
        .bind_path("bob-token", &path.id, BindOptions::new())
        .await
        .unwrap();
    match settled(&binding).await {
        SyncState::Failure { error, stale } => {
            assert_eq!(error.kind(), ErrorKind::Forbidden);
            assert!(stale.is_none());
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bind_path_requires_a_verified_token() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();

    let err = fx
        .service
        .bind_path("forged", &path.id, BindOptions::new())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    assert!(!fx.service.synchronizer().cache().contains(&path_cache_key("alice", &path.id)));
}

#[tokio::test]
async fn test_write_back_invalidates_bound_path() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();
    let key = path_cache_key("alice", &path.id);

    let binding = fx
        .service
        .bind_path("alice-token", &path.id, BindOptions::new())
        .await
        .unwrap();
    assert_eq!(settled(&binding).await.data().map(|p| p.progress), Some(0));
    assert!(fx.service.synchronizer().cache().contains(&key));

    fx.service
        .complete_step("alice-token", &path.id, &path.steps[0].id)
        .await
        .unwrap();
    assert!(!fx.service.synchronizer().cache().contains(&key));
    assert_eq!(binding.data().map(|p| p.progress), Some(0));

    let fresh = binding.refetch().await.unwrap();
    assert_eq!(fresh.progress, 33);
    assert!(fx.service.synchronizer().cache().contains(&key));
}

#[tokio::test]
async fn test_bind_paths_lists_only_own_paths() {
    let fx = fixture();
    fx.service.generate_path("alice-token", "Rust").await.unwrap();
    fx.service.generate_path("alice-token", "Go").await.unwrap();
    fx.service.generate_path("bob-token", "Haskell").await.unwrap();

    let binding = fx
        .service
        .bind_paths("alice-token", BindOptions::new())
        .await
        .unwrap();
    let paths = settled(&binding).await.data().cloned().unwrap();

    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.owner_id == "alice"));
    assert_eq!(binding.cache_key(), Some(paths_cache_key("alice").as_str()));

    // a new path drops the cached listing
    fx.service.generate_path("alice-token", "Zig").await.unwrap();
    assert!(!fx.service.synchronizer().cache().contains(&paths_cache_key("alice")));
    assert_eq!(binding.refetch().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_pause_and_resume() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();

    let paused = fx.service.set_paused("alice-token", &path.id, true).await.unwrap();
    assert_eq!(paused.status, PathStatus::Paused);

    let err = fx.service.set_paused("alice-token", &path.id, true).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = fx
        .service
        .complete_step("alice-token", &path.id, &path.steps[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let resumed = fx.service.set_paused("alice-token", &path.id, false).await.unwrap();
    assert_eq!(resumed.status, PathStatus::Active);
}

#[tokio::test]
async fn test_start_then_complete() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();

    let started = fx
        .service
        .start_step("alice-token", &path.id, &path.steps[0].id)
        .await
        .unwrap();
    assert_eq!(started.steps[0].status, StepStatus::InProgress);

    // in-progress is not kept once the path is read again
    let reloaded = fx.service.get_path("alice-token", &path.id).await.unwrap();
    assert_eq!(reloaded.steps[0].status, StepStatus::Available);

    let err = fx
        .service
        .start_step("alice-token", &path.id, &path.steps[1].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let done = fx
        .service
        .complete_step("alice-token", &path.id, &path.steps[0].id)
        .await
        .unwrap();
    assert_eq!(done.steps[0].status, StepStatus::Completed);
    assert_eq!(done.steps[1].status, StepStatus::Available);
}

#[tokio::test]
async fn test_delete_path() {
    let fx = fixture();
    let path = fx.service.generate_path("alice-token", "Rust").await.unwrap();

    let err = fx.service.delete_path("bob-token", &path.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    fx.service.delete_path("alice-token", &path.id).await.unwrap();
    assert_eq!(fx.store.len(PATHS_COLLECTION), 0);

    let err = fx.service.get_path("alice-token", &path.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_custom_collection_and_list_limit() {
    let identity = StaticIdentityProvider::new().with_token("alice-token", "alice");
    let store = Arc::new(InMemoryDocumentStore::new());
    let sync = DataSynchronizer::new(Arc::new(FetchCache::new()));
    let service = PathService::new(
        Arc::new(identity),
        store.clone(),
        Arc::new(MockGenerator::new(OUTLINE)),
        sync,
    )
    .with_config(ServiceConfig {
        collection: "paths".into(),
        list_limit: 1,
    });

    let path = service.generate_path("alice-token", "Rust").await.unwrap();
    service.generate_path("alice-token", "Go").await.unwrap();
    assert_eq!(store.len("paths"), 2);
    assert_eq!(store.len(PATHS_COLLECTION), 0);

    let binding = service
        .bind_paths("alice-token", BindOptions::new())
        .await
        .unwrap();
    assert_eq!(settled(&binding).await.data().map(|p| p.len()), Some(1));

    let done = service
        .complete_step("alice-token", &path.id, &path.steps[0].id)
        .await
        .unwrap();
    assert_eq!(done.progress, 33);
}
