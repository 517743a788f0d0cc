//! Event store contract tests, run against both implementations.

use std::sync::Arc;

use a2a_runtime::error::A2AError;
use a2a_runtime::server::{EventStore, FileEventStore, InMemoryEventStore};
use a2a_runtime::types::*;

fn snapshot(task_id: &str, context_id: &str) -> TaskEvent {
    TaskEvent::Task(Task {
        id: task_id.to_string(),
        context_id: context_id.to_string(),
        status: TaskStatus::now(TaskState::Submitted),
        history: vec![Message::user("m1", "hi")],
        artifacts: Vec::new(),
        metadata: None,
    })
}

fn status(task_id: &str, context_id: &str, state: TaskState, r#final: bool) -> TaskEvent {
    TaskEvent::StatusUpdate(TaskStatusUpdateEvent {
        task_id: task_id.to_string(),
        context_id: context_id.to_string(),
        status: TaskStatus::now(state),
        r#final,
        metadata: None,
    })
}

fn artifact_chunk(task_id: &str, context_id: &str, text: &str, append: bool) -> TaskEvent {
    TaskEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
        task_id: task_id.to_string(),
        context_id: context_id.to_string(),
        artifact: Artifact {
            artifact_id: "a1".to_string(),
            name: None,
            description: None,
            parts: vec![Part::text(text)],
            metadata: None,
        },
        append,
        last_chunk: false,
        metadata: None,
    })
}

// ============================================================
// Contract suite, generic over the store
// ============================================================

async fn versions_are_dense(store: &dyn EventStore) {
    assert_eq!(store.latest_version("t1").await.unwrap(), -1);
    assert!(!store.exists("t1").await.unwrap());

    assert_eq!(store.append("t1", snapshot("t1", "c1"), None).await.unwrap(), 0);
    assert_eq!(
        store
            .append("t1", status("t1", "c1", TaskState::Working, false), None)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        store
            .append("t1", artifact_chunk("t1", "c1", "one", false), None)
            .await
            .unwrap(),
        2
    );

    assert!(store.exists("t1").await.unwrap());
    assert_eq!(store.latest_version("t1").await.unwrap(), 2);

    let events = store.read("t1", 0).await.unwrap();
    let versions: Vec<u64> = events.iter().map(|v| v.version).collect();
    assert_eq!(versions, vec![0, 1, 2]);

    let tail = store.read("t1", 2).await.unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].version, 2);
}

async fn optimistic_concurrency_is_checked(store: &dyn EventStore) {
    store.append("t1", snapshot("t1", "c1"), Some(0)).await.unwrap();

    let err = store
        .append("t1", status("t1", "c1", TaskState::Working, false), Some(0))
        .await
        .unwrap_err();
    match err {
        A2AError::ConcurrencyConflict { expected, found } => {
            assert_eq!(expected, 0);
            assert_eq!(found, 1);
        }
        other => panic!("expected concurrency conflict, got {other}"),
    }

    // The failed append changed nothing.
    assert_eq!(store.latest_version("t1").await.unwrap(), 0);
    store
        .append("t1", status("t1", "c1", TaskState::Working, false), Some(1))
        .await
        .unwrap();
}

async fn terminal_state_freezes_log(store: &dyn EventStore) {
    store.append("t1", snapshot("t1", "c1"), None).await.unwrap();
    store
        .append("t1", status("t1", "c1", TaskState::Completed, true), None)
        .await
        .unwrap();

    let err = store
        .append("t1", status("t1", "c1", TaskState::Working, false), None)
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidRequest { .. }));
    assert_eq!(store.latest_version("t1").await.unwrap(), 1);
}

async fn lifecycle_rules_are_enforced(store: &dyn EventStore) {
    store.append("t1", snapshot("t1", "c1"), None).await.unwrap();

    // final=true requires a terminal state.
    let err = store
        .append("t1", status("t1", "c1", TaskState::Working, true), None)
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidRequest { .. }));

    // Context mixing is rejected.
    let err = store
        .append("t1", status("t1", "other-ctx", TaskState::Working, false), None)
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidRequest { .. }));

    // Task-id mixing is rejected.
    let err = store
        .append("t1", status("t2", "c1", TaskState::Working, false), None)
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidRequest { .. }));
}

async fn projection_matches_replay(store: &dyn EventStore) {
    store.append("t1", snapshot("t1", "c1"), None).await.unwrap();
    store
        .append("t1", status("t1", "c1", TaskState::Working, false), None)
        .await
        .unwrap();
    store
        .append("t1", artifact_chunk("t1", "c1", "one", false), None)
        .await
        .unwrap();
    store
        .append("t1", artifact_chunk("t1", "c1", "two", true), None)
        .await
        .unwrap();
    store
        .append("t1", status("t1", "c1", TaskState::Completed, true), None)
        .await
        .unwrap();

    let projected = store.get_task("t1").await.unwrap().unwrap();
    let events = store.read("t1", 0).await.unwrap();
    let replayed =
        a2a_runtime::server::projection::replay(events.iter().map(|v| &v.event)).unwrap();

    assert_eq!(
        serde_json::to_value(&projected).unwrap(),
        serde_json::to_value(&replayed).unwrap()
    );
    assert_eq!(projected.status.state, TaskState::Completed);
    assert_eq!(projected.artifacts.len(), 1);
    assert_eq!(projected.artifacts[0].parts.len(), 2);
}

async fn subscription_gets_catch_up_then_tail(store: Arc<dyn EventStore>) {
    store.append("t1", snapshot("t1", "c1"), None).await.unwrap();
    store
        .append("t1", status("t1", "c1", TaskState::Working, false), None)
        .await
        .unwrap();

    // Subscribe mid-flight: versions 0 and 1 are catch-up.
    let mut sub = store.subscribe("t1", -1).await.unwrap();

    // Race live appends against the drain.
    let appender = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .append("t1", artifact_chunk("t1", "c1", "one", false), None)
                .await
                .unwrap();
            store
                .append("t1", artifact_chunk("t1", "c1", "two", true), None)
                .await
                .unwrap();
            store
                .append("t1", status("t1", "c1", TaskState::Completed, true), None)
                .await
                .unwrap();
        })
    };

    let mut versions = Vec::new();
    while let Some(envelope) = sub.next().await {
        versions.push(envelope.version);
    }
    appender.await.unwrap();

    assert_eq!(versions, vec![0, 1, 2, 3, 4], "every version exactly once, in order");
}

async fn subscription_after_version_skips_prefix(store: &dyn EventStore) {
    store.append("t1", snapshot("t1", "c1"), None).await.unwrap();
    store
        .append("t1", artifact_chunk("t1", "c1", "one", false), None)
        .await
        .unwrap();
    store
        .append("t1", status("t1", "c1", TaskState::Completed, true), None)
        .await
        .unwrap();

    let mut sub = store.subscribe("t1", 0).await.unwrap();
    let mut versions = Vec::new();
    while let Some(envelope) = sub.next().await {
        versions.push(envelope.version);
    }
    assert_eq!(versions, vec![1, 2]);
}

async fn subscribe_unknown_task_fails(store: &dyn EventStore) {
    let err = store.subscribe("nope", -1).await.unwrap_err();
    assert!(matches!(err, A2AError::TaskNotFound { .. }));
}

// ============================================================
// In-memory store
// ============================================================

#[tokio::test]
async fn memory_versions_are_dense() {
    versions_are_dense(&InMemoryEventStore::new()).await;
}

#[tokio::test]
async fn memory_optimistic_concurrency() {
    optimistic_concurrency_is_checked(&InMemoryEventStore::new()).await;
}

#[tokio::test]
async fn memory_terminal_freeze() {
    terminal_state_freezes_log(&InMemoryEventStore::new()).await;
}

#[tokio::test]
async fn memory_lifecycle_rules() {
    lifecycle_rules_are_enforced(&InMemoryEventStore::new()).await;
}

#[tokio::test]
async fn memory_projection_matches_replay() {
    projection_matches_replay(&InMemoryEventStore::new()).await;
}

#[tokio::test]
async fn memory_subscription_catch_up_and_tail() {
    subscription_gets_catch_up_then_tail(Arc::new(InMemoryEventStore::new())).await;
}

#[tokio::test]
async fn memory_subscription_after_version() {
    subscription_after_version_skips_prefix(&InMemoryEventStore::new()).await;
}

#[tokio::test]
async fn memory_subscribe_unknown_task() {
    subscribe_unknown_task_fails(&InMemoryEventStore::new()).await;
}

// ============================================================
// File store
// ============================================================

#[tokio::test]
async fn file_versions_are_dense() {
    let dir = tempfile::tempdir().unwrap();
    versions_are_dense(&FileEventStore::open(dir.path()).await.unwrap()).await;
}

#[tokio::test]
async fn file_optimistic_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    optimistic_concurrency_is_checked(&FileEventStore::open(dir.path()).await.unwrap()).await;
}

#[tokio::test]
async fn file_terminal_freeze() {
    let dir = tempfile::tempdir().unwrap();
    terminal_state_freezes_log(&FileEventStore::open(dir.path()).await.unwrap()).await;
}

#[tokio::test]
async fn file_lifecycle_rules() {
    let dir = tempfile::tempdir().unwrap();
    lifecycle_rules_are_enforced(&FileEventStore::open(dir.path()).await.unwrap()).await;
}

#[tokio::test]
async fn file_projection_matches_replay() {
    let dir = tempfile::tempdir().unwrap();
    projection_matches_replay(&FileEventStore::open(dir.path()).await.unwrap()).await;
}

#[tokio::test]
async fn file_subscription_catch_up_and_tail() {
    let dir = tempfile::tempdir().unwrap();
    subscription_gets_catch_up_then_tail(Arc::new(FileEventStore::open(dir.path()).await.unwrap()))
        .await;
}

#[tokio::test]
async fn file_subscription_after_version() {
    let dir = tempfile::tempdir().unwrap();
    subscription_after_version_skips_prefix(&FileEventStore::open(dir.path()).await.unwrap())
        .await;
}

#[tokio::test]
async fn file_store_layout_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileEventStore::open(dir.path()).await.unwrap();

    store.append("t1", snapshot("t1", "ctx-9"), None).await.unwrap();
    store
        .append("t1", status("t1", "ctx-9", TaskState::Working, false), None)
        .await
        .unwrap();

    let log = std::fs::read_to_string(dir.path().join("events/t1.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);
    // Version 0 is the first line.
    let first: TaskEvent = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert!(matches!(first, TaskEvent::Task(_)));

    let projection = std::fs::read_to_string(dir.path().join("projections/t1.json")).unwrap();
    let task: Task = serde_json::from_str(&projection).unwrap();
    assert_eq!(task.status.state, TaskState::Working);

    let index = std::fs::read_to_string(dir.path().join("indexes/context_ctx-9.idx")).unwrap();
    assert_eq!(index.trim(), "t1");
}

#[tokio::test]
async fn file_store_reopen_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileEventStore::open(dir.path()).await.unwrap();
        store.append("t1", snapshot("t1", "c1"), None).await.unwrap();
        store
            .append("t1", artifact_chunk("t1", "c1", "one", false), None)
            .await
            .unwrap();
        store
            .append("t1", status("t1", "c1", TaskState::InputRequired, false), None)
            .await
            .unwrap();
    }

    let store = FileEventStore::open(dir.path()).await.unwrap();
    assert!(store.exists("t1").await.unwrap());
    assert_eq!(store.latest_version("t1").await.unwrap(), 2);

    let task = store.get_task("t1").await.unwrap().unwrap();
    assert_eq!(task.status.state, TaskState::InputRequired);
    assert_eq!(task.artifacts.len(), 1);

    // The log remains authoritative: appends continue at the right version.
    let v = store
        .append("t1", status("t1", "c1", TaskState::Completed, true), Some(3))
        .await
        .unwrap();
    assert_eq!(v, 3);
}

#[tokio::test]
async fn file_store_rebuilds_stale_projection() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileEventStore::open(dir.path()).await.unwrap();
        store.append("t1", snapshot("t1", "c1"), None).await.unwrap();
        store
            .append("t1", status("t1", "c1", TaskState::Working, false), None)
            .await
            .unwrap();
    }

    // Corrupt the derived cache; the log must win on reopen.
    std::fs::remove_file(dir.path().join("projections/t1.json")).unwrap();

    let store = FileEventStore::open(dir.path()).await.unwrap();
    let task = store.get_task("t1").await.unwrap().unwrap();
    assert_eq!(task.status.state, TaskState::Working);
    assert!(dir.path().join("projections/t1.json").exists());
}
