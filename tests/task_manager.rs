//! Task manager orchestration: blocking sends, continuations, direct
//! replies, cancellation, and failure surfacing.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use a2a_runtime::error::A2AError;
use a2a_runtime::server::{AgentExecutor, EventStore, InMemoryEventStore, TaskManager};
use a2a_runtime::types::*;

mod common;
use common::*;

fn manager_with(agent: Arc<dyn AgentExecutor>) -> (TaskManager, Arc<InMemoryEventStore>) {
    let store = Arc::new(InMemoryEventStore::new());
    let manager = TaskManager::new(agent, Arc::clone(&store) as Arc<dyn EventStore>);
    (manager, store)
}

#[tokio::test]
async fn echo_round_trip() {
    let (manager, _store) = manager_with(Arc::new(EchoAgent));

    let response = manager
        .send_message(send_params(user_message("m1", "hi")), CancellationToken::new())
        .await
        .unwrap();

    let task = match response {
        SendMessageResponse::Task(task) => task,
        SendMessageResponse::Message(_) => panic!("expected a task response"),
    };

    assert_eq!(task.status.state, TaskState::Completed);
    assert_eq!(task.history.len(), 1);
    assert_eq!(task.history[0].message_id, "m1");
    assert_eq!(task.artifacts.len(), 1);
    assert_eq!(
        task.artifacts[0].parts[0],
        Part::text("Echo: hi".to_string())
    );
}

#[tokio::test]
async fn echo_log_is_ordered_and_replayable() {
    let (manager, store) = manager_with(Arc::new(EchoAgent));

    let response = manager
        .send_message(send_params(user_message("m1", "hi")), CancellationToken::new())
        .await
        .unwrap();
    let task_id = match response {
        SendMessageResponse::Task(task) => task.id,
        _ => panic!("expected a task"),
    };

    let events = store.read(&task_id, 0).await.unwrap();
    let versions: Vec<u64> = events.iter().map(|v| v.version).collect();
    assert_eq!(versions, (0..events.len() as u64).collect::<Vec<_>>());

    // First event creates the task; the last one is terminal.
    assert!(matches!(events[0].event, TaskEvent::Task(_)));
    assert!(events.last().unwrap().event.is_final());

    let replayed =
        a2a_runtime::server::projection::replay(events.iter().map(|v| &v.event)).unwrap();
    let projected = store.get_task(&task_id).await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(&replayed).unwrap(),
        serde_json::to_value(&projected).unwrap()
    );
}

#[tokio::test]
async fn direct_reply_creates_no_task() {
    let (manager, store) = manager_with(Arc::new(DirectReplyAgent));

    let response = manager
        .send_message(send_params(user_message("m1", "ping")), CancellationToken::new())
        .await
        .unwrap();

    match response {
        SendMessageResponse::Message(message) => {
            assert_eq!(message.role, Role::Agent);
            assert_eq!(
                message.parts[0],
                Part::text("You said: ping".to_string())
            );
        }
        SendMessageResponse::Task(task) => panic!("expected a message, got task {}", task.id),
    }

    // Nothing was persisted.
    let page = store.list(&ListTasksParams::default()).await.unwrap();
    assert_eq!(page.total_size, 0);
}

#[tokio::test]
async fn continuation_resumes_paused_task() {
    let (manager, _store) = manager_with(Arc::new(InputRequiredAgent));

    let first = manager
        .send_message(send_params(user_message("m1", "start")), CancellationToken::new())
        .await
        .unwrap();
    let task = match first {
        SendMessageResponse::Task(task) => task,
        _ => panic!("expected a task"),
    };
    assert_eq!(task.status.state, TaskState::InputRequired);

    let mut follow_up = user_message("m2", "go ahead");
    follow_up.task_id = Some(task.id.clone());
    let second = manager
        .send_message(send_params(follow_up), CancellationToken::new())
        .await
        .unwrap();
    let done = match second {
        SendMessageResponse::Task(task) => task,
        _ => panic!("expected a task"),
    };

    assert_eq!(done.id, task.id);
    assert_eq!(done.status.state, TaskState::Completed);

    // Both user messages and both agent replies, in conversational order.
    let ids: Vec<&str> = done.history.iter().map(|m| m.message_id.as_str()).collect();
    assert_eq!(ids, ["m1", "agent-1", "m2", "agent-2"]);
    let roles: Vec<Role> = done.history.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Agent, Role::User, Role::Agent]);
}

#[tokio::test]
async fn continuation_of_terminal_task_is_rejected() {
    let (manager, _store) = manager_with(Arc::new(EchoAgent));

    let response = manager
        .send_message(send_params(user_message("m1", "hi")), CancellationToken::new())
        .await
        .unwrap();
    let task = match response {
        SendMessageResponse::Task(task) => task,
        _ => panic!("expected a task"),
    };

    let mut follow_up = user_message("m2", "more");
    follow_up.task_id = Some(task.id.clone());
    let err = manager
        .send_message(send_params(follow_up), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidRequest { .. }));
}

#[tokio::test]
async fn continuation_of_unknown_task_is_not_found() {
    let (manager, _store) = manager_with(Arc::new(EchoAgent));

    let mut message = user_message("m1", "hi");
    message.task_id = Some("no-such-task".to_string());
    let err = manager
        .send_message(send_params(message), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::TaskNotFound { .. }));
}

#[tokio::test]
async fn cancel_mid_flight_reaches_canceled() {
    let (agent, _release) = ParkedAgent::new();
    let store: Arc<InMemoryEventStore> = Arc::new(InMemoryEventStore::new());
    let manager = TaskManager::new(Arc::new(agent), Arc::clone(&store) as Arc<dyn EventStore>);

    // Start a streaming run so the handler parks in WORKING.
    let mut sub = manager
        .send_message_stream(send_params(user_message("m1", "work")), CancellationToken::new())
        .await
        .unwrap();

    // Snapshot (version 0), then the WORKING status.
    let first = sub.next().await.unwrap();
    let task_id = first.event.task_id().unwrap().to_string();
    let second = sub.next().await.unwrap();
    assert!(matches!(second.event, TaskEvent::StatusUpdate(ref u) if u.status.state == TaskState::Working));

    let canceled = manager.cancel_task(&task_id).await.unwrap();
    assert_eq!(canceled.status.state, TaskState::Canceled);

    // The stream closes with the terminal cancel event.
    let mut last_state = None;
    while let Some(envelope) = sub.next().await {
        if let TaskEvent::StatusUpdate(update) = &envelope.event {
            last_state = Some(update.status.state);
        }
    }
    assert_eq!(last_state, Some(TaskState::Canceled));

    // Terminal task: no continuation, no second cancel.
    let mut follow_up = user_message("m2", "more");
    follow_up.task_id = Some(task_id.clone());
    let err = manager
        .send_message(send_params(follow_up), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidRequest { .. }));

    let err = manager.cancel_task(&task_id).await.unwrap_err();
    assert!(matches!(err, A2AError::TaskNotCancelable { .. }));
}

#[tokio::test]
async fn cancel_unknown_task_is_not_found() {
    let (manager, _store) = manager_with(Arc::new(EchoAgent));
    let err = manager.cancel_task("missing").await.unwrap_err();
    assert!(matches!(err, A2AError::TaskNotFound { .. }));
}

#[tokio::test]
async fn handler_failure_surfaces_failed_status() {
    let (manager, store) = manager_with(Arc::new(FailingAgent));

    let err = manager
        .send_message(send_params(user_message("m1", "boom")), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InternalError { .. }));

    // The task the handler started is marked FAILED with a final status.
    let page = store.list(&ListTasksParams::default()).await.unwrap();
    assert_eq!(page.total_size, 1);
    let task = &page.tasks[0];
    assert_eq!(task.status.state, TaskState::Failed);

    let events = store.read(&task.id, 0).await.unwrap();
    let last = events.last().unwrap();
    assert!(last.event.is_final());
}

#[tokio::test]
async fn silent_handler_is_invalid_agent_response() {
    let (manager, store) = manager_with(Arc::new(SilentAgent));

    let err = manager
        .send_message(send_params(user_message("m1", "hello?")), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidAgentResponse { .. }));

    let page = store.list(&ListTasksParams::default()).await.unwrap();
    assert_eq!(page.total_size, 0);
}

#[tokio::test]
async fn get_task_trims_history() {
    let (manager, _store) = manager_with(Arc::new(InputRequiredAgent));

    let response = manager
        .send_message(send_params(user_message("m1", "start")), CancellationToken::new())
        .await
        .unwrap();
    let task = match response {
        SendMessageResponse::Task(task) => task,
        _ => panic!("expected a task"),
    };

    let full = manager
        .get_task(&GetTaskParams {
            id: task.id.clone(),
            history_length: None,
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(full.history.len(), 2);

    let trimmed = manager
        .get_task(&GetTaskParams {
            id: task.id.clone(),
            history_length: Some(1),
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(trimmed.history.len(), 1);
    assert_eq!(trimmed.history[0].message_id, "agent-1");

    let dropped = manager
        .get_task(&GetTaskParams {
            id: task.id.clone(),
            history_length: Some(0),
            metadata: None,
        })
        .await
        .unwrap();
    assert!(dropped.history.is_empty());

    let err = manager
        .get_task(&GetTaskParams {
            id: task.id,
            history_length: Some(-2),
            metadata: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidParams { .. }));
}

#[tokio::test]
async fn empty_parts_are_rejected() {
    let (manager, _store) = manager_with(Arc::new(EchoAgent));

    let mut message = user_message("m1", "placeholder");
    message.parts.clear();
    let err = manager
        .send_message(send_params(message), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, A2AError::InvalidParams { .. }));
}
