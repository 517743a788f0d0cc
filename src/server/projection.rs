//! Projection reducer — folds an event onto a task snapshot.
//!
//! The projection is a pure left-fold of a task's event log: replaying the
//! log from version zero always reproduces the stored snapshot, so the
//! materialized projection files are a rebuildable cache and the log stays
//! the source of truth.

use tracing::warn;

use crate::types::{Task, TaskArtifactUpdateEvent, TaskEvent, TaskState, TaskStatus};

/// Fold a single event onto the current snapshot.
///
/// Total over all inputs: when `current` is `None` and the event is not a
/// snapshot, a minimal `SUBMITTED` task is synthesized first so replay never
/// fails on a log whose head was trimmed or hand-edited.
pub fn apply(current: Option<Task>, event: &TaskEvent) -> Task {
    match event {
        TaskEvent::Task(snapshot) => snapshot.clone(),
        TaskEvent::StatusUpdate(update) => {
            let mut task = current
                .unwrap_or_else(|| empty_task(update.task_id.clone(), update.context_id.clone()));

            // The outgoing status message becomes history before the
            // replacement lands.
            if let Some(prev) = task.status.message.take() {
                task.history.push(prev);
            }

            if let Some(event_meta) = &update.metadata {
                merge_metadata(&mut task, event_meta);
            }

            task.status = update.status.clone();
            task
        }
        TaskEvent::ArtifactUpdate(update) => {
            let mut task = current
                .unwrap_or_else(|| empty_task(update.task_id.clone(), update.context_id.clone()));
            apply_artifact(&mut task, update);
            task
        }
        TaskEvent::Message(message) => {
            let Some(mut task) = current else {
                // A direct message creates no task state.
                return empty_task(
                    message.task_id.clone().unwrap_or_default(),
                    message.context_id.clone().unwrap_or_default(),
                );
            };
            if message.task_id.as_deref() == Some(task.id.as_str()) {
                // A pending status message joins the history before the
                // newcomer, keeping conversational order.
                if let Some(prev) = task.status.message.take() {
                    task.history.push(prev);
                }
                task.history.push(message.clone());
            }
            task
        }
    }
}

/// Replay a full event sequence into a snapshot.
pub fn replay<'a, I>(events: I) -> Option<Task>
where
    I: IntoIterator<Item = &'a TaskEvent>,
{
    let mut current: Option<Task> = None;
    for event in events {
        current = Some(apply(current, event));
    }
    current
}

fn empty_task(id: String, context_id: String) -> Task {
    Task {
        id,
        context_id,
        status: TaskStatus::new(TaskState::Submitted),
        history: Vec::new(),
        artifacts: Vec::new(),
        metadata: None,
    }
}

fn merge_metadata(task: &mut Task, event_meta: &serde_json::Value) {
    match &mut task.metadata {
        Some(task_meta) => {
            if let (Some(task_obj), Some(event_obj)) =
                (task_meta.as_object_mut(), event_meta.as_object())
            {
                for (k, v) in event_obj {
                    task_obj.insert(k.clone(), v.clone());
                }
            }
        }
        None => task.metadata = Some(event_meta.clone()),
    }
}

/// Apply an artifact update to the task's artifact list.
///
/// `append=false` replaces the artifact with the matching id (or inserts
/// it); `append=true` concatenates the chunk's parts onto the existing
/// artifact. An append to a nonexistent artifact is ignored. `last_chunk`
/// has no state effect; it is a hint to readers.
fn apply_artifact(task: &mut Task, event: &TaskArtifactUpdateEvent) {
    let artifact_id = &event.artifact.artifact_id;
    let existing_idx = task
        .artifacts
        .iter()
        .position(|a| a.artifact_id == *artifact_id);

    if !event.append {
        match existing_idx {
            Some(idx) => task.artifacts[idx] = event.artifact.clone(),
            None => task.artifacts.push(event.artifact.clone()),
        }
    } else if let Some(idx) = existing_idx {
        task.artifacts[idx]
            .parts
            .extend(event.artifact.parts.iter().cloned());
    } else {
        warn!(
            task_id = %task.id,
            artifact_id = %artifact_id,
            "Received append=true for nonexistent artifact. Ignoring chunk."
        );
    }
}
