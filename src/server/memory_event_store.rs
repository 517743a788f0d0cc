//! In-memory event store — development and testing backend.
//!
//! Keeps every task's log, projection, and subscriber registry in process
//! memory. Appends are serialized by a per-task mutex; projection reads go
//! through a separate `RwLock` map so they never contend with a writer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;

use crate::error::{A2AError, A2AResult};
use crate::server::event_store::{
    check_append, list_pipeline, EventStore, EventSubscription, VersionedEvent,
};
use crate::server::projection;
use crate::types::{ListTasksParams, ListTasksResponse, Task, TaskEvent};

/// Per-task log state, guarded by the task's mutex.
struct TaskRecord {
    events: Vec<TaskEvent>,
    projection: Option<Task>,
    subscribers: Vec<mpsc::UnboundedSender<VersionedEvent>>,
}

impl TaskRecord {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            projection: None,
            subscribers: Vec::new(),
        }
    }
}

/// In-memory [`EventStore`]. All state is lost when the process exits.
pub struct InMemoryEventStore {
    records: RwLock<HashMap<String, Arc<Mutex<TaskRecord>>>>,
    /// Projection cache readable without any task mutex.
    projections: RwLock<HashMap<String, Task>>,
    /// contextId → task ids, in creation order.
    context_index: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryEventStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            projections: RwLock::new(HashMap::new()),
            context_index: RwLock::new(HashMap::new()),
        }
    }

    async fn record(&self, task_id: &str) -> Option<Arc<Mutex<TaskRecord>>> {
        self.records.read().await.get(task_id).cloned()
    }

    async fn record_or_create(&self, task_id: &str) -> Arc<Mutex<TaskRecord>> {
        let mut records = self.records.write().await;
        records
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TaskRecord::new())))
            .clone()
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        task_id: &str,
        event: TaskEvent,
        expected_version: Option<u64>,
    ) -> A2AResult<u64> {
        let record = self.record_or_create(task_id).await;
        let mut rec = record.lock().await;

        let next = rec.events.len() as u64;
        if let Some(expected) = expected_version {
            if expected != next {
                return Err(A2AError::ConcurrencyConflict {
                    expected,
                    found: next,
                });
            }
        }
        check_append(task_id, rec.projection.as_ref(), &event)?;

        let updated = projection::apply(rec.projection.take(), &event);
        rec.projection = Some(updated.clone());
        rec.events.push(event.clone());

        {
            let mut projections = self.projections.write().await;
            let is_new = !projections.contains_key(task_id);
            projections.insert(task_id.to_string(), updated.clone());
            if is_new {
                let mut index = self.context_index.write().await;
                index
                    .entry(updated.context_id.clone())
                    .or_default()
                    .push(task_id.to_string());
            }
        }

        let envelope = VersionedEvent {
            version: next,
            event,
        };
        rec.subscribers
            .retain(|tx| tx.send(envelope.clone()).is_ok());
        if envelope.event.is_final() {
            // Dropping the senders ends every live tail after the terminal
            // envelope has been delivered.
            rec.subscribers.clear();
        }

        debug!(task_id = %task_id, version = next, kind = envelope.event.kind(), "Event appended");
        Ok(next)
    }

    async fn read(&self, task_id: &str, from_version: u64) -> A2AResult<Vec<VersionedEvent>> {
        let Some(record) = self.record(task_id).await else {
            return Ok(Vec::new());
        };
        let rec = record.lock().await;
        Ok(rec
            .events
            .iter()
            .enumerate()
            .skip(from_version as usize)
            .map(|(i, event)| VersionedEvent {
                version: i as u64,
                event: event.clone(),
            })
            .collect())
    }

    async fn subscribe(&self, task_id: &str, after_version: i64) -> A2AResult<EventSubscription> {
        let record = self
            .record(task_id)
            .await
            .ok_or_else(|| A2AError::task_not_found(task_id.to_string()))?;
        let mut rec = record.lock().await;

        // Register the live channel and snapshot the catch-up range under
        // the same lock acquisition; nothing can slip between the two.
        let (tx, rx) = mpsc::unbounded_channel();
        let terminal = rec
            .projection
            .as_ref()
            .is_some_and(|t| t.status.state.is_terminal());
        if !terminal {
            rec.subscribers.push(tx);
        }

        let catch_up: Vec<VersionedEvent> = rec
            .events
            .iter()
            .enumerate()
            .filter(|(i, _)| (*i as i64) > after_version)
            .map(|(i, event)| VersionedEvent {
                version: i as u64,
                event: event.clone(),
            })
            .collect();

        debug!(
            task_id = %task_id,
            after_version,
            catch_up = catch_up.len(),
            "Subscriber attached"
        );
        Ok(EventSubscription::new(catch_up, rx, after_version))
    }

    async fn exists(&self, task_id: &str) -> A2AResult<bool> {
        Ok(self.records.read().await.contains_key(task_id))
    }

    async fn latest_version(&self, task_id: &str) -> A2AResult<i64> {
        let Some(record) = self.record(task_id).await else {
            return Ok(-1);
        };
        let rec = record.lock().await;
        Ok(rec.events.len() as i64 - 1)
    }

    async fn get_task(&self, task_id: &str) -> A2AResult<Option<Task>> {
        Ok(self.projections.read().await.get(task_id).cloned())
    }

    async fn list(&self, params: &ListTasksParams) -> A2AResult<ListTasksResponse> {
        let projections = self.projections.read().await;

        let candidates: Vec<Task> = match params.context_id.as_deref() {
            Some(ctx) => {
                let index = self.context_index.read().await;
                index
                    .get(ctx)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| projections.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default()
            }
            None => projections.values().cloned().collect(),
        };

        list_pipeline(candidates, params)
    }
}
