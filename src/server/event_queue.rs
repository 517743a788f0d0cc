//! Agent event queue — the channel between a running handler and the task
//! manager.
//!
//! A bounded single-writer channel: the agent handler enqueues lifecycle
//! events, the task manager drains them and appends each one to the event
//! store. Enqueueing backpressures when the buffer is full (default
//! capacity 64). `complete()` closes the write side; the reader drains the
//! remaining items and exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::A2AResult;
use crate::types::{
    Artifact, Message, Task, TaskArtifactUpdateEvent, TaskEvent, TaskStatus, TaskStatusUpdateEvent,
};

/// Default buffer capacity of the agent event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

enum QueueItem {
    Event(TaskEvent),
    Done,
}

/// Write side of the agent event queue, handed to the handler.
///
/// The queue is created per run with the run's task and context ids baked
/// in; the status/artifact helpers stamp them onto every event so handlers
/// only describe *what* happened.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<QueueItem>,
    task_id: String,
    context_id: String,
    closed: Arc<AtomicBool>,
}

/// Read side of the agent event queue, held by the task manager.
pub struct EventQueueReceiver {
    rx: mpsc::Receiver<QueueItem>,
}

impl EventQueue {
    /// Create a queue for one run with the given capacity.
    pub fn channel(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        capacity: usize,
    ) -> (EventQueue, EventQueueReceiver) {
        assert!(capacity > 0, "capacity must be greater than 0");
        let (tx, rx) = mpsc::channel(capacity);
        (
            EventQueue {
                tx,
                task_id: task_id.into(),
                context_id: context_id.into(),
                closed: Arc::new(AtomicBool::new(false)),
            },
            EventQueueReceiver { rx },
        )
    }

    /// Create a queue with the default capacity (64).
    pub fn with_default_capacity(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
    ) -> (EventQueue, EventQueueReceiver) {
        Self::channel(task_id, context_id, DEFAULT_QUEUE_CAPACITY)
    }

    /// The task this queue feeds.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The context of the task this queue feeds.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Whether `complete()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Enqueue a full task snapshot.
    pub async fn enqueue_task(&self, task: Task) -> A2AResult<()> {
        self.enqueue(TaskEvent::Task(task)).await
    }

    /// Enqueue a status transition. The status is stamped with the current
    /// time when it carries no timestamp.
    pub async fn enqueue_status(&self, mut status: TaskStatus, r#final: bool) -> A2AResult<()> {
        if status.timestamp.is_none() {
            status.timestamp = Some(Utc::now());
        }
        self.enqueue(TaskEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            status,
            r#final,
            metadata: None,
        }))
        .await
    }

    /// Enqueue an artifact create/append.
    pub async fn enqueue_artifact(
        &self,
        artifact: Artifact,
        append: bool,
        last_chunk: bool,
    ) -> A2AResult<()> {
        self.enqueue(TaskEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            artifact,
            append,
            last_chunk,
            metadata: None,
        }))
        .await
    }

    /// Enqueue an agent message. A message without a `task_id` is treated
    /// by the task manager as a direct reply.
    pub async fn enqueue_message(&self, message: Message) -> A2AResult<()> {
        self.enqueue(TaskEvent::Message(message)).await
    }

    /// Signal end-of-output. Subsequent enqueues are dropped.
    pub async fn complete(&self) {
        debug!(task_id = %self.task_id, "Agent queue completed");
        self.closed.store(true, Ordering::Release);
        let _ = self.tx.send(QueueItem::Done).await;
    }

    async fn enqueue(&self, event: TaskEvent) -> A2AResult<()> {
        if self.is_closed() {
            warn!(task_id = %self.task_id, "Queue is completed. Event will not be enqueued.");
            return Ok(());
        }
        if self.tx.send(QueueItem::Event(event)).await.is_err() {
            // Reader gone; the run is over, nothing left to deliver to.
            warn!(task_id = %self.task_id, "Queue reader dropped. Event discarded.");
        }
        Ok(())
    }
}

impl EventQueueReceiver {
    /// The next handler event, or `None` once the handler called
    /// `complete()` (remaining buffered items are drained first) or every
    /// writer is gone.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        match self.rx.recv().await {
            Some(QueueItem::Event(event)) => Some(event),
            Some(QueueItem::Done) | None => None,
        }
    }
}
