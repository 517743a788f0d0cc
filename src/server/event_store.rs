//! Event store — the canonical per-task append-only log.
//!
//! Each task owns a totally ordered event log; the version of an event is
//! its zero-based index. The store maintains a materialized projection per
//! task (a pure left-fold of the log, see
//! [`projection`](crate::server::projection)), fans live events out to
//! subscribers, and answers indexed listing queries.
//!
//! Two implementations are provided:
//! [`InMemoryEventStore`](crate::server::InMemoryEventStore) for development
//! and tests, and [`FileEventStore`](crate::server::FileEventStore), the
//! file-backed reference layout.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::{A2AError, A2AResult};
use crate::types::{ListTasksParams, ListTasksResponse, Task, TaskEvent};

/// Default page size for task listings.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// An event paired with its position in the task's log.
#[derive(Debug, Clone)]
pub struct VersionedEvent {
    /// Zero-based index of the event within the task's log.
    pub version: u64,

    /// The event payload.
    pub event: TaskEvent,
}

/// Trait for the per-task event log, projection, and fan-out.
///
/// Implementations must serialize appends per task (single-writer
/// discipline) while allowing concurrent tasks to progress independently.
/// Reads observe a consistent snapshot without blocking the writer.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append an event to the task's log and return its version.
    ///
    /// When `expected_version` is given and the log's next slot differs,
    /// fails with [`A2AError::ConcurrencyConflict`] and changes nothing.
    /// Appending after the projection reached a terminal state, mixing
    /// context ids, or marking a non-terminal status `final` all fail with
    /// `InvalidRequest`.
    async fn append(
        &self,
        task_id: &str,
        event: TaskEvent,
        expected_version: Option<u64>,
    ) -> A2AResult<u64>;

    /// Read the log from `from_version` (inclusive) to the current tip.
    async fn read(&self, task_id: &str, from_version: u64) -> A2AResult<Vec<VersionedEvent>>;

    /// Subscribe to the task's events strictly after `after_version`
    /// (pass -1 for a full replay).
    ///
    /// Delivers catch-up events first, then tails live appends,
    /// de-duplicating by version; the subscription ends after a final
    /// event or when the caller drops it. Dropping a subscription does not
    /// affect the task.
    async fn subscribe(&self, task_id: &str, after_version: i64) -> A2AResult<EventSubscription>;

    /// Whether any events exist for the task.
    async fn exists(&self, task_id: &str) -> A2AResult<bool>;

    /// The version of the last appended event, or -1 when the log is empty.
    async fn latest_version(&self, task_id: &str) -> A2AResult<i64>;

    /// Read the materialized projection. O(1); no replay.
    async fn get_task(&self, task_id: &str) -> A2AResult<Option<Task>>;

    /// List task projections matching the filter.
    async fn list(&self, params: &ListTasksParams) -> A2AResult<ListTasksResponse>;
}

// ---------------------------------------------------------------------------
// EventSubscription — catch-up + live tail with version dedup
// ---------------------------------------------------------------------------

/// A live view over one task's event log.
///
/// Yields every event with version greater than the subscription's starting
/// point exactly once, in log order, even when appends race the catch-up
/// read: the live channel is registered before catch-up is snapshotted, and
/// live envelopes at or below the highest catch-up version are discarded.
#[derive(Debug)]
pub struct EventSubscription {
    catch_up: VecDeque<VersionedEvent>,
    live: mpsc::UnboundedReceiver<VersionedEvent>,
    max_seen: i64,
    done: bool,
}

impl EventSubscription {
    pub(crate) fn new(
        catch_up: Vec<VersionedEvent>,
        live: mpsc::UnboundedReceiver<VersionedEvent>,
        after_version: i64,
    ) -> Self {
        Self {
            catch_up: catch_up.into(),
            live,
            max_seen: after_version,
            done: false,
        }
    }

    /// The next event, or `None` once a final event has been delivered or
    /// the task's notifier is gone.
    pub async fn next(&mut self) -> Option<VersionedEvent> {
        if self.done {
            return None;
        }

        if let Some(envelope) = self.catch_up.pop_front() {
            self.max_seen = envelope.version as i64;
            if envelope.event.is_final() {
                self.done = true;
            }
            return Some(envelope);
        }

        while let Some(envelope) = self.live.recv().await {
            if (envelope.version as i64) <= self.max_seen {
                continue;
            }
            self.max_seen = envelope.version as i64;
            if envelope.event.is_final() {
                self.done = true;
            }
            return Some(envelope);
        }

        None
    }

    /// Drain the subscription to completion, collecting every event.
    pub async fn collect(mut self) -> Vec<VersionedEvent> {
        let mut events = Vec::new();
        while let Some(envelope) = self.next().await {
            events.push(envelope);
        }
        events
    }
}

// ---------------------------------------------------------------------------
// Shared append validation
// ---------------------------------------------------------------------------

/// Validate an append against the current projection and the lifecycle
/// rules. Called by every store implementation under the task's mutex.
pub(crate) fn check_append(
    task_id: &str,
    projection: Option<&Task>,
    event: &TaskEvent,
) -> A2AResult<()> {
    if let Some(task) = projection {
        if task.status.state.is_terminal() {
            return Err(A2AError::invalid_request(format!(
                "task {} is in terminal state {}; the log is frozen",
                task_id, task.status.state
            )));
        }
        if let Some(ctx) = event.context_id() {
            if ctx != task.context_id {
                return Err(A2AError::invalid_request(format!(
                    "event context {} does not match task context {}",
                    ctx, task.context_id
                )));
            }
        }
    }

    match event.task_id() {
        Some(event_task_id) if event_task_id != task_id => {
            return Err(A2AError::invalid_request(format!(
                "event task id {} does not match log {}",
                event_task_id, task_id
            )));
        }
        None if projection.is_none() => {
            return Err(A2AError::invalid_request(
                "first event in a log must identify its task",
            ));
        }
        _ => {}
    }

    if let TaskEvent::StatusUpdate(update) = event {
        if update.r#final && !update.status.state.is_terminal() {
            return Err(A2AError::invalid_request(format!(
                "final status update must carry a terminal state, got {}",
                update.status.state
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Shared listing pipeline
// ---------------------------------------------------------------------------

/// Reject negative history lengths up front.
pub(crate) fn validate_history_length(history_length: Option<i64>) -> A2AResult<()> {
    if let Some(n) = history_length {
        if n < 0 {
            return Err(A2AError::invalid_params(format!(
                "historyLength must be non-negative, got {}",
                n
            )));
        }
    }
    Ok(())
}

/// Trim a task's history per the request: `None` keeps everything, `0`
/// drops it, `k` keeps the last k messages. Callers validate first.
pub(crate) fn trim_history(task: &mut Task, history_length: Option<i64>) {
    match history_length {
        None => {}
        Some(0) => task.history.clear(),
        Some(k) => {
            let k = k as usize;
            if task.history.len() > k {
                let start = task.history.len() - k;
                task.history.drain(..start);
            }
        }
    }
}

/// Filter, order, paginate, and trim a set of candidate projections.
///
/// Ordering: `status.timestamp` descending, tasks without a timestamp last,
/// ties broken by ascending task id. The page token is the decimal offset
/// into the ordered result set; an unparsable token is `INVALID_PARAMS`.
pub(crate) fn list_pipeline(
    mut tasks: Vec<Task>,
    params: &ListTasksParams,
) -> A2AResult<ListTasksResponse> {
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size < 1 {
        return Err(A2AError::invalid_params(format!(
            "pageSize must be positive, got {}",
            page_size
        )));
    }
    validate_history_length(params.history_length)?;

    let offset: usize = match params.page_token.as_deref() {
        None | Some("") => 0,
        Some(token) => token.parse().map_err(|_| {
            A2AError::invalid_params(format!("invalid pageToken: {:?}", token))
        })?,
    };

    tasks.retain(|task| matches_filter(task, params));
    tasks.sort_by(|a, b| {
        order_key(b)
            .cmp(&order_key(a))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total_size = tasks.len() as i64;
    let mut page: Vec<Task> = tasks
        .into_iter()
        .skip(offset)
        .take(page_size as usize)
        .collect();

    let consumed = offset + page.len();
    let next_page_token = if (consumed as i64) < total_size && !page.is_empty() {
        consumed.to_string()
    } else {
        String::new()
    };

    let include_artifacts = params.include_artifacts.unwrap_or(false);
    for task in &mut page {
        trim_history(task, params.history_length);
        if !include_artifacts {
            task.artifacts.clear();
        }
    }

    let page_size_out = page.len() as i64;
    Ok(ListTasksResponse {
        tasks: page,
        next_page_token,
        page_size: page_size_out,
        total_size,
    })
}

fn matches_filter(task: &Task, params: &ListTasksParams) -> bool {
    if let Some(ref ctx) = params.context_id {
        if task.context_id != *ctx {
            return false;
        }
    }
    if let Some(status) = params.status {
        if task.status.state != status {
            return false;
        }
    }
    if let Some(after) = params.status_timestamp_after {
        match task.status.timestamp {
            Some(ts) if ts > after => {}
            _ => return false,
        }
    }
    true
}

/// Sort key: timestamped tasks order before bare ones, newest first once
/// the comparison is reversed by the caller.
fn order_key(task: &Task) -> (bool, Option<DateTime<Utc>>) {
    (task.status.timestamp.is_some(), task.status.timestamp)
}
