//! Task manager — drives the agent handler and enforces the lifecycle.
//!
//! The manager runs the handler behind an [`EventQueue`], drains the queue,
//! and appends every event to the [`EventStore`] in order. The store's
//! append checks enforce the state machine (terminal freeze, context
//! consistency, `final` ⇒ terminal); the manager adds orchestration:
//! task creation, continuation resolution, direct-message replies, failure
//! surfacing, cancellation with a grace window, and resubscription.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::server::agent_executor::{AgentExecutor, RequestContext};
use crate::server::event_queue::{EventQueue, EventQueueReceiver, DEFAULT_QUEUE_CAPACITY};
use crate::server::event_store::{
    trim_history, validate_history_length, EventStore, EventSubscription,
};
use crate::types::{
    GetTaskParams, ListTasksParams, ListTasksResponse, Message, SendMessageParams,
    SendMessageResponse, Task, TaskEvent, TaskState, TaskStatus, TaskStatusUpdateEvent,
};

/// Tuning knobs for the task manager.
#[derive(Debug, Clone)]
pub struct TaskManagerConfig {
    /// How long a handler gets to reach a terminal state after a cancel
    /// before the manager force-appends `TASK_STATE_CANCELED`.
    pub cancel_grace: Duration,

    /// Buffer capacity of each run's agent event queue.
    pub queue_capacity: usize,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            cancel_grace: Duration::from_secs(5),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Orchestrates agent runs over an event store.
#[derive(Clone)]
pub struct TaskManager {
    executor: Arc<dyn AgentExecutor>,
    store: Arc<dyn EventStore>,
    config: TaskManagerConfig,
}

/// What a drained run produced.
struct RunOutcome {
    task_created: bool,
    snapshot_seen: bool,
    direct_messages: Vec<Message>,
    canceled: bool,
}

impl TaskManager {
    /// Create a manager with default configuration.
    pub fn new(executor: Arc<dyn AgentExecutor>, store: Arc<dyn EventStore>) -> Self {
        Self::with_config(executor, store, TaskManagerConfig::default())
    }

    /// Create a manager with explicit configuration.
    pub fn with_config(
        executor: Arc<dyn AgentExecutor>,
        store: Arc<dyn EventStore>,
        config: TaskManagerConfig,
    ) -> Self {
        Self {
            executor,
            store,
            config,
        }
    }

    /// The store this manager appends to.
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    // -----------------------------------------------------------------
    // SendMessage (blocking)
    // -----------------------------------------------------------------

    /// Run the handler for a message and return the final result.
    ///
    /// The task is created lazily: a handler that only replies with a
    /// direct message creates no task at all, and the response carries the
    /// message. Otherwise the response carries the final projection,
    /// history-trimmed per the request configuration.
    pub async fn send_message(
        &self,
        params: SendMessageParams,
        cancel_token: CancellationToken,
    ) -> A2AResult<SendMessageResponse> {
        let history_length = params
            .configuration
            .as_ref()
            .and_then(|c| c.history_length);
        validate_history_length(history_length)?;

        let (context, task_created) = self.prepare_run(params).await?;
        let (handle, rx) = self.spawn_executor(&context, &cancel_token);
        let outcome = match self.drive_run(&context, rx, &cancel_token, task_created).await {
            Ok(outcome) => outcome,
            Err(e) => {
                handle.abort();
                return Err(e);
            }
        };

        if outcome.canceled {
            handle.abort();
            if outcome.task_created {
                let final_task = self.cancel_after_client_abort(&context.task_id).await?;
                return Ok(SendMessageResponse::Task(final_task));
            }
            return Err(A2AError::internal_error(
                "request canceled before the agent produced a task",
            ));
        }

        self.await_handler(&context, outcome.task_created, handle)
            .await?;

        if outcome.task_created {
            let mut task = self
                .store
                .get_task(&context.task_id)
                .await?
                .ok_or_else(|| A2AError::internal_error("task vanished after run"))?;
            trim_history(&mut task, history_length);
            return Ok(SendMessageResponse::Task(task));
        }

        let mut direct = outcome.direct_messages;
        match direct.pop() {
            Some(message) if direct.is_empty() && !outcome.snapshot_seen => {
                Ok(SendMessageResponse::Message(message))
            }
            None => Err(A2AError::invalid_agent_response(
                "agent produced no events for the request",
            )),
            Some(_) => Err(A2AError::invalid_agent_response(
                "agent produced multiple direct messages",
            )),
        }
    }

    // -----------------------------------------------------------------
    // SendStreamingMessage
    // -----------------------------------------------------------------

    /// Run the handler for a message and return a live event subscription.
    ///
    /// The task (and its initial snapshot) is created before the handler
    /// starts so the subscription replays the complete log from version
    /// zero; late subscribers via [`subscribe_to_task`](Self::subscribe_to_task)
    /// see the same sequence.
    pub async fn send_message_stream(
        &self,
        params: SendMessageParams,
        cancel_token: CancellationToken,
    ) -> A2AResult<EventSubscription> {
        let (context, task_created) = self.prepare_run(params).await?;
        if !task_created {
            self.append_initial_snapshot(&context).await?;
        }

        let subscription = self.store.subscribe(&context.task_id, -1).await?;

        let manager = self.clone();
        let (handle, rx) = self.spawn_executor(&context, &cancel_token);
        tokio::spawn(async move {
            let outcome = match manager.drive_run(&context, rx, &cancel_token, true).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(task_id = %context.task_id, error = %e, "Streaming run failed");
                    handle.abort();
                    manager.fail_task(&context, &e).await;
                    return;
                }
            };

            if outcome.canceled {
                handle.abort();
                if let Err(e) = manager.cancel_after_client_abort(&context.task_id).await {
                    error!(task_id = %context.task_id, error = %e, "Cancel after stream abort failed");
                }
                return;
            }

            if let Err(e) = manager.await_handler(&context, true, handle).await {
                debug!(task_id = %context.task_id, error = %e, "Handler error surfaced to stream");
            }
        });

        Ok(subscription)
    }

    // -----------------------------------------------------------------
    // CancelTask
    // -----------------------------------------------------------------

    /// Cancel a running task and return its final snapshot.
    pub async fn cancel_task(&self, task_id: &str) -> A2AResult<Task> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(task_id.to_string()))?;
        if task.status.state.is_terminal() {
            return Err(A2AError::task_not_cancelable(format!(
                "task {} is already in terminal state {}",
                task_id, task.status.state
            )));
        }
        self.cancel_run(task).await
    }

    // -----------------------------------------------------------------
    // SubscribeToTask
    // -----------------------------------------------------------------

    /// Re-attach to a task's event stream with a full replay: every logged
    /// event is delivered in order before the live tail.
    pub async fn subscribe_to_task(&self, task_id: &str) -> A2AResult<EventSubscription> {
        self.store.subscribe(task_id, -1).await
    }

    // -----------------------------------------------------------------
    // GetTask / ListTasks
    // -----------------------------------------------------------------

    /// Read a task's projection, history-trimmed per the request.
    pub async fn get_task(&self, params: &GetTaskParams) -> A2AResult<Task> {
        validate_history_length(params.history_length)?;
        let mut task = self
            .store
            .get_task(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;
        trim_history(&mut task, params.history_length);
        Ok(task)
    }

    /// List task projections.
    pub async fn list_tasks(&self, params: &ListTasksParams) -> A2AResult<ListTasksResponse> {
        self.store.list(params).await
    }

    // -----------------------------------------------------------------
    // Run plumbing
    // -----------------------------------------------------------------

    /// Resolve the request into a run context. For continuations the prior
    /// snapshot is loaded (must be non-terminal) and the incoming user
    /// message is appended to the log before the handler starts.
    async fn prepare_run(
        &self,
        params: SendMessageParams,
    ) -> A2AResult<(RequestContext, bool)> {
        let mut message = params.message;
        if message.parts.is_empty() {
            return Err(A2AError::invalid_params("message parts must not be empty"));
        }

        if let Some(task_id) = message.task_id.clone() {
            let task = self
                .store
                .get_task(&task_id)
                .await?
                .ok_or_else(|| A2AError::task_not_found(task_id.clone()))?;
            if task.status.state.is_terminal() {
                return Err(A2AError::invalid_request(format!(
                    "task {} is in terminal state {}",
                    task_id, task.status.state
                )));
            }

            message.context_id = Some(task.context_id.clone());
            self.store
                .append(&task_id, TaskEvent::Message(message.clone()), None)
                .await?;

            debug!(task_id = %task_id, "Continuing existing task");
            let context = RequestContext {
                task_id,
                context_id: task.context_id.clone(),
                user_message: Some(message),
                prior_task: Some(task),
                is_continuation: true,
            };
            return Ok((context, true));
        }

        let task_id = Uuid::new_v4().to_string();
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        message.task_id = Some(task_id.clone());
        message.context_id = Some(context_id.clone());

        debug!(task_id = %task_id, context_id = %context_id, "Starting fresh run");
        let context = RequestContext {
            task_id,
            context_id,
            user_message: Some(message),
            prior_task: None,
            is_continuation: false,
        };
        Ok((context, false))
    }

    /// Spawn the handler with a fresh queue; the write side moves into the
    /// spawned task so the channel closes when the handler returns.
    fn spawn_executor(
        &self,
        context: &RequestContext,
        cancel_token: &CancellationToken,
    ) -> (JoinHandle<A2AResult<()>>, EventQueueReceiver) {
        let (queue, rx) = EventQueue::channel(
            context.task_id.clone(),
            context.context_id.clone(),
            self.config.queue_capacity,
        );
        let executor = Arc::clone(&self.executor);
        let context = context.clone();
        let token = cancel_token.clone();
        let handle = tokio::spawn(async move { executor.execute(context, queue, token).await });
        (handle, rx)
    }

    /// Drain the run's queue, appending each event in order.
    ///
    /// Before any task-scoped event lands, direct messages (no task id) are
    /// buffered; the first task-scoped event triggers an implicit
    /// `SUBMITTED` snapshot when the handler did not open with one, then
    /// the buffered messages flush into the log.
    async fn drive_run(
        &self,
        context: &RequestContext,
        mut rx: EventQueueReceiver,
        cancel_token: &CancellationToken,
        mut task_created: bool,
    ) -> A2AResult<RunOutcome> {
        let task_id = &context.task_id;
        let mut pending: Vec<Message> = Vec::new();
        let mut snapshot_seen = false;
        let mut frozen = false;
        let mut canceled = false;

        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(event) = maybe else { break };
                    if frozen {
                        warn!(task_id = %task_id, kind = event.kind(), "Log frozen; dropping late handler event");
                        continue;
                    }
                    if let TaskEvent::Task(_) = &event {
                        snapshot_seen = true;
                    }

                    if !task_created {
                        if let TaskEvent::Message(msg) = &event {
                            if msg.task_id.is_none() {
                                pending.push(msg.clone());
                                continue;
                            }
                        }

                        let opening_snapshot = matches!(event, TaskEvent::Task(_));
                        if !opening_snapshot {
                            self.append_initial_snapshot(context).await?;
                        } else {
                            self.append_checked(task_id, event.clone(), &mut frozen).await?;
                        }
                        task_created = true;

                        for msg in pending.drain(..) {
                            self.append_checked(task_id, TaskEvent::Message(msg), &mut frozen)
                                .await?;
                        }
                        if !opening_snapshot {
                            self.append_checked(task_id, event, &mut frozen).await?;
                        }
                    } else {
                        self.append_checked(task_id, event, &mut frozen).await?;
                    }
                }
                _ = cancel_token.cancelled(), if !canceled => {
                    debug!(task_id = %task_id, "Caller canceled the request");
                    canceled = true;
                    break;
                }
            }
        }

        Ok(RunOutcome {
            task_created,
            snapshot_seen,
            direct_messages: pending,
            canceled,
        })
    }

    /// Append one event; a lifecycle rejection freezes the rest of the run
    /// instead of failing it, storage errors propagate.
    async fn append_checked(
        &self,
        task_id: &str,
        event: TaskEvent,
        frozen: &mut bool,
    ) -> A2AResult<()> {
        match self.store.append(task_id, event, None).await {
            Ok(_) => Ok(()),
            Err(A2AError::InvalidRequest { message, .. }) => {
                warn!(task_id = %task_id, reason = %message, "Handler event rejected");
                *frozen = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The implicit creation event: a `SUBMITTED` snapshot seeded with the
    /// incoming user message.
    async fn append_initial_snapshot(&self, context: &RequestContext) -> A2AResult<()> {
        let task = Task {
            id: context.task_id.clone(),
            context_id: context.context_id.clone(),
            status: TaskStatus::now(TaskState::Submitted),
            history: context.user_message.iter().cloned().collect(),
            artifacts: Vec::new(),
            metadata: None,
        };
        self.store
            .append(&context.task_id, TaskEvent::Task(task), Some(0))
            .await?;
        Ok(())
    }

    /// Wait for the handler to settle and surface its failure as a
    /// `FAILED` final status plus an internal error.
    ///
    /// A handler that signalled `complete()` and keeps running past the
    /// grace window is detached; the run is already over from the
    /// protocol's point of view.
    async fn await_handler(
        &self,
        context: &RequestContext,
        task_created: bool,
        handle: JoinHandle<A2AResult<()>>,
    ) -> A2AResult<()> {
        let result = match tokio::time::timeout(self.config.cancel_grace, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                debug!(task_id = %context.task_id, "Handler still running after complete(); detaching");
                return Ok(());
            }
        };

        let err = match result {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(join_err) if join_err.is_panic() => {
                A2AError::internal_error("agent execution panicked")
            }
            Err(join_err) => A2AError::internal_error(format!("agent task failed: {}", join_err)),
        };

        error!(task_id = %context.task_id, error = %err, "Agent execution failed");
        if task_created {
            self.fail_task(context, &err).await;
        }
        Err(A2AError::internal_error(format!(
            "agent execution failed: {}",
            err
        )))
    }

    /// Append `FAILED, final=true` with the error text as the agent
    /// message, unless the task is already terminal.
    async fn fail_task(&self, context: &RequestContext, err: &A2AError) {
        let already_terminal = match self.store.get_task(&context.task_id).await {
            Ok(Some(task)) => task.status.state.is_terminal(),
            _ => false,
        };
        if already_terminal {
            return;
        }

        let mut message = Message::agent(
            Uuid::new_v4().to_string(),
            format!("Agent execution failed: {}", err),
        );
        message.task_id = Some(context.task_id.clone());
        message.context_id = Some(context.context_id.clone());

        let event = TaskEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id: context.task_id.clone(),
            context_id: context.context_id.clone(),
            status: TaskStatus {
                state: TaskState::Failed,
                message: Some(message),
                timestamp: Some(chrono::Utc::now()),
            },
            r#final: true,
            metadata: None,
        });
        if let Err(e) = self.store.append(&context.task_id, event, None).await {
            error!(task_id = %context.task_id, error = %e, "Failed to record task failure");
        }
    }

    /// Cancellation path for a caller that abandoned its request: run the
    /// handler's cancel entry point unless the task already settled.
    async fn cancel_after_client_abort(&self, task_id: &str) -> A2AResult<Task> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(task_id.to_string()))?;
        if task.status.state.is_terminal() {
            return Ok(task);
        }
        self.cancel_run(task).await
    }

    /// Invoke the handler's cancel entry point and wait (bounded by the
    /// grace window) for a terminal event; force `CANCELED` if it never
    /// comes.
    async fn cancel_run(&self, task: Task) -> A2AResult<Task> {
        let task_id = task.id.clone();
        let context = RequestContext {
            task_id: task_id.clone(),
            context_id: task.context_id.clone(),
            user_message: None,
            prior_task: Some(task.clone()),
            is_continuation: true,
        };

        let (queue, mut rx) = EventQueue::channel(
            context.task_id.clone(),
            context.context_id.clone(),
            self.config.queue_capacity,
        );
        let executor = Arc::clone(&self.executor);
        let cancel_context = context.clone();
        let handle = tokio::spawn(async move { executor.cancel(cancel_context, queue).await });

        let drain = async {
            let mut frozen = false;
            while let Some(event) = rx.recv().await {
                let is_final = event.is_final();
                self.append_checked(&task_id, event, &mut frozen).await?;
                if is_final {
                    break;
                }
            }
            Ok::<(), A2AError>(())
        };
        match tokio::time::timeout(self.config.cancel_grace, drain).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                handle.abort();
                return Err(e);
            }
            Err(_) => {
                warn!(task_id = %context.task_id, "Cancel handler exceeded grace window");
                handle.abort();
            }
        }

        self.ensure_canceled(&context.task_id).await
    }

    /// Force-append `CANCELED, final=true` when the task has not reached a
    /// terminal state, then return the final projection.
    async fn ensure_canceled(&self, task_id: &str) -> A2AResult<Task> {
        let current = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(task_id.to_string()))?;

        if !current.status.state.is_terminal() {
            warn!(task_id = %task_id, "Forcing terminal cancel status");
            let event = TaskEvent::StatusUpdate(TaskStatusUpdateEvent {
                task_id: task_id.to_string(),
                context_id: current.context_id.clone(),
                status: TaskStatus::now(TaskState::Canceled),
                r#final: true,
                metadata: None,
            });
            self.store.append(task_id, event, None).await?;
        }

        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(task_id.to_string()))
    }
}
