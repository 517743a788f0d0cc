//! Shared fixtures: message builders and a small zoo of agent handlers.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use a2a_runtime::error::{A2AError, A2AResult};
use a2a_runtime::server::{
    AgentExecutor, Dispatcher, EventQueue, InMemoryEventStore, InMemoryPushConfigStore,
    RequestContext, StaticCardProvider, TaskManager,
};
use a2a_runtime::types::{
    AgentCapabilities, AgentCard, Message, Part, SendMessageParams, TaskState, TaskStatus,
};

pub fn user_message(message_id: &str, text: &str) -> Message {
    Message::user(message_id, text)
}

pub fn send_params(message: Message) -> SendMessageParams {
    SendMessageParams {
        message,
        configuration: None,
        metadata: None,
    }
}

pub fn agent_card(name: &str) -> AgentCard {
    AgentCard {
        name: name.to_string(),
        description: "test agent".to_string(),
        version: "1.0.0".to_string(),
        url: "http://localhost:7420".to_string(),
        capabilities: AgentCapabilities {
            streaming: Some(true),
            push_notifications: Some(true),
            extensions: None,
        },
        default_input_modes: vec!["text/plain".to_string()],
        default_output_modes: vec!["text/plain".to_string()],
        skills: Vec::new(),
        security_schemes: None,
        provider: None,
        documentation_url: None,
        supports_extended_card: None,
    }
}

/// A dispatcher wired with the echo agent, an in-memory store, and a push
/// config store.
pub fn echo_dispatcher() -> Dispatcher {
    let store = Arc::new(InMemoryEventStore::new());
    let manager = TaskManager::new(Arc::new(EchoAgent), store);
    Dispatcher::new(
        manager,
        Some(Arc::new(InMemoryPushConfigStore::new())),
        Arc::new(StaticCardProvider::new(agent_card("echo"))),
    )
}

/// Replies with one artifact `Echo: <input>` and completes.
pub struct EchoAgent;

#[async_trait]
impl AgentExecutor for EchoAgent {
    async fn execute(
        &self,
        context: RequestContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        let text = context.get_user_input(" ");
        queue
            .enqueue_status(TaskStatus::new(TaskState::Working), false)
            .await?;
        queue
            .enqueue_artifact(
                a2a_runtime::types::Artifact {
                    artifact_id: "echo-1".to_string(),
                    name: Some("echo".to_string()),
                    description: None,
                    parts: vec![Part::text(format!("Echo: {}", text))],
                    metadata: None,
                },
                false,
                true,
            )
            .await?;
        queue
            .enqueue_status(TaskStatus::new(TaskState::Completed), true)
            .await?;
        queue.complete().await;
        Ok(())
    }

    async fn cancel(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        queue
            .enqueue_status(TaskStatus::new(TaskState::Canceled), true)
            .await?;
        queue.complete().await;
        Ok(())
    }
}

/// Replies with a direct message (no task is ever created).
pub struct DirectReplyAgent;

#[async_trait]
impl AgentExecutor for DirectReplyAgent {
    async fn execute(
        &self,
        context: RequestContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        let text = context.get_user_input(" ");
        queue
            .enqueue_message(Message::agent("reply-1", format!("You said: {}", text)))
            .await?;
        queue.complete().await;
        Ok(())
    }

    async fn cancel(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        queue.complete().await;
        Ok(())
    }
}

/// First run pauses in `INPUT_REQUIRED`; the continuation completes. Agent
/// replies are emitted as history messages.
pub struct InputRequiredAgent;

#[async_trait]
impl AgentExecutor for InputRequiredAgent {
    async fn execute(
        &self,
        context: RequestContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        if !context.is_continuation {
            let mut reply = Message::agent("agent-1", "say go ahead");
            reply.task_id = Some(queue.task_id().to_string());
            reply.context_id = Some(queue.context_id().to_string());
            queue.enqueue_message(reply).await?;
            queue
                .enqueue_status(TaskStatus::new(TaskState::InputRequired), false)
                .await?;
        } else {
            let mut reply = Message::agent("agent-2", "done");
            reply.task_id = Some(queue.task_id().to_string());
            reply.context_id = Some(queue.context_id().to_string());
            queue.enqueue_message(reply).await?;
            queue
                .enqueue_status(TaskStatus::new(TaskState::Completed), true)
                .await?;
        }
        queue.complete().await;
        Ok(())
    }

    async fn cancel(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        queue
            .enqueue_status(TaskStatus::new(TaskState::Canceled), true)
            .await?;
        queue.complete().await;
        Ok(())
    }
}

/// Enters `WORKING` and parks until canceled (or told to stop).
pub struct ParkedAgent {
    pub release: Arc<Notify>,
}

impl ParkedAgent {
    pub fn new() -> (Self, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        (
            Self {
                release: Arc::clone(&release),
            },
            release,
        )
    }
}

#[async_trait]
impl AgentExecutor for ParkedAgent {
    async fn execute(
        &self,
        _context: RequestContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        queue
            .enqueue_status(TaskStatus::new(TaskState::Working), false)
            .await?;
        self.release.notified().await;
        Ok(())
    }

    async fn cancel(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        queue
            .enqueue_status(TaskStatus::new(TaskState::Canceled), true)
            .await?;
        queue.complete().await;
        self.release.notify_waiters();
        Ok(())
    }
}

/// Streams one artifact in three chunks, pausing after the first until the
/// test releases the gate.
pub struct GatedArtifactAgent {
    pub gate: Arc<Notify>,
}

impl GatedArtifactAgent {
    pub fn new() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                gate: Arc::clone(&gate),
            },
            gate,
        )
    }
}

#[async_trait]
impl AgentExecutor for GatedArtifactAgent {
    async fn execute(
        &self,
        _context: RequestContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        let chunk = |text: &str| a2a_runtime::types::Artifact {
            artifact_id: "A".to_string(),
            name: None,
            description: None,
            parts: vec![Part::text(text)],
            metadata: None,
        };

        queue.enqueue_artifact(chunk("one"), false, false).await?;
        self.gate.notified().await;
        queue.enqueue_artifact(chunk("two"), true, false).await?;
        queue.enqueue_artifact(chunk("three"), true, true).await?;
        queue
            .enqueue_status(TaskStatus::new(TaskState::Completed), true)
            .await?;
        queue.complete().await;
        Ok(())
    }

    async fn cancel(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        queue
            .enqueue_status(TaskStatus::new(TaskState::Canceled), true)
            .await?;
        queue.complete().await;
        Ok(())
    }
}

/// Fails partway through the run.
pub struct FailingAgent;

#[async_trait]
impl AgentExecutor for FailingAgent {
    async fn execute(
        &self,
        _context: RequestContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        queue
            .enqueue_status(TaskStatus::new(TaskState::Working), false)
            .await?;
        Err(A2AError::internal_error("model backend unreachable"))
    }

    async fn cancel(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        queue.complete().await;
        Ok(())
    }
}

/// Returns without emitting anything.
pub struct SilentAgent;

#[async_trait]
impl AgentExecutor for SilentAgent {
    async fn execute(
        &self,
        _context: RequestContext,
        queue: EventQueue,
        _cancel: CancellationToken,
    ) -> A2AResult<()> {
        queue.complete().await;
        Ok(())
    }

    async fn cancel(&self, _context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        queue.complete().await;
        Ok(())
    }
}
