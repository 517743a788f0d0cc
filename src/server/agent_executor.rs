//! Agent executor trait — the integration point for agent logic.
//!
//! Implementors read the incoming request from a [`RequestContext`] and
//! publish lifecycle events to the run's [`EventQueue`]. The engine owns
//! everything else: persistence, ordering, fan-out, and the state machine.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::A2AResult;
use crate::server::event_queue::EventQueue;
use crate::types::{Message, Part, Task};

/// Context for one agent execution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this task.
    pub task_id: String,

    /// Conversation context identifier.
    pub context_id: String,

    /// The incoming user message. `None` for cancel requests.
    pub user_message: Option<Message>,

    /// The task's snapshot before this run, when it already existed.
    pub prior_task: Option<Task>,

    /// Whether this run continues an existing task.
    pub is_continuation: bool,
}

impl RequestContext {
    /// Extract all text content from the user message, joined by
    /// `delimiter`. Empty when there is no message or no text parts.
    pub fn get_user_input(&self, delimiter: &str) -> String {
        let Some(ref message) = self.user_message else {
            return String::new();
        };

        message
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

/// Core trait for agent logic.
///
/// [`execute`](AgentExecutor::execute) is called for each accepted message;
/// it should publish events to the queue and return once the run is over or
/// pauses (e.g. enters `TASK_STATE_INPUT_REQUIRED`). The `cancel_token` is
/// triggered when the caller abandons the request; long-running handlers
/// should watch it.
///
/// [`cancel`](AgentExecutor::cancel) is a separate entry point invoked for
/// `CancelTask`; it should stop the work and publish a final
/// `TASK_STATE_CANCELED` status. Handlers that fail to reach a terminal
/// state within the engine's grace window are force-canceled.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Run the agent for one request.
    async fn execute(
        &self,
        context: RequestContext,
        event_queue: EventQueue,
        cancel_token: CancellationToken,
    ) -> A2AResult<()>;

    /// Stop an ongoing task.
    async fn cancel(&self, context: RequestContext, event_queue: EventQueue) -> A2AResult<()>;
}
