//! # a2a-runtime — server-side engine for the Agent-to-Agent protocol
//!
//! This crate implements the server half of an A2A deployment: the task
//! execution and event-sourcing engine that sits between remote callers
//! (JSON-RPC over HTTP, plus a REST binding) and a user-supplied agent
//! handler.
//!
//! The engine:
//! - dispatches inbound protocol requests and negotiates the wire version,
//! - drives a strict task-lifecycle state machine
//!   (`SUBMITTED → WORKING → COMPLETED | CANCELED | FAILED | REJECTED`,
//!   with `INPUT_REQUIRED` / `AUTH_REQUIRED` pauses),
//! - persists every transition as an append-only per-task event log,
//! - maintains a materialized snapshot per task (a pure fold of the log),
//! - fans live events out to any number of concurrent subscribers, with
//!   catch-up + tail semantics so clients can rejoin a task mid-flight.
//!
//! Authentication, rate limiting, TLS, push-notification delivery, and
//! the agent's business logic all live outside this crate.
//!
//! ## Architecture
//!
//! ```text
//! Client → Dispatcher → TaskManager → (invokes) AgentExecutor
//!                           ↑               |
//!                           └── EventQueue ─┘
//!                                  ↓
//!                           EventStore (append + notify)
//!                                  ↓
//!                           Subscribers (streaming responses)
//! ```
//!
//! Implement [`server::AgentExecutor`] for your agent, pick an event store
//! ([`server::InMemoryEventStore`] for tests, [`server::FileEventStore`]
//! for durable single-node deployments), wire a [`server::TaskManager`]
//! and [`server::Dispatcher`], and serve [`server::a2a_router`] with axum:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use a2a_runtime::server::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(FileEventStore::open("./data").await?);
//!     let manager = TaskManager::new(Arc::new(MyAgent), store);
//!     let cards = Arc::new(StaticCardProvider::new(my_card()));
//!     let push = Arc::new(InMemoryPushConfigStore::new());
//!     let dispatcher = Arc::new(Dispatcher::new(manager, Some(push), cards));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:7420").await?;
//!     axum::serve(listener, a2a_router(dispatcher)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire format
//!
//! The engine speaks the proto-JSON presence-based format: enums are
//! SCREAMING_SNAKE with a type prefix (`TASK_STATE_WORKING`, `ROLE_USER`)
//! and polymorphic values ([`types::Part`], [`types::TaskEvent`],
//! [`types::SendMessageResponse`], [`types::SecurityScheme`]) are
//! field-presence unions validated on decode.

pub mod error;
pub mod server;
pub mod types;

/// Commonly used types and traits.
pub mod prelude {
    pub use crate::error::{A2AError, A2AResult};
    pub use crate::server::{
        a2a_router, AgentExecutor, CardProvider, Dispatcher, EventQueue, EventStore,
        EventSubscription, FileEventStore, InMemoryEventStore, InMemoryPushConfigStore,
        PushConfigStore, RequestContext, RequestMeta, StaticCardProvider, TaskManager,
        TaskManagerConfig,
    };
    pub use crate::types::{
        AgentCard, Artifact, Message, Part, Role, SendMessageParams, SendMessageResponse,
        StreamResponse, Task, TaskEvent, TaskState, TaskStatus,
    };
}

pub use error::{A2AError, A2AResult};
