//! The task execution and event-sourcing engine.
//!
//! - [`AgentExecutor`] trait — implement your agent logic
//! - [`RequestContext`] — execution context with task ids and the message
//! - [`EventQueue`] — bounded channel the handler publishes events into
//! - [`EventStore`] trait — append-only per-task log with projection and
//!   fan-out; [`InMemoryEventStore`] and [`FileEventStore`] implementations
//! - [`projection`] — the pure event → snapshot reducer
//! - [`TaskManager`] — orchestrates handler runs over the store
//! - [`PushConfigStore`] trait + [`InMemoryPushConfigStore`]
//! - [`CardProvider`] trait + [`StaticCardProvider`]
//! - [`Dispatcher`] — method routing, validation, version negotiation
//! - [`a2a_router`] — axum routes for both protocol bindings
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use a2a_runtime::server::*;
//! use a2a_runtime::types::{TaskState, TaskStatus};
//!
//! struct EchoAgent;
//!
//! #[async_trait::async_trait]
//! impl AgentExecutor for EchoAgent {
//!     async fn execute(
//!         &self,
//!         ctx: RequestContext,
//!         queue: EventQueue,
//!         _cancel: tokio_util::sync::CancellationToken,
//!     ) -> a2a_runtime::A2AResult<()> {
//!         queue.enqueue_status(TaskStatus::new(TaskState::Working), false).await?;
//!         // ... produce artifacts ...
//!         queue.enqueue_status(TaskStatus::new(TaskState::Completed), true).await?;
//!         queue.complete().await;
//!         Ok(())
//!     }
//!
//!     async fn cancel(&self, ctx: RequestContext, queue: EventQueue) -> a2a_runtime::A2AResult<()> {
//!         queue.enqueue_status(TaskStatus::new(TaskState::Canceled), true).await?;
//!         queue.complete().await;
//!         Ok(())
//!     }
//! }
//!
//! let store = Arc::new(InMemoryEventStore::new());
//! let manager = TaskManager::new(Arc::new(EchoAgent), store);
//! let dispatcher = Arc::new(Dispatcher::new(manager, None, Arc::new(provider)));
//! let app = a2a_router(dispatcher);
//! ```

pub mod agent_executor;
pub mod card;
pub mod dispatcher;
pub mod event_queue;
pub mod event_store;
pub mod file_event_store;
pub mod http;
pub mod memory_event_store;
pub mod projection;
pub mod push_config;
pub mod task_manager;

pub use agent_executor::{AgentExecutor, RequestContext};
pub use card::{CardProvider, StaticCardProvider};
pub use dispatcher::{DispatchOutcome, Dispatcher, RequestMeta, SUPPORTED_VERSIONS};
pub use event_queue::{EventQueue, EventQueueReceiver, DEFAULT_QUEUE_CAPACITY};
pub use event_store::{EventStore, EventSubscription, VersionedEvent, DEFAULT_PAGE_SIZE};
pub use file_event_store::FileEventStore;
pub use http::a2a_router;
pub use memory_event_store::InMemoryEventStore;
pub use push_config::{task_push_config, InMemoryPushConfigStore, PushConfigStore};
pub use task_manager::{TaskManager, TaskManagerConfig};
