//! Dispatcher — method routing, validation, and version negotiation.
//!
//! Both transport bindings (JSON-RPC over HTTP and the REST mapping) call
//! into this layer; only the framing differs. The dispatcher validates the
//! JSON-RPC envelope, negotiates the protocol version, decodes params with
//! the wire codec, routes to the task manager / extension hooks, and maps
//! every failure to its protocol error code.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::server::card::CardProvider;
use crate::server::event_store::EventSubscription;
use crate::server::push_config::{task_push_config, PushConfigStore};
use crate::server::task_manager::TaskManager;
use crate::types::{
    AgentCard, CancelTaskParams, CreateTaskPushNotificationConfigParams, GetTaskParams,
    JsonRpcId, JsonRpcResponse, ListTaskPushNotificationConfigParams,
    ListTaskPushNotificationConfigResponse, ListTasksParams, SendMessageParams,
    SendMessageResponse, SubscribeToTaskParams, Task, TaskPushNotificationConfig,
    TaskPushNotificationConfigIdParams,
};

/// Protocol versions this engine accepts in the `A2A-Version` header.
pub const SUPPORTED_VERSIONS: [&str; 2] = ["0.3", "1.0"];

/// Transport-level request metadata supplied by the host HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Value of the `A2A-Version` header, when present.
    pub version: Option<String>,

    /// Extension URIs the client activated via `X-A2A-Extensions`.
    pub requested_extensions: Vec<String>,

    /// Whether the host HTTP layer authenticated the caller.
    pub authenticated: bool,
}

/// Result of dispatching one JSON-RPC request.
pub enum DispatchOutcome {
    /// A single response to frame as JSON.
    Single(JsonRpcResponse),

    /// An event stream to frame as SSE, one response per event.
    Stream {
        /// Request id to echo in each streamed response.
        id: Option<JsonRpcId>,
        /// The live event subscription.
        subscription: EventSubscription,
    },
}

/// Routes protocol methods to the engine.
pub struct Dispatcher {
    manager: TaskManager,
    push_configs: Option<Arc<dyn PushConfigStore>>,
    cards: Arc<dyn CardProvider>,
}

impl Dispatcher {
    /// Create a dispatcher. Pass `None` for `push_configs` to answer all
    /// push-notification methods with `PUSH_NOTIFICATION_NOT_SUPPORTED`.
    pub fn new(
        manager: TaskManager,
        push_configs: Option<Arc<dyn PushConfigStore>>,
        cards: Arc<dyn CardProvider>,
    ) -> Self {
        Self {
            manager,
            push_configs,
            cards,
        }
    }

    /// The underlying task manager.
    pub fn manager(&self) -> &TaskManager {
        &self.manager
    }

    // -----------------------------------------------------------------
    // Transport-level checks (shared by both bindings)
    // -----------------------------------------------------------------

    /// Validate version header and required extensions for one request.
    pub async fn check_request_meta(&self, meta: &RequestMeta) -> A2AResult<()> {
        if let Some(version) = meta.version.as_deref() {
            if !version.is_empty() && !SUPPORTED_VERSIONS.contains(&version) {
                return Err(A2AError::version_not_supported(format!(
                    "unsupported A2A-Version {:?}; supported: {}",
                    version,
                    SUPPORTED_VERSIONS.join(", ")
                )));
            }
        }

        let card = self.cards.card().await?;
        if let Some(extensions) = card.capabilities.extensions.as_ref() {
            for ext in extensions {
                if ext.required.unwrap_or(false)
                    && !meta.requested_extensions.iter().any(|uri| uri == &ext.uri)
                {
                    return Err(A2AError::extension_support_required(format!(
                        "extension {} must be activated via X-A2A-Extensions",
                        ext.uri
                    )));
                }
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------
    // JSON-RPC binding
    // -----------------------------------------------------------------

    /// Dispatch a raw JSON-RPC request body.
    ///
    /// Envelope rules: `jsonrpc` must be `"2.0"`, `id` a string, integer,
    /// or null, `method` a non-empty string, `params` an object when
    /// present. Violations answer with `INVALID_REQUEST`; unknown methods
    /// with `METHOD_NOT_FOUND`.
    pub async fn dispatch(
        &self,
        request: Value,
        meta: &RequestMeta,
        cancel_token: CancellationToken,
    ) -> DispatchOutcome {
        let id = extract_id(&request);

        // Envelope problems with the id itself are unrecoverable for
        // correlation; answer with a null id.
        let id = match id {
            Ok(id) => id,
            Err(e) => return DispatchOutcome::Single(JsonRpcResponse::from_a2a_error(None, e)),
        };

        if let Err(e) = self.check_request_meta(meta).await {
            return DispatchOutcome::Single(JsonRpcResponse::from_a2a_error(id, e));
        }
        if let Err(e) = validate_envelope(&request) {
            return DispatchOutcome::Single(JsonRpcResponse::from_a2a_error(id, e));
        }

        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = request
            .get("params")
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        debug!(method = %method, "Dispatching request");
        match method.as_str() {
            "SendMessage" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<SendMessageParams>(params)?;
                    let response = self.send_message(params, cancel_token).await?;
                    to_result(&response)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "SendStreamingMessage" => {
                let outcome: A2AResult<EventSubscription> = async {
                    let params = decode_params::<SendMessageParams>(params)?;
                    self.send_streaming_message(params, cancel_token).await
                }
                .await;
                match outcome {
                    Ok(subscription) => DispatchOutcome::Stream { id, subscription },
                    Err(e) => DispatchOutcome::Single(JsonRpcResponse::from_a2a_error(id, e)),
                }
            }
            "GetTask" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<GetTaskParams>(params)?;
                    let task = self.get_task(&params).await?;
                    to_result(&task)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "ListTasks" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<ListTasksParams>(params)?;
                    let page = self.list_tasks(&params).await?;
                    to_result(&page)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "CancelTask" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<CancelTaskParams>(params)?;
                    let task = self.cancel_task(&params).await?;
                    to_result(&task)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "SubscribeToTask" => {
                let outcome: A2AResult<EventSubscription> = async {
                    let params = decode_params::<SubscribeToTaskParams>(params)?;
                    self.subscribe_to_task(&params).await
                }
                .await;
                match outcome {
                    Ok(subscription) => DispatchOutcome::Stream { id, subscription },
                    Err(e) => DispatchOutcome::Single(JsonRpcResponse::from_a2a_error(id, e)),
                }
            }
            "CreateTaskPushNotificationConfig" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<CreateTaskPushNotificationConfigParams>(params)?;
                    let config = self.create_push_config(params).await?;
                    to_result(&config)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "GetTaskPushNotificationConfig" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<TaskPushNotificationConfigIdParams>(params)?;
                    let config = self.get_push_config(&params).await?;
                    to_result(&config)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "ListTaskPushNotificationConfig" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<ListTaskPushNotificationConfigParams>(params)?;
                    let configs = self.list_push_configs(&params).await?;
                    to_result(&configs)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "DeleteTaskPushNotificationConfig" => {
                let result: A2AResult<Value> = async {
                    let params = decode_params::<TaskPushNotificationConfigIdParams>(params)?;
                    self.delete_push_config(&params).await?;
                    Ok(Value::Null)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            "GetExtendedAgentCard" => {
                let result: A2AResult<Value> = async {
                    let card = self.extended_card(meta).await?;
                    to_result(&card)
                }
                .await;
                DispatchOutcome::Single(finish(id, result))
            }
            other => {
                warn!(method = %other, "Unknown method");
                DispatchOutcome::Single(JsonRpcResponse::from_a2a_error(
                    id,
                    A2AError::method_not_found(other.to_string()),
                ))
            }
        }
    }

    // -----------------------------------------------------------------
    // Typed method handlers (shared by both bindings)
    // -----------------------------------------------------------------

    /// `SendMessage`.
    pub async fn send_message(
        &self,
        params: SendMessageParams,
        cancel_token: CancellationToken,
    ) -> A2AResult<SendMessageResponse> {
        validate_message(&params)?;
        self.manager.send_message(params, cancel_token).await
    }

    /// `SendStreamingMessage`.
    pub async fn send_streaming_message(
        &self,
        params: SendMessageParams,
        cancel_token: CancellationToken,
    ) -> A2AResult<EventSubscription> {
        validate_message(&params)?;
        self.manager.send_message_stream(params, cancel_token).await
    }

    /// `GetTask`.
    pub async fn get_task(&self, params: &GetTaskParams) -> A2AResult<Task> {
        self.manager.get_task(params).await
    }

    /// `ListTasks`.
    pub async fn list_tasks(
        &self,
        params: &ListTasksParams,
    ) -> A2AResult<crate::types::ListTasksResponse> {
        self.manager.list_tasks(params).await
    }

    /// `CancelTask`.
    pub async fn cancel_task(&self, params: &CancelTaskParams) -> A2AResult<Task> {
        self.manager.cancel_task(&params.id).await
    }

    /// `SubscribeToTask`.
    pub async fn subscribe_to_task(
        &self,
        params: &SubscribeToTaskParams,
    ) -> A2AResult<EventSubscription> {
        self.manager.subscribe_to_task(&params.id).await
    }

    /// `CreateTaskPushNotificationConfig`. The config id is generated when
    /// the caller does not supply one.
    pub async fn create_push_config(
        &self,
        params: CreateTaskPushNotificationConfigParams,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let store = self.push_store()?;
        if !self.manager.store().exists(&params.task_id).await? {
            return Err(A2AError::task_not_found(params.task_id));
        }
        let config_id = params
            .config_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        store
            .set(task_push_config(params.task_id, config_id, params.config))
            .await
    }

    /// `GetTaskPushNotificationConfig`.
    pub async fn get_push_config(
        &self,
        params: &TaskPushNotificationConfigIdParams,
    ) -> A2AResult<TaskPushNotificationConfig> {
        self.push_store()?
            .get(&params.task_id, &params.config_id)
            .await
    }

    /// `ListTaskPushNotificationConfig`.
    pub async fn list_push_configs(
        &self,
        params: &ListTaskPushNotificationConfigParams,
    ) -> A2AResult<ListTaskPushNotificationConfigResponse> {
        let configs = self.push_store()?.list(&params.task_id).await?;
        Ok(ListTaskPushNotificationConfigResponse { configs })
    }

    /// `DeleteTaskPushNotificationConfig`.
    pub async fn delete_push_config(
        &self,
        params: &TaskPushNotificationConfigIdParams,
    ) -> A2AResult<()> {
        self.push_store()?
            .delete(&params.task_id, &params.config_id)
            .await
    }

    /// `GetExtendedAgentCard`.
    pub async fn extended_card(&self, meta: &RequestMeta) -> A2AResult<AgentCard> {
        self.cards.extended_card(meta.authenticated).await
    }

    /// The public agent card (well-known discovery endpoint).
    pub async fn public_card(&self) -> A2AResult<AgentCard> {
        self.cards.card().await
    }

    fn push_store(&self) -> A2AResult<&Arc<dyn PushConfigStore>> {
        self.push_configs.as_ref().ok_or_else(|| {
            A2AError::push_notification_not_supported(
                "push notifications are not supported by this agent",
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Envelope validation and decoding helpers
// ---------------------------------------------------------------------------

fn extract_id(request: &Value) -> Result<Option<JsonRpcId>, A2AError> {
    let Some(obj) = request.as_object() else {
        return Ok(None);
    };
    match obj.get("id") {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(JsonRpcId::Null)),
        Some(Value::String(s)) => Ok(Some(JsonRpcId::String(s.clone()))),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(Some(JsonRpcId::Number(i))),
            None => Err(A2AError::invalid_request(
                "request id must be a string, integer, or null",
            )),
        },
        Some(_) => Err(A2AError::invalid_request(
            "request id must be a string, integer, or null",
        )),
    }
}

fn validate_envelope(request: &Value) -> A2AResult<()> {
    let obj = request
        .as_object()
        .ok_or_else(|| A2AError::invalid_request("request must be a JSON object"))?;

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => {
            return Err(A2AError::invalid_request(
                "jsonrpc field must be the string \"2.0\"",
            ))
        }
    }

    match obj.get("method").and_then(Value::as_str) {
        Some(method) if !method.is_empty() => {}
        _ => {
            return Err(A2AError::invalid_request(
                "method must be a non-empty string",
            ))
        }
    }

    if let Some(params) = obj.get("params") {
        if !params.is_object() {
            return Err(A2AError::invalid_request("params must be an object"));
        }
    }

    Ok(())
}

fn decode_params<T: serde::de::DeserializeOwned>(params: Value) -> A2AResult<T> {
    serde_json::from_value(params).map_err(|e| A2AError::invalid_params(e.to_string()))
}

/// Shared message-shape checks on top of codec decoding.
fn validate_message(params: &SendMessageParams) -> A2AResult<()> {
    if params.message.parts.is_empty() {
        return Err(A2AError::invalid_params("message parts must not be empty"));
    }
    Ok(())
}

fn to_result<T: serde::Serialize>(value: &T) -> A2AResult<Value> {
    serde_json::to_value(value).map_err(|e| A2AError::internal_error(e.to_string()))
}

fn finish(id: Option<JsonRpcId>, result: A2AResult<Value>) -> JsonRpcResponse {
    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::from_a2a_error(id, e),
    }
}
