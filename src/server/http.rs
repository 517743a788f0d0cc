//! HTTP bindings — axum routes for the JSON-RPC endpoint and the REST
//! mapping, sharing one [`Dispatcher`] per method.
//!
//! - `POST /a2a` — JSON-RPC 2.0; streaming methods answer with an SSE
//!   stream whose `data:` frames are JSON-RPC responses, one per event.
//! - `/v1/...` — resource-oriented REST binding (see the route table in
//!   [`a2a_router`]); streaming endpoints frame raw event payloads.
//! - `GET /.well-known/agent.json` — public agent card discovery.
//!
//! Wire-level JSON-RPC errors are returned with HTTP 200; the REST binding
//! maps error codes onto HTTP statuses (404 not-found, 400 invalid, 422
//! content-type, 401 authentication, 500 internal).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::{self, A2AError};
use crate::server::dispatcher::{DispatchOutcome, Dispatcher, RequestMeta};
use crate::server::event_store::EventSubscription;
use crate::types::{
    CancelTaskParams, CreateTaskPushNotificationConfigParams, GetTaskParams, JsonRpcError,
    JsonRpcId, JsonRpcResponse, ListTaskPushNotificationConfigParams, ListTasksParams,
    PushNotificationConfig, SendMessageParams, SubscribeToTaskParams,
    TaskPushNotificationConfigIdParams,
};

struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// Create an axum `Router` exposing both protocol bindings.
///
/// | Method | REST route |
/// |---|---|
/// | SendMessage | `POST /v1/message:send` |
/// | SendStreamingMessage | `POST /v1/message:stream` (SSE) |
/// | GetTask | `GET /v1/tasks/{id}` |
/// | ListTasks | `GET /v1/tasks` |
/// | CancelTask | `POST /v1/tasks/{id}:cancel` |
/// | SubscribeToTask | `GET /v1/tasks/{id}:subscribe` (SSE) |
/// | CreateTaskPushNotificationConfig | `POST /v1/tasks/{id}/pushNotificationConfigs` |
/// | GetTaskPushNotificationConfig | `GET /v1/tasks/{id}/pushNotificationConfigs/{cid}` |
/// | ListTaskPushNotificationConfig | `GET /v1/tasks/{id}/pushNotificationConfigs` |
/// | DeleteTaskPushNotificationConfig | `DELETE /v1/tasks/{id}/pushNotificationConfigs/{cid}` |
/// | GetExtendedAgentCard | `GET /v1/card` |
pub fn a2a_router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = Arc::new(AppState { dispatcher });

    Router::new()
        .route("/a2a", post(handle_jsonrpc))
        .route("/.well-known/agent.json", get(handle_public_card))
        .route("/v1/message:send", post(rest_message_send))
        .route("/v1/message:stream", post(rest_message_stream))
        .route("/v1/tasks", get(rest_list_tasks))
        .route(
            "/v1/tasks/{*rest}",
            get(rest_tasks_get_dispatch)
                .post(rest_tasks_post_dispatch)
                .delete(rest_tasks_delete_dispatch),
        )
        .route("/v1/card", get(rest_extended_card))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

/// Read the transport metadata the dispatcher cares about.
fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let version = headers
        .get("A2A-Version")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let requested_extensions = headers
        .get("X-A2A-Extensions")
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    // The host layer terminates authentication; an Authorization header
    // surviving to this point means the caller passed it.
    let authenticated = headers.contains_key(header::AUTHORIZATION);

    RequestMeta {
        version,
        requested_extensions,
        authenticated,
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC binding
// ---------------------------------------------------------------------------

async fn handle_jsonrpc(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let meta = request_meta(&headers);

    let request: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            // Malformed top-level JSON is a wire-level error: HTTP 200 with
            // a parse-error response and a null id.
            return Json(JsonRpcResponse::from_a2a_error(
                None,
                A2AError::parse_error(e.to_string()),
            ))
            .into_response();
        }
    };

    match state
        .dispatcher
        .dispatch(request, &meta, CancellationToken::new())
        .await
    {
        DispatchOutcome::Single(response) => Json(response).into_response(),
        DispatchOutcome::Stream { id, subscription } => {
            Sse::new(jsonrpc_sse_stream(id, subscription))
                .keep_alive(KeepAlive::default())
                .into_response()
        }
    }
}

/// Frame each event as a JSON-RPC success response in a `data:` block.
/// The HTTP response closes after the terminal envelope.
fn jsonrpc_sse_stream(
    id: Option<JsonRpcId>,
    mut subscription: EventSubscription,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(envelope) = subscription.next().await {
            let payload = match serde_json::to_value(&envelope.event) {
                Ok(value) => value,
                Err(e) => {
                    error!(error = %e, "Failed to serialize stream event");
                    continue;
                }
            };
            let response = JsonRpcResponse::success(id.clone(), payload);
            match serde_json::to_string(&response) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => error!(error = %e, "Failed to serialize SSE frame"),
            }
        }
    }
}

/// Frame each raw event payload in a `data:` block (REST binding).
fn rest_sse_stream(
    mut subscription: EventSubscription,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(envelope) = subscription.next().await {
            match serde_json::to_string(&envelope.event) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => error!(error = %e, "Failed to serialize SSE frame"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// REST binding
// ---------------------------------------------------------------------------

/// Map an engine error onto an HTTP status + JSON error body.
fn rest_error(err: A2AError) -> Response {
    let status = match err.code() {
        error::TASK_NOT_FOUND
        | error::METHOD_NOT_FOUND
        | error::EXTENDED_AGENT_CARD_NOT_CONFIGURED => StatusCode::NOT_FOUND,
        error::CONTENT_TYPE_NOT_SUPPORTED => StatusCode::UNPROCESSABLE_ENTITY,
        error::AUTHENTICATION_REQUIRED => StatusCode::UNAUTHORIZED,
        error::PARSE_ERROR
        | error::INVALID_REQUEST
        | error::INVALID_PARAMS
        | error::TASK_NOT_CANCELABLE
        | error::VERSION_NOT_SUPPORTED
        | error::EXTENSION_SUPPORT_REQUIRED => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body: JsonRpcError = err.into();
    (status, Json(body)).into_response()
}

fn rest_json<T: serde::Serialize>(result: Result<T, A2AError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => rest_error(e),
    }
}

/// Decode a REST JSON body with parse errors mapped to `INVALID_PARAMS`.
fn rest_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, A2AError> {
    serde_json::from_str(body).map_err(|e| A2AError::invalid_params(e.to_string()))
}

async fn handle_public_card(State(state): State<Arc<AppState>>) -> Response {
    rest_json(state.dispatcher.public_card().await)
}

async fn rest_message_send(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        let params: SendMessageParams = rest_body(&body)?;
        state
            .dispatcher
            .send_message(params, CancellationToken::new())
            .await
    }
    .await;
    rest_json(result)
}

async fn rest_message_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        let params: SendMessageParams = rest_body(&body)?;
        state
            .dispatcher
            .send_streaming_message(params, CancellationToken::new())
            .await
    }
    .await;
    match result {
        Ok(subscription) => Sse::new(rest_sse_stream(subscription))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Err(e) => rest_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTaskQuery {
    history_length: Option<i64>,
}

/// Everything under `/v1/tasks/` except the bare `/v1/tasks` collection route
/// is handled through this single wildcard dispatch, because matchit does
/// not allow a literal suffix alongside a named parameter within one path
/// segment (`{id}:cancel`), nor a static route nested under an already
/// registered wildcard (`{id}/pushNotificationConfigs`). The `rest` capture
/// is parsed back into the same shapes the dedicated handlers below expect.
async fn rest_tasks_get_dispatch(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
    Path(rest): Path<String>,
    query: Query<GetTaskQuery>,
) -> Response {
    let mut segments = rest.splitn(2, '/');
    let first = segments.next().unwrap_or_default();
    let remainder = segments.next();

    match remainder {
        None => match first.strip_suffix(":subscribe") {
            Some(id) => rest_subscribe_task(state, headers, Path(id.to_string())).await,
            None => rest_get_task(state, headers, Path(first.to_string()), query).await,
        },
        Some(tail) => {
            let id = first.to_string();
            if tail == "pushNotificationConfigs" {
                rest_list_push_configs(state, headers, Path(id)).await
            } else if let Some(cid) = tail.strip_prefix("pushNotificationConfigs/") {
                rest_get_push_config(state, headers, Path((id, cid.to_string()))).await
            } else {
                StatusCode::NOT_FOUND.into_response()
            }
        }
    }
}

/// See [`rest_tasks_get_dispatch`] for why this is dispatched manually
/// instead of via dedicated routes.
async fn rest_tasks_post_dispatch(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
    Path(rest): Path<String>,
    body: String,
) -> Response {
    let mut segments = rest.splitn(2, '/');
    let first = segments.next().unwrap_or_default();
    let remainder = segments.next();

    match remainder {
        None => match first.strip_suffix(":cancel") {
            Some(id) => rest_cancel_task(state, headers, Path(id.to_string())).await,
            None => StatusCode::NOT_FOUND.into_response(),
        },
        Some("pushNotificationConfigs") => {
            rest_create_push_config(state, headers, Path(first.to_string()), body).await
        }
        Some(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// See [`rest_tasks_get_dispatch`] for why this is dispatched manually
/// instead of via a dedicated route.
async fn rest_tasks_delete_dispatch(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
    Path(rest): Path<String>,
) -> Response {
    let mut segments = rest.splitn(2, '/');
    let first = segments.next().unwrap_or_default();
    let remainder = segments.next();

    match remainder.and_then(|tail| tail.strip_prefix("pushNotificationConfigs/")) {
        Some(cid) => {
            rest_delete_push_config(state, headers, Path((first.to_string(), cid.to_string())))
                .await
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn rest_get_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<GetTaskQuery>,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state
            .dispatcher
            .get_task(&GetTaskParams {
                id,
                history_length: query.history_length,
                metadata: None,
            })
            .await
    }
    .await;
    rest_json(result)
}

async fn rest_list_tasks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListTasksParams>,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state.dispatcher.list_tasks(&params).await
    }
    .await;
    rest_json(result)
}

async fn rest_cancel_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state
            .dispatcher
            .cancel_task(&CancelTaskParams { id, metadata: None })
            .await
    }
    .await;
    rest_json(result)
}

async fn rest_subscribe_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state
            .dispatcher
            .subscribe_to_task(&SubscribeToTaskParams { id, metadata: None })
            .await
    }
    .await;
    match result {
        Ok(subscription) => Sse::new(rest_sse_stream(subscription))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Err(e) => rest_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePushConfigBody {
    config_id: Option<String>,
    config: PushNotificationConfig,
}

async fn rest_create_push_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: String,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        let body: CreatePushConfigBody = rest_body(&body)?;
        state
            .dispatcher
            .create_push_config(CreateTaskPushNotificationConfigParams {
                task_id: id,
                config_id: body.config_id,
                config: body.config,
            })
            .await
    }
    .await;
    rest_json(result)
}

async fn rest_list_push_configs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state
            .dispatcher
            .list_push_configs(&ListTaskPushNotificationConfigParams { task_id: id })
            .await
    }
    .await;
    rest_json(result)
}

async fn rest_get_push_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, cid)): Path<(String, String)>,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state
            .dispatcher
            .get_push_config(&TaskPushNotificationConfigIdParams {
                task_id: id,
                config_id: cid,
            })
            .await
    }
    .await;
    rest_json(result)
}

async fn rest_delete_push_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, cid)): Path<(String, String)>,
) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state
            .dispatcher
            .delete_push_config(&TaskPushNotificationConfigIdParams {
                task_id: id,
                config_id: cid,
            })
            .await
    }
    .await;
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => rest_error(e),
    }
}

async fn rest_extended_card(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let meta = request_meta(&headers);
    let result = async {
        state.dispatcher.check_request_meta(&meta).await?;
        state.dispatcher.extended_card(&meta).await
    }
    .await;
    rest_json(result)
}
