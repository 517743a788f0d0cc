//! A2A wire model — proto-JSON shapes for the task engine.
//!
//! Enums serialize as SCREAMING_SNAKE strings with a type prefix
//! (`TASK_STATE_WORKING`, `ROLE_USER`). Polymorphic values ([`Part`],
//! [`TaskEvent`], [`SendMessageResponse`], [`SecurityScheme`],
//! [`OAuthFlows`]) are field-presence unions: exactly one content field is
//! set, there is no discriminator, and decoders reject anything else.
//! Unknown fields are ignored on input; absent optional fields are omitted
//! on output.

use chrono::{DateTime, Utc};
use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Enums
// ============================================================================

/// The lifecycle state of a task.
///
/// `SUBMITTED → WORKING → {COMPLETED | CANCELED | FAILED | REJECTED |
/// INPUT_REQUIRED | AUTH_REQUIRED}`. The first four targets are terminal;
/// the last two are pausable (non-terminal but not progressing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Task has been received but not yet started.
    #[serde(rename = "TASK_STATE_SUBMITTED")]
    Submitted,
    /// Task is actively being processed.
    #[serde(rename = "TASK_STATE_WORKING")]
    Working,
    /// Task is waiting for additional user input.
    #[serde(rename = "TASK_STATE_INPUT_REQUIRED")]
    InputRequired,
    /// Task is waiting for the user to authenticate.
    #[serde(rename = "TASK_STATE_AUTH_REQUIRED")]
    AuthRequired,
    /// Task completed successfully.
    #[serde(rename = "TASK_STATE_COMPLETED")]
    Completed,
    /// Task was canceled.
    #[serde(rename = "TASK_STATE_CANCELED")]
    Canceled,
    /// Task failed.
    #[serde(rename = "TASK_STATE_FAILED")]
    Failed,
    /// Task was rejected by the agent.
    #[serde(rename = "TASK_STATE_REJECTED")]
    Rejected,
}

impl TaskState {
    /// Wire name of this state (`TASK_STATE_*`).
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "TASK_STATE_SUBMITTED",
            TaskState::Working => "TASK_STATE_WORKING",
            TaskState::InputRequired => "TASK_STATE_INPUT_REQUIRED",
            TaskState::AuthRequired => "TASK_STATE_AUTH_REQUIRED",
            TaskState::Completed => "TASK_STATE_COMPLETED",
            TaskState::Canceled => "TASK_STATE_CANCELED",
            TaskState::Failed => "TASK_STATE_FAILED",
            TaskState::Rejected => "TASK_STATE_REJECTED",
        }
    }

    /// Terminal states accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed | TaskState::Rejected
        )
    }

    /// Pausable states are non-terminal but not progressing.
    pub fn is_pausable(&self) -> bool {
        matches!(self, TaskState::InputRequired | TaskState::AuthRequired)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Message from the user / client.
    #[serde(rename = "ROLE_USER")]
    User,
    /// Message from the agent / server.
    #[serde(rename = "ROLE_AGENT")]
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "ROLE_USER"),
            Role::Agent => write!(f, "ROLE_AGENT"),
        }
    }
}

/// Location for an API key (header, query, cookie).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    /// API key sent as a cookie.
    Cookie,
    /// API key sent in an HTTP header.
    Header,
    /// API key sent as a query parameter.
    Query,
}

// ============================================================================
// Core Task Types
// ============================================================================

/// Current status of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// The current state.
    pub state: TaskState,

    /// Optional agent message associated with this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// When this status was set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    /// Status with the given state and no message or timestamp.
    pub fn new(state: TaskState) -> Self {
        TaskStatus {
            state,
            message: None,
            timestamp: None,
        }
    }

    /// Status with the given state, stamped with the current time.
    pub fn now(state: TaskState) -> Self {
        TaskStatus {
            state,
            message: None,
            timestamp: Some(Utc::now()),
        }
    }
}

/// A task — the unit of ongoing work, identified by a globally unique id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier (opaque, non-predictable).
    pub id: String,

    /// Context identifier grouping related tasks in a conversation.
    pub context_id: String,

    /// Current task status.
    pub status: TaskStatus,

    /// Ordered message history for this task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,

    /// Ordered artifacts produced by the task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ============================================================================
// Message & Parts
// ============================================================================

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub message_id: String,

    /// Who sent this message.
    pub role: Role,

    /// Content parts of the message.
    pub parts: Vec<Part>,

    /// Task this message is associated with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Context this message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// IDs of tasks referenced by this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_task_ids: Option<Vec<String>>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// Create a user message with a single text part.
    pub fn user(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Message {
            message_id: message_id.into(),
            role: Role::User,
            parts: vec![Part::text(text)],
            task_id: None,
            context_id: None,
            reference_task_ids: None,
            metadata: None,
        }
    }

    /// Create an agent message with a single text part.
    pub fn agent(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Message {
            message_id: message_id.into(),
            role: Role::Agent,
            parts: vec![Part::text(text)],
            task_id: None,
            context_id: None,
            reference_task_ids: None,
            metadata: None,
        }
    }
}

/// A content part within a message or artifact.
///
/// Field-presence union — exactly one of `text`, `data`, `url`, `raw`:
/// - `{"text": "hello"}`
/// - `{"data": {...}}`
/// - `{"url": "https://...", "mediaType": "application/pdf", "filename": "x.pdf"}`
/// - `{"raw": "<base64>", "mediaType": "image/png"}`
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Plain text content.
    Text {
        /// The text content.
        text: String,
        /// Optional metadata associated with this part.
        metadata: Option<serde_json::Value>,
    },
    /// Structured JSON data.
    Data {
        /// Arbitrary structured data (a JSON object).
        data: serde_json::Value,
        /// Optional metadata associated with this part.
        metadata: Option<serde_json::Value>,
    },
    /// A file referenced by URL.
    FileUrl {
        /// URL pointing to the file content.
        url: String,
        /// MIME type of the file.
        media_type: String,
        /// Optional file name.
        filename: Option<String>,
        /// Optional metadata associated with this part.
        metadata: Option<serde_json::Value>,
    },
    /// A file carried inline as base64 text.
    FileBytes {
        /// Base64-encoded file content.
        raw: String,
        /// MIME type of the file.
        media_type: String,
        /// Optional file name.
        filename: Option<String>,
        /// Optional metadata associated with this part.
        metadata: Option<serde_json::Value>,
    },
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    /// Create a structured data part.
    pub fn data(data: serde_json::Value) -> Self {
        Part::Data {
            data,
            metadata: None,
        }
    }

    /// Create a file part referencing a URL.
    pub fn file_url(
        url: impl Into<String>,
        media_type: impl Into<String>,
        filename: Option<String>,
    ) -> Self {
        Part::FileUrl {
            url: url.into(),
            media_type: media_type.into(),
            filename,
            metadata: None,
        }
    }

    /// Create a file part from base64-encoded bytes.
    pub fn file_bytes(
        raw: impl Into<String>,
        media_type: impl Into<String>,
        filename: Option<String>,
    ) -> Self {
        Part::FileBytes {
            raw: raw.into(),
            media_type: media_type.into(),
            filename,
            metadata: None,
        }
    }
}

impl Serialize for Part {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Part::Text { text, metadata } => {
                map.serialize_entry("text", text)?;
                if let Some(m) = metadata {
                    map.serialize_entry("metadata", m)?;
                }
            }
            Part::Data { data, metadata } => {
                map.serialize_entry("data", data)?;
                if let Some(m) = metadata {
                    map.serialize_entry("metadata", m)?;
                }
            }
            Part::FileUrl {
                url,
                media_type,
                filename,
                metadata,
            } => {
                map.serialize_entry("url", url)?;
                map.serialize_entry("mediaType", media_type)?;
                if let Some(name) = filename {
                    map.serialize_entry("filename", name)?;
                }
                if let Some(m) = metadata {
                    map.serialize_entry("metadata", m)?;
                }
            }
            Part::FileBytes {
                raw,
                media_type,
                filename,
                metadata,
            } => {
                map.serialize_entry("raw", raw)?;
                map.serialize_entry("mediaType", media_type)?;
                if let Some(name) = filename {
                    map.serialize_entry("filename", name)?;
                }
                if let Some(m) = metadata {
                    map.serialize_entry("metadata", m)?;
                }
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("part must be a JSON object"))?;

        const CONTENT_FIELDS: [&str; 4] = ["text", "data", "url", "raw"];
        let set: Vec<&str> = CONTENT_FIELDS
            .iter()
            .copied()
            .filter(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
            .collect();
        if set.len() != 1 {
            return Err(D::Error::custom(format!(
                "part must set exactly one of text, data, url, raw ({} set)",
                set.len()
            )));
        }

        let metadata = obj.get("metadata").filter(|v| !v.is_null()).cloned();
        let str_field = |key: &str| -> Result<String, D::Error> {
            obj.get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| D::Error::custom(format!("'{key}' must be a string")))
        };
        let filename = obj
            .get("filename")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        match set[0] {
            "text" => Ok(Part::Text {
                text: str_field("text")?,
                metadata,
            }),
            "data" => {
                let data = obj.get("data").cloned().unwrap_or(serde_json::Value::Null);
                if !data.is_object() {
                    return Err(D::Error::custom("'data' must be a JSON object"));
                }
                Ok(Part::Data { data, metadata })
            }
            "url" => Ok(Part::FileUrl {
                url: str_field("url")?,
                media_type: str_field("mediaType")?,
                filename,
                metadata,
            }),
            "raw" => Ok(Part::FileBytes {
                raw: str_field("raw")?,
                media_type: str_field("mediaType")?,
                filename,
                metadata,
            }),
            _ => unreachable!(),
        }
    }
}

/// An artifact produced by a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique artifact identifier.
    pub artifact_id: String,

    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description of the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Content parts of the artifact.
    pub parts: Vec<Part>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ============================================================================
// Events
// ============================================================================

/// Notification that a task's status has changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    /// ID of the task whose status changed.
    pub task_id: String,

    /// Context the task belongs to.
    pub context_id: String,

    /// The new status.
    pub status: TaskStatus,

    /// Whether this is the final event for the task. `true` requires a
    /// terminal state and closes all subscriptions.
    #[serde(rename = "final")]
    pub r#final: bool,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Notification that an artifact has been created or extended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    /// ID of the task that produced the artifact.
    pub task_id: String,

    /// Context the task belongs to.
    pub context_id: String,

    /// The artifact (or chunk of parts, when appending).
    pub artifact: Artifact,

    /// `true` to concatenate parts onto the existing artifact with the same
    /// id; `false` to replace/insert it.
    #[serde(default)]
    pub append: bool,

    /// Hint that this is the last chunk of the artifact.
    #[serde(default)]
    pub last_chunk: bool,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A record in a task's append-only event log, and the payload of one
/// streaming frame.
///
/// Field-presence union — exactly one of `task`, `message`, `statusUpdate`,
/// `artifactUpdate` is set on the wire.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A full task snapshot (emitted on creation or a full rebuild).
    Task(Task),

    /// An agent reply that does not belong to the projection unless it
    /// carries the task's id.
    Message(Message),

    /// A status transition.
    StatusUpdate(TaskStatusUpdateEvent),

    /// An artifact create/append.
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

/// Streaming responses share the event union verbatim.
pub type StreamResponse = TaskEvent;

impl TaskEvent {
    /// The task this event belongs to, when it names one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            TaskEvent::Task(t) => Some(&t.id),
            TaskEvent::Message(m) => m.task_id.as_deref(),
            TaskEvent::StatusUpdate(e) => Some(&e.task_id),
            TaskEvent::ArtifactUpdate(e) => Some(&e.task_id),
        }
    }

    /// The context this event names, when it names one.
    pub fn context_id(&self) -> Option<&str> {
        match self {
            TaskEvent::Task(t) => Some(&t.context_id),
            TaskEvent::Message(m) => m.context_id.as_deref(),
            TaskEvent::StatusUpdate(e) => Some(&e.context_id),
            TaskEvent::ArtifactUpdate(e) => Some(&e.context_id),
        }
    }

    /// Whether this event ends the task's stream: a `final` status update,
    /// or a snapshot already in a terminal state.
    pub fn is_final(&self) -> bool {
        match self {
            TaskEvent::StatusUpdate(e) => e.r#final,
            TaskEvent::Task(t) => t.status.state.is_terminal(),
            _ => false,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskEvent::Task(_) => "task",
            TaskEvent::Message(_) => "message",
            TaskEvent::StatusUpdate(_) => "statusUpdate",
            TaskEvent::ArtifactUpdate(_) => "artifactUpdate",
        }
    }
}

impl Serialize for TaskEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            TaskEvent::Task(inner) => map.serialize_entry("task", inner)?,
            TaskEvent::Message(inner) => map.serialize_entry("message", inner)?,
            TaskEvent::StatusUpdate(inner) => map.serialize_entry("statusUpdate", inner)?,
            TaskEvent::ArtifactUpdate(inner) => map.serialize_entry("artifactUpdate", inner)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TaskEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("event must be a JSON object"))?;

        const VARIANTS: [&str; 4] = ["task", "message", "statusUpdate", "artifactUpdate"];
        let set: Vec<&str> = VARIANTS
            .iter()
            .copied()
            .filter(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
            .collect();
        if set.len() != 1 {
            return Err(D::Error::custom(format!(
                "event must set exactly one of task, message, statusUpdate, artifactUpdate ({} set)",
                set.len()
            )));
        }

        let inner = obj.get(set[0]).cloned().unwrap_or(serde_json::Value::Null);
        match set[0] {
            "task" => serde_json::from_value(inner)
                .map(TaskEvent::Task)
                .map_err(D::Error::custom),
            "message" => serde_json::from_value(inner)
                .map(TaskEvent::Message)
                .map_err(D::Error::custom),
            "statusUpdate" => serde_json::from_value(inner)
                .map(TaskEvent::StatusUpdate)
                .map_err(D::Error::custom),
            "artifactUpdate" => serde_json::from_value(inner)
                .map(TaskEvent::ArtifactUpdate)
                .map_err(D::Error::custom),
            _ => unreachable!(),
        }
    }
}

// ============================================================================
// SendMessageResponse (oneof: task | message)
// ============================================================================

/// Response payload for `SendMessage`.
///
/// Field-presence union — exactly one of `task`, `message` is set.
#[derive(Debug, Clone)]
pub enum SendMessageResponse {
    /// A task was created or updated.
    Task(Task),

    /// A direct message reply (no task was created).
    Message(Message),
}

impl Serialize for SendMessageResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            SendMessageResponse::Task(inner) => map.serialize_entry("task", inner)?,
            SendMessageResponse::Message(inner) => map.serialize_entry("message", inner)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SendMessageResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("response must be a JSON object"))?;

        let has_task = obj.get("task").is_some_and(|v| !v.is_null());
        let has_message = obj.get("message").is_some_and(|v| !v.is_null());
        match (has_task, has_message) {
            (true, false) => serde_json::from_value(obj["task"].clone())
                .map(SendMessageResponse::Task)
                .map_err(D::Error::custom),
            (false, true) => serde_json::from_value(obj["message"].clone())
                .map(SendMessageResponse::Message)
                .map_err(D::Error::custom),
            _ => Err(D::Error::custom(
                "response must set exactly one of task, message",
            )),
        }
    }
}

// ============================================================================
// JSON-RPC Foundation
// ============================================================================

/// A JSON-RPC 2.0 request/response id — string, integer, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
    /// Explicit null.
    Null,
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::String(s) => write!(f, "{}", s),
            JsonRpcId::Number(n) => write!(f, "{}", n),
            JsonRpcId::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version — always "2.0".
    pub jsonrpc: String,

    /// Request identifier. Absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,

    /// Method name.
    pub method: String,

    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(
        id: impl Into<JsonRpcId>,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
    ) -> Self {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }
}

impl From<String> for JsonRpcId {
    fn from(s: String) -> Self {
        JsonRpcId::String(s)
    }
}

impl From<&str> for JsonRpcId {
    fn from(s: &str) -> Self {
        JsonRpcId::String(s.to_string())
    }
}

impl From<i64> for JsonRpcId {
    fn from(n: i64) -> Self {
        JsonRpcId::Number(n)
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` or `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version — always "2.0".
    pub jsonrpc: String,

    /// Request identifier this response corresponds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,

    /// Successful result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a successful JSON-RPC response.
    pub fn success(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error JSON-RPC response.
    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Create an error response from an [`A2AError`](crate::error::A2AError).
    pub fn from_a2a_error(id: Option<JsonRpcId>, err: crate::error::A2AError) -> Self {
        let rpc_err: JsonRpcError = err.into();
        Self::error(id, rpc_err)
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,

    /// Human-readable error message.
    pub message: String,

    /// Optional structured error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ============================================================================
// Request / Response Parameter Types
// ============================================================================

/// Parameters for `SendMessage` and `SendStreamingMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageParams {
    /// The message to send.
    pub message: Message,

    /// Optional send configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<SendMessageConfiguration>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Configuration for a `SendMessage` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageConfiguration {
    /// MIME types the client can accept as output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_output_modes: Option<Vec<String>>,

    /// Push notification configuration for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notification_config: Option<PushNotificationConfig>,

    /// Maximum number of history messages to include in the response.
    /// `null` = full history, `0` = drop, `k>0` = last k; negative is
    /// rejected with invalid params.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i64>,

    /// Whether the request should block until the task completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,
}

/// Parameters for `GetTask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskParams {
    /// Task ID to retrieve.
    pub id: String,

    /// History trimming — same semantics as
    /// [`SendMessageConfiguration::history_length`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i64>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for `ListTasks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksParams {
    /// Filter by context ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Filter by task state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskState>,

    /// Only tasks whose status timestamp is strictly after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_timestamp_after: Option<DateTime<Utc>>,

    /// Maximum number of tasks to return per page (default 50, must be ≥ 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,

    /// Opaque token from a previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,

    /// History trimming — same semantics as
    /// [`SendMessageConfiguration::history_length`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i64>,

    /// Whether to include artifacts in the response (default false).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_artifacts: Option<bool>,
}

/// Response for `ListTasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksResponse {
    /// Tasks matching the query, most recently updated first.
    pub tasks: Vec<Task>,

    /// Token for the next page; empty when the listing is exhausted.
    pub next_page_token: String,

    /// Number of tasks in this page.
    pub page_size: i64,

    /// Total number of matching tasks.
    pub total_size: i64,
}

/// Parameters for `CancelTask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTaskParams {
    /// ID of the task to cancel.
    pub id: String,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for `SubscribeToTask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToTaskParams {
    /// ID of the task to subscribe to.
    pub id: String,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ============================================================================
// Push Notifications
// ============================================================================

/// Configuration for push notification delivery. The engine stores these;
/// outbound delivery is an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationConfig {
    /// URL to deliver notifications to.
    pub url: String,

    /// Optional verification token echoed back by the receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Authentication the sender must use against the push endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<PushNotificationAuthenticationInfo>,
}

/// Authentication information for push notification delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationAuthenticationInfo {
    /// Supported authentication schemes (e.g. `["Bearer"]`).
    pub schemes: Vec<String>,

    /// Optional credentials required by the push endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// A push notification config bound to a specific task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPushNotificationConfig {
    /// Task this config applies to.
    pub task_id: String,

    /// Identifier of this config within the task.
    pub config_id: String,

    /// The push notification configuration details.
    pub push_notification_config: PushNotificationConfig,
}

/// Parameters for `CreateTaskPushNotificationConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPushNotificationConfigParams {
    /// The parent task id.
    pub task_id: String,

    /// The id for the new config; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,

    /// The push notification configuration to store.
    pub config: PushNotificationConfig,
}

/// Parameters for `GetTaskPushNotificationConfig` and
/// `DeleteTaskPushNotificationConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPushNotificationConfigIdParams {
    /// The parent task id.
    pub task_id: String,

    /// The config id.
    pub config_id: String,
}

/// Parameters for `ListTaskPushNotificationConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTaskPushNotificationConfigParams {
    /// The parent task id.
    pub task_id: String,
}

/// Response for `ListTaskPushNotificationConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTaskPushNotificationConfigResponse {
    /// The stored configurations for the task.
    pub configs: Vec<TaskPushNotificationConfig>,
}

// ============================================================================
// Agent Card & Security Schemes
// ============================================================================

/// Self-describing manifest for an A2A agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Human-readable name.
    pub name: String,

    /// Description of the agent's capabilities.
    pub description: String,

    /// Agent version string.
    pub version: String,

    /// Primary URL for the agent.
    pub url: String,

    /// Agent capabilities.
    pub capabilities: AgentCapabilities,

    /// Default MIME types accepted as input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_input_modes: Vec<String>,

    /// Default MIME types produced as output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_output_modes: Vec<String>,

    /// Skills the agent supports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<AgentSkill>,

    /// Named security scheme definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<HashMap<String, SecurityScheme>>,

    /// Service provider information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,

    /// URL to the agent's documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,

    /// Whether the agent serves an authenticated extended card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_extended_card: Option<bool>,
}

/// Agent capabilities declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Whether the agent supports streaming responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,

    /// Whether the agent supports push notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,

    /// Protocol extensions supported by the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<AgentExtension>>,
}

/// A protocol extension supported by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentExtension {
    /// URI identifying the extension.
    pub uri: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether clients must activate this extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Extension-specific parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// A skill that an agent can perform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique skill identifier.
    pub id: String,

    /// Human-readable skill name.
    pub name: String,

    /// Description of what the skill does.
    pub description: String,

    /// Categorization tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Example prompts/inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,

    /// MIME types this skill accepts as input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_modes: Option<Vec<String>>,

    /// MIME types this skill produces as output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_modes: Option<Vec<String>>,
}

/// Information about the agent's provider/organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    /// Organization name.
    pub organization: String,

    /// Organization URL.
    pub url: String,
}

/// A security scheme definition.
///
/// Field-presence union — exactly one of `apiKey`, `http`, `oauth2`,
/// `openIdConnect`, `mutualTls` is set on the wire.
#[derive(Debug, Clone)]
pub enum SecurityScheme {
    /// API key authentication.
    ApiKey(ApiKeySecurityScheme),
    /// HTTP authentication (Bearer, Basic, ...).
    Http(HttpAuthSecurityScheme),
    /// OAuth 2.0 authentication.
    OAuth2(OAuth2SecurityScheme),
    /// OpenID Connect authentication.
    OpenIdConnect(OpenIdConnectSecurityScheme),
    /// Mutual TLS authentication.
    MutualTls(MutualTlsSecurityScheme),
}

/// API key security scheme details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySecurityScheme {
    /// Where the API key is sent.
    #[serde(rename = "in")]
    pub location: ApiKeyLocation,

    /// Name of the API key parameter.
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// HTTP authentication scheme details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpAuthSecurityScheme {
    /// Authentication scheme name (e.g. "bearer").
    pub scheme: String,

    /// Format of the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OAuth 2.0 security scheme details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2SecurityScheme {
    /// The configured OAuth 2.0 flow.
    pub flows: OAuthFlows,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenID Connect security scheme details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenIdConnectSecurityScheme {
    /// OpenID Connect discovery URL.
    pub open_id_connect_url: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Mutual TLS security scheme details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualTlsSecurityScheme {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Serialize for SecurityScheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            SecurityScheme::ApiKey(inner) => map.serialize_entry("apiKey", inner)?,
            SecurityScheme::Http(inner) => map.serialize_entry("http", inner)?,
            SecurityScheme::OAuth2(inner) => map.serialize_entry("oauth2", inner)?,
            SecurityScheme::OpenIdConnect(inner) => map.serialize_entry("openIdConnect", inner)?,
            SecurityScheme::MutualTls(inner) => map.serialize_entry("mutualTls", inner)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SecurityScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("security scheme must be a JSON object"))?;

        const VARIANTS: [&str; 5] = ["apiKey", "http", "oauth2", "openIdConnect", "mutualTls"];
        let set: Vec<&str> = VARIANTS
            .iter()
            .copied()
            .filter(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
            .collect();
        if set.len() != 1 {
            return Err(D::Error::custom(format!(
                "security scheme must set exactly one of apiKey, http, oauth2, openIdConnect, mutualTls ({} set)",
                set.len()
            )));
        }

        let inner = obj.get(set[0]).cloned().unwrap_or(serde_json::Value::Null);
        match set[0] {
            "apiKey" => serde_json::from_value(inner)
                .map(SecurityScheme::ApiKey)
                .map_err(D::Error::custom),
            "http" => serde_json::from_value(inner)
                .map(SecurityScheme::Http)
                .map_err(D::Error::custom),
            "oauth2" => serde_json::from_value(inner)
                .map(SecurityScheme::OAuth2)
                .map_err(D::Error::custom),
            "openIdConnect" => serde_json::from_value(inner)
                .map(SecurityScheme::OpenIdConnect)
                .map_err(D::Error::custom),
            "mutualTls" => serde_json::from_value(inner)
                .map(SecurityScheme::MutualTls)
                .map_err(D::Error::custom),
            _ => unreachable!(),
        }
    }
}

/// OAuth 2.0 flow configuration.
///
/// Field-presence union — exactly one of `authorizationCode`,
/// `clientCredentials`, `implicit`, `password` is set on the wire.
#[derive(Debug, Clone)]
pub enum OAuthFlows {
    /// Authorization code flow.
    AuthorizationCode(AuthorizationCodeOAuthFlow),
    /// Client credentials flow.
    ClientCredentials(ClientCredentialsOAuthFlow),
    /// Implicit flow (deprecated in OAuth 2.1).
    Implicit(ImplicitOAuthFlow),
    /// Resource owner password flow (deprecated in OAuth 2.1).
    Password(PasswordOAuthFlow),
}

/// Authorization code OAuth flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCodeOAuthFlow {
    /// Authorization endpoint URL.
    pub authorization_url: String,

    /// Token endpoint URL.
    pub token_url: String,

    /// Token refresh endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Available scopes (scope name → description).
    #[serde(default)]
    pub scopes: HashMap<String, String>,
}

/// Client credentials OAuth flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentialsOAuthFlow {
    /// Token endpoint URL.
    pub token_url: String,

    /// Token refresh endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Available scopes.
    #[serde(default)]
    pub scopes: HashMap<String, String>,
}

/// Implicit OAuth flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitOAuthFlow {
    /// Authorization endpoint URL.
    pub authorization_url: String,

    /// Token refresh endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Available scopes.
    #[serde(default)]
    pub scopes: HashMap<String, String>,
}

/// Resource owner password OAuth flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordOAuthFlow {
    /// Token endpoint URL.
    pub token_url: String,

    /// Token refresh endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,

    /// Available scopes.
    #[serde(default)]
    pub scopes: HashMap<String, String>,
}

impl Serialize for OAuthFlows {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            OAuthFlows::AuthorizationCode(inner) => {
                map.serialize_entry("authorizationCode", inner)?
            }
            OAuthFlows::ClientCredentials(inner) => {
                map.serialize_entry("clientCredentials", inner)?
            }
            OAuthFlows::Implicit(inner) => map.serialize_entry("implicit", inner)?,
            OAuthFlows::Password(inner) => map.serialize_entry("password", inner)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OAuthFlows {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| D::Error::custom("oauth flows must be a JSON object"))?;

        const VARIANTS: [&str; 4] = [
            "authorizationCode",
            "clientCredentials",
            "implicit",
            "password",
        ];
        let set: Vec<&str> = VARIANTS
            .iter()
            .copied()
            .filter(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
            .collect();
        if set.len() != 1 {
            return Err(D::Error::custom(format!(
                "oauth flows must set exactly one of authorizationCode, clientCredentials, implicit, password ({} set)",
                set.len()
            )));
        }

        let inner = obj.get(set[0]).cloned().unwrap_or(serde_json::Value::Null);
        match set[0] {
            "authorizationCode" => serde_json::from_value(inner)
                .map(OAuthFlows::AuthorizationCode)
                .map_err(D::Error::custom),
            "clientCredentials" => serde_json::from_value(inner)
                .map(OAuthFlows::ClientCredentials)
                .map_err(D::Error::custom),
            "implicit" => serde_json::from_value(inner)
                .map(OAuthFlows::Implicit)
                .map_err(D::Error::custom),
            "password" => serde_json::from_value(inner)
                .map(OAuthFlows::Password)
                .map_err(D::Error::custom),
            _ => unreachable!(),
        }
    }
}
