//! HTTP binding behavior: JSON-RPC framing over POST /a2a, the REST
//! mapping with its status codes, and SSE stream termination.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use a2a_runtime::server::a2a_router;

mod common;
use common::*;

fn app() -> Router {
    a2a_router(Arc::new(echo_dispatcher()))
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn jsonrpc_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/a2a")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn malformed_json_is_parse_error_with_http_200() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/a2a")
                .header("content-type", "application/json")
                .body(Body::from("{this is not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!(-32700));
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn jsonrpc_send_message_returns_envelope() {
    let response = app()
        .oneshot(jsonrpc_request(json!({
            "jsonrpc": "2.0",
            "id": "req-1",
            "method": "SendMessage",
            "params": {
                "message": {
                    "messageId": "m1",
                    "role": "ROLE_USER",
                    "parts": [{"text": "hi"}]
                }
            }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["jsonrpc"], json!("2.0"));
    assert_eq!(body["id"], json!("req-1"));
    assert_eq!(
        body["result"]["task"]["status"]["state"],
        json!("TASK_STATE_COMPLETED")
    );
}

#[tokio::test]
async fn jsonrpc_streaming_send_emits_sse_frames() {
    let response = app()
        .oneshot(jsonrpc_request(json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "SendStreamingMessage",
            "params": {
                "message": {
                    "messageId": "m1",
                    "role": "ROLE_USER",
                    "parts": [{"text": "hi"}]
                }
            }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    // The stream closes after the terminal envelope, so the body is finite.
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("data: "));
    assert!(text.contains("\"jsonrpc\":\"2.0\""));
    assert!(text.contains("TASK_STATE_COMPLETED"));
}

#[tokio::test]
async fn rest_send_message_and_get_task() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/message:send")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "message": {
                            "messageId": "m1",
                            "role": "ROLE_USER",
                            "parts": [{"text": "hello"}]
                        }
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let task_id = body["task"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["task"]["status"]["state"], json!("TASK_STATE_COMPLETED"));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/tasks/{task_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], json!(task_id));
}

#[tokio::test]
async fn rest_unknown_task_is_404() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/v1/tasks/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!(-32001));
}

#[tokio::test]
async fn rest_version_header_is_enforced() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/v1/tasks")
                .header("A2A-Version", "2.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!(-32009));
}

#[tokio::test]
async fn well_known_agent_card_is_served() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/.well-known/agent.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], json!("echo"));
    assert_eq!(body["capabilities"]["streaming"], json!(true));
}

#[tokio::test]
async fn rest_extended_card_not_configured_is_404() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/v1/card")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!(-32007));
}

#[tokio::test]
async fn rest_push_config_lifecycle() {
    let app = app();

    // Create a task to hang the config off.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/message:send")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "message": {
                            "messageId": "m1",
                            "role": "ROLE_USER",
                            "parts": [{"text": "hello"}]
                        }
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let task_id = body_json(response).await["task"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/tasks/{task_id}/pushNotificationConfigs"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "configId": "hook-1",
                        "config": {"url": "https://client.example/hook"}
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/tasks/{task_id}/pushNotificationConfigs/hook-1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["pushNotificationConfig"]["url"],
        json!("https://client.example/hook")
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/tasks/{task_id}/pushNotificationConfigs/hook-1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/tasks/{task_id}/pushNotificationConfigs/hook-1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
