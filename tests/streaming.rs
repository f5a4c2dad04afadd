//! Event-stream relay through a live gateway.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};

mod common;

#[tokio::test]
async fn test_event_stream_is_relayed_in_order() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(&[]).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/events"))
        .header("x-gateway-service-host", upstream.to_string())
        .header("x-gateway-service-token", "t")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert!(response.headers().get("content-length").is_none());

    let body = response.text().await.unwrap();
    assert_eq!(body, "data: one\n\ndata: two\n\ndata: [DONE]\n\n");
}

#[tokio::test]
async fn test_empty_event_stream_is_internal_error() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(&[]).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/events/empty"))
        .header("x-gateway-service-host", upstream.to_string())
        .header("x-gateway-service-token", "t")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "No body to stream!"}));
}

type Gate = Arc<Mutex<Option<oneshot::Receiver<()>>>>;

/// Sends one event, then holds the stream open until the gate opens.
async fn gated_events(State(gate): State<Gate>) -> Response {
    let receiver = gate.lock().await.take();
    let first = futures_util::stream::once(async {
        Ok::<_, std::io::Error>(Bytes::from_static(b"data: first\n\n"))
    });
    let second = futures_util::stream::once(async move {
        if let Some(receiver) = receiver {
            let _ = receiver.await;
        }
        Ok::<_, std::io::Error>(Bytes::from_static(b"data: second\n\n"))
    });
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(first.chain(second)),
    )
        .into_response()
}

#[tokio::test]
async fn test_first_event_arrives_before_upstream_finishes() {
    let (open_gate, gate) = oneshot::channel();
    let gate: Gate = Arc::new(Mutex::new(Some(gate)));
    let upstream = common::serve(
        Router::new()
            .route("/events", get(gated_events))
            .with_state(gate),
    )
    .await;
    let gateway = common::start_gateway(&[]).await;

    let mut response = reqwest::Client::new()
        .get(gateway.url("/events"))
        .header("x-gateway-service-host", upstream.to_string())
        .header("x-gateway-service-token", "t")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let first = response.chunk().await.unwrap().unwrap();
    assert_eq!(first, "data: first\n\n");

    open_gate.send(()).unwrap();

    let mut rest = Vec::new();
    while let Some(chunk) = response.chunk().await.unwrap() {
        rest.extend_from_slice(&chunk);
    }
    assert_eq!(rest, b"data: second\n\n");
}
