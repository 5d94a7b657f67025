//! Endpoint discovery against a mock HTTP runtime

mod common;

use std::time::{Duration, Instant};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{address, hits, serve_json};
use rn_debugger::endpoint::{parse_base_url, EndpointResolver};
use rn_debugger::Error;

fn resolver(backoff: Duration) -> EndpointResolver {
    EndpointResolver::new(Duration::from_secs(2), backoff).unwrap()
}

/// Every request fails with a 500
async fn failing_runtime() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_version_document_wins() {
    let server = MockServer::start().await;
    serve_json(
        &server,
        "/json/version",
        json!({"Browser": "Hermes", "webSocketDebuggerUrl": "ws://127.0.0.1:8081/inspector/debug?page=1"}),
        1,
    )
    .await;
    serve_json(&server, "/json/list", json!([{"webSocketDebuggerUrl": "ws://127.0.0.1:8081/other"}]), 0).await;

    let base = parse_base_url(&address(&server)).unwrap();
    let url = resolver(Duration::from_millis(10)).get_ws_endpoint(&base).await.unwrap();
    assert_eq!(url, "ws://127.0.0.1:8081/inspector/debug?page=1");
}

#[tokio::test]
async fn test_falls_back_to_first_list_entry() {
    let server = MockServer::start().await;
    serve_json(&server, "/json/version", json!({}), 1).await;
    serve_json(
        &server,
        "/json/list",
        json!([
            {"id": "a", "webSocketDebuggerUrl": "ws://127.0.0.1:9229/first"},
            {"id": "b", "webSocketDebuggerUrl": "ws://127.0.0.1:9229/second"}
        ]),
        1,
    )
    .await;

    let base = parse_base_url(&address(&server)).unwrap();
    let url = resolver(Duration::from_millis(10)).get_ws_endpoint(&base).await.unwrap();
    assert_eq!(url, "ws://127.0.0.1:9229/first");
}

#[tokio::test]
async fn test_missing_version_document_falls_back_to_list() {
    // Only /json/list is served; /json/version is a 404
    let server = MockServer::start().await;
    serve_json(&server, "/json/list", json!([{"webSocketDebuggerUrl": "ws://127.0.0.1:9229/only"}]), 1).await;

    let base = parse_base_url(&address(&server)).unwrap();
    let url = resolver(Duration::from_millis(10)).get_ws_endpoint(&base).await.unwrap();
    assert_eq!(url, "ws://127.0.0.1:9229/only");
    assert_eq!(hits(&server).await, 2);
}

#[tokio::test]
async fn test_empty_list_is_not_debuggable() {
    let server = MockServer::start().await;
    serve_json(&server, "/json/version", json!({}), 1).await;
    serve_json(&server, "/json/list", json!([]), 1).await;

    let base = parse_base_url(&address(&server)).unwrap();
    let err = resolver(Duration::from_millis(10))
        .retry_get_ws_endpoint(&base, 1, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::CouldNotConnectToDebugTarget { source, .. } => {
            assert!(matches!(*source, Error::NoDebuggableTarget(_)))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_retry_budget_is_total_attempts() {
    let server = MockServer::start().await;
    for route in ["/json/version", "/json/list"] {
        Mock::given(wiremock::matchers::path(route))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;
    }

    let base = parse_base_url(&address(&server)).unwrap();
    let err = resolver(Duration::from_millis(10))
        .retry_get_ws_endpoint(&base, 2, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(!err.is_cancellation());
    match err {
        Error::CouldNotConnectToDebugTarget { source, .. } => {
            // The /json/list failure is what gets reported
            assert!(matches!(*source, Error::Http(_)))
        }
        other => panic!("unexpected error: {other}"),
    }
    server.verify().await;
}

#[tokio::test]
async fn test_cancellation_stops_retrying_promptly() {
    let server = failing_runtime().await;
    let base = parse_base_url(&address(&server)).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = resolver(Duration::from_millis(100))
        .retry_get_ws_endpoint(&base, 1_000, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancellation());
    assert!(started.elapsed() < Duration::from_secs(2));
    let seen = hits(&server).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(hits(&server).await, seen, "no attempts after cancellation");
}
