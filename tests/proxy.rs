//! CDP proxy tests against a mock runtime and a real WebSocket debugger

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_tungstenite::tungstenite;

use common::{connect_debugger, expect_closed, free_port, recv_json, send_json, MockRuntime};
use rn_debugger::{HandlerKind, ProxyServer};

async fn proxy(handler: HandlerKind) -> ProxyServer {
    ProxyServer::create("127.0.0.1", 0, handler).await.unwrap()
}

#[tokio::test]
async fn test_messages_relay_in_order_across_the_connect_barrier() {
    let mut runtime = MockRuntime::start_with_delay(Duration::from_millis(300)).await;
    let proxy = proxy(HandlerKind::Passthrough).await;

    // Sent while the application side is still connecting
    let mut debugger = connect_debugger(proxy.debugger_url(&runtime.url).unwrap().as_str()).await;
    for id in 1..=5 {
        send_json(&mut debugger, json!({"id": id, "method": "Runtime.evaluate", "params": {"expression": id.to_string()}})).await;
    }

    for id in 1..=5 {
        let received = runtime.recv().await;
        assert_eq!(received["id"], id);
        assert_eq!(received["method"], "Runtime.evaluate");
    }

    runtime.send(json!({"method": "Runtime.consoleAPICalled", "params": {"type": "log"}}));
    runtime.send(json!({"id": 1, "result": {"result": {"type": "number", "value": 1}}, "sessionId": "s1"}));

    let event = recv_json(&mut debugger).await;
    assert_eq!(event["method"], "Runtime.consoleAPICalled");
    let reply = recv_json(&mut debugger).await;
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["sessionId"], "s1", "unknown fields survive the relay");

    proxy.stop().await;
}

#[tokio::test]
async fn test_hermes_answers_call_function_on_locally() {
    let mut runtime = MockRuntime::start().await;
    let proxy = proxy(HandlerKind::Hermes).await;
    let mut debugger = connect_debugger(proxy.debugger_url(&runtime.url).unwrap().as_str()).await;

    send_json(
        &mut debugger,
        json!({"id": 7, "method": "Runtime.callFunctionOn", "params": {"objectId": "obj-1", "functionDeclaration": "function(){}"}}),
    )
    .await;
    send_json(&mut debugger, json!({"id": 8, "method": "Debugger.resume"})).await;

    let reply = recv_json(&mut debugger).await;
    assert_eq!(reply, json!({"id": 7, "result": {"result": {"objectId": "obj-1"}}}));

    // Only the second command reaches the runtime
    let forwarded = runtime.recv().await;
    assert_eq!(forwarded["id"], 8);
    runtime.assert_silent(Duration::from_millis(200)).await;

    // Exactly one reply for id 7: the next debugger message is the runtime's
    runtime.send(json!({"method": "Debugger.resumed", "params": {}}));
    let next = recv_json(&mut debugger).await;
    assert_eq!(next["method"], "Debugger.resumed");

    proxy.stop().await;
}

#[tokio::test]
async fn test_hermes_rewrites_breakpoints_and_paused_frames() {
    let mut runtime = MockRuntime::start().await;
    let proxy = proxy(HandlerKind::Hermes).await;
    let mut debugger = connect_debugger(proxy.debugger_url(&runtime.url).unwrap().as_str()).await;

    send_json(
        &mut debugger,
        json!({"id": 3, "method": "Debugger.setBreakpoint", "params": {"location": {"scriptId": "12", "lineNumber": 40, "columnNumber": 7}}}),
    )
    .await;
    let forwarded = runtime.recv().await;
    assert_eq!(
        forwarded["params"]["location"],
        json!({"scriptId": "12", "lineNumber": 40})
    );

    runtime.send(json!({
        "method": "Debugger.paused",
        "params": {
            "reason": "other",
            "callFrames": [
                {"functionName": "render", "location": {"scriptId": "12", "lineNumber": 40}},
                {"functionName": "(native)", "location": {"scriptId": "13", "lineNumber": 0}},
                {"functionName": "anonymous", "location": {"scriptId": "4294967295", "lineNumber": 0}}
            ]
        }
    }));
    let paused = recv_json(&mut debugger).await;
    let frames = paused["params"]["callFrames"].as_array().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["functionName"], "render");

    proxy.stop().await;
}

#[tokio::test]
async fn test_application_close_closes_debugger() {
    let runtime = MockRuntime::start().await;
    let proxy = proxy(HandlerKind::Passthrough).await;
    let mut debugger = connect_debugger(proxy.debugger_url(&runtime.url).unwrap().as_str()).await;

    // Make sure the relay is up before closing
    send_json(&mut debugger, json!({"id": 1, "method": "Runtime.enable"})).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    runtime.close();
    expect_closed(&mut debugger).await;

    proxy.stop().await;
}

#[tokio::test]
async fn test_unreachable_application_closes_debugger() {
    let proxy = proxy(HandlerKind::Passthrough).await;
    let target = format!("ws://127.0.0.1:{}/inspector", free_port());
    let mut debugger = connect_debugger(proxy.debugger_url(&target).unwrap().as_str()).await;

    expect_closed(&mut debugger).await;
    proxy.stop().await;
}

#[tokio::test]
async fn test_missing_browser_param_is_rejected() {
    let proxy = proxy(HandlerKind::Passthrough).await;
    let url = format!("ws://127.0.0.1:{}/", proxy.port());

    match tokio_tungstenite::connect_async(url).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 400),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("handshake without a browser parameter must fail"),
    }

    proxy.stop().await;
}

#[tokio::test]
async fn test_connection_callback_and_stop() {
    let mut runtime = MockRuntime::start().await;
    let proxy = proxy(HandlerKind::Rn).await;

    let established = Arc::new(AtomicUsize::new(0));
    let counter = established.clone();
    proxy
        .on_connection_established(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .await;

    let mut debugger = connect_debugger(proxy.debugger_url(&runtime.url).unwrap().as_str()).await;
    send_json(&mut debugger, json!({"id": 1, "method": "Debugger.enable"})).await;
    runtime.recv().await;
    assert_eq!(established.load(Ordering::SeqCst), 1);

    proxy.stop().await;
    expect_closed(&mut debugger).await;
}
