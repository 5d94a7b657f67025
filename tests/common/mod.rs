//! Shared fixtures for the integration tests
//!
//! - `MockRuntime`: a WebSocket server standing in for the app's JS runtime
//! - `serve_json`: mounts `/json/*` discovery documents on a wiremock server

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum RuntimeCommand {
    Send(String),
    Close,
}

/// Fake JS runtime accepting one inspector connection
pub struct MockRuntime {
    pub url: String,
    received: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedSender<RuntimeCommand>,
}

impl MockRuntime {
    pub async fn start() -> Self {
        Self::start_with_delay(Duration::ZERO).await
    }

    /// Delay the WebSocket handshake after the TCP accept
    pub async fn start_with_delay(handshake_delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!(
            "ws://{}/inspector/debug?device=0&page=1",
            listener.local_addr().unwrap()
        );
        let (received_tx, received) = mpsc::unbounded_channel();
        let (commands, mut commands_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(handshake_delay).await;
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(text);
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    command = commands_rx.recv() => match command {
                        Some(RuntimeCommand::Send(text)) => {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(RuntimeCommand::Close) | None => {
                            let _ = sink.close().await;
                            break;
                        }
                    },
                }
            }
        });

        Self {
            url,
            received,
            commands,
        }
    }

    pub fn send(&self, message: Value) {
        let _ = self.commands.send(RuntimeCommand::Send(message.to_string()));
    }

    pub fn close(&self) {
        let _ = self.commands.send(RuntimeCommand::Close);
    }

    /// Next message the runtime received
    pub async fn recv(&mut self) -> Value {
        let text = tokio::time::timeout(TIMEOUT, self.received.recv())
            .await
            .expect("runtime timed out waiting for a message")
            .expect("runtime connection ended");
        serde_json::from_str(&text).unwrap()
    }

    /// Nothing arrives within `window`
    pub async fn assert_silent(&mut self, window: Duration) {
        if let Ok(Some(text)) = tokio::time::timeout(window, self.received.recv()).await {
            panic!("runtime unexpectedly received {text}");
        }
    }
}

/// Connect a JS debugger client to a proxy URL
pub async fn connect_debugger(url: &str) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

pub async fn send_json(client: &mut Client, message: Value) {
    client.send(Message::Text(message.to_string())).await.unwrap();
}

/// Next text message on a debugger client
pub async fn recv_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(TIMEOUT, client.next())
            .await
            .expect("debugger timed out waiting for a message")
            .expect("debugger connection ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Wait until the peer closes the client's connection
pub async fn expect_closed(client: &mut Client) {
    loop {
        let frame = tokio::time::timeout(TIMEOUT, client.next())
            .await
            .expect("connection was not closed");
        match frame {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => {}
        }
    }
}

/// Serve `body` as JSON on `GET route`, expecting `hits` requests
///
/// Unmatched paths get wiremock's 404. Expectations are verified when the
/// server is dropped.
pub async fn serve_json(server: &MockServer, route: &str, body: Value, hits: impl Into<Times>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(hits)
        .mount(server)
        .await;
}

/// `host:port` of a mock server, as launch configurations spell it
pub fn address(server: &MockServer) -> String {
    server.address().to_string()
}

/// Requests the mock server has seen so far
pub async fn hits(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

/// A port nothing listens on
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
