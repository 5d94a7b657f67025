//! CDP proxy server
//!
//! Accepts the IDE's JS debugger on a local WebSocket, opens a matching
//! connection to the application's inspector (named by the `browser` query
//! parameter), and relays every frame through the session's message handler.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cdp::{HandlerKind, MessageHandler, ProtocolMessage};
use crate::common::{Error, Result};

use super::connection::{Connection, ConnectionReader, ConnectionWriter, Inbound, Peer};

/// Query parameter carrying the application's inspector URL
pub const BROWSER_PARAM: &str = "browser";

/// Called once both sides of a debugging connection are wired up
pub type ConnectionCallback = Arc<dyn Fn(&Url) + Send + Sync>;

type SharedHandler = Arc<Mutex<Box<dyn MessageHandler>>>;

/// State shared between the accept loop and every relay
struct Shared {
    handler: SharedHandler,
    callbacks: RwLock<Vec<ConnectionCallback>>,
    shutdown: CancellationToken,
}

/// A listening CDP proxy
pub struct ProxyServer {
    local_addr: SocketAddr,
    host: String,
    shared: Arc<Shared>,
    accept_task: JoinHandle<()>,
}

impl ProxyServer {
    /// Bind `host:port` and start accepting debugger connections
    ///
    /// Port 0 picks a free port; see [`ProxyServer::local_addr`].
    pub async fn create(host: &str, port: u16, handler: HandlerKind) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            handler: Arc::new(Mutex::new(handler.build())),
            callbacks: RwLock::new(Vec::new()),
            shutdown: CancellationToken::new(),
        });

        tracing::info!(%local_addr, %handler, "CDP proxy listening");
        let accept_task = tokio::spawn(accept_loop(listener, shared.clone()));

        Ok(Self {
            local_addr,
            host: host.to_string(),
            shared,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Register a callback for established debugging connections
    pub async fn on_connection_established(&self, callback: ConnectionCallback) {
        self.shared.callbacks.write().await.push(callback);
    }

    /// URL the JS debugger should connect to for a given application
    pub fn debugger_url(&self, application_ws_url: &str) -> Result<Url> {
        debugger_url(&self.host, self.port(), application_ws_url)
    }

    /// Stop listening and close every live relay
    pub async fn stop(self) {
        tracing::info!(local_addr = %self.local_addr, "Stopping CDP proxy");
        self.shared.shutdown.cancel();
        if let Err(e) = self.accept_task.await {
            tracing::warn!(error = %e, "CDP proxy accept task failed");
        }
    }
}

/// Build `ws://host:port/?browser=<application url>`
pub fn debugger_url(host: &str, port: u16, application_ws_url: &str) -> Result<Url> {
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    let mut url = Url::parse(&format!("ws://{host}:{port}/"))
        .map_err(|e| Error::Config(format!("Invalid proxy address {host}:{port}: {e}")))?;
    url.query_pairs_mut()
        .append_pair(BROWSER_PARAM, application_ws_url);
    Ok(url)
}

/// Pull the application inspector URL out of a handshake request URI
fn browser_param(request_uri: &str) -> Result<Url> {
    let url = Url::parse("ws://proxy")
        .and_then(|base| base.join(request_uri))
        .map_err(|e| Error::InvalidBrowserParam {
            url: request_uri.to_string(),
            reason: e.to_string(),
        })?;

    let browser = url
        .query_pairs()
        .find(|(key, _)| key == BROWSER_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or(Error::MissingBrowserParam)?;

    let target = Url::parse(&browser).map_err(|e| Error::InvalidBrowserParam {
        url: browser.clone(),
        reason: e.to_string(),
    })?;
    match target.scheme() {
        "ws" | "wss" => Ok(target),
        scheme => Err(Error::InvalidBrowserParam {
            url: browser,
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    tracing::debug!(%peer_addr, "Debugger connecting");
                    tokio::spawn(handle_debugger(stream, shared.clone()));
                }
                Err(e) => tracing::error!(error = %e, "Accept error"),
            },
        }
    }
    tracing::debug!("CDP proxy accept loop finished");
}

async fn handle_debugger(stream: TcpStream, shared: Arc<Shared>) {
    let mut target = None;
    let callback = |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
        match browser_param(&request.uri().to_string()) {
            Ok(url) => {
                target = Some(url);
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(uri = %request.uri(), error = %e, "Rejecting debugger connection");
                let mut reject = ErrorResponse::new(Some(e.to_string()));
                *reject.status_mut() = StatusCode::BAD_REQUEST;
                Err(reject)
            }
        }
    };

    let ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(error = %e, "Debugger handshake failed");
            return;
        }
    };
    let Some(target) = target else {
        return;
    };

    // Nothing the debugger sends may be dispatched before the application
    // side and its relays exist.
    let mut debugger = Connection::new(Peer::Debugger, ws);
    debugger.pause();

    tracing::info!(application = %target, "Connecting to application");
    let application = match tokio_tungstenite::connect_async(target.as_str()).await {
        Ok((ws, _)) => Connection::new(Peer::Application, ws),
        Err(e) => {
            tracing::error!(application = %target, error = %e, "Cannot connect to application");
            debugger
                .close(&format!("Cannot connect to application: {e}"))
                .await;
            return;
        }
    };

    for callback in shared.callbacks.read().await.iter() {
        callback(&target);
    }

    debugger.unpause();
    let (debugger_rx, debugger_tx) = match debugger.split() {
        Ok(halves) => halves,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start relay");
            return;
        }
    };
    let (application_rx, application_tx) = match application.split() {
        Ok(halves) => halves,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start relay");
            return;
        }
    };

    tracing::info!(application = %target, "Debugging connection established");
    relay(
        Relay {
            debugger_rx,
            debugger_tx,
            application_rx,
            application_tx,
        },
        shared.handler.clone(),
        shared.shutdown.clone(),
    )
    .await;
    tracing::info!(application = %target, "Debugging connection finished");
}

/// Both halves of both connections
pub struct Relay<D, A> {
    pub debugger_rx: ConnectionReader<D>,
    pub debugger_tx: ConnectionWriter<D>,
    pub application_rx: ConnectionReader<A>,
    pub application_tx: ConnectionWriter<A>,
}

/// Pump messages in both directions until either side ends or `shutdown` fires
///
/// One task drives both directions, so per-direction order is preserved.
pub async fn relay<D, A>(
    mut relay: Relay<D, A>,
    handler: Arc<Mutex<Box<dyn MessageHandler>>>,
    shutdown: CancellationToken,
) where
    D: AsyncRead + AsyncWrite + Unpin,
    A: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                relay.debugger_tx.close("proxy stopped").await;
                relay.application_tx.close("proxy stopped").await;
                break;
            }
            inbound = relay.debugger_rx.next() => match inbound {
                Inbound::Message(message) => {
                    let processed = handler.lock().await.process_debugger_message(message);
                    if processed.send_back {
                        dispatch(&mut relay.debugger_tx, Peer::Debugger, &processed.message).await;
                    } else {
                        dispatch(&mut relay.application_tx, Peer::Debugger, &processed.message).await;
                    }
                }
                Inbound::End => {
                    tracing::debug!("Debugger went away, closing application connection");
                    relay.application_tx.close("debugger disconnected").await;
                    break;
                }
            },
            inbound = relay.application_rx.next() => match inbound {
                Inbound::Message(message) => {
                    let processed = handler.lock().await.process_application_message(message);
                    if processed.send_back {
                        dispatch(&mut relay.application_tx, Peer::Application, &processed.message).await;
                    } else {
                        dispatch(&mut relay.debugger_tx, Peer::Application, &processed.message).await;
                    }
                }
                Inbound::End => {
                    tracing::info!("Application closed, closing debugger connection");
                    relay.debugger_tx.close("application closed").await;
                    break;
                }
            },
        }
    }
}

async fn dispatch<S>(writer: &mut ConnectionWriter<S>, from: Peer, message: &ProtocolMessage)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::trace!(from = %from, to = %writer.peer(), id = ?message.id(), method = ?message.method(), "Relaying");
    if let Err(e) = writer.send(message).await {
        tracing::warn!(to = %writer.peer(), error = %e, "Failed to relay message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_param_is_required() {
        assert!(matches!(browser_param("/"), Err(Error::MissingBrowserParam)));
        assert!(matches!(
            browser_param("/?other=1"),
            Err(Error::MissingBrowserParam)
        ));
    }

    #[test]
    fn test_browser_param_must_be_websocket_url() {
        assert!(matches!(
            browser_param("/?browser=not%20a%20url"),
            Err(Error::InvalidBrowserParam { .. })
        ));
        assert!(matches!(
            browser_param("/?browser=http%3A%2F%2Flocalhost%3A8081"),
            Err(Error::InvalidBrowserParam { .. })
        ));
    }

    #[test]
    fn test_debugger_url_round_trips_browser_param() {
        let app = "ws://localhost:8081/inspector/debug?device=0&page=1";
        let url = debugger_url("127.0.0.1", 13602, app).unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(13602));

        let path_and_query = format!("{}?{}", url.path(), url.query().unwrap());
        assert_eq!(browser_param(&path_and_query).unwrap().as_str(), app);
    }

    #[test]
    fn test_debugger_url_brackets_ipv6_hosts() {
        let url = debugger_url("::1", 9000, "ws://[::1]:9229/abc").unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
    }
}
