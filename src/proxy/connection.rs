//! One side of a proxied CDP session
//!
//! A [`Connection`] wraps a WebSocket to either the debugger or the
//! application. While paused its inbound frames stay queued in the socket;
//! it has to be unpaused before it can be split into a reader and a writer.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::cdp::ProtocolMessage;
use crate::common::{Error, Result};

/// Which peer a connection talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// The IDE's JS debugger
    Debugger,
    /// The JS runtime inside the app
    Application,
}

impl Peer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debugger => "debugger",
            Self::Application => "application",
        }
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reader produces
#[derive(Debug)]
pub enum Inbound {
    Message(ProtocolMessage),
    /// Peer closed the connection or the transport failed
    End,
}

pub struct Connection<S> {
    peer: Peer,
    ws: WebSocketStream<S>,
    paused: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(peer: Peer, ws: WebSocketStream<S>) -> Self {
        Self {
            peer,
            ws,
            paused: false,
        }
    }

    pub fn peer(&self) -> Peer {
        self.peer
    }

    /// Stop dispatching inbound frames; they queue up in the transport
    pub fn pause(&mut self) {
        tracing::trace!(peer = %self.peer, "Pausing connection");
        self.paused = true;
    }

    /// Allow inbound frames to be dispatched again, in arrival order
    pub fn unpause(&mut self) {
        tracing::trace!(peer = %self.peer, "Unpausing connection");
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Split into reader and writer halves
    pub fn split(self) -> Result<(ConnectionReader<S>, ConnectionWriter<S>)> {
        if self.paused {
            return Err(Error::ConnectionPaused(self.peer.as_str()));
        }
        let (sink, stream) = self.ws.split();
        Ok((
            ConnectionReader {
                peer: self.peer,
                stream,
            },
            ConnectionWriter {
                peer: self.peer,
                sink,
            },
        ))
    }

    /// Close without splitting, e.g. when the other side never came up
    pub async fn close(mut self, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::Error,
            reason: reason.to_string().into(),
        };
        if let Err(e) = self.ws.close(Some(frame)).await {
            tracing::debug!(peer = %self.peer, error = %e, "Error closing connection");
        }
    }
}

pub struct ConnectionReader<S> {
    peer: Peer,
    stream: SplitStream<WebSocketStream<S>>,
}

impl<S> ConnectionReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Next protocol message
    ///
    /// Frames that are not CDP messages are logged and skipped. Transport
    /// errors are logged and reported as [`Inbound::End`].
    pub async fn next(&mut self) -> Inbound {
        loop {
            let frame = match self.stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::warn!(peer = %self.peer, error = %e, "Connection error");
                    return Inbound::End;
                }
                None => return Inbound::End,
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    tracing::debug!(peer = %self.peer, ?frame, "Connection closed by peer");
                    return Inbound::End;
                }
                Message::Binary(data) => match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::warn!(peer = %self.peer, "Dropping non UTF-8 binary frame");
                        continue;
                    }
                },
                // Pings are answered by tungstenite
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            match ProtocolMessage::from_text(&text) {
                Ok(message) => return Inbound::Message(message),
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, frame = %text, "Dropping malformed frame");
                }
            }
        }
    }
}

pub struct ConnectionWriter<S> {
    peer: Peer,
    sink: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> ConnectionWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn peer(&self) -> Peer {
        self.peer
    }

    pub async fn send(&mut self, message: &ProtocolMessage) -> Result<()> {
        let text = message.to_text()?;
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Send a close frame; errors are logged, the peer may already be gone
    pub async fn close(&mut self, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        };
        if let Err(e) = self.sink.send(Message::Close(Some(frame))).await {
            tracing::debug!(peer = %self.peer, error = %e, "Error sending close frame");
        }
        if let Err(e) = self.sink.close().await {
            tracing::debug!(peer = %self.peer, error = %e, "Error closing connection");
        }
    }
}
