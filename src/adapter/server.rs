//! DAP server over a byte stream (stdio in production)
//!
//! One read loop parses messages from the IDE. Requests are handled on
//! their own tasks so a long attach never blocks a disconnect or the
//! response to one of our reverse requests. All output goes through a
//! single writer task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};
use crate::dap::codec;
use crate::dap::{EventMessage, ProtocolMessage, RequestMessage, ResponseMessage};
use crate::session::SessionRegistry;

use super::handler::RequestHandler;

/// How long queued output may take to flush at shutdown
const WRITER_DRAIN: Duration = Duration::from_secs(2);

type PendingRequests = Arc<Mutex<HashMap<i64, oneshot::Sender<ResponseMessage>>>>;

/// Sends messages to the IDE; cheap to clone
#[derive(Clone)]
pub struct DapSender {
    tx: mpsc::UnboundedSender<String>,
    seq: Arc<AtomicI64>,
    pending: PendingRequests,
    closed: CancellationToken,
}

impl DapSender {
    fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tx,
            seq: Arc::new(AtomicI64::new(1)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            closed: CancellationToken::new(),
        }
    }

    /// Get the next sequence number
    pub fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn send(&self, message: ProtocolMessage) -> Result<()> {
        let json = serde_json::to_string(&message)?;
        tracing::debug!("DAP >>> {}", json);
        self.tx.send(json).map_err(|_| Error::ClientDisconnected)
    }

    pub fn send_response(&self, response: ResponseMessage) -> Result<()> {
        self.send(ProtocolMessage::Response(response))
    }

    pub fn send_event<B: Serialize>(&self, event: &str, body: Option<B>) -> Result<()> {
        let body = body.map(serde_json::to_value).transpose()?;
        self.send(ProtocolMessage::Event(EventMessage {
            seq: self.next_seq(),
            event: event.to_string(),
            body,
        }))
    }

    /// Send a reverse request and wait for the IDE's response
    pub async fn request<A: Serialize>(&self, command: &str, arguments: A) -> Result<ResponseMessage> {
        if self.closed.is_cancelled() {
            return Err(Error::ClientDisconnected);
        }
        let seq = self.next_seq();
        let (tx, rx) = oneshot::channel();
        self.pending_requests().insert(seq, tx);

        let sent = self.send(ProtocolMessage::Request(RequestMessage {
            seq,
            command: command.to_string(),
            arguments: Some(serde_json::to_value(arguments)?),
        }));
        if let Err(e) = sent {
            self.pending_requests().remove(&seq);
            return Err(e);
        }

        tokio::select! {
            response = rx => response.map_err(|_| Error::ClientDisconnected),
            _ = self.closed.cancelled() => Err(Error::ClientDisconnected),
        }
    }

    /// Fail every outstanding and future reverse request
    fn close(&self) {
        self.closed.cancel();
        self.pending_requests().clear();
    }

    fn resolve(&self, response: ResponseMessage) {
        match self.pending_requests().remove(&response.request_seq) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => tracing::warn!(
                request_seq = response.request_seq,
                command = %response.command,
                "Response to unknown request"
            ),
        }
    }

    fn pending_requests(&self) -> std::sync::MutexGuard<'_, HashMap<i64, oneshot::Sender<ResponseMessage>>> {
        // Poisoned only if a holder panicked
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Serve one IDE connection until it closes
pub async fn serve<R, W>(mut reader: R, mut writer: W, registry: Arc<SessionRegistry>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if let Err(e) = codec::write_message(&mut writer, &json).await {
                tracing::error!(error = %e, "Failed to write to the IDE");
                break;
            }
        }
    });

    let sender = DapSender::new(tx);
    let handler = Arc::new(RequestHandler::new(registry.clone(), sender.clone()));

    let outcome = loop {
        let json = match codec::read_message(&mut reader).await {
            Ok(Some(json)) => json,
            Ok(None) => {
                tracing::info!("IDE closed the connection");
                break Ok(());
            }
            Err(e) => break Err(e),
        };
        tracing::debug!("DAP <<< {}", json);

        match serde_json::from_str::<ProtocolMessage>(&json) {
            Ok(ProtocolMessage::Request(request)) => {
                let handler = handler.clone();
                tokio::spawn(async move { handler.handle(request).await });
            }
            Ok(ProtocolMessage::Response(response)) => sender.resolve(response),
            Ok(ProtocolMessage::Event(event)) => {
                tracing::debug!(event = %event.event, "Ignoring event from the IDE");
            }
            Err(e) => tracing::warn!(error = %e, "Dropping malformed DAP message"),
        }
    };

    // Nobody is left to answer reverse requests
    sender.close();
    registry.disconnect_all(false).await;
    drop(handler);
    drop(sender);
    if tokio::time::timeout(WRITER_DRAIN, writer_task).await.is_err() {
        tracing::debug!("Writer still busy at shutdown");
    }
    outcome
}
