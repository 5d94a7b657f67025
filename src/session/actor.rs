//! Session actor
//!
//! Every session event (IDE requests, app connections, child notifications)
//! goes through one queue and is handled to completion before the next, so
//! the session's status is only ever touched by one task.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::args::{AttachArgs, LaunchArgs};
use super::context::SessionContext;
use super::host::HostIde;
use super::launcher::AppLauncher;
use super::status::DebugSessionStatus;
use super::{AttachProgress, FlowStrategy};

const EVENT_QUEUE: usize = 64;

/// Inputs to a session
#[derive(Debug)]
pub enum SessionEvent {
    Launch {
        args: LaunchArgs,
        reply: oneshot::Sender<Result<()>>,
    },
    Attach {
        args: AttachArgs,
        reply: oneshot::Sender<Result<()>>,
    },
    /// A (new) application runtime is available
    AppConnected { port: u16, ws_url: String },
    ChildStarted { child_id: String },
    ChildTerminated { child_id: String },
    Disconnect {
        forced_stop: bool,
        reply: oneshot::Sender<()>,
    },
    /// Report the current status, for diagnostics and tests
    Status { reply: oneshot::Sender<DebugSessionStatus> },
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    events: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session actor has finished
    pub fn is_finished(&self) -> bool {
        self.events.is_closed()
    }

    pub async fn launch(&self, args: LaunchArgs) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Launch { args, reply }).await?;
        rx.await.map_err(|_| self.gone())?
    }

    pub async fn attach(&self, args: AttachArgs) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Attach { args, reply }).await?;
        rx.await.map_err(|_| self.gone())?
    }

    pub async fn app_connected(&self, port: u16, ws_url: String) -> Result<()> {
        self.send(SessionEvent::AppConnected { port, ws_url }).await
    }

    pub async fn child_started(&self, child_id: String) -> Result<()> {
        self.send(SessionEvent::ChildStarted { child_id }).await
    }

    pub async fn child_terminated(&self, child_id: String) -> Result<()> {
        self.send(SessionEvent::ChildTerminated { child_id }).await
    }

    /// Stop the session; in-flight attach work is cancelled first
    pub async fn disconnect(&self, forced_stop: bool) -> Result<()> {
        self.cancel.cancel();
        let (reply, rx) = oneshot::channel();
        if self
            .send(SessionEvent::Disconnect { forced_stop, reply })
            .await
            .is_err()
        {
            // Already gone
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    pub async fn status(&self) -> Result<DebugSessionStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Status { reply }).await?;
        rx.await.map_err(|_| self.gone())
    }

    async fn send(&self, event: SessionEvent) -> Result<()> {
        self.events.send(event).await.map_err(|_| self.gone())
    }

    fn gone(&self) -> Error {
        Error::SessionNotFound(self.id.clone())
    }
}

/// Start a session actor
pub fn spawn(
    id: String,
    config: Arc<Config>,
    host: Arc<dyn HostIde>,
    launcher: Arc<dyn AppLauncher>,
) -> Result<SessionHandle> {
    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let cancel = CancellationToken::new();
    let ctx = SessionContext::new(id.clone(), config, host, launcher, cancel.clone(), tx.downgrade())?;

    let session = DebugSession {
        ctx,
        flow: None,
        events: rx,
    };
    tokio::spawn(session.run());

    Ok(SessionHandle {
        id,
        events: tx,
        cancel,
    })
}

struct DebugSession {
    ctx: SessionContext,
    flow: Option<Box<dyn FlowStrategy>>,
    events: mpsc::Receiver<SessionEvent>,
}

impl DebugSession {
    async fn run(mut self) {
        tracing::debug!(session = %self.ctx.id, "Session started");
        while let Some(event) = self.events.recv().await {
            if !self.handle(event).await {
                break;
            }
        }
        self.events.close();
        // Handles dropped without a disconnect
        self.ctx.terminate(false).await;
        tracing::debug!(session = %self.ctx.id, "Session finished");
    }

    /// Returns false once the session is finished
    async fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Launch { args, reply } => {
                let result = self.launch(args).await;
                self.complete_attach(result, reply).await;
            }
            SessionEvent::Attach { args, reply } => {
                let result = self.attach(args).await;
                self.complete_attach(result, reply).await;
            }
            SessionEvent::AppConnected { port, ws_url } => {
                if let Some(flow) = &self.flow {
                    flow.on_app_connected(&mut self.ctx, port, ws_url).await;
                }
            }
            SessionEvent::ChildStarted { child_id } => {
                tracing::info!(session = %self.ctx.id, child = %child_id, "Child session started");
                self.ctx.child = Some(child_id);
            }
            SessionEvent::ChildTerminated { child_id } => match &self.flow {
                Some(flow) => flow.on_child_terminated(&mut self.ctx, &child_id).await,
                None => tracing::debug!(session = %self.ctx.id, child = %child_id, "Child terminated before attach"),
            },
            SessionEvent::Disconnect { forced_stop, reply } => {
                self.ctx.terminate(forced_stop).await;
                self.events.close();
                let _ = reply.send(());
                return false;
            }
            SessionEvent::Status { reply } => {
                let _ = reply.send(self.ctx.status);
            }
        }
        // Flows may tear the session down themselves
        self.ctx.status != DebugSessionStatus::Stopped
    }

    fn select_flow(&mut self, args: &AttachArgs) -> Result<()> {
        if self.flow.is_some() || self.ctx.status != DebugSessionStatus::FirstConnection {
            return Err(Error::SessionAlreadyStarted(self.ctx.id.clone()));
        }
        let flow = args.flow();
        tracing::info!(session = %self.ctx.id, %flow, "Selected debugging flow");
        self.flow = Some(flow.strategy());
        Ok(())
    }

    async fn launch(&mut self, args: LaunchArgs) -> Result<AttachProgress> {
        self.select_flow(&args.attach)?;
        self.ctx.launch_app(&args).await?;
        self.run_attach(args.attach).await
    }

    async fn attach(&mut self, args: AttachArgs) -> Result<AttachProgress> {
        self.select_flow(&args)?;
        self.run_attach(args).await
    }

    async fn run_attach(&mut self, args: AttachArgs) -> Result<AttachProgress> {
        match &self.flow {
            Some(flow) => flow.attach(&mut self.ctx, args).await,
            None => Err(Error::Internal("no debugging flow selected".to_string())),
        }
    }

    async fn complete_attach(
        &mut self,
        result: Result<AttachProgress>,
        reply: oneshot::Sender<Result<()>>,
    ) {
        match result {
            Ok(AttachProgress::Attached) => {
                let _ = reply.send(Ok(()));
            }
            Ok(AttachProgress::AwaitingApplication) => {
                if self.ctx.status.is_stopping() {
                    let _ = reply.send(Ok(()));
                } else {
                    self.ctx.pending_attach = Some(reply);
                }
            }
            Err(e) if e.is_cancellation() && self.ctx.cancel.is_cancelled() => {
                tracing::debug!(session = %self.ctx.id, error = %e, "Attach cancelled by disconnect");
                self.ctx.release_resources().await;
                let _ = reply.send(Ok(()));
            }
            Err(e) => {
                tracing::error!(session = %self.ctx.id, error = %e, "Attach failed");
                self.ctx.release_resources().await;
                let _ = reply.send(Err(e));
            }
        }
    }
}
