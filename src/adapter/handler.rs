//! Request handler for the DAP adapter
//!
//! Translates IDE requests into session operations.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::common::error::DapErrorMessage;
use crate::common::{Error, Result};
use crate::dap::{
    commands, events, Capabilities, ChildSessionArguments, DisconnectArguments,
    InitializeArguments, RequestMessage, ResponseMessage,
};
use crate::session::{AttachArgs, LaunchArgs, SessionHandle, SessionRegistry};

use super::host::DapHost;
use super::server::DapSender;

/// Handles the requests of one IDE connection
pub struct RequestHandler {
    registry: Arc<SessionRegistry>,
    sender: DapSender,
    /// The React Native session this connection drives
    session: Mutex<Option<SessionHandle>>,
}

impl RequestHandler {
    pub fn new(registry: Arc<SessionRegistry>, sender: DapSender) -> Self {
        Self {
            registry,
            sender,
            session: Mutex::new(None),
        }
    }

    /// Handle a request and send its response
    pub async fn handle(&self, request: RequestMessage) {
        let outcome = self.handle_inner(&request).await;
        let response = match outcome {
            Ok(body) => ResponseMessage::success(self.sender.next_seq(), &request, body),
            Err(e) => {
                tracing::warn!(command = %request.command, error = %e, "Request failed");
                ResponseMessage::error(self.sender.next_seq(), &request, DapErrorMessage::from(&e))
            }
        };
        if let Err(e) = self.sender.send_response(response) {
            tracing::debug!(command = %request.command, error = %e, "Cannot send response");
            return;
        }

        if request.command == commands::INITIALIZE {
            let _ = self.sender.send_event::<Value>(events::INITIALIZED, None);
        }
    }

    async fn handle_inner(&self, request: &RequestMessage) -> Result<Option<Value>> {
        match request.command.as_str() {
            commands::INITIALIZE => {
                let args: InitializeArguments = arguments(request)?;
                tracing::info!(
                    client = ?args.client_name,
                    adapter = %args.adapter_id,
                    "IDE connected"
                );
                if !args.supports_start_debugging_request {
                    tracing::warn!("IDE did not announce startDebugging support");
                }
                let capabilities = Capabilities {
                    supports_configuration_done_request: true,
                    supports_terminate_request: true,
                };
                Ok(Some(serde_json::to_value(capabilities)?))
            }

            commands::CONFIGURATION_DONE => Ok(None),

            commands::LAUNCH => {
                let args: LaunchArgs = arguments(request)?;
                let session = self.session().await?;
                session.launch(args).await?;
                Ok(None)
            }

            commands::ATTACH => {
                let args: AttachArgs = arguments(request)?;
                let session = self.session().await?;
                session.attach(args).await?;
                Ok(None)
            }

            commands::DISCONNECT => {
                let args: DisconnectArguments = match &request.arguments {
                    Some(_) => arguments(request)?,
                    None => DisconnectArguments::default(),
                };
                self.stop(args.forced_stop).await?;
                Ok(None)
            }

            commands::TERMINATE => {
                self.stop(true).await?;
                Ok(None)
            }

            commands::CHILD_SESSION_STARTED => {
                let args: ChildSessionArguments = arguments(request)?;
                self.registry
                    .child_started(&args.rn_debug_session_id, args.child_id)
                    .await?;
                Ok(None)
            }

            commands::CHILD_SESSION_TERMINATED => {
                let args: ChildSessionArguments = arguments(request)?;
                self.registry
                    .child_terminated(&args.rn_debug_session_id, args.child_id)
                    .await?;
                Ok(None)
            }

            other => Err(Error::UnsupportedRequest(other.to_string())),
        }
    }

    /// This connection's session, created on first use
    async fn session(&self) -> Result<SessionHandle> {
        let mut session = self.session.lock().await;
        if let Some(handle) = session.as_ref() {
            return Ok(handle.clone());
        }
        let host = Arc::new(DapHost::new(self.sender.clone()));
        let handle = self.registry.create(host).await?;
        tracing::info!(session = %handle.id(), "Created React Native debug session");
        *session = Some(handle.clone());
        Ok(handle)
    }

    async fn stop(&self, forced_stop: bool) -> Result<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        match self.registry.disconnect(session.id(), forced_stop).await {
            // Finished on its own already
            Err(Error::SessionNotFound(_)) => Ok(()),
            other => other,
        }
    }
}

fn arguments<T: DeserializeOwned>(request: &RequestMessage) -> Result<T> {
    let value = request.arguments.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|e| {
        Error::DapProtocol(format!("Invalid {} arguments: {}", request.command, e))
    })
}
