//! The IDE, as seen by a session running inside the DAP adapter

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::dap::{
    commands, events, StartDebuggingArguments, TerminateChildSessionEventBody,
    TerminatedEventBody,
};
use crate::session::{ChildSessionConfig, HostIde};

use super::server::DapSender;

pub struct DapHost {
    sender: DapSender,
}

impl DapHost {
    pub fn new(sender: DapSender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl HostIde for DapHost {
    async fn start_child_session(&self, config: &ChildSessionConfig) -> Result<bool> {
        let arguments = StartDebuggingArguments {
            configuration: serde_json::to_value(config)?,
            request: config.request.clone(),
        };
        let response = self
            .sender
            .request(commands::START_DEBUGGING, arguments)
            .await?;
        if !response.success {
            tracing::warn!(
                message = ?response.message,
                "IDE refused to start child debug session"
            );
        }
        Ok(response.success)
    }

    async fn terminate_child_session(&self, session_id: &str, child_id: &str) -> Result<()> {
        self.sender.send_event(
            events::TERMINATE_CHILD_SESSION,
            Some(TerminateChildSessionEventBody {
                rn_debug_session_id: session_id.to_string(),
                child_id: child_id.to_string(),
            }),
        )
    }

    async fn session_terminated(&self, session_id: &str, forced_stop: bool) {
        let sent = self.sender.send_event(
            events::TERMINATED,
            Some(TerminatedEventBody { forced_stop }),
        );
        match sent {
            Ok(()) => tracing::debug!(session = %session_id, forced_stop, "Reported session termination"),
            Err(Error::ClientDisconnected) => {}
            Err(e) => tracing::warn!(session = %session_id, error = %e, "Cannot report session termination"),
        }
    }
}
