//! Classic React Native message handler
//!
//! The app bundle is loaded with a `debugger;` statement at the top so the
//! JS debugger can resolve source maps before any app code runs. The first
//! pause the runtime reports is that statement; it is relabelled so the IDE
//! shows it as a break on start rather than a breakpoint hit.

use serde_json::Value;

use super::handler::{methods, MessageHandler, ProcessedMessage};
use super::message::ProtocolMessage;

/// Reason the IDE shows for the synthetic first pause
pub const BREAK_ON_START_REASON: &str = "Break on start";

#[derive(Debug)]
pub struct RnHandler {
    /// Still waiting for the synthetic first pause
    first_stop: bool,
}

impl RnHandler {
    pub fn new() -> Self {
        Self { first_stop: true }
    }

    pub fn is_awaiting_first_stop(&self) -> bool {
        self.first_stop
    }
}

impl Default for RnHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHandler for RnHandler {
    fn process_debugger_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        if message.method() == Some(methods::CLOSE) {
            // The debugger reconnects with a freshly loaded bundle
            self.first_stop = true;
        }
        ProcessedMessage::forward(message)
    }

    fn process_application_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        match message {
            ProtocolMessage::Command(mut cmd)
                if self.first_stop && cmd.method == methods::DEBUGGER_PAUSED =>
            {
                let reason = cmd
                    .params
                    .as_mut()
                    .and_then(Value::as_object_mut)
                    .and_then(|params| params.get_mut("reason"));
                if let Some(reason) = reason {
                    if reason.as_str() == Some("other") {
                        *reason = Value::String(BREAK_ON_START_REASON.to_string());
                        self.first_stop = false;
                    }
                }
                ProcessedMessage::forward(cmd.into())
            }
            other => ProcessedMessage::forward(other),
        }
    }
}
