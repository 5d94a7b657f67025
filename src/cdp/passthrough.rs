//! Handlers that forward everything unchanged

use super::handler::{MessageHandler, ProcessedMessage};
use super::message::ProtocolMessage;

/// Identity transform for runtimes that already speak compatible CDP
#[derive(Debug, Default)]
pub struct PassthroughHandler;

impl MessageHandler for PassthroughHandler {
    fn process_debugger_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        ProcessedMessage::forward(message)
    }

    fn process_application_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        ProcessedMessage::forward(message)
    }
}

/// JavaScriptCore on iOS, reached through ios_webkit_debug_proxy
///
/// Kept as its own variant so JSC-specific rewrites have a home.
#[derive(Debug, Default)]
pub struct IosDirectHandler;

impl MessageHandler for IosDirectHandler {
    fn process_debugger_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        ProcessedMessage::forward(message)
    }

    fn process_application_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        ProcessedMessage::forward(message)
    }
}
