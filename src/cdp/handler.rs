//! Message handler strategy
//!
//! A handler sees every message the proxy relays and may rewrite it or
//! answer it directly. It never reorders: one message in, one message out.

use serde::{Deserialize, Serialize};

use super::hermes::HermesHandler;
use super::message::ProtocolMessage;
use super::passthrough::{IosDirectHandler, PassthroughHandler};
use super::rn::RnHandler;

/// CDP method names the handlers react to
pub mod methods {
    pub const CLOSE: &str = "close";
    pub const DEBUGGER_PAUSED: &str = "Debugger.paused";
    pub const DEBUGGER_SET_BREAKPOINT: &str = "Debugger.setBreakpoint";
    pub const RUNTIME_CALL_FUNCTION_ON: &str = "Runtime.callFunctionOn";
}

/// Outcome of handling one message
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMessage {
    pub message: ProtocolMessage,
    /// Answer the sending side with `message` instead of forwarding it
    pub send_back: bool,
}

impl ProcessedMessage {
    /// Forward to the peer
    pub fn forward(message: ProtocolMessage) -> Self {
        Self {
            message,
            send_back: false,
        }
    }

    /// Reply to the sender; the original message is consumed
    pub fn reply(message: ProtocolMessage) -> Self {
        Self {
            message,
            send_back: true,
        }
    }
}

/// Per-runtime message rewriting
pub trait MessageHandler: Send {
    /// Handle a message sent by the debugger (IDE side)
    fn process_debugger_message(&mut self, message: ProtocolMessage) -> ProcessedMessage;

    /// Handle a message sent by the application (JS runtime side)
    fn process_application_message(&mut self, message: ProtocolMessage) -> ProcessedMessage;
}

/// Handler variants, selected once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerKind {
    /// Runtimes that already speak compatible CDP
    #[default]
    Passthrough,
    /// Hermes engine
    Hermes,
    /// JavaScriptCore through ios_webkit_debug_proxy
    IosDirect,
    /// Classic React Native debugger worker
    Rn,
}

impl HandlerKind {
    pub fn build(self) -> Box<dyn MessageHandler> {
        match self {
            Self::Passthrough => Box::new(PassthroughHandler),
            Self::Hermes => Box::new(HermesHandler),
            Self::IosDirect => Box::new(IosDirectHandler),
            Self::Rn => Box::new(RnHandler::new()),
        }
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passthrough => write!(f, "passthrough"),
            Self::Hermes => write!(f, "hermes"),
            Self::IosDirect => write!(f, "ios-direct"),
            Self::Rn => write!(f, "rn"),
        }
    }
}
