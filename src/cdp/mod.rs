//! Chrome DevTools Protocol messages and per-runtime rewriting
//!
//! The proxy relays CDP frames between the IDE's JS debugger and the app's
//! runtime. Each frame passes through a [`MessageHandler`] chosen for the
//! target runtime.

pub mod handler;
pub mod hermes;
pub mod message;
pub mod passthrough;
pub mod rn;

pub use handler::{HandlerKind, MessageHandler, ProcessedMessage};
pub use message::{Command, ErrorReply, MessageId, ProtocolMessage, SuccessReply};
