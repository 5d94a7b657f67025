//! React Native debugger
//!
//! A CDP proxy that sits between an IDE's JS debugger and a React Native
//! app's JS runtime, and a DAP adapter that drives debug sessions through it.

pub mod adapter;
pub mod cdp;
pub mod cli;
pub mod commands;
pub mod common;
pub mod dap;
pub mod endpoint;
pub mod proxy;
pub mod session;

// Re-export commonly used types for tests
pub use cdp::{HandlerKind, ProtocolMessage};
pub use common::{Error, Result};
pub use proxy::ProxyServer;
