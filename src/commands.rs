//! CLI command definitions
//!
//! Defines the clap commands for the debugger binary.

use clap::Subcommand;

use crate::cdp::HandlerKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Run as a debug adapter, speaking DAP on stdin/stdout (default)
    Adapter,

    /// Run a standalone CDP proxy until Ctrl-C
    Proxy {
        /// Address to listen on (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on; 0 picks a free port (default from config)
        #[arg(long)]
        port: Option<u16>,

        /// Message rewriting to apply between debugger and application
        #[arg(long, value_enum, default_value_t = HandlerKind::Passthrough)]
        handler: HandlerKind,
    },

    /// Resolve a runtime's inspector WebSocket URL
    Resolve {
        /// Runtime address, e.g. localhost:8081 or https://127.0.0.1:9222
        address: String,

        /// Total attempts before giving up (default from config)
        #[arg(long)]
        attempts: Option<u32>,
    },
}
