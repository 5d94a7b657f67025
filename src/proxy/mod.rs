//! CDP proxy between the IDE's JS debugger and the app's JS runtime

pub mod connection;
pub mod server;

pub use connection::{Connection, Inbound, Peer};
pub use server::{debugger_url, ConnectionCallback, ProxyServer, BROWSER_PARAM};
