//! Error types for the React Native debugger
//!
//! Variants follow the failure classes the proxy and session code
//! distinguish: transport, protocol, discovery, session and configuration.
//! Messages are shown verbatim in the IDE, so they name the address or
//! option involved.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the debugger
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Debug client disconnected")]
    ClientDisconnected,

    // === Protocol Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed CDP message: {0}")]
    MalformedMessage(String),

    #[error("Debugger connection is missing the 'browser' query parameter")]
    MissingBrowserParam,

    #[error("Invalid application inspector URL '{url}': {reason}")]
    InvalidBrowserParam { url: String, reason: String },

    #[error("Cannot split a paused {0} connection; unpause it first")]
    ConnectionPaused(&'static str),

    #[error("DAP protocol error: {0}")]
    DapProtocol(String),

    #[error("Unsupported request '{0}'")]
    UnsupportedRequest(String),

    // === Discovery Errors ===
    #[error("Could not find any debuggable target at {0}")]
    NoDebuggableTarget(String),

    #[error("Cannot connect to the debug target at {address}: {source}")]
    CouldNotConnectToDebugTarget {
        address: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Connecting to {address} was cancelled")]
    Cancelled {
        address: String,
        #[source]
        source: Option<Box<Error>>,
    },

    // === Session Errors ===
    #[error("Cannot start child debug session: {0}")]
    ChildSessionFailed(String),

    #[error("Debug session '{0}' not found")]
    SessionNotFound(String),

    #[error("Debug session '{0}' has already started")]
    SessionAlreadyStarted(String),

    #[error("Platform '{platform}' is not supported by the {flow} debugging flow")]
    UnsupportedPlatform { platform: String, flow: String },

    #[error("iOS WebKit debug proxy failed: {0}")]
    WebkitProxy(String),

    #[error("No iOS device matching '{0}' is attached to the WebKit debug proxy")]
    DeviceNotFound(String),

    #[error("Failed to launch the application: {0}")]
    LaunchFailed(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a discovery failure with the address it was aimed at
    pub fn could_not_connect(address: &str, source: Error) -> Self {
        Self::CouldNotConnectToDebugTarget {
            address: address.to_string(),
            source: Box::new(source),
        }
    }

    /// Create a cancellation error, keeping the last failure if there was one
    pub fn cancelled(address: &str, source: Option<Error>) -> Self {
        Self::Cancelled {
            address: address.to_string(),
            source: source.map(Box::new),
        }
    }

    /// Create an unsupported platform error
    pub fn unsupported_platform(platform: impl ToString, flow: &str) -> Self {
        Self::UnsupportedPlatform {
            platform: platform.to_string(),
            flow: flow.to_string(),
        }
    }

    /// Whether this error, or any error it wraps, came from cancellation
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::CouldNotConnectToDebugTarget { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }
}

/// Error body sent back in DAP error responses
///
/// Mirrors the `Message` object of the Debug Adapter Protocol.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DapErrorMessage {
    pub id: u32,
    pub format: String,
    #[serde(default)]
    pub show_user: bool,
}

impl From<&Error> for DapErrorMessage {
    fn from(e: &Error) -> Self {
        let id = match e {
            Error::WebSocket(_) | Error::Http(_) | Error::Io(_) | Error::ClientDisconnected => 1001,
            Error::Json(_)
            | Error::MalformedMessage(_)
            | Error::MissingBrowserParam
            | Error::InvalidBrowserParam { .. }
            | Error::DapProtocol(_) => 1101,
            Error::UnsupportedRequest(_) => 1102,
            Error::NoDebuggableTarget(_) => 1201,
            Error::CouldNotConnectToDebugTarget { .. } => 1202,
            Error::Cancelled { .. } => 1203,
            Error::ChildSessionFailed(_) => 1301,
            Error::SessionNotFound(_) | Error::SessionAlreadyStarted(_) => 1302,
            Error::UnsupportedPlatform { .. } => 1303,
            Error::WebkitProxy(_) | Error::DeviceNotFound(_) => 1304,
            Error::LaunchFailed(_) => 1305,
            Error::Config(_) | Error::ConfigParse(_) | Error::FileRead { .. } => 1401,
            Error::ConnectionPaused(_) | Error::Internal(_) => 1999,
        };

        Self {
            id,
            format: e.to_string(),
            show_user: !e.is_cancellation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_detected_through_wrapping() {
        let err = Error::could_not_connect(
            "http://localhost:8081",
            Error::cancelled("http://localhost:8081", None),
        );
        assert!(err.is_cancellation());

        let refused = Error::could_not_connect(
            "http://localhost:8081",
            Error::NoDebuggableTarget("http://localhost:8081".to_string()),
        );
        assert!(!refused.is_cancellation());
    }

    #[test]
    fn test_dap_error_message_hides_cancellation() {
        let msg = DapErrorMessage::from(&Error::cancelled("ws://x", None));
        assert_eq!(msg.id, 1203);
        assert!(!msg.show_user);

        let msg = DapErrorMessage::from(&Error::ChildSessionFailed("rejected".into()));
        assert_eq!(msg.id, 1301);
        assert!(msg.show_user);
        assert!(msg.format.contains("rejected"));
    }
}
