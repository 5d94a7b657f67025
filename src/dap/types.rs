//! DAP message types
//!
//! The subset of the Debug Adapter Protocol a React Native session speaks,
//! plus the custom requests and events exchanged with the IDE extension.
//! See: https://microsoft.github.io/debug-adapter-protocol/specification

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::error::DapErrorMessage;

// === Base Protocol Messages ===

/// Base message type for DAP protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    Request(RequestMessage),
    Response(ResponseMessage),
    Event(EventMessage),
}

/// DAP request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMessage {
    pub seq: i64,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// DAP response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub seq: i64,
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// DAP event message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub seq: i64,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ResponseMessage {
    pub fn success(seq: i64, request: &RequestMessage, body: Option<Value>) -> Self {
        Self {
            seq,
            request_seq: request.seq,
            success: true,
            command: request.command.clone(),
            message: None,
            body,
        }
    }

    /// Error response whose body carries a DAP `Message` object
    pub fn error(seq: i64, request: &RequestMessage, error: DapErrorMessage) -> Self {
        Self {
            seq,
            request_seq: request.seq,
            success: false,
            command: request.command.clone(),
            message: Some(error.format.clone()),
            body: Some(serde_json::json!({ "error": error })),
        }
    }
}

// === Commands and Events ===

pub mod commands {
    pub const INITIALIZE: &str = "initialize";
    pub const CONFIGURATION_DONE: &str = "configurationDone";
    pub const LAUNCH: &str = "launch";
    pub const ATTACH: &str = "attach";
    pub const DISCONNECT: &str = "disconnect";
    pub const TERMINATE: &str = "terminate";
    /// IDE extension: a nested session of ours has started
    pub const CHILD_SESSION_STARTED: &str = "childSessionStarted";
    /// IDE extension: a nested session of ours has ended
    pub const CHILD_SESSION_TERMINATED: &str = "childSessionTerminated";
    /// Reverse request asking the IDE to start a nested session
    pub const START_DEBUGGING: &str = "startDebugging";
}

pub mod events {
    pub const INITIALIZED: &str = "initialized";
    pub const TERMINATED: &str = "terminated";
    /// Asks the IDE extension to stop one nested session
    pub const TERMINATE_CHILD_SESSION: &str = "terminateChildSession";
}

// === Request Arguments ===

/// Initialize request arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(rename = "adapterID", default)]
    pub adapter_id: String,
    #[serde(default)]
    pub supports_start_debugging_request: bool,
}

/// Disconnect request arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    #[serde(default)]
    pub restart: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
    /// Set by the IDE extension when the user stopped the session
    #[serde(default)]
    pub forced_stop: bool,
}

/// Arguments of the child session notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSessionArguments {
    pub rn_debug_session_id: String,
    /// IDE id of the nested session
    #[serde(rename = "childId")]
    pub child_id: String,
}

/// `startDebugging` reverse request arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDebuggingArguments {
    pub configuration: Value,
    /// `launch` or `attach`
    pub request: String,
}

// === Response and Event Bodies ===

/// Capabilities returned by initialize response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub supports_configuration_done_request: bool,
    #[serde(default)]
    pub supports_terminate_request: bool,
}

/// Terminated event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedEventBody {
    pub forced_stop: bool,
}

/// `terminateChildSession` event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateChildSessionEventBody {
    pub rn_debug_session_id: String,
    pub child_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_ide_request() {
        let msg: ProtocolMessage = serde_json::from_value(json!({
            "seq": 3,
            "type": "request",
            "command": "disconnect",
            "arguments": {"restart": false, "forcedStop": true}
        }))
        .unwrap();

        let ProtocolMessage::Request(request) = msg else {
            panic!("expected a request");
        };
        assert_eq!(request.command, commands::DISCONNECT);
        let args: DisconnectArguments = serde_json::from_value(request.arguments.unwrap()).unwrap();
        assert!(args.forced_stop);
    }

    #[test]
    fn test_disconnect_defaults_to_unforced() {
        let args: DisconnectArguments = serde_json::from_value(json!({})).unwrap();
        assert!(!args.forced_stop);
    }

    #[test]
    fn test_error_response_shape() {
        let request = RequestMessage {
            seq: 7,
            command: "evaluate".to_string(),
            arguments: None,
        };
        let response = ResponseMessage::error(
            1,
            &request,
            DapErrorMessage {
                id: 1102,
                format: "Unsupported request 'evaluate'".to_string(),
                show_user: true,
            },
        );

        let value = serde_json::to_value(ProtocolMessage::Response(response)).unwrap();
        assert_eq!(value["type"], "response");
        assert_eq!(value["request_seq"], 7);
        assert_eq!(value["success"], false);
        assert_eq!(value["body"]["error"]["id"], 1102);
        assert_eq!(value["body"]["error"]["showUser"], true);
    }
}
