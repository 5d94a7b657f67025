//! CDP message types
//!
//! Only the envelope is typed. Payloads (`params`, `result`, `error`) stay
//! as JSON values because the proxy forwards them untouched except for the
//! few fields the message handlers rewrite. Unknown top-level fields such
//! as `sessionId` ride along in `extra` and are written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::{Error, Result};

/// Correlation id of a command and its reply
pub type MessageId = u64;

/// Command or event: anything carrying a `method`
///
/// Events are commands without an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Successful reply to a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessReply {
    pub id: MessageId,
    pub result: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Failed reply to a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub id: MessageId,
    pub error: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One frame of CDP traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtocolMessage {
    Command(Command),
    SuccessReply(SuccessReply),
    ErrorReply(ErrorReply),
}

impl Command {
    /// Create a command with an id
    pub fn new(id: MessageId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id),
            method: method.into(),
            params,
            extra: Map::new(),
        }
    }

    /// Create an event (no id)
    pub fn event(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params,
            extra: Map::new(),
        }
    }

    pub fn is_event(&self) -> bool {
        self.id.is_none()
    }
}

impl SuccessReply {
    pub fn new(id: MessageId, result: Value) -> Self {
        Self {
            id,
            result,
            extra: Map::new(),
        }
    }
}

impl ProtocolMessage {
    /// Decode a text frame
    pub fn from_text(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(Error::MalformedMessage(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|_| {
            Error::MalformedMessage("not a command, event or reply".to_string())
        })
    }

    /// Encode as a text frame
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Command/reply id, if any
    pub fn id(&self) -> Option<MessageId> {
        match self {
            Self::Command(cmd) => cmd.id,
            Self::SuccessReply(reply) => Some(reply.id),
            Self::ErrorReply(reply) => Some(reply.id),
        }
    }

    /// Method name for commands and events
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Command(cmd) => Some(&cmd.method),
            _ => None,
        }
    }

    pub fn is_reply(&self) -> bool {
        !matches!(self, Self::Command(_))
    }
}

impl From<Command> for ProtocolMessage {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}

impl From<SuccessReply> for ProtocolMessage {
    fn from(reply: SuccessReply) -> Self {
        Self::SuccessReply(reply)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classifies_frames() {
        let cmd = ProtocolMessage::from_text(r#"{"id":1,"method":"Debugger.enable"}"#).unwrap();
        assert_eq!(cmd.method(), Some("Debugger.enable"));
        assert_eq!(cmd.id(), Some(1));

        let event =
            ProtocolMessage::from_text(r#"{"method":"Debugger.resumed","params":{}}"#).unwrap();
        assert!(matches!(&event, ProtocolMessage::Command(c) if c.is_event()));

        let ok = ProtocolMessage::from_text(r#"{"id":2,"result":{"debuggerId":"x"}}"#).unwrap();
        assert!(matches!(ok, ProtocolMessage::SuccessReply(_)));

        let err =
            ProtocolMessage::from_text(r#"{"id":3,"error":{"code":-32601,"message":"nope"}}"#)
                .unwrap();
        assert!(matches!(err, ProtocolMessage::ErrorReply(_)));
        assert!(err.is_reply());
    }

    #[test]
    fn test_preserves_unknown_fields() {
        let text = r#"{"id":7,"method":"Runtime.evaluate","params":{"expression":"1"},"sessionId":"abc"}"#;
        let msg = ProtocolMessage::from_text(text).unwrap();
        let back: Value = serde_json::from_str(&msg.to_text().unwrap()).unwrap();
        assert_eq!(
            back,
            json!({"id":7,"method":"Runtime.evaluate","params":{"expression":"1"},"sessionId":"abc"})
        );
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert!(matches!(
            ProtocolMessage::from_text("[1,2]"),
            Err(Error::MalformedMessage(_))
        ));
        assert!(matches!(
            ProtocolMessage::from_text(r#"{"foo":1}"#),
            Err(Error::MalformedMessage(_))
        ));
        assert!(matches!(
            ProtocolMessage::from_text("{not json"),
            Err(Error::Json(_))
        ));
    }
}
