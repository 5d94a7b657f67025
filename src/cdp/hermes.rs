//! Hermes message handler
//!
//! Hermes speaks a subset of CDP. The rewrites here cover the gaps the
//! JS debugger trips over:
//! - no column breakpoints: `columnNumber` is dropped from `Debugger.setBreakpoint`
//! - `Runtime.callFunctionOn` replies are unusable, so the proxy answers itself
//! - paused events carry native frames without a script
//! - function property descriptors have no `description`

use serde_json::{json, Value};

use super::handler::{methods, MessageHandler, ProcessedMessage};
use super::message::{Command, ProtocolMessage, SuccessReply};

/// scriptId Hermes reports for frames that have no script
pub const NO_SCRIPT_ID: &str = "4294967295";

/// functionName Hermes reports for native frames
pub const NATIVE_FUNCTION_NAME: &str = "(native)";

/// Placeholder shown by the IDE for function previews
pub const FUNCTION_DESCRIPTION_PLACEHOLDER: &str = "function() { … }";

#[derive(Debug, Default)]
pub struct HermesHandler;

impl MessageHandler for HermesHandler {
    fn process_debugger_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        let mut cmd = match message {
            ProtocolMessage::Command(cmd) => cmd,
            other => return ProcessedMessage::forward(other),
        };

        match cmd.method.as_str() {
            methods::DEBUGGER_SET_BREAKPOINT => {
                strip_breakpoint_column(&mut cmd);
                ProcessedMessage::forward(cmd.into())
            }
            methods::RUNTIME_CALL_FUNCTION_ON => match echo_object_id(&cmd) {
                Some(reply) => {
                    tracing::trace!(id = reply.id, "Answering Runtime.callFunctionOn locally");
                    ProcessedMessage::reply(reply.into())
                }
                None => ProcessedMessage::forward(cmd.into()),
            },
            _ => ProcessedMessage::forward(cmd.into()),
        }
    }

    fn process_application_message(&mut self, message: ProtocolMessage) -> ProcessedMessage {
        match message {
            ProtocolMessage::Command(mut cmd) if cmd.method == methods::DEBUGGER_PAUSED => {
                filter_native_frames(&mut cmd);
                ProcessedMessage::forward(cmd.into())
            }
            ProtocolMessage::SuccessReply(mut reply) => {
                describe_functions(&mut reply.result);
                ProcessedMessage::forward(reply.into())
            }
            other => ProcessedMessage::forward(other),
        }
    }
}

fn strip_breakpoint_column(cmd: &mut Command) {
    if let Some(location) = cmd
        .params
        .as_mut()
        .and_then(|params| params.get_mut("location"))
        .and_then(Value::as_object_mut)
    {
        location.remove("columnNumber");
    }
}

/// Build `{result: {result: {objectId}}, id}` for a callFunctionOn command
fn echo_object_id(cmd: &Command) -> Option<SuccessReply> {
    let id = cmd.id?;
    let mut inner = serde_json::Map::new();
    if let Some(object_id) = cmd.params.as_ref().and_then(|p| p.get("objectId")) {
        inner.insert("objectId".to_string(), object_id.clone());
    }
    Some(SuccessReply::new(id, json!({ "result": inner })))
}

fn filter_native_frames(cmd: &mut Command) {
    let Some(frames) = cmd
        .params
        .as_mut()
        .and_then(|params| params.get_mut("callFrames"))
        .and_then(Value::as_array_mut)
    else {
        return;
    };

    let before = frames.len();
    frames.retain(|frame| !is_native_frame(frame));
    if frames.len() != before {
        tracing::trace!(removed = before - frames.len(), "Filtered native Hermes frames");
    }
}

fn is_native_frame(frame: &Value) -> bool {
    let native_name = frame.get("functionName").and_then(Value::as_str) == Some(NATIVE_FUNCTION_NAME);
    let no_script = frame
        .get("location")
        .and_then(|l| l.get("scriptId"))
        .and_then(Value::as_str)
        == Some(NO_SCRIPT_ID);
    native_name || no_script
}

/// Give function property descriptors in `result.result` a description
fn describe_functions(result: &mut Value) {
    let Some(descriptors) = result.get_mut("result").and_then(Value::as_array_mut) else {
        return;
    };

    for descriptor in descriptors {
        let Some(value) = descriptor.get_mut("value").and_then(Value::as_object_mut) else {
            continue;
        };
        let is_function = value.get("type").and_then(Value::as_str) == Some("function");
        if is_function && !value.contains_key("description") {
            value.insert(
                "description".to_string(),
                Value::String(FUNCTION_DESCRIPTION_PLACEHOLDER.to_string()),
            );
        }
    }
}
