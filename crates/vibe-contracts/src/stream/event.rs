use serde::Deserialize;
use serde_json::Value;

use super::decoder::Frame;
use crate::models::AmbiencePlan;

/// Transport error code for a non-2xx response.
pub const HTTP_ERROR: &str = "HTTP_ERROR";
/// Transport error code for connect/read failures.
pub const STREAM_ERROR: &str = "STREAM_ERROR";

/// Typed event of the analyze stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token {
        text: String,
    },
    ToolStart {
        tool_name: String,
        input: Value,
    },
    ToolEnd {
        tool_name: String,
        result: String,
        duration_ms: u64,
    },
    Complete {
        plan: Option<AmbiencePlan>,
        processing_time_ms: u64,
    },
    Error {
        code: String,
        message: String,
    },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Token { .. } => "token",
            StreamEvent::ToolStart { .. } => "tool_start",
            StreamEvent::ToolEnd { .. } => "tool_end",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Stream is over once one of these has been dispatched.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }

    pub fn transport_error(code: &str, message: impl Into<String>) -> Self {
        StreamEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Decodes a frame. `Ok(None)` means the event type is not part of this stream.
    pub fn parse(frame: &Frame) -> serde_json::Result<Option<Self>> {
        let event = match frame.event.as_str() {
            "token" => {
                let payload: TokenPayload = serde_json::from_str(&frame.data)?;
                StreamEvent::Token { text: payload.text }
            }
            "tool_start" => {
                let payload: ToolStartPayload = serde_json::from_str(&frame.data)?;
                StreamEvent::ToolStart {
                    tool_name: payload.tool_name,
                    input: payload.input,
                }
            }
            "tool_end" => {
                let payload: ToolEndPayload = serde_json::from_str(&frame.data)?;
                StreamEvent::ToolEnd {
                    tool_name: payload.tool_name,
                    result: result_text(payload.result),
                    duration_ms: payload.duration_ms,
                }
            }
            "complete" => {
                let payload: CompletePayload = serde_json::from_str(&frame.data)?;
                StreamEvent::Complete {
                    plan: payload.plan,
                    processing_time_ms: payload.processing_time_ms,
                }
            }
            "error" => {
                let payload: ErrorPayload = serde_json::from_str(&frame.data)?;
                StreamEvent::Error {
                    code: payload.code,
                    message: payload.message,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Like [`StreamEvent::parse`], but logs and drops bad or unknown frames.
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        match Self::parse(frame) {
            Ok(Some(event)) => Some(event),
            Ok(None) => {
                log::debug!("ignoring stream event '{}'", frame.event);
                None
            }
            Err(err) => {
                log::warn!(
                    "failed to parse stream data for '{}': {err}",
                    frame.event
                );
                None
            }
        }
    }
}

fn result_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct TokenPayload {
    #[serde(alias = "content")]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolStartPayload {
    tool_name: String,
    #[serde(default)]
    input: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolEndPayload {
    tool_name: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletePayload {
    #[serde(default)]
    plan: Option<AmbiencePlan>,
    #[serde(default)]
    processing_time_ms: u64,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}
