use serde::Deserialize;
use serde_json::Value;

use super::decoder::Frame;

/// Named event pushed on the per-session event feed.
#[derive(Debug, Clone, PartialEq)]
pub enum VibeNotice {
    ToolStart {
        task_id: String,
        tool_name: String,
        input: Value,
    },
    ToolEnd {
        task_id: String,
        tool_name: String,
        result: String,
    },
    Complete {
        task_id: String,
        plan: Value,
    },
    Error {
        task_id: String,
        error: String,
    },
    Cancelled {
        task_id: String,
    },
}

impl VibeNotice {
    pub fn task_id(&self) -> &str {
        match self {
            VibeNotice::ToolStart { task_id, .. }
            | VibeNotice::ToolEnd { task_id, .. }
            | VibeNotice::Complete { task_id, .. }
            | VibeNotice::Error { task_id, .. }
            | VibeNotice::Cancelled { task_id } => task_id,
        }
    }

    /// Decodes a feed frame; heartbeats, unknown names and bad payloads yield `None`.
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        if frame.event == "heartbeat" {
            return None;
        }
        let payload: NoticePayload = match serde_json::from_str(&frame.data) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("failed to parse '{}' notice: {err}", frame.event);
                return None;
            }
        };
        let task_id = payload.task_id;
        let notice = match frame.event.as_str() {
            "vibe_tool_start" => VibeNotice::ToolStart {
                task_id,
                tool_name: payload.tool_name,
                input: payload.input,
            },
            "vibe_tool_end" => VibeNotice::ToolEnd {
                task_id,
                tool_name: payload.tool_name,
                result: match payload.result {
                    Value::String(text) => text,
                    Value::Null => String::new(),
                    other => other.to_string(),
                },
            },
            "vibe_complete" => VibeNotice::Complete {
                task_id,
                plan: payload.plan,
            },
            "vibe_error" => VibeNotice::Error {
                task_id,
                error: payload.error,
            },
            "vibe_cancelled" => VibeNotice::Cancelled { task_id },
            other => {
                log::debug!("ignoring feed event '{other}'");
                return None;
            }
        };
        Some(notice)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoticePayload {
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    tool_name: String,
    #[serde(default)]
    input: Value,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    plan: Value,
    #[serde(default)]
    error: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::VibeNotice;
    use crate::stream::FrameDecoder;

    #[test]
    fn feed_frames_decode_to_notices() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(
            b"event: heartbeat\ndata: {}\n\n\
event: vibe_tool_start\ndata: {\"taskId\":\"t1\",\"toolName\":\"setLight\",\"input\":{\"b\":1}}\n\n\
event: vibe_complete\ndata: {\"taskId\":\"t1\",\"plan\":{\"id\":\"p\"}}\n\n\
event: vibe_cancelled\ndata: {\"taskId\":\"t2\"}\n\n",
        );
        let notices: Vec<VibeNotice> = frames.iter().filter_map(VibeNotice::from_frame).collect();
        assert_eq!(notices.len(), 3);
        assert_eq!(
            notices[0],
            VibeNotice::ToolStart {
                task_id: "t1".to_string(),
                tool_name: "setLight".to_string(),
                input: json!({"b": 1}),
            }
        );
        assert_eq!(notices[1].task_id(), "t1");
        assert_eq!(
            notices[2],
            VibeNotice::Cancelled {
                task_id: "t2".to_string()
            }
        );
    }

    #[test]
    fn bad_notice_payload_is_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"event: vibe_error\ndata: oops\n");
        assert_eq!(frames.iter().filter_map(VibeNotice::from_frame).count(), 0);
    }
}
