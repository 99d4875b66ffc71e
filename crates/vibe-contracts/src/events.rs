use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::models::ThinkingStep;

pub type EventPayload = Map<String, Value>;

/// Append-only `events.jsonl` log for one analysis session.
///
/// Every line carries `type`, `session_id` and `ts`; the caller payload is
/// merged last and may override them. Clones share the same file lock.
#[derive(Debug, Clone)]
pub struct SessionLog {
    inner: Arc<SessionLogInner>,
}

#[derive(Debug)]
struct SessionLogInner {
    path: PathBuf,
    session_id: Mutex<String>,
    lock: Mutex<()>,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SessionLogInner {
                path: path.into(),
                session_id: Mutex::new(session_id.into()),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> String {
        self.inner
            .session_id
            .lock()
            .map(|id| id.clone())
            .unwrap_or_default()
    }

    /// Subsequent lines are stamped with `session_id`.
    pub fn rotate(&self, session_id: &str) {
        if let Ok(mut current) = self.inner.session_id.lock() {
            *current = session_id.to_string();
        }
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert("session_id".to_string(), Value::String(self.session_id()));
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            event.insert(key, value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("session log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }

    /// Writes a thinking step as a `step_<kind>` line.
    pub fn record_step(&self, step: &ThinkingStep) -> anyhow::Result<Value> {
        let mut payload = EventPayload::new();
        payload.insert("content".to_string(), Value::String(step.content.clone()));
        if let Some(tool_name) = &step.tool_name {
            payload.insert("tool_name".to_string(), Value::String(tool_name.clone()));
        }
        if let Some(input) = &step.tool_input {
            payload.insert("tool_input".to_string(), input.clone());
        }
        if let Some(output) = &step.tool_output {
            payload.insert("tool_output".to_string(), Value::String(output.clone()));
        }
        self.emit(&format!("step_{}", step.kind.as_str()), payload)
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;

    use super::*;
    use crate::models::StepKind;

    #[test]
    fn emit_writes_compact_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let log = SessionLog::new(&path, "session-123");

        let mut payload = EventPayload::new();
        payload.insert("speed".to_string(), Value::from(72));
        let emitted = log.emit("environment_set", payload)?;

        let content = fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or("");
        let parsed: Value = serde_json::from_str(line)?;

        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], Value::String("environment_set".to_string()));
        assert_eq!(parsed["session_id"], Value::String("session-123".to_string()));
        assert_eq!(parsed["speed"], Value::from(72));

        let ts = parsed["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn record_step_appends_in_order_and_follows_rotation() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let log = SessionLog::new(&path, "session-a");

        let mut step = ThinkingStep::new(StepKind::ToolStart, "calling setLight");
        step.tool_name = Some("setLight".to_string());
        log.record_step(&step)?;
        log.rotate("session-b");
        log.record_step(&ThinkingStep::new(StepKind::Complete, "done"))?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], Value::String("step_tool_start".to_string()));
        assert_eq!(lines[0]["tool_name"], Value::String("setLight".to_string()));
        assert_eq!(lines[0]["session_id"], Value::String("session-a".to_string()));
        assert_eq!(lines[1]["type"], Value::String("step_complete".to_string()));
        assert_eq!(lines[1]["session_id"], Value::String("session-b".to_string()));
        Ok(())
    }
}
