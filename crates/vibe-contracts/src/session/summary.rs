use std::path::Path;

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{SafetyMode, StepKind, ThinkingStep};

/// Closing record of one analysis, written as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub total_steps: u64,
    /// Tool name to invocation count, in first-seen order.
    pub tool_calls: IndexMap<String, u64>,
    pub safety_mode: SafetyMode,
    pub plan_id: Option<String>,
    pub error: Option<String>,
}

impl SessionSummary {
    pub fn from_steps(
        session_id: &str,
        started_at: &str,
        steps: &[ThinkingStep],
        safety_mode: SafetyMode,
    ) -> Self {
        let mut tool_calls: IndexMap<String, u64> = IndexMap::new();
        for step in steps.iter().filter(|step| step.kind == StepKind::ToolStart) {
            if let Some(name) = &step.tool_name {
                *tool_calls.entry(name.clone()).or_insert(0) += 1;
            }
        }
        let error = steps
            .iter()
            .rev()
            .find(|step| step.kind == StepKind::Error)
            .map(|step| step.content.clone());
        Self {
            session_id: session_id.to_string(),
            started_at: started_at.to_string(),
            finished_at: now_utc_iso(),
            total_steps: steps.len() as u64,
            tool_calls,
            safety_mode,
            plan_id: None,
            error,
        }
    }
}

pub fn write_summary(
    path: &Path,
    summary: &SessionSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
