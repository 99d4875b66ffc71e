use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{AmbiencePlan, AnalyzeAction, Environment, FeedbackType, SafetyMode};

/// `{ success, data?, error?, timestamp }` wrapper used by the REST endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Splits the envelope into its payload or the server-provided error.
    pub fn into_result(self) -> Result<Option<T>, ErrorInfo> {
        if self.success {
            return Ok(self.data);
        }
        Err(self.error.unwrap_or_else(|| ErrorInfo {
            code: "UNKNOWN".to_string(),
            message: "request failed without error details".to_string(),
            details: None,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub session_id: String,
    pub environment: Environment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Map<String, Value>>,
    #[serde(default, rename = "async", skip_serializing_if = "Option::is_none")]
    pub run_async: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsageInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionInfo {
    pub tool_name: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub action: AnalyzeAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<AmbiencePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsageInfo>,
    #[serde(default)]
    pub tool_executions: Vec<ToolExecutionInfo>,
    #[serde(default)]
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeStatus {
    pub session_id: String,
    pub agent_running: bool,
    pub current_safety_mode: SafetyMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_plan: Option<AmbiencePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_environment: Option<Environment>,
    #[serde(default)]
    pub last_update_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub session_id: String,
    pub plan_id: String,
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateEnvRequest {
    pub description: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AnalyzeResponse, ApiResponse, FeedbackRequest, VibeStatus};
    use crate::models::{AnalyzeAction, FeedbackType, SafetyMode};

    #[test]
    fn envelope_success_yields_data() -> anyhow::Result<()> {
        let envelope: ApiResponse<VibeStatus> = serde_json::from_value(json!({
            "success": true,
            "data": {
                "sessionId": "session-1",
                "agentRunning": false,
                "currentSafetyMode": "L2_FOCUS",
                "lastUpdateTime": "2026-01-01T00:00:00Z"
            },
            "timestamp": "2026-01-01T00:00:00Z"
        }))?;
        let status = envelope.into_result().ok().flatten().expect("status data");
        assert_eq!(status.current_safety_mode, SafetyMode::L2Focus);
        assert!(status.current_plan.is_none());
        Ok(())
    }

    #[test]
    fn envelope_failure_yields_error_info() -> anyhow::Result<()> {
        let envelope: ApiResponse<AnalyzeResponse> = serde_json::from_value(json!({
            "success": false,
            "error": {"code": "AGENT_BUSY", "message": "agent is busy"},
            "timestamp": "2026-01-01T00:00:00Z"
        }))?;
        let err = envelope.into_result().err().expect("error info");
        assert_eq!(err.code, "AGENT_BUSY");
        assert_eq!(err.message, "agent is busy");
        Ok(())
    }

    #[test]
    fn envelope_without_data_for_unit_payloads() -> anyhow::Result<()> {
        let envelope: ApiResponse<serde_json::Value> =
            serde_json::from_value(json!({"success": true, "timestamp": "t"}))?;
        assert_eq!(envelope.into_result().ok(), Some(None));
        Ok(())
    }

    #[test]
    fn analyze_response_no_action_has_no_plan() -> anyhow::Result<()> {
        let response: AnalyzeResponse = serde_json::from_value(json!({
            "action": "NO_ACTION",
            "message": "nothing changed",
            "processingTimeMs": 12
        }))?;
        assert_eq!(response.action, AnalyzeAction::NoAction);
        assert!(response.plan.is_none());
        assert!(response.tool_executions.is_empty());
        Ok(())
    }

    #[test]
    fn feedback_request_uses_type_key() -> anyhow::Result<()> {
        let request = FeedbackRequest {
            session_id: "s".to_string(),
            plan_id: "p".to_string(),
            feedback_type: FeedbackType::Dislike,
            comment: Some("too bright".to_string()),
        };
        let value = serde_json::to_value(&request)?;
        assert_eq!(value["type"], json!("DISLIKE"));
        assert_eq!(value["planId"], json!("p"));
        Ok(())
    }
}
