use anyhow::{Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use vibe_contracts::api::{
    AnalyzeRequest, AnalyzeResponse, ApiResponse, FeedbackRequest, GenerateEnvRequest, VibeStatus,
};
use vibe_contracts::models::{Environment, ScenarioType};

use crate::config::EngineConfig;
use crate::error::ApiError;

/// Request/response client for the `/api/vibe` REST endpoints.
#[derive(Debug, Clone)]
pub struct VibeApi {
    config: EngineConfig,
    http: HttpClient,
}

impl VibeApi {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let http = config.http_client()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let url = self.config.api_url("/api/vibe/analyze");
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .with_context(|| format!("analyze request failed ({url})"))?;
        read_envelope::<AnalyzeResponse>(response, &url)?.ok_or_else(|| ApiError::MissingData.into())
    }

    pub fn status(&self, session_id: &str) -> Result<VibeStatus> {
        let url = self.config.api_url("/api/vibe/status");
        let response = self
            .http
            .get(&url)
            .query(&[("sessionId", session_id)])
            .send()
            .with_context(|| format!("status request failed ({url})"))?;
        read_envelope::<VibeStatus>(response, &url)?.ok_or_else(|| ApiError::MissingData.into())
    }

    pub fn feedback(&self, request: &FeedbackRequest) -> Result<()> {
        let url = self.config.api_url("/api/vibe/feedback");
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .with_context(|| format!("feedback request failed ({url})"))?;
        read_envelope::<Value>(response, &url)?;
        Ok(())
    }

    /// Simulated environment for a named scenario; the body is not enveloped.
    pub fn scenario(&self, scenario: ScenarioType) -> Result<Environment> {
        let url = self.config.api_url("/api/vibe/simulator/scenario");
        let response = self
            .http
            .get(&url)
            .query(&[("type", scenario.as_str())])
            .send()
            .with_context(|| format!("scenario request failed ({url})"))?;
        read_raw(response, &url)
    }

    /// Environment synthesised from a free-text description; not enveloped.
    pub fn generate_environment(&self, description: &str) -> Result<Environment> {
        let url = self.config.api_url("/api/vibe/environment/generate");
        let response = self
            .http
            .post(&url)
            .json(&GenerateEnvRequest {
                description: description.to_string(),
            })
            .send()
            .with_context(|| format!("environment generation failed ({url})"))?;
        read_raw(response, &url)
    }

    pub fn sync_environment(&self, session_id: &str, environment: &Environment) -> Result<()> {
        let url = self.config.api_url("/api/vibe/environment/sync");
        let response = self
            .http
            .post(&url)
            .query(&[("sessionId", session_id)])
            .json(environment)
            .send()
            .with_context(|| format!("environment sync failed ({url})"))?;
        read_envelope::<Value>(response, &url)?;
        Ok(())
    }
}

fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body: truncate_text(&body, 512),
    }
    .into())
}

fn read_envelope<T: DeserializeOwned>(response: HttpResponse, url: &str) -> Result<Option<T>> {
    let envelope: ApiResponse<T> = check_status(response)?
        .json()
        .with_context(|| format!("failed parsing response envelope ({url})"))?;
    envelope
        .into_result()
        .map_err(|info| anyhow::Error::new(ApiError::from(info)))
}

fn read_raw<T: DeserializeOwned>(response: HttpResponse, url: &str) -> Result<T> {
    check_status(response)?
        .json()
        .with_context(|| format!("failed parsing response body ({url})"))
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use vibe_contracts::api::{AnalyzeRequest, FeedbackRequest};
    use vibe_contracts::models::{
        AnalyzeAction, Environment, FeedbackType, SafetyMode, ScenarioType, TimeOfDay,
    };

    use super::{truncate_text, VibeApi};
    use crate::config::EngineConfig;
    use crate::error::ApiError;
    use crate::test_support::{Fixture, Reply};

    fn api_for(base: &str) -> anyhow::Result<VibeApi> {
        VibeApi::new(EngineConfig::default().with_api_base(base))
    }

    #[test]
    fn analyze_unwraps_envelope() -> anyhow::Result<()> {
        let body = json!({
            "success": true,
            "data": {
                "action": "APPLY",
                "plan": {"id": "plan-7", "light": {"color": {"hex": "#112233"}, "brightness": 40}},
                "toolExecutions": [],
                "processingTimeMs": 812
            },
            "timestamp": "2026-01-01T00:00:00Z"
        });
        let fixture = Fixture::serve(vec![Reply::json(200, &body.to_string())])?;
        let api = api_for(&fixture.base)?;

        let response = api.analyze(&AnalyzeRequest {
            session_id: "s-1".to_string(),
            environment: Environment::default(),
            preferences: None,
            run_async: None,
        })?;
        assert_eq!(response.action, AnalyzeAction::Apply);
        assert_eq!(response.processing_time_ms, 812);
        let plan = response.plan.expect("plan");
        assert_eq!(plan.id.as_deref(), Some("plan-7"));

        let requests = fixture.requests();
        assert_eq!(requests[0].target, "/api/vibe/analyze");
        let sent: Value = serde_json::from_str(&requests[0].body)?;
        assert_eq!(sent["sessionId"], json!("s-1"));
        assert_eq!(sent["environment"]["timeOfDay"], json!("NOON"));
        Ok(())
    }

    #[test]
    fn envelope_failure_surfaces_server_code() -> anyhow::Result<()> {
        let body = json!({
            "success": false,
            "error": {"code": "AGENT_BUSY", "message": "analysis already running"}
        });
        let fixture = Fixture::serve(vec![Reply::json(200, &body.to_string())])?;
        let api = api_for(&fixture.base)?;

        let err = api
            .status("s-2")
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected envelope failure"))?;
        let api_err = err
            .downcast_ref::<ApiError>()
            .ok_or_else(|| anyhow::anyhow!("not an ApiError: {err:#}"))?;
        assert_eq!(api_err.code(), Some("AGENT_BUSY"));
        assert_eq!(api_err.to_string(), "AGENT_BUSY: analysis already running");
        assert_eq!(fixture.requests()[0].target, "/api/vibe/status?sessionId=s-2");
        Ok(())
    }

    #[test]
    fn status_reads_safety_mode() -> anyhow::Result<()> {
        let body = json!({
            "success": true,
            "data": {"sessionId": "s-3", "agentRunning": false, "currentSafetyMode": "L2_FOCUS"}
        });
        let fixture = Fixture::serve(vec![Reply::json(200, &body.to_string())])?;
        let status = api_for(&fixture.base)?.status("s-3")?;
        assert_eq!(status.current_safety_mode, SafetyMode::L2Focus);
        assert!(status.current_plan.is_none());
        Ok(())
    }

    #[test]
    fn scenario_reads_raw_environment() -> anyhow::Result<()> {
        let mut environment = Environment::default();
        environment.time_of_day = TimeOfDay::Midnight;
        environment.speed = 45.0;
        let fixture = Fixture::serve(vec![Reply::json(
            200,
            &serde_json::to_string(&environment)?,
        )])?;

        let fetched = api_for(&fixture.base)?.scenario(ScenarioType::LateNightReturn)?;
        assert_eq!(fetched.time_of_day, TimeOfDay::Midnight);
        assert_eq!(fetched.speed, 45.0);
        assert_eq!(
            fixture.requests()[0].target,
            "/api/vibe/simulator/scenario?type=LATE_NIGHT_RETURN"
        );
        Ok(())
    }

    #[test]
    fn http_status_error_carries_body() -> anyhow::Result<()> {
        let fixture = Fixture::serve(vec![
            Reply::json(500, "{\"message\":\"boom\"}"),
            Reply::json(200, "{\"success\":true,\"data\":null}"),
        ])?;
        let api = api_for(&fixture.base)?;

        let err = api
            .generate_environment("rainy night, tired driver")
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected status failure"))?;
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Status { status, body }) => {
                assert_eq!(*status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        api.feedback(&FeedbackRequest {
            session_id: "s-4".to_string(),
            plan_id: "plan-1".to_string(),
            feedback_type: FeedbackType::Like,
            comment: None,
        })?;
        let requests = fixture.requests();
        let generate: Value = serde_json::from_str(&requests[0].body)?;
        assert_eq!(generate["description"], json!("rainy night, tired driver"));
        let feedback: Value = serde_json::from_str(&requests[1].body)?;
        assert_eq!(feedback["type"], json!("LIKE"));
        Ok(())
    }

    #[test]
    fn truncate_text_marks_cut() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
    }
}
