use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const DEFAULT_TTS_BASE: &str = "http://localhost:3002";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoints and HTTP limits shared by every client in the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub api_base: String,
    pub tts_base: String,
    /// Bounds plain request/response calls; streaming calls only use it to connect.
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            tts_base: DEFAULT_TTS_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    /// Reads `VIBE_API_BASE`, `VIBE_TTS_BASE` and `VIBE_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base) = lookup("VIBE_API_BASE") {
            config = config.with_api_base(&base);
        }
        if let Some(base) = lookup("VIBE_TTS_BASE") {
            config = config.with_tts_base(&base);
        }
        if let Some(raw) = lookup("VIBE_HTTP_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => log::warn!("ignoring VIBE_HTTP_TIMEOUT_SECS={raw:?}"),
            }
        }
        config
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        if let Some(base) = normalize_base(base) {
            self.api_base = base;
        }
        self
    }

    pub fn with_tts_base(mut self, base: &str) -> Self {
        if let Some(base) = normalize_base(base) {
            self.tts_base = base;
        }
        self
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    pub fn tts_url(&self, path: &str) -> String {
        format!("{}{}", self.tts_base, path)
    }

    pub(crate) fn http_client(&self) -> Result<HttpClient> {
        HttpClient::builder()
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .build()
            .context("failed building HTTP client")
    }

    /// Client for long-lived bodies: no overall deadline, only a connect timeout.
    pub(crate) fn streaming_client(&self) -> Result<HttpClient> {
        HttpClient::builder()
            .connect_timeout(self.timeout)
            .timeout(None::<Duration>)
            .build()
            .context("failed building streaming HTTP client")
    }
}

fn normalize_base(value: &str) -> Option<String> {
    Some(value.trim().trim_end_matches('/').to_string()).filter(|value| !value.is_empty())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
