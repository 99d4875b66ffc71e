use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use reqwest::blocking::Client as HttpClient;
use vibe_contracts::stream::VibeNotice;

use crate::client::{pump, spawn_reader, PumpEnd, StreamGate, StreamOutcome};
use crate::config::EngineConfig;
use crate::error::ApiError;

const EVENTS_PATH: &str = "/api/vibe/events";

/// Subscription to the per-session `vibe_*` notice feed.
pub struct VibeEventFeed {
    config: EngineConfig,
    http: HttpClient,
    active: Mutex<Option<Arc<StreamGate>>>,
}

impl VibeEventFeed {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let http = config.streaming_client()?;
        Ok(Self {
            config,
            http,
            active: Mutex::new(None),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.active
            .lock()
            .map(|active| active.is_some())
            .unwrap_or(false)
    }

    /// Blocks dispatching notices until the server hangs up or the feed is
    /// disconnected. Transport failures are returned rather than dispatched.
    pub fn connect<F>(
        &self,
        session_id: &str,
        topics: &[String],
        mut handler: F,
    ) -> Result<StreamOutcome>
    where
        F: FnMut(VibeNotice),
    {
        let url = self.config.api_url(EVENTS_PATH);
        let mut query = vec![("sessionId".to_string(), session_id.to_string())];
        query.extend(
            topics
                .iter()
                .map(|topic| ("topics".to_string(), topic.clone())),
        );
        let builder = self.http.get(&url).query(&query);

        let (gate, signals) = StreamGate::open();
        let previous = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.replace(gate.clone()));
        if let Some(previous) = previous {
            previous.close();
        }
        log::info!("subscribing to vibe events (session {session_id})");

        spawn_reader(builder, gate.clone());
        let end = pump(&gate, &signals, VibeNotice::from_frame, |notice| {
            handler(notice);
            None::<()>
        });
        if let Ok(mut active) = self.active.lock() {
            if active
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &gate))
            {
                *active = None;
            }
        }

        match end {
            PumpEnd::Eof | PumpEnd::Stopped(()) => Ok(StreamOutcome::Ended),
            PumpEnd::Cancelled => Ok(StreamOutcome::Cancelled),
            PumpEnd::Status(status) => Err(ApiError::Status {
                status,
                body: String::new(),
            }
            .into()),
            PumpEnd::Failed(message) => Err(anyhow!("vibe event feed failed ({url}): {message}")),
        }
    }

    pub fn disconnect(&self) {
        let previous = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.take());
        if let Some(gate) = previous {
            gate.close();
            log::info!("vibe event feed disconnected");
        }
    }
}
