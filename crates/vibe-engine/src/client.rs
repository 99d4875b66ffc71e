use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde_json::{json, Value};
use vibe_contracts::models::Environment;
use vibe_contracts::stream::{Frame, FrameDecoder, StreamEvent, HTTP_ERROR, STREAM_ERROR};

use crate::config::EngineConfig;

const ANALYZE_STREAM_PATH: &str = "/api/vibe/analyze/stream";
const CHAT_STREAM_PATH: &str = "/api/master/chat/stream";
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// One POST against a streaming endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    path: &'static str,
    query: Vec<(String, String)>,
    body: Value,
}

impl StreamRequest {
    /// `POST /api/vibe/analyze/stream?sessionId=` with the environment as body.
    pub fn analyze(session_id: &str, environment: &Environment) -> Result<Self> {
        Ok(Self {
            path: ANALYZE_STREAM_PATH,
            query: vec![("sessionId".to_string(), session_id.to_string())],
            body: serde_json::to_value(environment).context("failed encoding environment")?,
        })
    }

    /// `POST /api/master/chat/stream?sessionId=` with `{ message }`.
    pub fn chat(session_id: &str, message: &str) -> Self {
        Self {
            path: CHAT_STREAM_PATH,
            query: vec![("sessionId".to_string(), session_id.to_string())],
            body: json!({ "message": message }),
        }
    }

    pub fn with_preferences(mut self, preferences: &str) -> Self {
        if !preferences.trim().is_empty() {
            self.query
                .push(("preferences".to_string(), preferences.to_string()));
        }
        self
    }

    pub fn with_debug(mut self) -> Self {
        self.query.push(("debug".to_string(), "true".to_string()));
        self
    }

    pub fn path(&self) -> &str {
        self.path
    }
}

/// How a call to [`StreamClient::connect`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// A `complete` event was dispatched.
    Completed,
    /// An `error` event was dispatched, from the server or the transport.
    Failed,
    /// The body ended without a terminal event.
    Ended,
    /// `disconnect()` or a newer `connect()` took over.
    Cancelled,
}

/// Streaming analyze client; at most one stream is live per instance.
///
/// The body is read on a detached worker thread while `connect` dispatches on
/// the calling thread. Replacing or disconnecting a stream closes its gate:
/// once that returns, the old handler sees nothing further and the old
/// `connect` call returns [`StreamOutcome::Cancelled`] without an error event.
///
/// The worker drops the response as soon as it wakes on a closed gate: after
/// the request is sent, or after the next read returns. A read already blocked
/// on a silent server stays blocked until the server writes again (the
/// backend's heartbeat) or hangs up, since the streaming client has no read
/// timeout.
pub struct StreamClient {
    config: EngineConfig,
    http: HttpClient,
    active: Mutex<Option<Arc<StreamGate>>>,
}

impl StreamClient {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let http = config.streaming_client()?;
        Ok(Self {
            config,
            http,
            active: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.active
            .lock()
            .map(|active| active.is_some())
            .unwrap_or(false)
    }

    /// Streams `request`, handing every decoded event to `handler` in wire order.
    ///
    /// Blocks until the stream ends. `handler` must not call back into this
    /// client.
    pub fn connect<F>(&self, request: StreamRequest, mut handler: F) -> StreamOutcome
    where
        F: FnMut(StreamEvent),
    {
        let url = self.config.api_url(request.path);
        let builder = self
            .http
            .post(&url)
            .query(&request.query)
            .json(&request.body);

        let (gate, signals) = StreamGate::open();
        self.install(gate.clone());
        log::debug!("stream connecting ({url})");

        spawn_reader(builder, gate.clone());
        let outcome = pump(&gate, &signals, StreamEvent::from_frame, |event| {
            let terminal = match &event {
                StreamEvent::Complete { .. } => Some(StreamOutcome::Completed),
                StreamEvent::Error { .. } => Some(StreamOutcome::Failed),
                _ => None,
            };
            handler(event);
            terminal
        });

        let outcome = match outcome {
            PumpEnd::Stopped(outcome) => outcome,
            PumpEnd::Eof => StreamOutcome::Ended,
            PumpEnd::Cancelled => StreamOutcome::Cancelled,
            PumpEnd::Status(status) => {
                let event = StreamEvent::transport_error(HTTP_ERROR, format!("HTTP {status}"));
                gate.dispatch(|| handler(event))
                    .map_or(StreamOutcome::Cancelled, |_| StreamOutcome::Failed)
            }
            PumpEnd::Failed(message) => {
                let event = StreamEvent::transport_error(STREAM_ERROR, message);
                gate.dispatch(|| handler(event))
                    .map_or(StreamOutcome::Cancelled, |_| StreamOutcome::Failed)
            }
        };
        self.release(&gate);
        log::debug!("stream finished ({url}): {outcome:?}");
        outcome
    }

    /// Cancels the live stream, if any. Never produces an error event.
    pub fn disconnect(&self) {
        let previous = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.take());
        if let Some(gate) = previous {
            gate.close();
        }
    }

    fn install(&self, gate: Arc<StreamGate>) {
        let previous = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.replace(gate));
        if let Some(previous) = previous {
            log::info!("replacing active stream");
            previous.close();
        }
    }

    fn release(&self, gate: &Arc<StreamGate>) {
        if let Ok(mut active) = self.active.lock() {
            if active
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, gate))
            {
                *active = None;
            }
        }
    }
}

/// What the reader worker reports to the dispatching thread.
pub(crate) enum Signal {
    Chunk(Vec<u8>),
    Status(u16),
    Failed(String),
    Eof,
    Cancelled,
}

pub(crate) enum PumpEnd<T> {
    Stopped(T),
    Eof,
    Cancelled,
    Status(u16),
    Failed(String),
}

/// Dispatch permission shared between a stream and whoever may cancel it.
pub(crate) struct StreamGate {
    open: Mutex<bool>,
    waker: Mutex<Sender<Signal>>,
}

impl StreamGate {
    pub(crate) fn open() -> (Arc<Self>, Receiver<Signal>) {
        let (tx, rx) = mpsc::channel();
        let gate = Arc::new(Self {
            open: Mutex::new(true),
            waker: Mutex::new(tx),
        });
        (gate, rx)
    }

    pub(crate) fn waker(&self) -> Sender<Signal> {
        match self.waker.lock() {
            Ok(tx) => tx.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Blocks while a dispatch is in flight; afterwards none will start.
    pub(crate) fn close(&self) {
        match self.open.lock() {
            Ok(mut open) => *open = false,
            Err(poisoned) => *poisoned.into_inner() = false,
        }
        let _ = self.waker().send(Signal::Cancelled);
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.lock().map(|open| *open).unwrap_or(false)
    }

    /// Runs `f` unless the gate is closed; `None` means it was closed.
    pub(crate) fn dispatch<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let open = self.open.lock().ok()?;
        if !*open {
            return None;
        }
        let result = f();
        drop(open);
        Some(result)
    }
}

/// Sends the request and forwards body chunks until EOF, failure, hang-up or
/// the gate closing.
pub(crate) fn spawn_reader(builder: RequestBuilder, gate: Arc<StreamGate>) {
    let tx = gate.waker();
    thread::spawn(move || {
        let mut response = match builder.send() {
            Ok(response) => response,
            Err(err) => {
                let _ = tx.send(Signal::Failed(error_text(&err)));
                return;
            }
        };
        if !gate.is_open() {
            log::debug!("stream closed before the response arrived");
            return;
        }
        let status = response.status();
        if !status.is_success() {
            let _ = tx.send(Signal::Status(status.as_u16()));
            return;
        }
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let read = response.read(&mut buf);
            if !gate.is_open() {
                log::debug!("dropping response of a closed stream");
                return;
            }
            let signal = match read {
                Ok(0) => Signal::Eof,
                Ok(n) => Signal::Chunk(buf[..n].to_vec()),
                Err(err) => Signal::Failed(err.to_string()),
            };
            let last = !matches!(signal, Signal::Chunk(_));
            if tx.send(signal).is_err() || last {
                return;
            }
        }
    });
}

/// Decodes chunks into frames and dispatches them through the gate.
///
/// `on_event` returns `Some` to stop early after a terminal event.
pub(crate) fn pump<E, T>(
    gate: &StreamGate,
    signals: &Receiver<Signal>,
    decode: fn(&Frame) -> Option<E>,
    mut on_event: impl FnMut(E) -> Option<T>,
) -> PumpEnd<T> {
    let mut decoder = FrameDecoder::new();
    loop {
        let (frames, eof) = match signals.recv() {
            Ok(Signal::Chunk(bytes)) => (decoder.push(&bytes), false),
            Ok(Signal::Eof) => (decoder.finish(), true),
            Ok(Signal::Status(status)) => return PumpEnd::Status(status),
            Ok(Signal::Failed(message)) => return PumpEnd::Failed(message),
            Ok(Signal::Cancelled) | Err(_) => return PumpEnd::Cancelled,
        };
        for frame in frames {
            let Some(event) = decode(&frame) else {
                continue;
            };
            match gate.dispatch(|| on_event(event)) {
                None => return PumpEnd::Cancelled,
                Some(Some(stop)) => return PumpEnd::Stopped(stop),
                Some(None) => {}
            }
        }
        if eof {
            return PumpEnd::Eof;
        }
    }
}

fn error_text(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
