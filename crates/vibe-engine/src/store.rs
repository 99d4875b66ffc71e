use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Result};
use serde_json::Value;
use vibe_contracts::api::{AnalyzeRequest, AnalyzeResponse, FeedbackRequest};
use vibe_contracts::events::SessionLog;
use vibe_contracts::models::{
    AmbiencePlan, ChatMessage, ChatRole, Environment, EnvironmentPatch, FeedbackType, PlanField,
    PlayResult, SafetyMode, ScenarioType, StepKind, ThinkingStep, ToolCall,
    DEFAULT_NARRATIVE_VOLUME,
};
use vibe_contracts::session::generate_session_id;
use vibe_contracts::stream::StreamEvent;

use crate::api::VibeApi;
use crate::audio::{Playback, Speech};
use crate::client::{StreamClient, StreamOutcome, StreamRequest};
use crate::config::EngineConfig;
use crate::error::ApiError;

pub const MISSING_ENVIRONMENT: &str = "set the driving environment first";
pub const ANALYSIS_COMPLETE: &str = "Analysis complete";
pub const SILENCED_COMPLETE: &str =
    "⚠️ L3 silent mode: speed too high, ambience recommendations skipped for driving safety";
const SAY_TOOL: &str = "say";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Notification sent to every [`VibeStore::watch`] receiver after a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Environment(Option<Environment>),
    /// A fresh snapshot; plans are never mutated in place.
    Plan(Option<Arc<AmbiencePlan>>),
    /// A step was appended, or the last thinking step grew.
    Step(ThinkingStep),
    StepsCleared,
    Error(Option<String>),
    AgentRunning(bool),
    Session(String),
    Playback { playing: bool, index: usize },
    Chat,
    Ui,
}

#[derive(Debug)]
struct StoreState {
    session_id: String,
    environment: Option<Environment>,
    plan: Option<Arc<AmbiencePlan>>,
    agent_running: bool,
    /// Bumped by every analysis start; only the newest run may end itself.
    run: u64,
    steps: Vec<ThinkingStep>,
    error: Option<String>,
    theme: Theme,
    demo_mode: bool,
    chain_expanded: bool,
    chat_messages: Vec<ChatMessage>,
    chat_panel_open: bool,
    chat_running: bool,
    is_playing: bool,
    /// Percent of the current track, 0-100.
    audio_progress: f64,
    playlist_index: usize,
}

impl StoreState {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            environment: None,
            plan: None,
            agent_running: false,
            run: 0,
            steps: Vec::new(),
            error: None,
            theme: Theme::Light,
            demo_mode: false,
            chain_expanded: false,
            chat_messages: Vec::new(),
            chat_panel_open: false,
            chat_running: false,
            is_playing: false,
            audio_progress: 0.0,
            playlist_index: 0,
        }
    }

    fn playlist_url(&self, index: usize) -> Option<String> {
        self.plan
            .as_ref()?
            .playlist
            .as_ref()?
            .songs
            .get(index)?
            .playable_url()
            .map(str::to_string)
    }

    fn playlist_len(&self) -> usize {
        self.plan
            .as_ref()
            .and_then(|plan| plan.playlist.as_ref())
            .map(|playlist| playlist.len())
            .unwrap_or(0)
    }
}

/// Shared state behind one driving session.
///
/// Holds the environment, the current plan, the visible thinking log and the
/// UI/session metadata, together with the clients and players that act on
/// them. Every mutation goes through a method here and is announced to
/// watchers as a [`StoreChange`].
pub struct VibeStore {
    state: Mutex<StoreState>,
    api: VibeApi,
    analysis: StreamClient,
    chat: StreamClient,
    playback: Mutex<Box<dyn Playback>>,
    speech: Mutex<Box<dyn Speech>>,
    watchers: Mutex<Vec<Sender<StoreChange>>>,
    log: Option<SessionLog>,
}

impl VibeStore {
    pub fn new(
        config: EngineConfig,
        playback: Box<dyn Playback>,
        speech: Box<dyn Speech>,
    ) -> Result<Self> {
        Ok(Self {
            state: Mutex::new(StoreState::new(generate_session_id())),
            api: VibeApi::new(config.clone())?,
            analysis: StreamClient::new(config.clone())?,
            chat: StreamClient::new(config)?,
            playback: Mutex::new(playback),
            speech: Mutex::new(speech),
            watchers: Mutex::new(Vec::new()),
            log: None,
        })
    }

    /// Mirrors every finished thinking step into `log`, stamped with this
    /// store's session id.
    pub fn with_session_log(mut self, log: SessionLog) -> Self {
        log.rotate(&self.session_id());
        self.log = Some(log);
        self
    }

    pub fn api(&self) -> &VibeApi {
        &self.api
    }

    pub fn watch(&self) -> Receiver<StoreChange> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.push(tx);
        }
        rx
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, change: StoreChange) {
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.retain(|watcher| watcher.send(change.clone()).is_ok());
        }
    }

    // ---- reads ----

    pub fn session_id(&self) -> String {
        self.state().session_id.clone()
    }

    pub fn environment(&self) -> Option<Environment> {
        self.state().environment.clone()
    }

    pub fn plan(&self) -> Option<Arc<AmbiencePlan>> {
        self.state().plan.clone()
    }

    pub fn has_active_plan(&self) -> bool {
        self.state().plan.is_some()
    }

    pub fn steps(&self) -> Vec<ThinkingStep> {
        self.state().steps.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn agent_running(&self) -> bool {
        self.state().agent_running
    }

    /// Derived from the current speed on every call; normal without an
    /// environment.
    pub fn safety_mode(&self) -> SafetyMode {
        self.state()
            .environment
            .as_ref()
            .map(Environment::safety_mode)
            .unwrap_or_default()
    }

    pub fn theme(&self) -> Theme {
        self.state().theme
    }

    pub fn demo_mode(&self) -> bool {
        self.state().demo_mode
    }

    pub fn chain_expanded(&self) -> bool {
        self.state().chain_expanded
    }

    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.state().chat_messages.clone()
    }

    pub fn chat_panel_open(&self) -> bool {
        self.state().chat_panel_open
    }

    pub fn chat_running(&self) -> bool {
        self.state().chat_running
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing
    }

    pub fn audio_progress(&self) -> f64 {
        self.state().audio_progress
    }

    pub fn playlist_index(&self) -> usize {
        self.state().playlist_index
    }

    /// The playlist entry being played, else the last single-track result.
    pub fn now_playing(&self) -> Option<PlayResult> {
        let state = self.state();
        let plan = state.plan.as_ref()?;
        plan.playlist
            .as_ref()
            .and_then(|playlist| playlist.songs.get(state.playlist_index))
            .or(plan.play_result.as_ref())
            .cloned()
    }

    pub fn is_speaking(&self) -> bool {
        self.speech
            .lock()
            .map(|speech| speech.is_speaking())
            .unwrap_or(false)
    }

    // ---- environment and plan ----

    /// Shallow-merges `patch`; applied over the default environment when
    /// none is set yet.
    pub fn set_environment(&self, patch: &EnvironmentPatch) {
        let environment = {
            let mut state = self.state();
            let mut environment = state.environment.take().unwrap_or_default();
            environment.apply(patch);
            state.environment = Some(environment.clone());
            environment
        };
        self.publish(StoreChange::Environment(Some(environment)));
    }

    pub fn replace_environment(&self, environment: Environment) {
        self.state().environment = Some(environment.clone());
        self.publish(StoreChange::Environment(Some(environment)));
    }

    /// Merges one tool result into the plan and starts its side effect.
    ///
    /// Malformed JSON, results that do not fit the field and tools without a
    /// plan field are logged and ignored.
    pub fn apply_tool_result(&self, tool_name: &str, result_json: &str) {
        let value: Value = match serde_json::from_str(result_json) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("ignoring unparseable {tool_name} result: {err}");
                return;
            }
        };
        let Some(field) = PlanField::for_tool(tool_name) else {
            log::debug!("no plan field for tool {tool_name}");
            return;
        };

        let plan = {
            let mut state = self.state();
            let current = state.plan.as_deref().cloned().unwrap_or_default();
            let merged = match field.merged(&current, value) {
                Ok(merged) => Arc::new(merged),
                Err(err) => {
                    log::warn!("ignoring malformed {tool_name} result: {err}");
                    return;
                }
            };
            if field == PlanField::Playlist {
                state.playlist_index = 0;
            }
            state.plan = Some(merged.clone());
            merged
        };
        log::info!("applied {tool_name} to plan");
        self.publish(StoreChange::Plan(Some(plan.clone())));

        match field {
            PlanField::Playlist => {
                let first = plan
                    .playlist
                    .as_ref()
                    .and_then(|playlist| playlist.songs.first())
                    .and_then(PlayResult::playable_url);
                if let Some(url) = first {
                    self.play_music(url);
                }
            }
            PlanField::PlayResult => {
                if let Some(url) = plan.play_result.as_ref().and_then(PlayResult::playable_url) {
                    self.play_music(url);
                }
            }
            PlanField::Narrative => {
                if let Some(narrative) = &plan.narrative {
                    if !narrative.text.trim().is_empty() {
                        self.speak(&narrative.text, narrative.volume);
                    }
                }
            }
            PlanField::Light | PlanField::Scent | PlanField::Massage => {}
        }
    }

    // ---- analysis ----

    fn fail_precondition(&self) {
        self.state().error = Some(MISSING_ENVIRONMENT.to_string());
        self.publish(StoreChange::Error(Some(MISSING_ENVIRONMENT.to_string())));
    }

    fn begin_run(&self, clear_steps: bool) -> Option<(u64, String, Environment)> {
        let started = {
            let mut state = self.state();
            let environment = state.environment.clone()?;
            state.error = None;
            state.agent_running = true;
            state.run += 1;
            if clear_steps {
                state.steps.clear();
            }
            (state.run, state.session_id.clone(), environment)
        };
        self.publish(StoreChange::Error(None));
        if clear_steps {
            self.publish(StoreChange::StepsCleared);
        }
        self.publish(StoreChange::AgentRunning(true));
        Some(started)
    }

    fn is_current_run(&self, run: u64) -> bool {
        self.state().run == run
    }

    /// No-op once a newer run has started.
    fn end_run(&self, run: u64) {
        let was_running = {
            let mut state = self.state();
            state.run == run && std::mem::replace(&mut state.agent_running, false)
        };
        if was_running {
            self.publish(StoreChange::AgentRunning(false));
        }
    }

    fn set_error(&self, message: String) {
        self.state().error = Some(message.clone());
        self.publish(StoreChange::Error(Some(message)));
    }

    /// Streams an analysis of the current environment into the store.
    ///
    /// Returns `None` without touching the network when no environment is
    /// set. Blocks until the stream ends or [`VibeStore::cancel_stream`] is
    /// called from another thread.
    pub fn analyze_stream(&self) -> Option<StreamOutcome> {
        let Some((run, session_id, environment)) = self.begin_run(true) else {
            self.fail_precondition();
            return None;
        };
        let request = match StreamRequest::analyze(&session_id, &environment) {
            Ok(request) => request.with_debug(),
            Err(err) => {
                self.set_error(format!("{err:#}"));
                self.end_run(run);
                return None;
            }
        };

        let outcome = self
            .analysis
            .connect(request, |event| self.handle_analysis_event(run, event));
        if self.is_current_run(run) {
            self.flush_thinking_step();
            self.end_run(run);
        } else {
            log::debug!("analysis run {run} superseded");
        }
        log::info!("analysis stream ended: {outcome:?}");
        Some(outcome)
    }

    fn handle_analysis_event(&self, run: u64, event: StreamEvent) {
        match event {
            StreamEvent::Token { text } => self.append_token(&text),
            StreamEvent::ToolStart { tool_name, input } => {
                let mut step = ThinkingStep::new(StepKind::ToolStart, format!("Calling {tool_name}"));
                step.tool_name = Some(tool_name);
                step.tool_input = Some(input);
                self.push_step(step);
            }
            StreamEvent::ToolEnd {
                tool_name, result, ..
            } => {
                let mut step = ThinkingStep::new(StepKind::ToolEnd, format!("{tool_name} finished"));
                step.tool_name = Some(tool_name.clone());
                step.tool_output = Some(result.clone());
                self.push_step(step);
                self.apply_tool_result(&tool_name, &result);
            }
            StreamEvent::Complete { plan, .. } => {
                let silenced = plan.as_ref().map_or(true, AmbiencePlan::is_stimulus_free)
                    && self.safety_mode() == SafetyMode::L3Silent;
                let plan = plan.map(Arc::new);
                self.state().plan = plan.clone();
                self.publish(StoreChange::Plan(plan));
                let content = if silenced {
                    log::warn!("silent tier active, ambience recommendations skipped");
                    SILENCED_COMPLETE
                } else {
                    ANALYSIS_COMPLETE
                };
                self.push_step(ThinkingStep::new(StepKind::Complete, content));
                self.end_run(run);
            }
            StreamEvent::Error { code, message } => {
                self.set_error(format!("{code}: {message}"));
                self.push_step(ThinkingStep::new(StepKind::Error, message));
                self.end_run(run);
            }
        }
    }

    /// Consecutive tokens grow one thinking step.
    fn append_token(&self, text: &str) {
        let step = {
            let mut state = self.state();
            match state.steps.last_mut() {
                Some(last) if last.kind == StepKind::Thinking => {
                    last.content.push_str(text);
                    last.clone()
                }
                _ => {
                    let step = ThinkingStep::new(StepKind::Thinking, text);
                    state.steps.push(step.clone());
                    step
                }
            }
        };
        self.publish(StoreChange::Step(step));
    }

    fn push_step(&self, step: ThinkingStep) {
        self.flush_thinking_step();
        self.state().steps.push(step.clone());
        self.record(&step);
        self.publish(StoreChange::Step(step));
    }

    /// Thinking steps are logged once they stop growing.
    fn flush_thinking_step(&self) {
        let last = self.state().steps.last().cloned();
        if let Some(step) = last.filter(|step| step.kind == StepKind::Thinking) {
            self.record(&step);
        }
    }

    fn record(&self, step: &ThinkingStep) {
        if let Some(log) = &self.log {
            if let Err(err) = log.record_step(step) {
                log::warn!("failed writing step to {}: {err:#}", log.path().display());
            }
        }
    }

    /// Request/response analysis; the plan is replaced only when the
    /// response carries one.
    pub fn analyze(&self) -> Option<AnalyzeResponse> {
        let Some((run, session_id, environment)) = self.begin_run(false) else {
            self.fail_precondition();
            return None;
        };
        let request = AnalyzeRequest {
            session_id,
            environment,
            preferences: None,
            run_async: None,
        };
        let result = self.api.analyze(&request);
        let response = match result {
            Ok(response) => {
                if let Some(plan) = &response.plan {
                    let plan = Arc::new(plan.clone());
                    self.state().plan = Some(plan.clone());
                    self.publish(StoreChange::Plan(Some(plan)));
                }
                Some(response)
            }
            Err(err) => {
                let message = match err.downcast_ref::<ApiError>() {
                    Some(ApiError::Envelope { message, .. }) => message.clone(),
                    _ => format!("{err:#}"),
                };
                self.set_error(message);
                None
            }
        };
        self.end_run(run);
        response
    }

    /// Ends the in-flight analysis stream as a clean stop.
    pub fn cancel_stream(&self) {
        self.analysis.disconnect();
    }

    /// Starts a fresh session: new id, no environment, plan, steps or error.
    pub fn reset_session(&self) {
        self.analysis.disconnect();
        let session_id = generate_session_id();
        {
            let mut state = self.state();
            state.session_id = session_id.clone();
            state.environment = None;
            state.plan = None;
            state.steps.clear();
            state.error = None;
            state.playlist_index = 0;
        }
        if let Some(log) = &self.log {
            log.rotate(&session_id);
        }
        log::info!("session reset to {session_id}");
        self.publish(StoreChange::Session(session_id));
        self.publish(StoreChange::Environment(None));
        self.publish(StoreChange::Plan(None));
        self.publish(StoreChange::StepsCleared);
        self.publish(StoreChange::Error(None));
    }

    // ---- chat ----

    pub fn push_user_message(&self, text: &str) {
        self.state()
            .chat_messages
            .push(ChatMessage::new(ChatRole::User, text));
        self.publish(StoreChange::Chat);
    }

    /// Appends an empty assistant reply and returns its id.
    pub fn begin_assistant_message(&self) -> String {
        let message = ChatMessage::new(ChatRole::Assistant, "");
        let id = message.id.clone();
        self.state().chat_messages.push(message);
        self.publish(StoreChange::Chat);
        id
    }

    fn with_message(&self, id: &str, f: impl FnOnce(&mut ChatMessage)) {
        let found = {
            let mut state = self.state();
            match state
                .chat_messages
                .iter_mut()
                .find(|message| message.id == id)
            {
                Some(message) => {
                    f(message);
                    true
                }
                None => false,
            }
        };
        if found {
            self.publish(StoreChange::Chat);
        }
    }

    pub fn append_assistant_token(&self, id: &str, token: &str) {
        self.with_message(id, |message| message.content.push_str(token));
    }

    /// Starts a tool call on message `id`, or fills in the output of the
    /// earliest open call to the same tool.
    pub fn record_tool_call(
        &self,
        id: &str,
        tool_name: &str,
        input: Option<Value>,
        output: Option<String>,
    ) {
        self.with_message(id, |message| match (input, output) {
            (Some(input), output) => message.tool_calls.push(ToolCall {
                tool_name: tool_name.to_string(),
                input,
                output,
            }),
            (None, Some(output)) => {
                let open = message
                    .tool_calls
                    .iter_mut()
                    .find(|call| call.tool_name == tool_name && call.output.is_none());
                if let Some(call) = open {
                    call.output = Some(output);
                }
            }
            (None, None) => {}
        });
    }

    /// Sends one chat message and streams the assistant reply into the
    /// transcript. Blank input and overlapping sends are ignored.
    pub fn send_message(&self, text: &str) -> Option<StreamOutcome> {
        if text.trim().is_empty() {
            return None;
        }
        let session_id = {
            let mut state = self.state();
            if state.chat_running {
                return None;
            }
            state.chat_running = true;
            state.session_id.clone()
        };
        self.push_user_message(text);
        let reply_id = self.begin_assistant_message();

        let request = StreamRequest::chat(&session_id, text);
        let outcome = self.chat.connect(request, |event| match event {
            StreamEvent::Token { text } => self.append_assistant_token(&reply_id, &text),
            StreamEvent::ToolStart { tool_name, input } => {
                self.record_tool_call(&reply_id, &tool_name, Some(input), None)
            }
            StreamEvent::ToolEnd {
                tool_name, result, ..
            } => {
                self.record_tool_call(&reply_id, &tool_name, None, Some(result.clone()));
                if tool_name == SAY_TOOL && !result.trim().is_empty() {
                    self.speak(&result, DEFAULT_NARRATIVE_VOLUME);
                }
                self.apply_tool_result(&tool_name, &result);
            }
            StreamEvent::Complete { .. } => {}
            StreamEvent::Error { message, .. } => {
                self.append_assistant_token(&reply_id, &format!("\n[error: {message}]"))
            }
        });
        self.state().chat_running = false;
        self.publish(StoreChange::Chat);
        Some(outcome)
    }

    pub fn toggle_chat_panel(&self) -> bool {
        let open = {
            let mut state = self.state();
            state.chat_panel_open = !state.chat_panel_open;
            state.chat_panel_open
        };
        self.publish(StoreChange::Ui);
        open
    }

    pub fn clear_chat_messages(&self) {
        self.state().chat_messages.clear();
        self.publish(StoreChange::Chat);
    }

    // ---- UI metadata ----

    pub fn toggle_theme(&self) -> Theme {
        let theme = {
            let mut state = self.state();
            state.theme = match state.theme {
                Theme::Light => Theme::Dark,
                Theme::Dark => Theme::Light,
            };
            state.theme
        };
        self.publish(StoreChange::Ui);
        theme
    }

    pub fn set_demo_mode(&self, enabled: bool) {
        self.state().demo_mode = enabled;
        self.publish(StoreChange::Ui);
    }

    pub fn toggle_chain_expanded(&self) -> bool {
        let expanded = {
            let mut state = self.state();
            state.chain_expanded = !state.chain_expanded;
            state.chain_expanded
        };
        self.publish(StoreChange::Ui);
        expanded
    }

    // ---- playback ----

    fn publish_playback(&self) {
        let (playing, index) = {
            let state = self.state();
            (state.is_playing, state.playlist_index)
        };
        self.publish(StoreChange::Playback { playing, index });
    }

    /// Activates the output with a silent clip.
    pub fn unlock_audio(&self) {
        if let Ok(mut playback) = self.playback.lock() {
            if let Err(err) = playback.unlock() {
                log::debug!("audio unlock failed: {err:#}");
            }
        }
    }

    pub fn play_music(&self, url: &str) {
        log::info!("play {url}");
        let result = match self.playback.lock() {
            Ok(mut playback) => playback.play(url),
            Err(_) => return,
        };
        match result {
            Ok(()) => {
                self.state().is_playing = true;
                self.publish_playback();
            }
            Err(err) => log::error!("playback failed for {url}: {err:#}"),
        }
    }

    pub fn toggle_audio(&self) -> bool {
        let playing = self.state().is_playing;
        if let Ok(mut playback) = self.playback.lock() {
            if playing {
                playback.pause();
            } else if let Err(err) = playback.resume() {
                log::warn!("resume failed: {err:#}");
            }
        }
        self.state().is_playing = !playing;
        self.publish_playback();
        !playing
    }

    fn play_index(&self, index: usize) {
        let url = {
            let mut state = self.state();
            state.playlist_index = index;
            state.playlist_url(index)
        };
        self.publish_playback();
        if let Some(url) = url {
            self.play_music(&url);
        }
    }

    pub fn play_next(&self) {
        let next = {
            let state = self.state();
            let next = state.playlist_index + 1;
            (next < state.playlist_len()).then_some(next)
        };
        if let Some(next) = next {
            self.play_index(next);
        }
    }

    pub fn play_previous(&self) {
        let previous = {
            let state = self.state();
            state
                .playlist_index
                .checked_sub(1)
                .filter(|index| *index < state.playlist_len())
        };
        if let Some(previous) = previous {
            self.play_index(previous);
        }
    }

    pub fn play_song_at(&self, index: usize) {
        if index < self.state().playlist_len() {
            self.play_index(index);
        }
    }

    /// Resets progress and advances when a later playlist entry exists.
    pub fn on_track_ended(&self) {
        {
            let mut state = self.state();
            state.is_playing = false;
            state.audio_progress = 0.0;
        }
        self.publish_playback();
        self.play_next();
    }

    /// Seconds into the track; ignored until the duration is known.
    pub fn set_audio_progress(&self, current: f64, duration: f64) {
        if duration > 0.0 && current.is_finite() {
            self.state().audio_progress = (current / duration * 100.0).clamp(0.0, 100.0);
            self.publish_playback();
        }
    }

    // ---- speech ----

    pub fn speak(&self, text: &str, volume: f64) {
        if let Ok(mut speech) = self.speech.lock() {
            if let Err(err) = speech.speak(text, volume) {
                log::warn!("speech failed: {err:#}");
            }
        }
    }

    pub fn stop_speech(&self) {
        if let Ok(mut speech) = self.speech.lock() {
            speech.stop();
        }
    }

    // ---- backend wrappers ----

    /// Rates the current plan.
    pub fn feedback(&self, feedback_type: FeedbackType, comment: Option<String>) -> Result<()> {
        let (session_id, plan_id) = {
            let state = self.state();
            let plan_id = state.plan.as_ref().and_then(|plan| plan.id.clone());
            (state.session_id.clone(), plan_id)
        };
        let Some(plan_id) = plan_id else {
            bail!("no plan to rate yet");
        };
        self.api.feedback(&FeedbackRequest {
            session_id,
            plan_id,
            feedback_type,
            comment,
        })
    }

    /// Fetches a simulated scenario and makes it the current environment.
    pub fn load_scenario(&self, scenario: ScenarioType) -> Result<Environment> {
        let environment = self.api.scenario(scenario)?;
        log::info!("loaded scenario {}", scenario.label());
        self.replace_environment(environment.clone());
        Ok(environment)
    }

    pub fn generate_environment(&self, description: &str) -> Result<Environment> {
        let environment = self.api.generate_environment(description)?;
        self.replace_environment(environment.clone());
        Ok(environment)
    }

    /// Pushes the current environment to the backend session.
    pub fn sync_environment(&self) -> Result<()> {
        let (session_id, environment) = {
            let state = self.state();
            (state.session_id.clone(), state.environment.clone())
        };
        let Some(environment) = environment else {
            bail!(MISSING_ENVIRONMENT);
        };
        self.api.sync_environment(&session_id, &environment)
    }
}
