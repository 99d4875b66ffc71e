use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use vibe_contracts::api::FeedbackRequest;
use vibe_contracts::chat::{parse_command, Intent, DRIVE_HELP_COMMANDS};
use vibe_contracts::events::SessionLog;
use vibe_contracts::models::{
    Environment, EnvironmentPatch, FeedbackType, ScenarioType, StepKind, TimeOfDay, UserMood,
    Weather, DEFAULT_NARRATIVE_VOLUME,
};
use vibe_contracts::session::{now_utc_iso, write_summary, SessionSummary};
use vibe_contracts::stream::VibeNotice;
use vibe_engine::audio::{
    tts_speak_url, ElementPlayer, FileMediaBuffer, LoggingOutput, Speech, StreamingSpeechPlayer,
};
use vibe_engine::demo::DEFAULT_SCENARIO_PAUSE;
use vibe_engine::render::{DrawOp, NowPlaying, ScreenRenderer};
use vibe_engine::{
    DemoRunner, EngineConfig, StoreChange, StreamOutcome, VibeApi, VibeEventFeed, VibeStore,
};

#[derive(Debug, Parser)]
#[command(name = "vibe-rs", version, about = "Vibe Drive ambience client")]
struct Cli {
    /// Backend base URL; overrides VIBE_API_BASE.
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// TTS service base URL; overrides VIBE_TTS_BASE.
    #[arg(long, global = true)]
    tts_base: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Analyze(AnalyzeArgs),
    Status(StatusArgs),
    Feedback(FeedbackArgs),
    Scenario(ScenarioArgs),
    GenerateEnv(GenerateEnvArgs),
    Events(EventsArgs),
    Demo(DemoArgs),
    Speak(SpeakArgs),
    Screen(ScreenArgs),
    Drive(DriveArgs),
}

#[derive(Debug, Parser)]
struct EnvironmentArgs {
    /// Environment JSON file.
    #[arg(long)]
    env: Option<PathBuf>,
    /// Load a simulator scenario first.
    #[arg(long)]
    scenario: Option<String>,
    #[arg(long)]
    speed: Option<f64>,
    #[arg(long)]
    mood: Option<String>,
    #[arg(long)]
    weather: Option<String>,
    #[arg(long)]
    time: Option<String>,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[command(flatten)]
    environment: EnvironmentArgs,
    /// Use the request/response endpoint instead of the stream.
    #[arg(long)]
    sync: bool,
    /// Directory for events.jsonl and summary.json.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct StatusArgs {
    #[arg(long)]
    session: String,
}

#[derive(Debug, Parser)]
struct FeedbackArgs {
    #[arg(long)]
    session: String,
    #[arg(long)]
    plan: String,
    /// LIKE, DISLIKE or SKIP.
    #[arg(long = "type")]
    feedback_type: String,
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Debug, Parser)]
struct ScenarioArgs {
    #[arg(default_value = "RANDOM")]
    scenario: String,
}

#[derive(Debug, Parser)]
struct GenerateEnvArgs {
    #[arg(required = true)]
    description: Vec<String>,
}

#[derive(Debug, Parser)]
struct EventsArgs {
    #[arg(long)]
    session: String,
    #[arg(long = "topic")]
    topics: Vec<String>,
}

#[derive(Debug, Parser)]
struct DemoArgs {
    #[arg(long, default_value_t = DEFAULT_SCENARIO_PAUSE.as_secs())]
    pause_secs: u64,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct SpeakArgs {
    #[arg(required = true)]
    text: Vec<String>,
    #[arg(long)]
    voice: Option<String>,
    #[arg(long, default_value_t = DEFAULT_NARRATIVE_VOLUME)]
    volume: f64,
    /// Stream the audio into files under this directory.
    #[arg(long)]
    stream_to: Option<PathBuf>,
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

#[derive(Debug, Parser)]
struct ScreenArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long, default_value = "")]
    artist: String,
    /// Track length in seconds.
    #[arg(long, default_value_t = 0)]
    duration: u32,
    /// 0..1.
    #[arg(long, default_value_t = 0.0)]
    progress: f64,
    /// Seconds of title scrolling to simulate before the snapshot.
    #[arg(long, default_value_t = 0.0)]
    scroll_secs: f64,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct DriveArgs {
    /// Directory for the session events.jsonl.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("vibe-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = engine_config(&cli);
    match cli.command {
        Command::Analyze(args) => run_analyze(config, args),
        Command::Status(args) => {
            let status = VibeApi::new(config)?.status(&args.session)?;
            print_json(&status)?;
            Ok(0)
        }
        Command::Feedback(args) => run_feedback(config, args),
        Command::Scenario(args) => {
            let scenario = parse_wire(&args.scenario, ScenarioType::parse, "scenario")?;
            print_json(&VibeApi::new(config)?.scenario(scenario)?)?;
            Ok(0)
        }
        Command::GenerateEnv(args) => {
            let description = args.description.join(" ");
            print_json(&VibeApi::new(config)?.generate_environment(&description)?)?;
            Ok(0)
        }
        Command::Events(args) => run_events(config, args),
        Command::Demo(args) => run_demo(config, args),
        Command::Speak(args) => run_speak(config, args),
        Command::Screen(args) => run_screen(args),
        Command::Drive(args) => run_drive(config, args),
    }
}

fn engine_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(base) = cli.api_base.as_deref() {
        config = config.with_api_base(base);
    }
    if let Some(base) = cli.tts_base.as_deref() {
        config = config.with_tts_base(base);
    }
    config
}

fn build_store(config: &EngineConfig, log: Option<SessionLog>) -> Result<VibeStore> {
    let store = VibeStore::new(
        config.clone(),
        Box::new(ElementPlayer::new(LoggingOutput::new("music"), config.clone())),
        Box::new(ElementPlayer::new(LoggingOutput::new("voice"), config.clone())),
    )?;
    Ok(match log {
        Some(log) => store.with_session_log(log),
        None => store,
    })
}

fn session_log(out: Option<&Path>) -> Option<SessionLog> {
    out.map(|dir| SessionLog::new(dir.join("events.jsonl"), ""))
}

fn run_analyze(config: EngineConfig, args: AnalyzeArgs) -> Result<i32> {
    let store = build_store(&config, session_log(args.out.as_deref()))?;
    resolve_environment(&store, &args.environment)?;
    let started_at = now_utc_iso();
    let printer = spawn_step_printer(store.watch());

    let completed = if args.sync {
        match store.analyze() {
            Some(response) => {
                println!(
                    "action {} in {} ms",
                    response.action, response.processing_time_ms
                );
                true
            }
            None => false,
        }
    } else {
        store.analyze_stream() == Some(StreamOutcome::Completed)
    };

    let session_id = store.session_id();
    let steps = store.steps();
    let plan = store.plan();
    let error = store.error();
    let safety_mode = store.safety_mode();
    drop(store);
    let _ = printer.join();

    if let Some(plan) = &plan {
        print_json(plan.as_ref())?;
    }
    if let Some(out) = &args.out {
        let mut summary = SessionSummary::from_steps(&session_id, &started_at, &steps, safety_mode);
        summary.plan_id = plan.as_ref().and_then(|plan| plan.id.clone());
        if summary.error.is_none() {
            summary.error = error.clone();
        }
        write_summary(&out.join("summary.json"), &summary, None)?;
        println!("Session artifacts in {}", out.display());
    }

    match error {
        Some(error) => {
            eprintln!("analysis failed: {error}");
            Ok(1)
        }
        None if completed => Ok(0),
        None => {
            eprintln!("analysis ended without a plan");
            Ok(1)
        }
    }
}

fn run_feedback(config: EngineConfig, args: FeedbackArgs) -> Result<i32> {
    let feedback_type = parse_wire(&args.feedback_type, FeedbackType::parse, "feedback type")?;
    VibeApi::new(config)?.feedback(&FeedbackRequest {
        session_id: args.session,
        plan_id: args.plan,
        feedback_type,
        comment: args.comment.filter(|comment| !comment.trim().is_empty()),
    })?;
    println!("Feedback sent: {feedback_type}");
    Ok(0)
}

fn run_events(config: EngineConfig, args: EventsArgs) -> Result<i32> {
    let feed = VibeEventFeed::new(config)?;
    let outcome = feed.connect(&args.session, &args.topics, |notice| {
        println!("{}", format_notice(&notice));
    })?;
    println!("event feed ended ({outcome:?})");
    Ok(0)
}

fn run_demo(config: EngineConfig, args: DemoArgs) -> Result<i32> {
    let store = Arc::new(build_store(&config, session_log(args.out.as_deref()))?);
    let printer = spawn_step_printer(store.watch());
    let runner =
        DemoRunner::new(store.clone()).with_pause(Duration::from_secs(args.pause_secs));
    let completed = runner.run_with(|index, scenario| {
        println!("== scenario {}: {}", index + 1, scenario.label());
    });
    drop(runner);
    drop(store);
    let _ = printer.join();
    println!("{completed} scenario(s) completed");
    Ok(if completed == 0 { 1 } else { 0 })
}

fn run_speak(config: EngineConfig, args: SpeakArgs) -> Result<i32> {
    let text = args.text.join(" ");
    let Some(dir) = args.stream_to else {
        let url = tts_speak_url(&config, &text, args.voice.as_deref())?;
        let mut player = ElementPlayer::new(LoggingOutput::new("voice"), config);
        if let Some(voice) = args.voice {
            player = player.with_voice(voice);
        }
        player.speak(&text, args.volume)?;
        println!("{url}");
        return Ok(0);
    };

    let mut player =
        StreamingSpeechPlayer::new(FileMediaBuffer::new(dir), LoggingOutput::new("voice"), config)?;
    player.speak(&text, args.volume)?;
    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    while player.is_speaking() {
        if Instant::now() >= deadline {
            player.stop();
            eprintln!("speech timed out after {}s", args.timeout_secs);
            return Ok(1);
        }
        thread::sleep(Duration::from_millis(50));
    }
    let written = player
        .with_buffer(|buffer| buffer.written().to_vec())
        .unwrap_or_default();
    for path in &written {
        println!("{}", path.display());
    }
    Ok(if written.is_empty() { 1 } else { 0 })
}

fn run_screen(args: ScreenArgs) -> Result<i32> {
    let mut screen = ScreenRenderer::new();
    if let Some(title) = args.title {
        screen.update_song(Some(NowPlaying {
            title,
            artist: args.artist,
            duration_secs: args.duration,
        }));
        screen.update_progress(args.progress);
    }
    if args.scroll_secs > 0.0 {
        screen.tick(args.scroll_secs);
    }
    for op in screen.ops() {
        if let DrawOp::Text { text, x, y, .. } = op {
            println!("text ({x:.0}, {y:.0}) {text}");
        }
    }
    if let Some(parent) = args.out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    screen
        .rasterize()
        .save(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    println!("Wrote {}", args.out.display());
    Ok(0)
}

fn run_drive(config: EngineConfig, args: DriveArgs) -> Result<i32> {
    let store = build_store(&config, session_log(args.out.as_deref()))?;
    let printer = spawn_step_printer(store.watch());
    let stdin = io::stdin();
    let mut line = String::new();

    println!("Vibe drive started (session {}). Type /help for commands.", store.session_id());

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_command(line.trim_end_matches(['\n', '\r']));
        if !handle_intent(&store, &intent)? {
            break;
        }
    }

    drop(store);
    let _ = printer.join();
    Ok(0)
}

/// Runs one REPL intent; `false` ends the session.
fn handle_intent(store: &VibeStore, intent: &Intent) -> Result<bool> {
    match intent.action.as_str() {
        "noop" => {}
        "quit" => return Ok(false),
        "help" => {
            for command in DRIVE_HELP_COMMANDS {
                println!("  {command}");
            }
            println!("  anything else is sent to the assistant");
        }
        "invalid" => println!(
            "/{}: {}",
            arg_text(intent, "command").unwrap_or_default(),
            arg_text(intent, "reason").unwrap_or_default()
        ),
        "unknown" => println!(
            "Unknown command /{}. Type /help.",
            arg_text(intent, "command").unwrap_or_default()
        ),
        "load_scenario" => {
            let scenario = arg_text(intent, "scenario")
                .and_then(|raw| ScenarioType::parse(&raw))
                .unwrap_or(ScenarioType::Random);
            match store.load_scenario(scenario) {
                Ok(environment) => println!("{}", describe_environment(&environment)),
                Err(err) => println!("Scenario failed: {err:#}"),
            }
        }
        "generate_environment" => {
            let description = intent.message.clone().unwrap_or_default();
            match store.generate_environment(&description) {
                Ok(environment) => println!("{}", describe_environment(&environment)),
                Err(err) => println!("Environment generation failed: {err:#}"),
            }
        }
        "analyze_stream" => {
            store.analyze_stream();
            if let Some(error) = store.error() {
                println!("Analysis failed: {error}");
            }
        }
        "analyze" => match store.analyze() {
            Some(response) => println!("{}", response.action),
            None => println!(
                "Analysis failed: {}",
                store.error().unwrap_or_else(|| "unknown error".to_string())
            ),
        },
        "reset_session" => {
            store.reset_session();
            println!("New session {}", store.session_id());
        }
        "play_song_at" => {
            let index = intent
                .command_args
                .get("index")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            store.play_song_at(index as usize);
            print_now_playing(store);
        }
        "play_next" => {
            store.play_next();
            print_now_playing(store);
        }
        "play_previous" => {
            store.play_previous();
            print_now_playing(store);
        }
        "toggle_audio" => {
            let playing = store.toggle_audio();
            println!("{}", if playing { "Playing" } else { "Paused" });
        }
        "speak" => {
            if let Some(text) = &intent.message {
                store.speak(text, DEFAULT_NARRATIVE_VOLUME);
            }
        }
        "stop_speech" => store.stop_speech(),
        "feedback" => {
            let feedback_type = arg_text(intent, "type")
                .and_then(|raw| FeedbackType::parse(&raw))
                .unwrap_or(FeedbackType::Like);
            match store.feedback(feedback_type, arg_text(intent, "comment")) {
                Ok(()) => println!("Feedback sent: {feedback_type}"),
                Err(err) => println!("Feedback failed: {err:#}"),
            }
        }
        "toggle_theme" => println!("Theme: {}", store.toggle_theme().as_str()),
        "show_plan" => match store.plan() {
            Some(plan) => print_json(plan.as_ref())?,
            None => println!("No plan yet."),
        },
        "show_steps" => {
            for step in store.steps() {
                println!("[{}] {}", step.kind.as_str(), step.content);
            }
        }
        "status" => {
            println!("session {}", store.session_id());
            match store.environment() {
                Some(environment) => println!("{}", describe_environment(&environment)),
                None => println!("no environment"),
            }
            let safety = store.safety_mode();
            println!(
                "safety {} ({}{})",
                safety,
                safety.display_name(),
                if safety.allows_dynamic_lighting() { "" } else { ", static lights" }
            );
            if !store.has_active_plan() {
                println!("no plan yet");
            }
            print_now_playing(store);
        }
        "chat" => {
            let message = intent.message.clone().unwrap_or_default();
            store.send_message(&message);
            if let Some(reply) = store.chat_messages().last() {
                println!("{}", reply.content);
            }
        }
        action if action.starts_with("set_") => {
            if let Some(patch) = &intent.environment_update {
                store.set_environment(patch);
                if let Some(environment) = store.environment() {
                    println!("{}", describe_environment(&environment));
                }
                if let Err(err) = store.sync_environment() {
                    log::warn!("environment sync failed: {err:#}");
                }
            }
        }
        other => println!("Unhandled action {other}"),
    }
    Ok(true)
}

fn arg_text(intent: &Intent, key: &str) -> Option<String> {
    intent
        .command_args
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn print_now_playing(store: &VibeStore) {
    match store.now_playing() {
        Some(song) => println!(
            "#{} {} - {} ({})",
            store.playlist_index(),
            song.name,
            song.artist,
            if store.is_playing() { "playing" } else { "paused" }
        ),
        None => println!("Nothing queued."),
    }
}

fn describe_environment(environment: &Environment) -> String {
    format!(
        "{} km/h, {}, {}, {}, {} on {}, {} passenger(s) -> {}",
        environment.speed,
        environment.weather,
        environment.time_of_day,
        environment.user_mood,
        environment.gps_tag,
        environment.route_type,
        environment.passenger_count,
        environment.safety_mode()
    )
}

fn resolve_environment(store: &VibeStore, args: &EnvironmentArgs) -> Result<()> {
    if let Some(path) = &args.env {
        store.replace_environment(read_environment(path)?);
    } else if let Some(raw) = &args.scenario {
        let scenario = parse_wire(raw, ScenarioType::parse, "scenario")?;
        store.load_scenario(scenario)?;
    }
    store.set_environment(&environment_patch(args)?);
    Ok(())
}

fn read_environment(path: &Path) -> Result<Environment> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid environment in {}", path.display()))
}

fn environment_patch(args: &EnvironmentArgs) -> Result<EnvironmentPatch> {
    Ok(EnvironmentPatch {
        speed: args.speed,
        user_mood: args
            .mood
            .as_deref()
            .map(|raw| parse_wire(raw, UserMood::parse, "mood"))
            .transpose()?,
        weather: args
            .weather
            .as_deref()
            .map(|raw| parse_wire(raw, Weather::parse, "weather"))
            .transpose()?,
        time_of_day: args
            .time
            .as_deref()
            .map(|raw| parse_wire(raw, TimeOfDay::parse, "time of day"))
            .transpose()?,
        ..EnvironmentPatch::default()
    })
}

fn parse_wire<T>(raw: &str, parse: fn(&str) -> Option<T>, what: &str) -> Result<T> {
    parse(raw).ok_or_else(|| anyhow!("unknown {what} '{raw}'"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_notice(notice: &VibeNotice) -> String {
    match notice {
        VibeNotice::ToolStart {
            task_id, tool_name, ..
        } => format!("[{task_id}] tool_start {tool_name}"),
        VibeNotice::ToolEnd {
            task_id,
            tool_name,
            result,
        } => format!("[{task_id}] tool_end {tool_name}: {result}"),
        VibeNotice::Complete { task_id, .. } => format!("[{task_id}] complete"),
        VibeNotice::Error { task_id, error } => format!("[{task_id}] error: {error}"),
        VibeNotice::Cancelled { task_id } => format!("[{task_id}] cancelled"),
    }
}

fn spawn_step_printer(changes: Receiver<StoreChange>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut printer = StepPrinter::default();
        let mut stdout = io::stdout();
        for change in changes {
            if let Some(text) = printer.render(&change) {
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
        }
        if printer.thinking_len > 0 {
            let _ = stdout.write_all(b"\n");
        }
    })
}

/// Turns store changes into terminal output, streaming thinking text as it
/// grows.
#[derive(Debug, Default)]
struct StepPrinter {
    thinking_len: usize,
}

impl StepPrinter {
    fn render(&mut self, change: &StoreChange) -> Option<String> {
        match change {
            StoreChange::StepsCleared => {
                self.thinking_len = 0;
                None
            }
            StoreChange::Step(step) if step.kind == StepKind::Thinking => {
                let fresh = step.content.get(self.thinking_len..).unwrap_or_default();
                let lead = if self.thinking_len == 0 { "... " } else { "" };
                self.thinking_len = step.content.len();
                Some(format!("{lead}{fresh}"))
            }
            StoreChange::Step(step) => {
                let lead = if self.thinking_len > 0 { "\n" } else { "" };
                self.thinking_len = 0;
                Some(format!("{lead}[{}] {}\n", step.kind.as_str(), step.content))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use vibe_contracts::chat::parse_command;
    use vibe_contracts::models::{
        Environment, StepKind, ThinkingStep, TimeOfDay, UserMood, Weather,
    };
    use vibe_engine::StoreChange;

    use super::{
        describe_environment, environment_patch, read_environment, Cli, Command, EnvironmentArgs,
        StepPrinter,
    };

    fn env_args() -> EnvironmentArgs {
        EnvironmentArgs {
            env: None,
            scenario: None,
            speed: None,
            mood: None,
            weather: None,
            time: None,
        }
    }

    #[test]
    fn subcommands_parse_with_global_bases() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "vibe-rs",
            "generate-env",
            "rainy",
            "night",
            "--api-base",
            "http://backend:9000",
        ])?;
        assert_eq!(cli.api_base.as_deref(), Some("http://backend:9000"));
        match cli.command {
            Command::GenerateEnv(args) => assert_eq!(args.description.join(" "), "rainy night"),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["vibe-rs", "analyze", "--speed", "120", "--sync"])?;
        match cli.command {
            Command::Analyze(args) => {
                assert!(args.sync);
                assert_eq!(args.environment.speed, Some(120.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn environment_flags_build_a_patch() -> anyhow::Result<()> {
        let args = EnvironmentArgs {
            speed: Some(72.0),
            mood: Some("tired".to_string()),
            weather: Some("RAINY".to_string()),
            time: Some("night".to_string()),
            ..env_args()
        };
        let patch = environment_patch(&args)?;
        assert_eq!(patch.speed, Some(72.0));
        assert_eq!(patch.user_mood, Some(UserMood::Tired));
        assert_eq!(patch.weather, Some(Weather::Rainy));
        assert_eq!(patch.time_of_day, Some(TimeOfDay::Night));
        assert!(patch.gps_tag.is_none());

        let bad = EnvironmentArgs {
            mood: Some("grumpy".to_string()),
            ..env_args()
        };
        let err = environment_patch(&bad).expect_err("unknown mood");
        assert!(err.to_string().contains("grumpy"));
        Ok(())
    }

    #[test]
    fn environment_file_is_read() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("env.json");
        std::fs::write(&path, serde_json::to_string(&Environment::default())?)?;
        let environment = read_environment(&path)?;
        assert_eq!(environment, Environment::default());
        assert!(describe_environment(&environment).ends_with("-> L1_NORMAL"));

        std::fs::write(&path, "{}")?;
        assert!(read_environment(&path).is_err());
        Ok(())
    }

    #[test]
    fn step_printer_streams_thinking_deltas() {
        let mut printer = StepPrinter::default();
        let mut thinking = ThinkingStep::new(StepKind::Thinking, "Rain");
        assert_eq!(
            printer.render(&StoreChange::Step(thinking.clone())).as_deref(),
            Some("... Rain")
        );
        thinking.content.push_str(" ahead");
        assert_eq!(
            printer.render(&StoreChange::Step(thinking)).as_deref(),
            Some(" ahead")
        );
        let tool = ThinkingStep::new(StepKind::ToolStart, "Calling setLight");
        assert_eq!(
            printer.render(&StoreChange::Step(tool)).as_deref(),
            Some("\n[tool_start] Calling setLight\n")
        );
        let next = ThinkingStep::new(StepKind::Thinking, "Done");
        assert_eq!(
            printer.render(&StoreChange::Step(next)).as_deref(),
            Some("... Done")
        );
        assert_eq!(printer.render(&StoreChange::Ui), None);
    }

    #[test]
    fn drive_commands_map_to_store_actions() {
        assert_eq!(parse_command("/analyze").action, "analyze_stream");
        assert_eq!(parse_command("/play 2").action, "play_song_at");
        assert_eq!(parse_command("what's playing?").action, "chat");
    }
}
