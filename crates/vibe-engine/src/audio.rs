use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client as HttpClient;
use reqwest::Url;

use crate::config::EngineConfig;

const TTS_SPEAK_PATH: &str = "/api/tts/speak";
const STREAMED_MIME: &str = "audio/mpeg";
const SILENT_WAV_SAMPLE_RATE: u32 = 44_100;

/// Sink that can load and play one source at a time, like a media element.
pub trait AudioOutput: Send {
    fn load(&mut self, source: &str) -> Result<()>;
    fn set_volume(&mut self, volume: f64);
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    /// Stops playback and drops the loaded source.
    fn release(&mut self);
}

/// Music transport used by the store.
pub trait Playback: Send {
    fn play(&mut self, url: &str) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self) -> Result<()>;
    fn stop(&mut self);
    /// Primes the output with a silent clip so later plays are permitted.
    fn unlock(&mut self) -> Result<()>;
}

/// Narration output used by the store.
pub trait Speech: Send {
    /// Starts speaking `text`; any utterance in flight is stopped first.
    fn speak(&mut self, text: &str, volume: f64) -> Result<()>;
    fn stop(&mut self);
    fn is_speaking(&self) -> bool;
}

/// Builds `<tts_base>/api/tts/speak?text=..[&voice=..]`.
pub fn tts_speak_url(config: &EngineConfig, text: &str, voice: Option<&str>) -> Result<Url> {
    let endpoint = config.tts_url(TTS_SPEAK_PATH);
    let mut params = vec![("text", text)];
    if let Some(voice) = voice.map(str::trim).filter(|voice| !voice.is_empty()) {
        params.push(("voice", voice));
    }
    Url::parse_with_params(&endpoint, &params)
        .with_context(|| format!("invalid TTS endpoint ({endpoint})"))
}

/// Data URL of a header-only 16-bit mono PCM WAV.
pub fn silent_wav_data_url() -> String {
    let byte_rate = SILENT_WAV_SAMPLE_RATE * 2;
    let mut wav = Vec::with_capacity(44);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&36u32.to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&SILENT_WAV_SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&0u32.to_le_bytes());
    format!("data:audio/wav;base64,{}", BASE64.encode(wav))
}

/// Direct-URL player over an [`AudioOutput`].
pub struct ElementPlayer<O: AudioOutput> {
    output: O,
    config: EngineConfig,
    voice: Option<String>,
    source: Option<String>,
    playing: bool,
}

impl<O: AudioOutput> ElementPlayer<O> {
    pub fn new(output: O, config: EngineConfig) -> Self {
        Self {
            output,
            config,
            voice: None,
            source: None,
            playing: false,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    fn start(&mut self, source: &str, volume: f64) -> Result<()> {
        self.halt();
        self.output.load(source)?;
        self.output.set_volume(volume.clamp(0.0, 1.0));
        self.source = Some(source.to_string());
        if let Err(err) = self.output.play() {
            log::error!("audio play failed: {err:#}");
            return Err(err);
        }
        self.playing = true;
        Ok(())
    }

    fn halt(&mut self) {
        if self.source.take().is_some() {
            self.output.release();
        }
        self.playing = false;
    }
}

impl<O: AudioOutput> Playback for ElementPlayer<O> {
    fn play(&mut self, url: &str) -> Result<()> {
        log::info!("playing {url}");
        self.start(url, 1.0)
    }

    fn pause(&mut self) {
        if self.playing {
            self.output.pause();
            self.playing = false;
        }
    }

    fn resume(&mut self) -> Result<()> {
        if self.source.is_none() {
            bail!("no track loaded");
        }
        self.output.play()?;
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.halt();
    }

    fn unlock(&mut self) -> Result<()> {
        self.output.load(&silent_wav_data_url())?;
        let played = self.output.play();
        self.output.pause();
        self.output.release();
        if let Err(err) = played {
            log::debug!("audio unlock ignored: {err:#}");
        }
        Ok(())
    }
}

impl<O: AudioOutput> Speech for ElementPlayer<O> {
    fn speak(&mut self, text: &str, volume: f64) -> Result<()> {
        if text.trim().is_empty() {
            log::warn!("empty narration text, skipping");
            return Ok(());
        }
        let url = tts_speak_url(&self.config, text, self.voice.as_deref())?;
        log::info!("speaking: {}", preview(text));
        self.start(url.as_str(), volume)
    }

    fn stop(&mut self) {
        self.halt();
    }

    fn is_speaking(&self) -> bool {
        self.playing
    }
}

/// Growing buffer fed incrementally while speech is being received.
pub trait MediaBuffer: Send + 'static {
    fn supports(&self, mime: &str) -> bool;
    /// Starts a new utterance.
    fn open(&mut self, volume: f64) -> Result<()>;
    fn append(&mut self, chunk: &[u8]) -> Result<()>;
    fn end_of_stream(&mut self) -> Result<()>;
    /// Drops whatever is buffered for the current utterance.
    fn release(&mut self);
}

struct Utterance {
    stopped: Arc<AtomicBool>,
}

/// Speaks by streaming TTS audio into a [`MediaBuffer`] as it arrives.
///
/// Falls back to the direct-URL element player when the buffer cannot take
/// `audio/mpeg`. After [`Speech::stop`] returns no further chunk is appended.
pub struct StreamingSpeechPlayer<B: MediaBuffer, O: AudioOutput> {
    config: EngineConfig,
    http: HttpClient,
    buffer: Arc<Mutex<B>>,
    fallback: ElementPlayer<O>,
    current: Option<Utterance>,
    speaking: Arc<AtomicBool>,
}

impl<B: MediaBuffer, O: AudioOutput> StreamingSpeechPlayer<B, O> {
    pub fn new(buffer: B, fallback_output: O, config: EngineConfig) -> Result<Self> {
        let http = config.streaming_client()?;
        Ok(Self {
            fallback: ElementPlayer::new(fallback_output, config.clone()),
            config,
            http,
            buffer: Arc::new(Mutex::new(buffer)),
            current: None,
            speaking: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Runs `f` against the buffer, e.g. to inspect what was received.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&B) -> R) -> Option<R> {
        self.buffer.lock().ok().map(|buffer| f(&buffer))
    }

    pub fn fallback(&self) -> &ElementPlayer<O> {
        &self.fallback
    }
}

impl<B: MediaBuffer, O: AudioOutput> Speech for StreamingSpeechPlayer<B, O> {
    fn speak(&mut self, text: &str, volume: f64) -> Result<()> {
        if text.trim().is_empty() {
            log::warn!("empty narration text, skipping");
            return Ok(());
        }
        Speech::stop(self);

        let supported = self
            .buffer
            .lock()
            .map(|buffer| buffer.supports(STREAMED_MIME))
            .unwrap_or(false);
        if !supported {
            log::warn!("{STREAMED_MIME} not supported by media buffer, using direct URL");
            return self.fallback.speak(text, volume);
        }

        let url = tts_speak_url(&self.config, text, None)?;
        self.buffer
            .lock()
            .map_err(|_| anyhow::anyhow!("media buffer lock poisoned"))?
            .open(volume.clamp(0.0, 1.0))?;
        log::info!("streaming speech: {}", preview(text));

        let stopped = Arc::new(AtomicBool::new(false));
        self.current = Some(Utterance {
            stopped: Arc::clone(&stopped),
        });
        self.speaking.store(true, Ordering::SeqCst);

        let http = self.http.clone();
        let buffer = Arc::clone(&self.buffer);
        let speaking = Arc::clone(&self.speaking);
        thread::spawn(move || {
            if let Err(err) = stream_into_buffer(&http, url, &buffer, &stopped) {
                log::error!("streaming speech failed: {err:#}");
            }
            if !stopped.load(Ordering::SeqCst) {
                speaking.store(false, Ordering::SeqCst);
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(utterance) = self.current.take() {
            utterance.stopped.store(true, Ordering::SeqCst);
            if let Ok(mut buffer) = self.buffer.lock() {
                buffer.release();
            }
        }
        self.fallback.halt();
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst) || self.fallback.is_playing()
    }
}

fn stream_into_buffer<B: MediaBuffer>(
    http: &HttpClient,
    url: Url,
    buffer: &Mutex<B>,
    stopped: &AtomicBool,
) -> Result<()> {
    let mut response = http
        .get(url.clone())
        .send()
        .with_context(|| format!("TTS request failed ({url})"))?;
    if !response.status().is_success() {
        bail!("TTS request failed: {}", response.status().as_u16());
    }
    let mut chunk = vec![0u8; 16 * 1024];
    loop {
        let n = response.read(&mut chunk).context("failed reading TTS audio")?;
        let mut buffer = buffer
            .lock()
            .map_err(|_| anyhow::anyhow!("media buffer lock poisoned"))?;
        if stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        if n == 0 {
            return buffer.end_of_stream();
        }
        buffer.append(&chunk[..n])?;
    }
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(30).collect();
    if text.chars().count() > 30 {
        short.push_str("...");
    }
    short
}

/// Output that only logs what it is asked to do.
#[derive(Debug, Default)]
pub struct LoggingOutput {
    label: String,
    history: Vec<String>,
}

impl LoggingOutput {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    fn note(&mut self, line: String) {
        log::info!("[{}] {line}", self.label);
        self.history.push(line);
    }
}

impl AudioOutput for LoggingOutput {
    fn load(&mut self, source: &str) -> Result<()> {
        let shown = if source.starts_with("data:") {
            "<inline clip>".to_string()
        } else {
            source.to_string()
        };
        self.note(format!("load {shown}"));
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) {
        self.note(format!("volume {volume:.2}"));
    }

    fn play(&mut self) -> Result<()> {
        self.note("play".to_string());
        Ok(())
    }

    fn pause(&mut self) {
        self.note("pause".to_string());
    }

    fn release(&mut self) {
        self.note("release".to_string());
    }
}

/// Writes each streamed utterance to `speech-NNN.mp3` under a directory.
#[derive(Debug)]
pub struct FileMediaBuffer {
    dir: PathBuf,
    next_index: u32,
    current: Option<(PathBuf, File)>,
    written: Vec<PathBuf>,
}

impl FileMediaBuffer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_index: 0,
            current: None,
            written: Vec::new(),
        }
    }

    /// Utterances that reached end of stream.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl MediaBuffer for FileMediaBuffer {
    fn supports(&self, mime: &str) -> bool {
        mime == STREAMED_MIME
    }

    fn open(&mut self, volume: f64) -> Result<()> {
        self.release();
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.dir.join(format!("speech-{:03}.mp3", self.next_index));
        self.next_index += 1;
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        log::debug!("buffering speech into {} (volume {volume:.2})", path.display());
        self.current = Some((path, file));
        Ok(())
    }

    fn append(&mut self, chunk: &[u8]) -> Result<()> {
        let Some((path, file)) = self.current.as_mut() else {
            bail!("media buffer is not open");
        };
        file.write_all(chunk)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    fn end_of_stream(&mut self) -> Result<()> {
        if let Some((path, mut file)) = self.current.take() {
            file.flush()
                .with_context(|| format!("failed to flush {}", path.display()))?;
            self.written.push(path);
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some((path, file)) = self.current.take() {
            drop(file);
            let _ = fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use anyhow::Result;

    use super::{
        silent_wav_data_url, tts_speak_url, AudioOutput, ElementPlayer, FileMediaBuffer,
        LoggingOutput, MediaBuffer, Playback, Speech, StreamingSpeechPlayer,
    };
    use crate::config::EngineConfig;
    use crate::test_support::{Fixture, Reply};

    #[derive(Default)]
    struct NoStreamBuffer;

    impl MediaBuffer for NoStreamBuffer {
        fn supports(&self, _mime: &str) -> bool {
            false
        }
        fn open(&mut self, _volume: f64) -> Result<()> {
            Ok(())
        }
        fn append(&mut self, _chunk: &[u8]) -> Result<()> {
            Ok(())
        }
        fn end_of_stream(&mut self) -> Result<()> {
            Ok(())
        }
        fn release(&mut self) {}
    }

    #[test]
    fn silent_clip_matches_known_header() {
        assert_eq!(
            silent_wav_data_url(),
            "data:audio/wav;base64,UklGRiQAAABXQVZFZm10IBAAAAABAAEARKwAAIhYAQACABAAZGF0YQAAAAA="
        );
    }

    #[test]
    fn speak_url_encodes_text_and_optional_voice() -> Result<()> {
        let config = EngineConfig::default().with_tts_base("http://tts.local:3002/");
        let url = tts_speak_url(&config, "slow down & relax", Some("zh-CN-Xiaoxiao"))?;
        assert_eq!(
            url.as_str(),
            "http://tts.local:3002/api/tts/speak?text=slow+down+%26+relax&voice=zh-CN-Xiaoxiao"
        );
        let bare = tts_speak_url(&config, "hi", Some(" "))?;
        assert_eq!(bare.query(), Some("text=hi"));
        Ok(())
    }

    #[test]
    fn element_player_stops_previous_source_before_next() -> Result<()> {
        let mut player = ElementPlayer::new(LoggingOutput::new("music"), EngineConfig::default());
        Playback::play(&mut player, "http://music/a.mp3")?;
        Playback::play(&mut player, "http://music/b.mp3")?;
        assert_eq!(player.source(), Some("http://music/b.mp3"));
        assert_eq!(
            player.output().history(),
            [
                "load http://music/a.mp3",
                "volume 1.00",
                "play",
                "release",
                "load http://music/b.mp3",
                "volume 1.00",
                "play",
            ]
        );

        Playback::pause(&mut player);
        assert!(!player.is_playing());
        player.resume()?;
        assert!(player.is_playing());
        Playback::stop(&mut player);
        assert!(player.resume().is_err());
        Ok(())
    }

    #[test]
    fn element_speech_skips_blank_text() -> Result<()> {
        let mut player = ElementPlayer::new(LoggingOutput::new("tts"), EngineConfig::default());
        player.speak("   ", 0.8)?;
        assert!(player.output().history().is_empty());
        assert!(!player.is_speaking());

        player.speak("hello", 0.5)?;
        assert!(player.is_speaking());
        assert_eq!(player.output().history()[1], "volume 0.50");
        Ok(())
    }

    #[test]
    fn streaming_player_falls_back_without_mpeg_support() -> Result<()> {
        let mut player = StreamingSpeechPlayer::new(
            NoStreamBuffer,
            LoggingOutput::new("fallback"),
            EngineConfig::default(),
        )?;
        player.speak("evening drive", 0.8)?;
        assert!(player.is_speaking());
        let loaded = &player.fallback().output().history()[0];
        assert!(loaded.starts_with("load http://localhost:3002/api/tts/speak?text=evening+drive"));
        Ok(())
    }

    #[test]
    fn streaming_player_writes_received_audio() -> Result<()> {
        let fixture = Fixture::serve(vec![Reply {
            status: 200,
            content_type: "audio/mpeg",
            chunks: vec![
                (Duration::ZERO, b"ID3".to_vec()),
                (Duration::from_millis(20), b"frame-bytes".to_vec()),
            ],
        }])?;
        let temp = tempfile::tempdir()?;
        let config = EngineConfig::default().with_tts_base(&fixture.base);
        let mut player =
            StreamingSpeechPlayer::new(FileMediaBuffer::new(temp.path()), LoggingOutput::default(), config)?;
        player.speak("turning left", 0.8)?;

        let deadline = Instant::now() + Duration::from_secs(5);
        while player.is_speaking() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        let written = player
            .with_buffer(|buffer| buffer.written().to_vec())
            .unwrap_or_default();
        assert_eq!(written.len(), 1);
        assert_eq!(std::fs::read(&written[0])?, b"ID3frame-bytes");
        assert!(fixture.requests()[0].target.starts_with("/api/tts/speak?text=turning+left"));
        Ok(())
    }

    #[test]
    fn stop_releases_buffer_and_blocks_late_chunks() -> Result<()> {
        let fixture = Fixture::serve(vec![Reply {
            status: 200,
            content_type: "audio/mpeg",
            chunks: vec![
                (Duration::ZERO, b"early".to_vec()),
                (Duration::from_millis(400), b"late".to_vec()),
            ],
        }])?;
        let temp = tempfile::tempdir()?;
        let config = EngineConfig::default().with_tts_base(&fixture.base);
        let mut player =
            StreamingSpeechPlayer::new(FileMediaBuffer::new(temp.path()), LoggingOutput::default(), config)?;
        player.speak("a long announcement", 0.8)?;
        std::thread::sleep(Duration::from_millis(100));
        player.stop();
        assert!(!player.is_speaking());

        let _ = fixture.requests();
        std::thread::sleep(Duration::from_millis(50));
        assert!(player
            .with_buffer(|buffer| buffer.written().is_empty())
            .unwrap_or(false));
        assert!(!temp.path().join("speech-000.mp3").exists());
        Ok(())
    }

    #[test]
    fn logging_output_hides_inline_clips() -> Result<()> {
        let mut output = LoggingOutput::new("unlock");
        output.load(&silent_wav_data_url())?;
        assert_eq!(output.history(), ["load <inline clip>"]);
        Ok(())
    }
}
