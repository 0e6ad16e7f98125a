//! On-device speech through an `espeak-ng` subprocess.
//!
//! The whole remainder of the document is one utterance, fed to espeak on
//! stdin and rendered to a temporary WAV. Playback then reports a word
//! boundary per word at the clip's average cadence, which is what the engine
//! tracks the cursor by.

use super::{ClipSlot, EventTx, LiveClip};
use crate::audio::{self, AudioOutput, BoundaryCadence, PLAYBACK_POLL_INTERVAL};
use crate::cancellation::CancellationToken;
use read_aloud_core::{
    BOUNDARY_COALESCE_WINDOW, ChunkRequest, EngineEvent, HandleId, PlaybackBackend, PlaybackError,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const RENDER_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Spacing for synthetic boundaries so none fall inside the coalescing window.
const MIN_BOUNDARY_GAP: Duration = BOUNDARY_COALESCE_WINDOW.saturating_add(PLAYBACK_POLL_INTERVAL);

#[derive(Debug, Clone)]
pub struct EspeakSettings {
    pub command: String,
    pub words_per_minute: u32,
}

impl EspeakSettings {
    /// espeak speed for a playback rate multiplier.
    pub fn speed_for(&self, rate: f32) -> u32 {
        (self.words_per_minute as f32 * rate).round().max(1.0) as u32
    }

    fn args(&self, output: &Path, request: &ChunkRequest) -> Vec<String> {
        let mut args = vec![
            "-w".to_string(),
            output.display().to_string(),
            "-s".to_string(),
            self.speed_for(request.rate).to_string(),
        ];
        if let Some(voice) = request.voice.as_deref() {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        args.push("--stdin".to_string());
        args
    }
}

pub struct EspeakBackend {
    settings: EspeakSettings,
    audio: AudioOutput,
    events: EventTx,
    slot: ClipSlot,
}

impl EspeakBackend {
    pub fn new(settings: EspeakSettings, events: EventTx) -> Self {
        Self {
            settings,
            audio: AudioOutput::new(),
            events,
            slot: ClipSlot::default(),
        }
    }
}

impl PlaybackBackend for EspeakBackend {
    fn start_chunk(&mut self, request: ChunkRequest) -> Result<(), PlaybackError> {
        let sink = self.audio.new_sink()?;
        let token = CancellationToken::new();
        self.slot.replace(LiveClip {
            handle: request.handle,
            sink: Arc::clone(&sink),
            token: token.clone(),
        });

        info!(
            handle = %request.handle,
            start = request.start,
            words = request.word_count(),
            voice = ?request.voice,
            "Starting on-device utterance"
        );
        let settings = self.settings.clone();
        let events = self.events.clone();
        thread::Builder::new()
            .name(format!("espeak-{}", request.handle.get()))
            .spawn(move || run_utterance(settings, request, sink, token, events))
            .map_err(|err| PlaybackError::PlaybackResource(format!("Spawning worker: {err}")))?;
        Ok(())
    }

    fn pause(&mut self, handle: HandleId) {
        self.slot.pause(handle);
    }

    fn resume(&mut self, handle: HandleId) {
        self.slot.resume(handle);
    }

    fn cancel(&mut self, handle: HandleId) {
        self.slot.cancel(handle);
    }
}

fn run_utterance(
    settings: EspeakSettings,
    request: ChunkRequest,
    sink: Arc<rodio::Sink>,
    token: CancellationToken,
    events: EventTx,
) {
    let handle = request.handle;
    let bytes = match render(&settings, &request, &token) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!(%handle, "Utterance cancelled during synthesis");
            return;
        }
        Err(error) => {
            warn!(%handle, "espeak failed: {error}");
            events.post(&token, EngineEvent::Failed { handle, error });
            return;
        }
    };

    let duration = audio::wav_duration(&bytes);
    if let Err(error) = audio::append_clip(&sink, bytes) {
        events.post(&token, EngineEvent::Failed { handle, error });
        return;
    }
    if !events.post(&token, EngineEvent::ClipLoaded { handle, duration }) {
        return;
    }

    let cadence = cadence_for(duration, request.word_count());
    debug!(%handle, ?cadence, "Following utterance");
    let finished = audio::follow_clip(&sink, &token, Some(cadence), |at| {
        events.post(&token, EngineEvent::WordBoundary { handle, at });
    });
    if finished {
        events.post(&token, EngineEvent::ChunkEnded { handle });
    }
}

/// Spread the clip evenly over its words, never closer together than the
/// engine's boundary coalescing window.
pub(crate) fn cadence_for(duration: Duration, words: usize) -> BoundaryCadence {
    let words = words.max(1);
    let even = duration / u32::try_from(words).unwrap_or(u32::MAX);
    BoundaryCadence {
        words,
        interval: even.max(MIN_BOUNDARY_GAP),
    }
}

/// Render the request to WAV bytes. `Ok(None)` means the token was
/// cancelled and the subprocess has been killed.
fn render(
    settings: &EspeakSettings,
    request: &ChunkRequest,
    token: &CancellationToken,
) -> Result<Option<Vec<u8>>, PlaybackError> {
    let output = scratch_path(request.handle);
    let result = run_espeak(settings, &output, request, token)
        .map_err(|err| PlaybackError::PlaybackResource(format!("{}: {err}", settings.command)));
    let bytes = result.and_then(|out| {
        let Some(out) = out else {
            return Ok(None);
        };
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(PlaybackError::PlaybackResource(format!(
                "{} exited with {}: {}",
                settings.command,
                out.status,
                stderr.trim()
            )));
        }
        fs::read(&output)
            .map(Some)
            .map_err(|err| PlaybackError::PlaybackResource(err.to_string()))
    });
    if output.exists() {
        if let Err(err) = fs::remove_file(&output) {
            debug!(path = %output.display(), "Scratch WAV not removed: {err}");
        }
    }
    bytes
}

/// Run espeak to completion, or kill and reap it once the token is cancelled.
fn run_espeak(
    settings: &EspeakSettings,
    output: &Path,
    request: &ChunkRequest,
    token: &CancellationToken,
) -> std::io::Result<Option<Output>> {
    let mut child = Command::new(&settings.command)
        .args(settings.args(output, request))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    // A separate writer keeps a full pipe from hiding a cancel. Write errors
    // mean espeak exited early; its stderr says why.
    let feeder = child.stdin.take().map(|mut stdin| {
        let text = request.text.clone();
        thread::spawn(move || {
            if let Err(err) = stdin.write_all(text.as_bytes()) {
                debug!("espeak stopped reading input: {err}");
            }
        })
    });

    loop {
        if token.is_cancelled() {
            if let Err(err) = child.kill() {
                debug!("espeak already gone: {err}");
            }
            child.wait()?;
            return Ok(None);
        }
        if child.try_wait()?.is_some() {
            join_feeder(feeder);
            return child.wait_with_output().map(Some);
        }
        thread::sleep(RENDER_POLL_INTERVAL);
    }
}

fn join_feeder(feeder: Option<thread::JoinHandle<()>>) {
    if let Some(feeder) = feeder {
        if feeder.join().is_err() {
            warn!("espeak input writer panicked");
        }
    }
}

fn scratch_path(handle: HandleId) -> PathBuf {
    std::env::temp_dir().join(format!(
        "read-aloud-{}-{}.wav",
        std::process::id(),
        handle.get()
    ))
}
