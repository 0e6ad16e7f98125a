//! Seams between the word-sync engine and the outside world.
//!
//! The engine never talks to a synthesizer, an audio device or a clock
//! directly. It hands `ChunkRequest`s to a `PlaybackBackend`, arms a `Ticker`
//! for timer-driven cursor tracking, and consumes `EngineEvent`s that the
//! runtime feeds back in. Tests drive the same entry points with synthetic
//! events.

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Largest word span sent to the remote service in one request.
pub const REMOTE_CHUNK_WORDS: usize = 50;

/// Native progress events closer together than this are coalesced.
pub const BOUNDARY_COALESCE_WINDOW: Duration = Duration::from_millis(200);

/// Identity of one in-flight backend resource. Never reused within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which backend a session plays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    OnDevice,
    Remote,
    #[default]
    Unavailable,
}

impl Mode {
    /// Exclusive end of the chunk that starts at `from`.
    ///
    /// On-device speech takes the whole remainder as one utterance; remote
    /// synthesis is bounded to `REMOTE_CHUNK_WORDS`.
    pub fn chunk_end(self, from: usize, len: usize) -> usize {
        match self {
            Mode::OnDevice => len,
            Mode::Remote => from.saturating_add(REMOTE_CHUNK_WORDS).min(len),
            Mode::Unavailable => from.min(len),
        }
    }

    /// How the cursor follows audio for this mode.
    pub fn tracking(self) -> Tracking {
        match self {
            Mode::Remote => Tracking::EstimatedTimer,
            Mode::OnDevice | Mode::Unavailable => Tracking::NativeBoundaries,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mode::OnDevice => "on-device",
            Mode::Remote => "remote",
            Mode::Unavailable => "unavailable",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Cursor advances on backend word-boundary events.
    NativeBoundaries,
    /// Cursor advances on a fixed-interval timer derived from clip duration.
    EstimatedTimer,
}

/// One unit of work for a backend: speak `text`, which covers words
/// `[start, end)` of the loaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRequest {
    pub handle: HandleId,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub rate: f32,
    pub voice: Option<String>,
}

impl ChunkRequest {
    pub fn word_count(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// A playback backend owns at most one live resource, identified by the
/// handle it was started with.
///
/// `start_chunk` must not block on synthesis; progress is reported later
/// through `EngineEvent`s carrying the same handle. `pause`, `resume` and
/// `cancel` for a handle the backend no longer owns are no-ops.
pub trait PlaybackBackend {
    fn start_chunk(&mut self, request: ChunkRequest) -> Result<(), PlaybackError>;

    fn pause(&mut self, handle: HandleId);

    fn resume(&mut self, handle: HandleId);

    /// Release the resource unconditionally. Safe to call repeatedly.
    fn cancel(&mut self, handle: HandleId);
}

/// The two concrete backends the engine can dispatch to.
pub struct Backends {
    pub on_device: Box<dyn PlaybackBackend>,
    pub remote: Box<dyn PlaybackBackend>,
}

impl Backends {
    pub fn for_mode(&mut self, mode: Mode) -> Option<&mut dyn PlaybackBackend> {
        match mode {
            Mode::OnDevice => Some(self.on_device.as_mut()),
            Mode::Remote => Some(self.remote.as_mut()),
            Mode::Unavailable => None,
        }
    }
}

/// Fixed-interval tick source for estimated cursor tracking.
///
/// Arming replaces any previous schedule; `cancel` stops it outright so no
/// tick from an old schedule can fire after a pause or teardown.
pub trait Ticker {
    fn arm(&mut self, handle: HandleId, interval: Duration);

    fn cancel(&mut self);
}

/// Asynchronous completions and progress reported back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Audio for the chunk is ready and starting; `duration` is the clip length.
    ClipLoaded { handle: HandleId, duration: Duration },
    /// Native word boundary reached, stamped when it was observed.
    WordBoundary { handle: HandleId, at: Instant },
    /// One cursor-advance interval elapsed.
    TimerTick { handle: HandleId },
    /// The chunk finished playing.
    ChunkEnded { handle: HandleId },
    /// Synthesis or playback failed for the chunk.
    Failed { handle: HandleId, error: PlaybackError },
}

impl EngineEvent {
    pub fn handle(&self) -> HandleId {
        match self {
            EngineEvent::ClipLoaded { handle, .. }
            | EngineEvent::WordBoundary { handle, .. }
            | EngineEvent::TimerTick { handle }
            | EngineEvent::ChunkEnded { handle }
            | EngineEvent::Failed { handle, .. } => *handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_chunks_are_bounded() {
        assert_eq!(Mode::Remote.chunk_end(0, 120), 50);
        assert_eq!(Mode::Remote.chunk_end(50, 120), 100);
        assert_eq!(Mode::Remote.chunk_end(100, 120), 120);
        assert_eq!(Mode::Remote.chunk_end(3, 5), 5);
    }

    #[test]
    fn on_device_takes_the_remainder() {
        assert_eq!(Mode::OnDevice.chunk_end(7, 500), 500);
    }

    #[test]
    fn mode_labels_and_tracking() {
        assert_eq!(Mode::OnDevice.to_string(), "on-device");
        assert_eq!(Mode::Remote.tracking(), Tracking::EstimatedTimer);
    }
}
