//! Mutable state of one playback attempt.

use crate::backend::{HandleId, Mode};
use crate::render::PlayState;
use std::time::{Duration, Instant};

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;
pub const DEFAULT_RATE: f32 = 1.0;

/// Clamp a requested speed into range and snap it to 0.1 steps.
pub fn clamp_rate(rate: f32) -> f32 {
    if !rate.is_finite() {
        return DEFAULT_RATE;
    }
    (rate.clamp(MIN_RATE, MAX_RATE) * 10.0).round() / 10.0
}

/// The single live backend resource and the word span it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveChunk {
    pub handle: HandleId,
    pub mode: Mode,
    pub start: usize,
    pub end: usize,
    /// Estimated per-word cadence once the clip length is known.
    pub word_interval: Option<Duration>,
}

impl ActiveChunk {
    pub fn word_count(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub(crate) cursor: usize,
    pub(crate) mode: Mode,
    pub(crate) play_state: PlayState,
    pub(crate) rate: f32,
    pub(crate) voice: Option<String>,
    pub(crate) active: Option<ActiveChunk>,
    pub(crate) last_boundary_at: Option<Instant>,
    next_handle: u64,
}

impl PlaybackSession {
    pub fn new(mode: Mode, rate: f32) -> Self {
        Self {
            cursor: 0,
            mode,
            play_state: PlayState::Idle,
            rate: clamp_rate(rate),
            voice: None,
            active: None,
            last_boundary_at: None,
            next_handle: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn active(&self) -> Option<&ActiveChunk> {
        self.active.as_ref()
    }

    pub fn active_handle(&self) -> Option<HandleId> {
        self.active.as_ref().map(|chunk| chunk.handle)
    }

    pub(crate) fn allocate_handle(&mut self) -> HandleId {
        self.next_handle = self.next_handle.wrapping_add(1);
        HandleId::new(self.next_handle)
    }

    /// Drop per-chunk bookkeeping, returning the chunk that was live.
    pub(crate) fn clear_transient_playback_state(&mut self) -> Option<ActiveChunk> {
        self.last_boundary_at = None;
        self.active.take()
    }

    pub(crate) fn reset_to_idle(&mut self) {
        self.cursor = 0;
        self.play_state = PlayState::Idle;
    }

    pub(crate) fn set_cursor_clamped(&mut self, cursor: usize, word_count: usize) {
        self.cursor = cursor.min(word_count);
    }
}
