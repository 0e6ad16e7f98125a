//! Render callback interface consumed by the UI layer.

use crate::error::PlaybackError;
use crate::tokenizer::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    #[default]
    Idle,
    Playing,
    Paused,
    Finished,
}

impl PlayState {
    /// True while a backend resource is live.
    pub fn is_active(self) -> bool {
        matches!(self, PlayState::Playing | PlayState::Paused)
    }
}

/// User-facing status line.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    PageLoaded,
    SelectionLoaded,
    GeneratingSpeech,
    Playing,
    Paused,
    Stopped,
    Finished,
    ReadyToPlay,
    NoTextFound,
    LoadContentFirst,
    ConfigureServer,
    UsingOnDevice,
    UsingRemote,
    Unavailable,
    Error(String),
}

impl Status {
    /// Statuses that should stay visible as a warning until the next probe.
    pub fn is_warning(&self) -> bool {
        matches!(self, Status::Unavailable | Status::ConfigureServer | Status::Error(_))
    }
}

impl From<&PlaybackError> for Status {
    fn from(err: &PlaybackError) -> Self {
        match err {
            PlaybackError::EmptyInput => Status::NoTextFound,
            PlaybackError::NoContent => Status::LoadContentFirst,
            PlaybackError::BackendUnavailable => Status::Unavailable,
            other => Status::Error(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::PageLoaded => write!(f, "Page loaded"),
            Status::SelectionLoaded => write!(f, "Selection loaded"),
            Status::GeneratingSpeech => write!(f, "Generating speech..."),
            Status::Playing => write!(f, "Playing..."),
            Status::Paused => write!(f, "Paused"),
            Status::Stopped => write!(f, "Stopped"),
            Status::Finished => write!(f, "Finished"),
            Status::ReadyToPlay => write!(f, "Ready to play"),
            Status::NoTextFound => write!(f, "No text found"),
            Status::LoadContentFirst => write!(f, "Please load content first"),
            Status::ConfigureServer => write!(f, "Please configure TTS server"),
            Status::UsingOnDevice => write!(f, "Using on-device speech"),
            Status::UsingRemote => write!(f, "Using local TTS server"),
            Status::Unavailable => write!(f, "TTS not available. Configure server below."),
            Status::Error(detail) => write!(f, "Error: {detail}"),
        }
    }
}

/// Sink invoked synchronously after every state-affecting operation.
///
/// Implementations must tolerate repeated calls with identical arguments.
pub trait RenderSink {
    fn on_position_changed(&mut self, cursor: usize, play_state: PlayState, document: &Document);

    fn on_status(&mut self, _status: &Status) {}
}
