//! Word-synchronized read-aloud playback core.
//!
//! This crate owns the state machine and nothing else: tokenizing text into a
//! `Document`, choosing a backend, keeping the word cursor in step with speech,
//! and exposing transport controls. Speech engines, HTTP, audio devices, timers
//! and the UI are reached only through the traits in [`backend`], [`selector`]
//! and [`render`], so every behaviour here can be driven with synthetic events.

pub mod backend;
pub mod engine;
pub mod error;
pub mod render;
pub mod selector;
pub mod session;
pub mod tokenizer;
pub mod transport;

#[cfg(test)]
mod testing;

pub use backend::{
    BOUNDARY_COALESCE_WINDOW, Backends, ChunkRequest, EngineEvent, HandleId, Mode, PlaybackBackend,
    REMOTE_CHUNK_WORDS, Ticker, Tracking,
};
pub use engine::WordSyncEngine;
pub use error::PlaybackError;
pub use render::{PlayState, RenderSink, Status};
pub use selector::{BackendProbe, BackendSelection, Capabilities, RemoteHealth, Voice, select_backend};
pub use session::{MAX_RATE, MIN_RATE, PlaybackSession, clamp_rate};
pub use tokenizer::{Document, tokenize};
pub use transport::{ControlsView, ProbeOutcome, Source, TransportController};
