//! Failure taxonomy for the playback core.
//!
//! Everything that can go wrong between a user intent and an audible word ends
//! up as one of these variants. The engine converts backend failures into a
//! status message plus a forced transition to `Idle`; nothing here is meant to
//! escape to the UI as an unhandled fault.

use crate::backend::HandleId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Tokenization produced zero words.
    #[error("No text found")]
    EmptyInput,

    /// A playback operation was requested before any document was loaded.
    #[error("Please load content first")]
    NoContent,

    /// Neither the on-device synthesizer nor the remote service is usable.
    #[error("TTS not available. Configure server below.")]
    BackendUnavailable,

    /// The remote service rejected or failed a synthesis request.
    #[error("{0}")]
    SynthesisRequest(String),

    /// Audio or speech output failed after it was started.
    #[error("{0}")]
    PlaybackResource(String),

    /// A completion or progress event outlived the handle it belongs to.
    #[error("stale event for handle {handle}")]
    StaleCallback { handle: HandleId },
}
