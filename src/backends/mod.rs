//! Concrete playback collaborators for the core engine.
//!
//! Each backend runs its chunk on a worker thread and reports back through
//! [`EventTx`]. Workers never touch engine state; a cancelled worker goes
//! quiet, and anything that slips through is rejected by handle identity.

pub mod on_device;
pub mod probe;
pub mod remote;
pub mod ticker;

use crate::audio;
use crate::cancellation::CancellationToken;
use crate::runtime::RuntimeMessage;
use read_aloud_core::{EngineEvent, HandleId};
use rodio::Sink;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use tracing::{debug, trace};

pub use on_device::EspeakBackend;
pub use probe::SystemProbe;
pub use remote::RemoteBackend;
pub use ticker::ThreadTicker;

/// Channel back to the runtime loop.
#[derive(Clone)]
pub struct EventTx {
    tx: Sender<RuntimeMessage>,
}

impl EventTx {
    pub fn new(tx: Sender<RuntimeMessage>) -> Self {
        Self { tx }
    }

    /// Post unless the worker was cancelled. Returns `false` if nothing was sent.
    pub fn post(&self, token: &CancellationToken, event: EngineEvent) -> bool {
        if token.is_cancelled() {
            trace!(handle = %event.handle(), "Dropping event from cancelled worker");
            return false;
        }
        self.tx.send(RuntimeMessage::Engine(event)).is_ok()
    }
}

/// The one chunk a backend currently owns.
pub(crate) struct LiveClip {
    pub handle: HandleId,
    pub sink: Arc<Sink>,
    pub token: CancellationToken,
}

#[derive(Default)]
pub(crate) struct ClipSlot {
    live: Option<LiveClip>,
}

impl ClipSlot {
    /// Install a new clip, releasing whatever was there.
    pub fn replace(&mut self, clip: LiveClip) {
        if let Some(old) = self.live.take() {
            debug!(handle = %old.handle, "Replacing live clip");
            release(old);
        }
        self.live = Some(clip);
    }

    pub fn pause(&self, handle: HandleId) {
        if let Some(clip) = self.owned(handle) {
            clip.sink.pause();
        }
    }

    pub fn resume(&self, handle: HandleId) {
        if let Some(clip) = self.owned(handle) {
            clip.sink.play();
        }
    }

    pub fn cancel(&mut self, handle: HandleId) {
        if self.live.as_ref().is_some_and(|clip| clip.handle == handle) {
            if let Some(clip) = self.live.take() {
                release(clip);
            }
        }
    }

    fn owned(&self, handle: HandleId) -> Option<&LiveClip> {
        self.live.as_ref().filter(|clip| clip.handle == handle)
    }
}

fn release(clip: LiveClip) {
    clip.token.cancel();
    audio::discard(&clip.sink);
}
