//! Remote synthesis backend: one HTTP request per chunk, cursor estimated.

use super::{ClipSlot, EventTx, LiveClip};
use crate::audio::{self, AudioOutput};
use crate::cancellation::CancellationToken;
use crate::remote::RemoteClient;
use read_aloud_core::{ChunkRequest, EngineEvent, HandleId, PlaybackBackend, PlaybackError};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, info, warn};

pub struct RemoteBackend {
    client: Arc<Mutex<RemoteClient>>,
    audio: AudioOutput,
    events: EventTx,
    slot: ClipSlot,
}

impl RemoteBackend {
    pub fn new(client: Arc<Mutex<RemoteClient>>, events: EventTx) -> Self {
        Self {
            client,
            audio: AudioOutput::new(),
            events,
            slot: ClipSlot::default(),
        }
    }
}

impl PlaybackBackend for RemoteBackend {
    fn start_chunk(&mut self, request: ChunkRequest) -> Result<(), PlaybackError> {
        let sink = self.audio.new_sink()?;
        let client = self
            .client
            .lock()
            .map_err(|_| PlaybackError::SynthesisRequest("HTTP client unavailable".into()))?
            .clone();
        let token = CancellationToken::new();
        self.slot.replace(LiveClip {
            handle: request.handle,
            sink: Arc::clone(&sink),
            token: token.clone(),
        });

        let events = self.events.clone();
        info!(
            handle = %request.handle,
            start = request.start,
            end = request.end,
            rate = request.rate,
            "Starting remote chunk"
        );
        thread::Builder::new()
            .name(format!("remote-{}", request.handle.get()))
            .spawn(move || run_chunk(client, request, sink, token, events))
            .map_err(|err| PlaybackError::SynthesisRequest(format!("Spawning worker: {err}")))?;
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

fn run_chunk(
    client: RemoteClient,
    request: ChunkRequest,
    sink: Arc<rodio::Sink>,
    token: CancellationToken,
    events: EventTx,
) {
    let handle = request.handle;
    let bytes = match client.synthesize(&request.text, request.rate, request.voice.as_deref()) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(%handle, "Synthesis failed: {error}");
            events.post(&token, EngineEvent::Failed { handle, error });
            return;
        }
    };
    if token.is_cancelled() {
        debug!(%handle, "Discarding audio for cancelled chunk");
        return;
    }

    let duration = audio::wav_duration(&bytes);
    if let Err(error) = audio::append_clip(&sink, bytes) {
        events.post(&token, EngineEvent::Failed { handle, error });
        return;
    }
    if !events.post(&token, EngineEvent::ClipLoaded { handle, duration }) {
        return;
    }
    if audio::follow_clip(&sink, &token, None, |_| {}) {
        events.post(&token, EngineEvent::ChunkEnded { handle });
    }
}
