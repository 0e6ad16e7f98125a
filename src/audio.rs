//! Audio output via `rodio` and clip measurement via `hound`.

use crate::cancellation::CancellationToken;
use read_aloud_core::PlaybackError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Lazily opened output device. The stream must stay on the thread that
/// opened it; sinks handed out are shareable with worker threads.
#[derive(Default)]
pub struct AudioOutput {
    stream: Option<(OutputStream, OutputStreamHandle)>,
}

impl AudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, playing sink for one chunk.
    pub fn new_sink(&mut self) -> Result<Arc<Sink>, PlaybackError> {
        if self.stream.is_none() {
            let opened = OutputStream::try_default()
                .map_err(|err| PlaybackError::PlaybackResource(format!("Opening audio output: {err}")))?;
            debug!("Opened audio output stream");
            self.stream = Some(opened);
        }
        let Some((_, handle)) = self.stream.as_ref() else {
            return Err(PlaybackError::PlaybackResource("Audio output unavailable".into()));
        };
        let sink = Sink::try_new(handle)
            .map_err(|err| PlaybackError::PlaybackResource(format!("Creating sink: {err}")))?;
        Ok(Arc::new(sink))
    }
}

/// Clip length from the WAV header, falling back to the decoder's estimate.
pub fn wav_duration(bytes: &[u8]) -> Duration {
    match hound::WavReader::new(Cursor::new(bytes)) {
        Ok(reader) => {
            let spec = reader.spec();
            if spec.sample_rate > 0 && reader.duration() > 0 {
                return Duration::from_secs_f64(reader.duration() as f64 / spec.sample_rate as f64);
            }
        }
        Err(err) => debug!("WAV header unreadable, asking decoder: {err}"),
    }
    Decoder::new(Cursor::new(bytes.to_vec()))
        .ok()
        .and_then(|d| d.total_duration())
        .unwrap_or(Duration::from_secs(1))
}

/// Decode a WAV clip onto the sink.
pub fn append_clip(sink: &Sink, bytes: Vec<u8>) -> Result<(), PlaybackError> {
    let source = Decoder::new(Cursor::new(bytes))
        .map_err(|err| PlaybackError::PlaybackResource(format!("Decoding audio: {err}")))?;
    sink.append(source);
    Ok(())
}

/// Estimated boundary cadence for a clip that has no native word events.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryCadence {
    pub words: usize,
    pub interval: Duration,
}

/// Block until the sink drains, counting only unpaused time.
///
/// `on_boundary` fires for words `1..words` as audible time passes each
/// cadence step, at most once per poll. Returns `false` if cancelled before
/// the clip finished.
pub fn follow_clip(
    sink: &Sink,
    token: &CancellationToken,
    cadence: Option<BoundaryCadence>,
    mut on_boundary: impl FnMut(Instant),
) -> bool {
    let mut audible = Duration::ZERO;
    let mut next_word = 1usize;
    loop {
        if token.is_cancelled() {
            return false;
        }
        if sink.empty() {
            return true;
        }
        std::thread::sleep(PLAYBACK_POLL_INTERVAL);
        if sink.is_paused() {
            continue;
        }
        audible += PLAYBACK_POLL_INTERVAL;
        if let Some(cadence) = cadence {
            if next_word < cadence.words
                && audible >= cadence.interval * u32::try_from(next_word).unwrap_or(u32::MAX)
            {
                if token.is_cancelled() {
                    return false;
                }
                on_boundary(Instant::now());
                next_word += 1;
            }
        }
    }
}

/// Stop a sink and log if it still had queued audio.
pub fn discard(sink: &Sink) {
    if !sink.empty() {
        warn!(queued = sink.len(), "Discarding queued audio");
    }
    sink.stop();
}
