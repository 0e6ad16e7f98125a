//! Word-sync engine: the state machine that keeps a word cursor in step with
//! speech coming out of either backend.
//!
//! States are `Idle -> Playing <-> Paused`, `Playing -> Finished`, and any
//! state back to `Idle` via stop/restart. A backend resource exists exactly
//! while the session is `Playing` or `Paused`; it is always released before a
//! new one is started. Events produced by an earlier resource are rejected by
//! handle identity, so a late completion can never move the cursor after the
//! user has stopped or skipped.

use crate::backend::{
    BOUNDARY_COALESCE_WINDOW, Backends, ChunkRequest, EngineEvent, HandleId, Mode, Ticker, Tracking,
};
use crate::error::PlaybackError;
use crate::render::{PlayState, RenderSink, Status};
use crate::session::{ActiveChunk, PlaybackSession, clamp_rate};
use crate::tokenizer::Document;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

pub struct WordSyncEngine {
    document: Document,
    session: PlaybackSession,
    backends: Backends,
    ticker: Box<dyn Ticker>,
    sink: Box<dyn RenderSink>,
}

impl WordSyncEngine {
    pub fn new(
        backends: Backends,
        ticker: Box<dyn Ticker>,
        sink: Box<dyn RenderSink>,
        mode: Mode,
        rate: f32,
    ) -> Self {
        Self {
            document: Document::default(),
            session: PlaybackSession::new(mode, rate),
            backends,
            ticker,
            sink,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn cursor(&self) -> usize {
        self.session.cursor
    }

    pub fn play_state(&self) -> PlayState {
        self.session.play_state
    }

    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    /// Replace the document wholesale and rewind to an idle session.
    pub fn load(&mut self, document: Document) {
        self.teardown();
        info!(words = document.len(), "Loaded document");
        self.document = document;
        self.session.reset_to_idle();
        self.render();
    }

    /// Start speaking at `from`, releasing whatever was playing before.
    pub fn play(&mut self, from: usize) -> Result<(), PlaybackError> {
        if self.document.is_empty() {
            self.emit_status(Status::LoadContentFirst);
            return Err(PlaybackError::NoContent);
        }
        if self.session.mode == Mode::Unavailable {
            self.emit_status(Status::ConfigureServer);
            return Err(PlaybackError::BackendUnavailable);
        }

        self.teardown();
        if from >= self.document.len() {
            self.finish();
            return Ok(());
        }
        self.session.cursor = from;
        self.start_chunk_at(from)
    }

    pub fn pause(&mut self) {
        if self.session.play_state != PlayState::Playing {
            return;
        }
        if let Some(active) = self.session.active.as_ref() {
            let (handle, mode) = (active.handle, active.mode);
            if mode.tracking() == Tracking::EstimatedTimer {
                self.ticker.cancel();
            }
            if let Some(backend) = self.backends.for_mode(mode) {
                backend.pause(handle);
            }
            debug!(%handle, cursor = self.session.cursor, "Paused playback");
        }
        self.session.play_state = PlayState::Paused;
        self.emit_status(Status::Paused);
        self.render();
    }

    pub fn resume(&mut self) {
        if self.session.play_state != PlayState::Paused {
            return;
        }
        if let Some(active) = self.session.active.as_ref() {
            let (handle, mode, interval) = (active.handle, active.mode, active.word_interval);
            if let Some(backend) = self.backends.for_mode(mode) {
                backend.resume(handle);
            }
            if let (Tracking::EstimatedTimer, Some(interval)) = (mode.tracking(), interval) {
                self.ticker.arm(handle, interval);
            }
            debug!(%handle, cursor = self.session.cursor, "Resumed playback");
        }
        self.session.play_state = PlayState::Playing;
        self.emit_status(Status::Playing);
        self.render();
    }

    /// Release the backend resource and rewind. Safe to call when idle.
    pub fn stop(&mut self) {
        self.teardown();
        self.session.reset_to_idle();
        self.emit_status(Status::Stopped);
        self.render();
    }

    /// Like `stop`, but leaves the session ready to play from the start.
    pub fn restart(&mut self) {
        self.teardown();
        self.session.reset_to_idle();
        self.emit_status(Status::ReadyToPlay);
        self.render();
    }

    /// Move the cursor by `delta` words, clamped to the last word.
    ///
    /// While a resource is live playback is rebuilt from the new position,
    /// since neither backend can seek an in-flight stream.
    pub fn skip(&mut self, delta: i64) -> Result<usize, PlaybackError> {
        if self.document.is_empty() {
            self.emit_status(Status::LoadContentFirst);
            return Err(PlaybackError::NoContent);
        }
        let last = i64::try_from(self.document.len() - 1).unwrap_or(i64::MAX);
        let current = i64::try_from(self.session.cursor).unwrap_or(i64::MAX);
        let target = current.saturating_add(delta).clamp(0, last);
        let target = usize::try_from(target).unwrap_or_default();

        if self.session.play_state.is_active() {
            info!(from = self.session.cursor, to = target, "Skipping within playback");
            self.teardown();
            self.session.cursor = target;
            self.start_chunk_at(target)?;
        } else {
            debug!(from = self.session.cursor, to = target, "Moved cursor");
            self.session.cursor = target;
            if self.session.play_state == PlayState::Finished {
                self.session.play_state = PlayState::Idle;
            }
            self.render();
        }
        Ok(target)
    }

    /// Store a new rate; it applies from the next chunk or utterance.
    pub fn set_rate(&mut self, rate: f32) -> f32 {
        self.session.rate = clamp_rate(rate);
        debug!(rate = self.session.rate, "Updated playback rate");
        self.session.rate
    }

    pub fn set_voice(&mut self, voice: Option<String>) {
        debug!(voice = ?voice, "Updated voice");
        self.session.voice = voice;
    }

    /// Switch backend. Any live resource is released first.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.session.mode == mode {
            return;
        }
        if self.session.play_state.is_active() {
            self.teardown();
            self.session.play_state = PlayState::Idle;
        }
        info!(from = %self.session.mode, to = %mode, "Switched playback mode");
        self.session.mode = mode;
        self.render();
    }

    /// Apply one asynchronous backend or timer event.
    ///
    /// Returns `StaleCallback` for events whose handle is no longer live;
    /// those have no effect on the session.
    pub fn handle_event(&mut self, event: EngineEvent) -> Result<(), PlaybackError> {
        let handle = event.handle();
        if self.session.active_handle() != Some(handle) {
            debug!(%handle, live = ?self.session.active_handle(), "Discarding stale engine event");
            return Err(PlaybackError::StaleCallback { handle });
        }

        match event {
            EngineEvent::ClipLoaded { duration, .. } => self.on_clip_loaded(handle, duration),
            EngineEvent::WordBoundary { at, .. } => self.on_word_boundary(at),
            EngineEvent::TimerTick { .. } => self.on_timer_tick(),
            EngineEvent::ChunkEnded { .. } => self.on_chunk_ended(handle),
            EngineEvent::Failed { error, .. } => self.fail(error),
        }
        Ok(())
    }

    /// Push the current position to the render sink.
    pub fn render(&mut self) {
        self.sink.on_position_changed(
            self.session.cursor,
            self.session.play_state,
            &self.document,
        );
    }

    pub fn emit_status(&mut self, status: Status) {
        self.sink.on_status(&status);
    }

    fn start_chunk_at(&mut self, from: usize) -> Result<(), PlaybackError> {
        let mode = self.session.mode;
        let end = mode.chunk_end(from, self.document.len());
        let handle = self.session.allocate_handle();
        let request = ChunkRequest {
            handle,
            text: self.document.text_for(from..end),
            start: from,
            end,
            rate: self.session.rate,
            voice: self.session.voice.clone(),
        };
        self.session.active = Some(ActiveChunk {
            handle,
            mode,
            start: from,
            end,
            word_interval: None,
        });
        self.session.last_boundary_at = None;
        self.session.play_state = PlayState::Playing;
        info!(%handle, %mode, start = from, end, rate = request.rate, "Starting chunk");

        let started = match self.backends.for_mode(mode) {
            Some(backend) => backend.start_chunk(request),
            None => Err(PlaybackError::BackendUnavailable),
        };
        match started {
            Ok(()) => {
                let status = match mode.tracking() {
                    Tracking::EstimatedTimer => Status::GeneratingSpeech,
                    Tracking::NativeBoundaries => Status::Playing,
                };
                self.emit_status(status);
                self.render();
                Ok(())
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn on_clip_loaded(&mut self, handle: HandleId, duration: Duration) {
        let playing = self.session.play_state == PlayState::Playing;
        let Some(active) = self.session.active.as_mut() else {
            return;
        };
        if active.mode.tracking() == Tracking::EstimatedTimer {
            let words = u32::try_from(active.word_count().max(1)).unwrap_or(u32::MAX);
            let interval = duration / words;
            active.word_interval = Some(interval);
            debug!(%handle, ?duration, ?interval, words, "Estimated per-word cadence");
            if playing {
                self.ticker.arm(handle, interval);
            }
        }
        if playing {
            self.emit_status(Status::Playing);
        }
        self.render();
    }

    fn on_word_boundary(&mut self, at: Instant) {
        if self.session.play_state != PlayState::Playing {
            return;
        }
        if let Some(last) = self.session.last_boundary_at {
            if at.saturating_duration_since(last) < BOUNDARY_COALESCE_WINDOW {
                trace!("Coalesced word boundary");
                return;
            }
        }
        self.session.last_boundary_at = Some(at);
        let last_word = self.document.len().saturating_sub(1);
        if self.session.cursor < last_word {
            self.session.cursor += 1;
            self.render();
        }
    }

    fn on_timer_tick(&mut self) {
        if self.session.play_state != PlayState::Playing {
            self.ticker.cancel();
            return;
        }
        let Some(end) = self.session.active.as_ref().map(|chunk| chunk.end) else {
            return;
        };
        if self.session.cursor + 1 < end {
            self.session.cursor += 1;
            self.render();
        } else {
            // The chunk's last word stays current until the clip ends.
            self.ticker.cancel();
        }
    }

    fn on_chunk_ended(&mut self, handle: HandleId) {
        let Some(end) = self.session.active.as_ref().map(|chunk| chunk.end) else {
            return;
        };
        debug!(%handle, end, "Chunk finished");
        self.teardown();
        if end < self.document.len() {
            self.session.cursor = end;
            if let Err(err) = self.start_chunk_at(end) {
                warn!("Failed to continue with next chunk: {err}");
            }
        } else {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.teardown();
        self.session.set_cursor_clamped(self.document.len(), self.document.len());
        self.session.play_state = PlayState::Finished;
        info!(words = self.document.len(), "Playback finished");
        self.emit_status(Status::Finished);
        self.render();
    }

    /// Backend failure: return to a clean idle session and surface the detail.
    fn fail(&mut self, error: PlaybackError) {
        warn!("Playback failed: {error}");
        self.teardown();
        self.session.reset_to_idle();
        self.emit_status(Status::from(&error));
        self.render();
    }

    /// Cancel the tick source and release the live resource, if any.
    fn teardown(&mut self) {
        self.ticker.cancel();
        if let Some(chunk) = self.session.clear_transient_playback_state() {
            if let Some(backend) = self.backends.for_mode(chunk.mode) {
                backend.cancel(chunk.handle);
            }
            debug!(handle = %chunk.handle, "Released backend resource");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, Harness, document};
    use crate::tokenizer::tokenize;

    #[test]
    fn load_resets_cursor_and_state() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(10));
        h.engine.play(4).unwrap();

        h.engine.load(document(3));

        assert_eq!(h.engine.cursor(), 0);
        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert!(h.engine.session().active().is_none());
    }

    #[test]
    fn skip_always_stays_within_the_document() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(12));
        for delta in [i64::MIN, -100, -1, 0, 1, 5, 11, 12, 1_000, i64::MAX] {
            let cursor = h.engine.skip(delta).unwrap();
            assert!(cursor <= 11, "delta {delta} produced {cursor}");
            assert_eq!(h.engine.cursor(), cursor);
        }
        assert!(h.starts().is_empty(), "idle skips must not touch a backend");
    }

    #[test]
    fn stop_is_idempotent() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(8));
        h.engine.play(3).unwrap();

        h.engine.stop();
        let once = (h.engine.cursor(), h.engine.play_state(), h.engine.session().active_handle());
        h.engine.stop();
        let twice = (h.engine.cursor(), h.engine.play_state(), h.engine.session().active_handle());

        assert_eq!(once, (0, PlayState::Idle, None));
        assert_eq!(once, twice);
        let cancels = h
            .calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Cancel(_)))
            .count();
        assert_eq!(cancels, 1);
    }

    #[test]
    fn bursty_boundaries_are_coalesced() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(20));
        h.engine.play(0).unwrap();
        let handle = h.last_start().handle;
        let t0 = Instant::now();

        for offset in [0, 10, 40, 90, 150, 199] {
            h.engine
                .handle_event(EngineEvent::WordBoundary {
                    handle,
                    at: t0 + Duration::from_millis(offset),
                })
                .unwrap();
        }

        assert_eq!(h.engine.cursor(), 1);
    }

    #[test]
    fn spaced_boundaries_each_advance() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(20));
        h.engine.play(0).unwrap();
        let handle = h.last_start().handle;
        let t0 = Instant::now();

        for step in 0..5u64 {
            h.engine
                .handle_event(EngineEvent::WordBoundary {
                    handle,
                    at: t0 + Duration::from_millis(200 * step),
                })
                .unwrap();
        }

        assert_eq!(h.engine.cursor(), 5);
    }

    #[test]
    fn on_device_speaks_the_whole_remainder_and_finishes() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(30));
        h.engine.play(7).unwrap();

        let request = h.last_start();
        assert_eq!((request.start, request.end), (7, 30));
        assert!(request.text.starts_with("w7 w8"));

        let t0 = Instant::now();
        for step in 0..40u64 {
            h.engine
                .handle_event(EngineEvent::WordBoundary {
                    handle: request.handle,
                    at: t0 + Duration::from_millis(250 * step),
                })
                .unwrap();
        }
        assert_eq!(h.engine.cursor(), 29, "boundaries never run past the last word");

        h.engine
            .handle_event(EngineEvent::ChunkEnded {
                handle: request.handle,
            })
            .unwrap();
        assert_eq!(h.engine.cursor(), 30);
        assert_eq!(h.engine.play_state(), PlayState::Finished);
        assert_eq!(h.last_status(), Some(Status::Finished));
    }

    #[test]
    fn remote_playback_walks_chunks_without_gaps() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(120));
        h.engine.play(0).unwrap();

        let mut seen = vec![h.engine.cursor()];
        loop {
            let request = h.last_start();
            assert!(request.word_count() <= 50);
            h.engine
                .handle_event(EngineEvent::ClipLoaded {
                    handle: request.handle,
                    duration: Duration::from_secs(10),
                })
                .unwrap();
            // One more tick than words: the surplus must not advance.
            for _ in 0..=request.word_count() {
                h.engine
                    .handle_event(EngineEvent::TimerTick {
                        handle: request.handle,
                    })
                    .unwrap();
                seen.push(h.engine.cursor());
            }
            h.engine
                .handle_event(EngineEvent::ChunkEnded {
                    handle: request.handle,
                })
                .unwrap();
            seen.push(h.engine.cursor());
            if h.engine.play_state() == PlayState::Finished {
                break;
            }
        }

        let starts: Vec<(usize, usize)> = h.starts().iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(starts, vec![(0, 50), (50, 100), (100, 120)]);
        assert!(seen.windows(2).all(|pair| pair[1] == pair[0] || pair[1] == pair[0] + 1));
        let mut distinct = seen.clone();
        distinct.dedup();
        assert_eq!(distinct, (0..=120).collect::<Vec<_>>());
    }

    #[test]
    fn five_word_remote_scenario() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(tokenize("Hello world from the test").unwrap());
        h.engine.play(0).unwrap();

        let request = h.last_start();
        assert_eq!((request.start, request.end), (0, 5));
        assert_eq!(request.text, "Hello world from the test");
        assert_eq!(h.last_status(), Some(Status::GeneratingSpeech));

        h.engine
            .handle_event(EngineEvent::ClipLoaded {
                handle: request.handle,
                duration: Duration::from_millis(2500),
            })
            .unwrap();
        assert!(
            h.calls
                .borrow()
                .contains(&Call::Arm(request.handle, Duration::from_millis(500)))
        );

        for _ in 0..2 {
            h.engine
                .handle_event(EngineEvent::TimerTick {
                    handle: request.handle,
                })
                .unwrap();
        }
        assert_eq!(h.engine.cursor(), 2);

        h.engine
            .handle_event(EngineEvent::ChunkEnded {
                handle: request.handle,
            })
            .unwrap();
        assert_eq!(h.engine.cursor(), 5);
        assert_eq!(h.engine.play_state(), PlayState::Finished);
    }

    #[test]
    fn stop_during_remote_request_discards_the_late_completion() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(40));
        h.engine.play(10).unwrap();
        let handle = h.last_start().handle;

        h.engine.stop();
        h.clear_calls();

        for event in [
            EngineEvent::ClipLoaded {
                handle,
                duration: Duration::from_secs(4),
            },
            EngineEvent::TimerTick { handle },
            EngineEvent::ChunkEnded { handle },
        ] {
            assert_eq!(
                h.engine.handle_event(event),
                Err(PlaybackError::StaleCallback { handle })
            );
        }

        assert_eq!(h.engine.cursor(), 0);
        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert!(h.calls.borrow().is_empty());
    }

    #[test]
    fn rate_change_then_skip_rebuilds_the_remote_chunk() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(100));
        h.engine.play(0).unwrap();
        let old = h.last_start().handle;

        h.engine.set_rate(1.5);
        h.engine.skip(10).unwrap();

        let request = h.last_start();
        assert!(h.calls.borrow().contains(&Call::Cancel(old)));
        assert_ne!(request.handle, old);
        assert_eq!((request.start, request.end), (10, 60));
        assert_eq!(request.rate, 1.5);
        assert_eq!(h.engine.play_state(), PlayState::Playing);
    }

    #[test]
    fn remote_pause_cancels_the_timer_and_resume_rearms_it() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(10));
        h.engine.play(0).unwrap();
        let handle = h.last_start().handle;
        h.engine
            .handle_event(EngineEvent::ClipLoaded {
                handle,
                duration: Duration::from_secs(5),
            })
            .unwrap();
        h.clear_calls();

        h.engine.pause();
        assert_eq!(
            *h.calls.borrow(),
            vec![Call::TickerCancel, Call::Pause(handle)]
        );
        h.engine
            .handle_event(EngineEvent::TimerTick { handle })
            .unwrap();
        assert_eq!(h.engine.cursor(), 0, "ticks while paused are ignored");
        h.clear_calls();

        h.engine.resume();
        assert_eq!(
            *h.calls.borrow(),
            vec![
                Call::Resume(handle),
                Call::Arm(handle, Duration::from_millis(500))
            ]
        );
        assert_eq!(h.engine.play_state(), PlayState::Playing);
    }

    #[test]
    fn clip_arriving_while_paused_does_not_start_the_timer() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(4));
        h.engine.play(0).unwrap();
        let handle = h.last_start().handle;
        h.engine.pause();
        h.clear_calls();

        h.engine
            .handle_event(EngineEvent::ClipLoaded {
                handle,
                duration: Duration::from_secs(2),
            })
            .unwrap();

        assert!(h.calls.borrow().is_empty());
        assert_eq!(h.engine.play_state(), PlayState::Paused);
    }

    #[test]
    fn backend_failure_returns_to_idle_with_error_status() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(60));
        h.engine.play(20).unwrap();
        let handle = h.last_start().handle;

        h.engine
            .handle_event(EngineEvent::Failed {
                handle,
                error: PlaybackError::SynthesisRequest("TTS server error: Internal Server Error".into()),
            })
            .unwrap();

        assert_eq!(h.engine.cursor(), 0);
        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert!(h.engine.session().active().is_none());
        assert_eq!(
            h.last_status().map(|status| status.to_string()),
            Some("Error: TTS server error: Internal Server Error".to_string())
        );
    }

    #[test]
    fn synchronous_start_failure_leaves_no_live_handle() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(5));
        *h.fail_start.borrow_mut() = Some(PlaybackError::PlaybackResource("no audio device".into()));

        let result = h.engine.play(0);

        assert_eq!(
            result,
            Err(PlaybackError::PlaybackResource("no audio device".into()))
        );
        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert!(h.engine.session().active().is_none());
    }

    #[test]
    fn failed_next_chunk_start_lands_idle_without_a_handle() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(120));
        h.engine.play(0).unwrap();
        let handle = h.last_start().handle;
        *h.fail_start.borrow_mut() = Some(PlaybackError::SynthesisRequest("connection refused".into()));

        h.engine
            .handle_event(EngineEvent::ChunkEnded { handle })
            .unwrap();

        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert!(h.engine.session().active().is_none());
        assert_eq!(h.starts().len(), 1);
        assert_eq!(
            h.last_status(),
            Some(Status::Error("connection refused".into()))
        );
    }

    #[test]
    fn skip_while_paused_rebuilds_playback_and_plays() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(10));
        h.engine.play(0).unwrap();
        let paused = h.last_start().handle;
        h.engine.pause();
        h.clear_calls();

        assert_eq!(h.engine.skip(3), Ok(3));

        let starts = h.starts();
        assert_eq!(starts.len(), 1);
        assert_eq!((starts[0].start, starts[0].end), (3, 10));
        assert!(h.calls.borrow().contains(&Call::Cancel(paused)));
        assert_eq!(h.engine.session().active_handle(), Some(starts[0].handle));
        assert_eq!(h.engine.cursor(), 3);
        assert_eq!(h.engine.play_state(), PlayState::Playing);
    }

    #[test]
    fn skip_from_finished_returns_to_idle_on_the_last_word() {
        let mut h = Harness::new(Mode::Remote);
        h.engine.load(document(3));
        h.engine.play(0).unwrap();
        let handle = h.last_start().handle;
        h.engine
            .handle_event(EngineEvent::ChunkEnded { handle })
            .unwrap();
        assert_eq!(h.engine.play_state(), PlayState::Finished);
        assert_eq!(h.engine.cursor(), 3);
        h.clear_calls();

        assert_eq!(h.engine.skip(5), Ok(2));

        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert_eq!(h.engine.cursor(), 2);
        assert!(h.starts().is_empty());
        assert_eq!(h.engine.skip(-1), Ok(1));
    }

    #[test]
    fn play_without_content_reports_status() {
        let mut h = Harness::new(Mode::OnDevice);
        assert_eq!(h.engine.play(0), Err(PlaybackError::NoContent));
        assert_eq!(h.last_status(), Some(Status::LoadContentFirst));
        assert!(h.starts().is_empty());
    }

    #[test]
    fn unavailable_mode_refuses_to_play() {
        let mut h = Harness::new(Mode::Unavailable);
        h.engine.load(document(5));
        assert_eq!(h.engine.play(0), Err(PlaybackError::BackendUnavailable));
        assert_eq!(h.last_status(), Some(Status::ConfigureServer));
        assert_eq!(h.engine.play_state(), PlayState::Idle);
    }

    #[test]
    fn restart_rewinds_without_playing() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(5));
        h.engine.play(3).unwrap();
        let starts_before = h.starts().len();

        h.engine.restart();

        assert_eq!(h.engine.cursor(), 0);
        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert_eq!(h.starts().len(), starts_before);
        assert_eq!(h.last_status(), Some(Status::ReadyToPlay));
    }

    #[test]
    fn switching_mode_releases_the_live_handle() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(5));
        h.engine.play(0).unwrap();
        let handle = h.last_start().handle;

        h.engine.set_mode(Mode::Remote);

        assert!(h.calls.borrow().contains(&Call::Cancel(handle)));
        assert_eq!(h.engine.play_state(), PlayState::Idle);
        assert_eq!(h.engine.mode(), Mode::Remote);
    }

    #[test]
    fn every_state_change_is_rendered() {
        let mut h = Harness::new(Mode::OnDevice);
        h.engine.load(document(3));
        h.engine.play(0).unwrap();
        h.engine.pause();
        h.engine.resume();
        h.engine.stop();

        let states: Vec<PlayState> = h
            .recorded
            .borrow()
            .positions
            .iter()
            .map(|(_, state)| *state)
            .collect();
        assert_eq!(
            states,
            vec![
                PlayState::Idle,
                PlayState::Playing,
                PlayState::Paused,
                PlayState::Playing,
                PlayState::Idle
            ]
        );
    }
}
