//! Transport controls: user intents validated against engine state.

use crate::backend::{EngineEvent, Mode};
use crate::engine::WordSyncEngine;
use crate::error::PlaybackError;
use crate::render::{PlayState, Status};
use crate::selector::{BackendProbe, BackendSelection, select_backend};
use crate::tokenizer::tokenize;
use serde::Serialize;
use tracing::{debug, info};

/// Where loaded text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Page(String),
    Selection(String),
}

impl Source {
    fn text(&self) -> &str {
        match self {
            Source::Page(text) | Source::Selection(text) => text,
        }
    }

    fn loaded_status(&self) -> Status {
        match self {
            Source::Page(_) => Status::PageLoaded,
            Source::Selection(_) => Status::SelectionLoaded,
        }
    }
}

/// Result of a backend re-probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Selected(Mode),
    /// Playback is live; probing was skipped so the session is not disturbed.
    Deferred,
}

/// Which controls a UI should enable, mirroring the panel's button rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlsView {
    pub can_load: bool,
    pub can_play_pause: bool,
    pub can_stop: bool,
    pub can_skip: bool,
    pub can_restart: bool,
    pub shows_pause: bool,
    pub progress_pct: f64,
}

pub struct TransportController {
    engine: WordSyncEngine,
    selection: Option<BackendSelection>,
}

impl TransportController {
    pub fn new(engine: WordSyncEngine) -> Self {
        Self {
            engine,
            selection: None,
        }
    }

    pub fn engine(&self) -> &WordSyncEngine {
        &self.engine
    }

    pub fn selection(&self) -> Option<&BackendSelection> {
        self.selection.as_ref()
    }

    /// Tokenize and install new content. Empty input leaves the session as is.
    pub fn load_document(&mut self, source: Source) -> Result<usize, PlaybackError> {
        match tokenize(source.text()) {
            Ok(document) => {
                let words = document.len();
                self.engine.load(document);
                self.engine.emit_status(source.loaded_status());
                Ok(words)
            }
            Err(err) => {
                info!("Refusing to load empty content");
                self.engine.emit_status(Status::from(&err));
                Err(err)
            }
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if self.engine.document().is_empty() {
            self.engine.emit_status(Status::LoadContentFirst);
            return;
        }
        match self.engine.play_state() {
            PlayState::Playing => self.engine.pause(),
            PlayState::Paused => self.engine.resume(),
            PlayState::Idle => {
                let from = self.engine.cursor();
                // Failures are already surfaced as status by the engine.
                let _ = self.engine.play(from);
            }
            PlayState::Finished => {
                debug!("Replaying finished document from the start");
                let _ = self.engine.play(0);
            }
        }
        self.engine.render();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn restart(&mut self) {
        self.engine.restart();
    }

    pub fn skip(&mut self, words: i64) {
        let _ = self.engine.skip(words);
        self.engine.render();
    }

    pub fn set_rate(&mut self, rate: f32) -> f32 {
        let applied = self.engine.set_rate(rate);
        self.engine.render();
        applied
    }

    pub fn set_voice(&mut self, voice: Option<String>) {
        self.engine.set_voice(voice);
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.engine.set_mode(mode);
        self.emit_mode_status(mode);
    }

    /// Run backend selection unless playback is live.
    ///
    /// Safe to call on every voice-list-changed notification.
    pub fn reprobe(&mut self, probe: &dyn BackendProbe) -> ProbeOutcome {
        if self.engine.play_state().is_active() {
            debug!("Skipping backend probe during playback");
            return ProbeOutcome::Deferred;
        }
        let selection = select_backend(probe);
        let mode = selection.mode;
        self.selection = Some(selection);
        self.set_mode(mode);
        ProbeOutcome::Selected(mode)
    }

    /// Forward a backend or timer event; stale events are dropped here.
    pub fn handle_event(&mut self, event: EngineEvent) {
        if let Err(err) = self.engine.handle_event(event) {
            debug!("{err}");
        }
    }

    pub fn controls(&self) -> ControlsView {
        let has_content = !self.engine.document().is_empty();
        let state = self.engine.play_state();
        let active = state.is_active();
        let progress_pct = if has_content {
            self.engine.cursor() as f64 / self.engine.document().len() as f64 * 100.0
        } else {
            0.0
        };
        ControlsView {
            can_load: !active,
            can_play_pause: has_content,
            can_stop: active || has_content,
            can_skip: active || has_content,
            can_restart: active || has_content,
            shows_pause: state == PlayState::Playing,
            progress_pct,
        }
    }

    fn emit_mode_status(&mut self, mode: Mode) {
        let status = match mode {
            Mode::OnDevice => Status::UsingOnDevice,
            Mode::Remote => Status::UsingRemote,
            Mode::Unavailable => Status::Unavailable,
        };
        self.engine.emit_status(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::RemoteHealth;
    use crate::selector::tests::{FakeProbe, voice};
    use crate::testing::{Harness, Logs};

    fn controller(mode: Mode) -> (TransportController, Logs) {
        let Harness { engine, logs } = Harness::new(mode);
        (TransportController::new(engine), logs)
    }

    #[test]
    fn toggle_before_load_asks_for_content() {
        let (mut transport, h) = controller(Mode::OnDevice);
        transport.toggle_play_pause();
        assert_eq!(h.last_status(), Some(Status::LoadContentFirst));
        assert!(h.starts().is_empty());
    }

    #[test]
    fn load_leaves_cursor_at_zero_and_idle() {
        let (mut transport, h) = controller(Mode::Remote);
        let words = transport
            .load_document(Source::Page("one two three".into()))
            .unwrap();
        assert_eq!(words, 3);
        assert_eq!(transport.engine().cursor(), 0);
        assert_eq!(transport.engine().play_state(), PlayState::Idle);
        assert_eq!(h.last_status(), Some(Status::PageLoaded));
    }

    #[test]
    fn empty_load_keeps_previous_document() {
        let (mut transport, h) = controller(Mode::Remote);
        transport
            .load_document(Source::Selection("keep these words".into()))
            .unwrap();
        transport.skip(2);

        let result = transport.load_document(Source::Page("   \n".into()));

        assert_eq!(result, Err(PlaybackError::EmptyInput));
        assert_eq!(transport.engine().document().len(), 3);
        assert_eq!(transport.engine().cursor(), 2);
        assert_eq!(h.last_status(), Some(Status::NoTextFound));
    }

    #[test]
    fn toggle_cycles_play_pause_resume() {
        let (mut transport, h) = controller(Mode::OnDevice);
        transport
            .load_document(Source::Page("a b c d".into()))
            .unwrap();

        transport.toggle_play_pause();
        assert_eq!(transport.engine().play_state(), PlayState::Playing);
        assert!(transport.controls().shows_pause);
        assert!(!transport.controls().can_load);

        transport.toggle_play_pause();
        assert_eq!(transport.engine().play_state(), PlayState::Paused);
        assert_eq!(h.last_status(), Some(Status::Paused));

        transport.toggle_play_pause();
        assert_eq!(transport.engine().play_state(), PlayState::Playing);
        assert_eq!(h.starts().len(), 1, "resume must reuse the live utterance");
    }

    #[test]
    fn toggle_after_finish_replays_from_start() {
        let (mut transport, h) = controller(Mode::Remote);
        transport.load_document(Source::Page("x y".into())).unwrap();
        transport.toggle_play_pause();
        let handle = h.last_start().handle;
        transport.handle_event(EngineEvent::ChunkEnded { handle });
        assert_eq!(transport.engine().play_state(), PlayState::Finished);
        assert_eq!(transport.controls().progress_pct, 100.0);

        transport.toggle_play_pause();

        let request = h.last_start();
        assert_eq!((request.start, request.end), (0, 2));
        assert_eq!(transport.engine().play_state(), PlayState::Playing);
    }

    #[test]
    fn reprobe_is_deferred_while_playing() {
        let (mut transport, _h) = controller(Mode::OnDevice);
        transport.load_document(Source::Page("a b".into())).unwrap();
        transport.toggle_play_pause();

        let probe = FakeProbe::new(Vec::new(), Ok(RemoteHealth::default()));
        assert_eq!(transport.reprobe(&probe), ProbeOutcome::Deferred);
        assert_eq!(transport.engine().mode(), Mode::OnDevice);
        assert_eq!(probe.remote_calls.get(), 0);
    }

    #[test]
    fn reprobe_is_deferred_while_paused() {
        let (mut transport, h) = controller(Mode::Remote);
        transport.load_document(Source::Page("a b c".into())).unwrap();
        transport.toggle_play_pause();
        transport.toggle_play_pause();
        assert_eq!(transport.engine().play_state(), PlayState::Paused);
        let live = transport.engine().session().active_handle();

        let probe = FakeProbe::new(vec![voice("en")], Ok(RemoteHealth::default()));

        assert_eq!(transport.reprobe(&probe), ProbeOutcome::Deferred);
        assert_eq!(transport.engine().mode(), Mode::Remote);
        assert_eq!(transport.engine().session().active_handle(), live);
        assert_eq!(h.starts().len(), 1);
    }

    #[test]
    fn reprobe_when_idle_switches_mode() {
        let (mut transport, h) = controller(Mode::Unavailable);
        let probe = FakeProbe::new(vec![voice("en")], Err("down".into()));

        assert_eq!(
            transport.reprobe(&probe),
            ProbeOutcome::Selected(Mode::OnDevice)
        );
        assert_eq!(transport.engine().mode(), Mode::OnDevice);
        assert_eq!(h.last_status(), Some(Status::UsingOnDevice));
        assert_eq!(
            transport.selection().map(|s| s.capabilities.voices.len()),
            Some(1)
        );
    }

    #[test]
    fn failed_probe_reports_persistent_warning() {
        let (mut transport, h) = controller(Mode::OnDevice);
        let probe = FakeProbe::new(Vec::new(), Err("timed out".into()));

        transport.reprobe(&probe);

        let status = h.last_status().unwrap();
        assert_eq!(status, Status::Unavailable);
        assert!(status.is_warning());
    }

    #[test]
    fn set_rate_clamps_into_range() {
        let (mut transport, _h) = controller(Mode::Remote);
        assert_eq!(transport.set_rate(9.0), 2.0);
        assert_eq!(transport.set_rate(0.0), 0.5);
        assert_eq!(transport.set_rate(1.23), 1.2);
    }

    #[test]
    fn controls_disable_transport_without_content() {
        let (transport, _h) = controller(Mode::OnDevice);
        let controls = transport.controls();
        assert!(controls.can_load);
        assert!(!controls.can_play_pause);
        assert!(!controls.can_skip);
        assert_eq!(controls.progress_pct, 0.0);
    }
}
