//! Recording fakes shared by the engine and transport tests.

use crate::backend::{Backends, ChunkRequest, HandleId, Mode, PlaybackBackend, Ticker};
use crate::engine::WordSyncEngine;
use crate::error::PlaybackError;
use crate::render::{PlayState, RenderSink, Status};
use crate::tokenizer::Document;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Start(ChunkRequest),
    Pause(HandleId),
    Resume(HandleId),
    Cancel(HandleId),
    Arm(HandleId, Duration),
    TickerCancel,
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

pub(crate) struct FakeBackend {
    log: CallLog,
    fail_start: Rc<RefCell<Option<PlaybackError>>>,
}

impl PlaybackBackend for FakeBackend {
    fn start_chunk(&mut self, request: ChunkRequest) -> Result<(), PlaybackError> {
        if let Some(err) = self.fail_start.borrow_mut().take() {
            return Err(err);
        }
        self.log.borrow_mut().push(Call::Start(request));
        Ok(())
    }

    fn pause(&mut self, handle: HandleId) {
        self.log.borrow_mut().push(Call::Pause(handle));
    }

    fn resume(&mut self, handle: HandleId) {
        self.log.borrow_mut().push(Call::Resume(handle));
    }

    fn cancel(&mut self, handle: HandleId) {
        self.log.borrow_mut().push(Call::Cancel(handle));
    }
}

pub(crate) struct FakeTicker {
    log: CallLog,
}

impl Ticker for FakeTicker {
    fn arm(&mut self, handle: HandleId, interval: Duration) {
        self.log.borrow_mut().push(Call::Arm(handle, interval));
    }

    fn cancel(&mut self) {
        self.log.borrow_mut().push(Call::TickerCancel);
    }
}

#[derive(Default)]
pub(crate) struct Recorded {
    pub positions: Vec<(usize, PlayState)>,
    pub statuses: Vec<Status>,
}

pub(crate) struct RecordingSink {
    recorded: Rc<RefCell<Recorded>>,
}

impl RenderSink for RecordingSink {
    fn on_position_changed(&mut self, cursor: usize, play_state: PlayState, _document: &Document) {
        self.recorded.borrow_mut().positions.push((cursor, play_state));
    }

    fn on_status(&mut self, status: &Status) {
        self.recorded.borrow_mut().statuses.push(status.clone());
    }
}

/// Handles to everything the fakes record.
pub(crate) struct Logs {
    pub calls: CallLog,
    pub recorded: Rc<RefCell<Recorded>>,
    pub fail_start: Rc<RefCell<Option<PlaybackError>>>,
}

impl Logs {
    pub(crate) fn starts(&self) -> Vec<ChunkRequest> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Start(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_start(&self) -> ChunkRequest {
        self.starts().pop().expect("no chunk was started")
    }

    pub(crate) fn last_status(&self) -> Option<Status> {
        self.recorded.borrow().statuses.last().cloned()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

/// Engine wired to fakes.
pub(crate) struct Harness {
    pub engine: WordSyncEngine,
    pub logs: Logs,
}

impl Harness {
    pub(crate) fn new(mode: Mode) -> Self {
        let calls: CallLog = Rc::default();
        let recorded: Rc<RefCell<Recorded>> = Rc::default();
        let fail_start: Rc<RefCell<Option<PlaybackError>>> = Rc::default();
        let backends = Backends {
            on_device: Box::new(FakeBackend {
                log: Rc::clone(&calls),
                fail_start: Rc::clone(&fail_start),
            }),
            remote: Box::new(FakeBackend {
                log: Rc::clone(&calls),
                fail_start: Rc::clone(&fail_start),
            }),
        };
        let engine = WordSyncEngine::new(
            backends,
            Box::new(FakeTicker {
                log: Rc::clone(&calls),
            }),
            Box::new(RecordingSink {
                recorded: Rc::clone(&recorded),
            }),
            mode,
            1.0,
        );
        Self {
            engine,
            logs: Logs {
                calls,
                recorded,
                fail_start,
            },
        }
    }
}

impl Deref for Harness {
    type Target = Logs;

    fn deref(&self) -> &Logs {
        &self.logs
    }
}

pub(crate) fn document(words: usize) -> Document {
    let text: Vec<String> = (0..words).map(|idx| format!("w{idx}")).collect();
    crate::tokenizer::tokenize(&text.join(" ")).expect("non-empty test document")
}
