use super::EventTx;
use crate::cancellation::CancellationToken;
use read_aloud_core::{EngineEvent, HandleId, Ticker};
use std::thread;
use std::time::Duration;
use tracing::{trace, warn};

/// Posts `TimerTick` at a fixed interval from a dedicated thread.
pub struct ThreadTicker {
    events: EventTx,
    current: Option<CancellationToken>,
}

impl ThreadTicker {
    pub fn new(events: EventTx) -> Self {
        Self {
            events,
            current: None,
        }
    }
}

impl Ticker for ThreadTicker {
    fn arm(&mut self, handle: HandleId, interval: Duration) {
        self.cancel();
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        let events = self.events.clone();
        let interval = interval.max(Duration::from_millis(1));
        trace!(%handle, ?interval, "Arming word ticker");
        let spawned = thread::Builder::new()
            .name(format!("ticker-{}", handle.get()))
            .spawn(move || {
                while token.sleep(interval) {
                    if !events.post(&token, EngineEvent::TimerTick { handle }) {
                        break;
                    }
                }
            });
        if let Err(err) = spawned {
            warn!(%handle, "Failed to start word ticker: {err}");
        }
    }

    fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
