use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared stop flag handed to every backend worker thread.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sleep in short slices so a cancel is noticed promptly.
    ///
    /// Returns `false` if the token was cancelled before the wait completed.
    pub fn sleep(&self, total: std::time::Duration) -> bool {
        const SLICE: std::time::Duration = std::time::Duration::from_millis(20);
        let deadline = std::time::Instant::now() + total;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }
}
