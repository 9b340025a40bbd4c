//! Coalescing wake signal between a periodic ticker and a worker

use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Notify;

const IDLE: u8 = 0;
const PENDING: u8 = 1;
const RUNNING: u8 = 2;
const CLOSED: u8 = 3;

/// Wake-up signal with at most one pending run.
///
/// Wakes while a run is pending collapse into that run. Wakes that arrive
/// while the worker is running are dropped.
#[derive(Debug)]
pub struct WakeSignal {
    state: AtomicU8,
    notify: Notify,
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
            notify: Notify::new(),
        }
    }

    /// Request a run. Returns `true` if this call scheduled one.
    pub fn wake(&self) -> bool {
        match self
            .state
            .compare_exchange(IDLE, PENDING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.notify.notify_one();
                true
            }
            Err(_) => false,
        }
    }

    /// Wait for a pending run and claim it. Returns `false` once closed.
    pub async fn wait(&self) -> bool {
        loop {
            match self.state.compare_exchange(
                PENDING,
                RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(CLOSED) => return false,
                Err(_) => self.notify.notified().await,
            }
        }
    }

    /// Mark the claimed run complete
    pub fn finish(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Release the waiter for good
    pub fn close(&self) {
        self.state.store(CLOSED, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }
}
