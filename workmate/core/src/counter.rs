//! Work time counter: seconds spent in the `Work` state

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::clock::TICK;
use crate::engine::StateListener;
use crate::state::CharacterState;

#[derive(Debug, Default)]
struct Counts {
    seconds: AtomicU64,
    working: AtomicBool,
}

/// Counts seconds while the character works
///
/// Always ticking once started; the count only moves while the last state
/// reported through [`StateListener`] is `Work`.
#[derive(Clone, Debug)]
pub struct WorkTimeCounter {
    counts: Arc<Counts>,
    ticker: Arc<parking_lot::Mutex<Option<JoinHandle<()>>>>,
}

impl WorkTimeCounter {
    /// Create a stopped counter at zero for a character in `initial`
    pub fn new(initial: CharacterState) -> Self {
        let counter = Self {
            counts: Arc::new(Counts::default()),
            ticker: Arc::new(parking_lot::Mutex::new(None)),
        };
        counter.on_state_change(initial);
        counter
    }

    /// Spawn the one-second ticker (idempotent)
    pub fn start(&self) {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            return;
        }

        let counts = self.counts.clone();
        *ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;
                if counts.working.load(Ordering::Relaxed) {
                    counts.seconds.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    /// Stop the ticker
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }

    /// Seconds counted so far
    pub fn seconds(&self) -> u64 {
        self.counts.seconds.load(Ordering::Relaxed)
    }

    /// Counted time as `HH:MM:SS`
    pub fn display(&self) -> String {
        format_hms(self.seconds())
    }
}

impl StateListener for WorkTimeCounter {
    fn on_state_change(&self, state: CharacterState) {
        self.counts
            .working
            .store(state == CharacterState::Work, Ordering::Relaxed);
    }
}

impl Drop for WorkTimeCounter {
    fn drop(&mut self) {
        if Arc::strong_count(&self.ticker) == 1 {
            self.stop();
        }
    }
}

/// Format seconds as zero-padded `HH:MM:SS`
pub fn format_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
