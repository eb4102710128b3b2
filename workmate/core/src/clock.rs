//! Focus Timer
//!
//! A work/break countdown. The work phase only counts down while the
//! character is actually working; the break phase always counts.
//!
//! [`ClockTimer`] is the synchronous state machine, advanced one second per
//! [`ClockTimer::tick`]. [`Clock`] wraps it in a shared handle that drives the
//! ticks from a tokio interval and tracks the character through
//! [`StateListener`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::engine::StateListener;
use crate::state::CharacterState;

/// Default length of a work phase
pub const DEFAULT_WORK_DURATION: Duration = Duration::from_secs(25 * 60);

/// Default length of a break phase
pub const DEFAULT_REST_DURATION: Duration = Duration::from_secs(5 * 60);

/// Interval between ticks
pub const TICK: Duration = Duration::from_secs(1);

/// Which part of the cycle the timer is in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimerPhase {
    /// Not started, or reset
    #[default]
    Idle,
    /// Counting down a work session
    Working,
    /// Counting down a break
    Resting,
}

/// What a single tick did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is not running
    Stopped,
    /// Work phase, but the character is not working
    Gated,
    /// One second was counted
    Counted {
        /// Time left in the phase
        remaining: Duration,
    },
    /// The phase ran out and the next one began
    PhaseCompleted {
        /// Phase that ended
        finished: TimerPhase,
        /// Phase that started
        next: TimerPhase,
    },
}

/// Work/break countdown state machine
#[derive(Clone, Debug)]
pub struct ClockTimer {
    phase: TimerPhase,
    total: Duration,
    remaining: Duration,
    work: Duration,
    rest: Duration,
    completed: u32,
    running: bool,
    character: CharacterState,
}

impl ClockTimer {
    /// Create an idle timer
    pub fn new(work: Duration, rest: Duration) -> Self {
        Self {
            phase: TimerPhase::Idle,
            total: work,
            remaining: work,
            work,
            rest,
            completed: 0,
            running: false,
            character: CharacterState::Work,
        }
    }

    /// Start or resume counting
    ///
    /// An idle timer enters the work phase with a full work duration.
    pub fn start(&mut self) {
        if self.phase == TimerPhase::Idle {
            self.enter(TimerPhase::Working);
        }
        self.running = true;
    }

    /// Stop counting, keeping phase and remaining time
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Start if stopped, pause if running
    ///
    /// Returns whether the timer is now running.
    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.pause();
        } else {
            self.start();
        }
        self.running
    }

    /// Stop and return to idle with a full work duration
    ///
    /// The completed count is kept.
    pub fn reset(&mut self) {
        self.running = false;
        self.phase = TimerPhase::Idle;
        self.total = self.work;
        self.remaining = self.work;
    }

    /// Record the character's new state
    pub fn set_character(&mut self, state: CharacterState) {
        self.character = state;
    }

    /// Advance by one second
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.phase == TimerPhase::Idle {
            return TickOutcome::Stopped;
        }
        if self.phase == TimerPhase::Working && self.character != CharacterState::Work {
            return TickOutcome::Gated;
        }

        self.remaining = self.remaining.saturating_sub(TICK);
        if !self.remaining.is_zero() {
            return TickOutcome::Counted {
                remaining: self.remaining,
            };
        }

        let finished = self.phase;
        let next = match finished {
            TimerPhase::Working => {
                self.completed += 1;
                TimerPhase::Resting
            }
            _ => TimerPhase::Working,
        };
        self.enter(next);
        TickOutcome::PhaseCompleted { finished, next }
    }

    fn enter(&mut self, phase: TimerPhase) {
        self.phase = phase;
        self.total = match phase {
            TimerPhase::Resting => self.rest,
            _ => self.work,
        };
        self.remaining = self.total;
    }

    /// Current phase
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Time left in the current phase
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Full length of the current phase
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of finished work phases
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Whether the timer is counting
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Remaining time as `MM:SS`
    pub fn display_time(&self) -> String {
        let secs = self.remaining.as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    /// Elapsed fraction of the current phase, from 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        let total = self.total.as_secs_f64();
        (total - self.remaining.as_secs_f64()) / total
    }

    /// Human-readable phase label
    pub fn status_label(&self) -> &'static str {
        match self.phase {
            TimerPhase::Idle => "Ready",
            TimerPhase::Working => "Focus Time",
            TimerPhase::Resting => "Break Time",
        }
    }
}

impl Default for ClockTimer {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DURATION, DEFAULT_REST_DURATION)
    }
}

/// Shared, self-ticking [`ClockTimer`]
///
/// Cloning yields another handle to the same timer. Register it with the
/// engine as a [`StateListener`] so the work phase is gated correctly.
#[derive(Clone)]
pub struct Clock {
    timer: Arc<Mutex<ClockTimer>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Clock {
    /// Wrap a timer
    pub fn new(timer: ClockTimer) -> Self {
        Self {
            timer: Arc::new(Mutex::new(timer)),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    /// Start counting, spawning the ticker if needed
    pub fn start(&self) {
        self.timer.lock().start();

        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            return;
        }

        let timer = self.timer.clone();
        *ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                let outcome = timer.lock().tick();
                if let TickOutcome::PhaseCompleted { finished, next } = outcome {
                    tracing::info!(?finished, ?next, "Focus timer phase completed");
                }
            }
        }));
        tracing::debug!("Focus timer started");
    }

    /// Stop counting
    pub fn pause(&self) {
        self.timer.lock().pause();
        self.stop_ticker();
        tracing::debug!("Focus timer paused");
    }

    /// Start if stopped, pause if running
    pub fn toggle(&self) -> bool {
        let running = self.timer.lock().is_running();
        if running {
            self.pause();
        } else {
            self.start();
        }
        !running
    }

    /// Stop and return to idle
    pub fn reset(&self) {
        self.timer.lock().reset();
        self.stop_ticker();
        tracing::debug!("Focus timer reset");
    }

    fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }

    /// Copy of the current timer state
    pub fn snapshot(&self) -> ClockTimer {
        self.timer.lock().clone()
    }
}

impl StateListener for Clock {
    fn on_state_change(&self, state: CharacterState) {
        self.timer.lock().set_character(state);
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        // Last handle going away stops the ticker
        if Arc::strong_count(&self.ticker) == 1 {
            self.stop_ticker();
        }
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("timer", &*self.timer.lock())
            .finish()
    }
}
