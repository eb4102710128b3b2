//! Companion
//!
//! Top-level owner: one character engine, the focus timer gated by it, and
//! the work time counter. Both timers are registered as engine listeners so
//! they see every state change synchronously.

use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, ClockTimer, TimerPhase};
use crate::config::WorkmateConfig;
use crate::counter::WorkTimeCounter;
use crate::engine::{CharacterEngine, EngineConfig, StateListener};
use crate::state::{CharacterState, PlaybackKind};
use crate::surface::PlaybackSurface;

/// Point-in-time view of everything the companion shows
#[derive(Clone, Debug, PartialEq)]
pub struct CompanionStatus {
    /// Character state
    pub state: CharacterState,
    /// What the character is playing
    pub playing: PlaybackKind,
    /// Focus timer phase
    pub phase: TimerPhase,
    /// Focus timer label
    pub timer_label: &'static str,
    /// Focus timer remaining time, `MM:SS`
    pub timer: String,
    /// Elapsed fraction of the focus phase
    pub progress: f64,
    /// Whether the focus timer is counting
    pub timer_running: bool,
    /// Completed focus sessions
    pub completed: u32,
    /// Total time worked, `HH:MM:SS`
    pub work_time: String,
}

impl fmt::Display for CompanionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}) | {} {} [{:.0}%]{} | done {} | worked {}",
            self.state.label(),
            self.playing,
            self.timer_label,
            self.timer,
            self.progress * 100.0,
            if self.timer_running { "" } else { " paused" },
            self.completed,
            self.work_time
        )
    }
}

/// Engine plus the timers that follow it
pub struct Companion {
    engine: CharacterEngine,
    clock: Clock,
    counter: WorkTimeCounter,
}

impl Companion {
    /// Build from a loaded configuration
    pub fn new(surface: Arc<dyn PlaybackSurface>, config: &WorkmateConfig) -> Self {
        Self::with_parts(surface, config.engine_config(), config.clock_timer())
    }

    /// Build from explicit engine parameters and timer
    pub fn with_parts(
        surface: Arc<dyn PlaybackSurface>,
        engine_config: EngineConfig,
        timer: ClockTimer,
    ) -> Self {
        let initial = engine_config.initial_state;
        let engine = CharacterEngine::new(surface, engine_config);

        let clock = Clock::new(timer);
        clock.on_state_change(initial);
        let counter = WorkTimeCounter::new(initial);

        engine.add_listener(Arc::new(clock.clone()));
        engine.add_listener(Arc::new(counter.clone()));

        Self {
            engine,
            clock,
            counter,
        }
    }

    /// Show the character and start counting work time
    ///
    /// The focus timer stays idle until started.
    pub fn start(&self) {
        self.engine.start();
        self.counter.start();
    }

    /// Change the character state
    pub fn set_state(&self, state: CharacterState) -> bool {
        self.engine.set_state(state)
    }

    /// The character engine
    pub fn engine(&self) -> &CharacterEngine {
        &self.engine
    }

    /// The focus timer
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// The work time counter
    pub fn counter(&self) -> &WorkTimeCounter {
        &self.counter
    }

    /// Current status of all parts
    pub fn status(&self) -> CompanionStatus {
        let timer = self.clock.snapshot();
        CompanionStatus {
            state: self.engine.current_state(),
            playing: self.engine.playback_kind(),
            phase: timer.phase(),
            timer_label: timer.status_label(),
            timer: timer.display_time(),
            progress: timer.progress(),
            timer_running: timer.is_running(),
            completed: timer.completed(),
            work_time: self.counter.display(),
        }
    }

    /// Stop both timers
    pub fn shutdown(&self) {
        self.clock.pause();
        self.counter.stop();
        tracing::info!(work_time = %self.counter.display(), "Companion stopped");
    }
}

impl fmt::Debug for Companion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Companion")
            .field("engine", &self.engine)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{settle, MockSurface};
    use std::time::Duration;

    fn companion(surface: &Arc<MockSurface>, initial: CharacterState) -> Companion {
        let engine_config = EngineConfig {
            initial_state: initial,
            seed: Some(3),
            ..EngineConfig::default()
        };
        Companion::with_parts(
            surface.clone(),
            engine_config,
            ClockTimer::new(Duration::from_secs(60), Duration::from_secs(30)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_after_start() {
        let surface = Arc::new(MockSurface::new());
        let companion = companion(&surface, CharacterState::Work);
        companion.start();
        settle().await;

        let status = companion.status();
        assert_eq!(status.state, CharacterState::Work);
        assert_eq!(status.phase, TimerPhase::Idle);
        assert_eq!(status.timer_label, "Ready");
        assert_eq!(status.timer, "01:00");
        assert!(!status.timer_running);
        assert!(status.to_string().starts_with("WORK"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_follow_state() {
        let surface = Arc::new(MockSurface::new());
        let companion = companion(&surface, CharacterState::Work);
        companion.start();
        companion.clock().start();
        settle().await;

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(companion.status().timer, "00:50");
        assert_eq!(companion.counter().seconds(), 10);

        companion.set_state(CharacterState::Break);
        tokio::time::sleep(Duration::from_secs(20)).await;

        let status = companion.status();
        assert_eq!(status.timer, "00:50");
        assert_eq!(status.work_time, "00:00:10");
        assert_eq!(status.state, CharacterState::Break);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_gates_timer() {
        let surface = Arc::new(MockSurface::new());
        let companion = companion(&surface, CharacterState::Away);
        companion.start();
        companion.clock().start();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(companion.status().timer, "01:00");
        assert_eq!(companion.counter().seconds(), 0);

        companion.shutdown();
    }
}
