//! Random Event Scheduler
//!
//! While the character is stably looping, an event timer is armed with a
//! random delay. When it fires, a short one-shot "business" clip (stretching,
//! drinking, ...) is played before returning to the loop.
//!
//! The scheduler only owns the timer and the random choices. Whether firing
//! is still appropriate (the state may have changed, a transition may be
//! playing) is re-checked by the engine at fire time.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use crate::state::CharacterState;

/// Default lower bound of the event delay
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(60);

/// Default upper bound (exclusive) of the event delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(180);

/// Event actions available per state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventCatalog {
    actions: HashMap<CharacterState, Vec<String>>,
}

impl EventCatalog {
    /// Catalog with no actions for any state
    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Replace the actions of one state
    pub fn with_actions<I, S>(mut self, state: CharacterState, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_actions(state, actions);
        self
    }

    /// Replace the actions of one state in place
    pub fn set_actions<I, S>(&mut self, state: CharacterState, actions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions
            .insert(state, actions.into_iter().map(Into::into).collect());
    }

    /// Actions for a state (empty if none)
    pub fn actions(&self, state: CharacterState) -> &[String] {
        self.actions.get(&state).map_or(&[], Vec::as_slice)
    }
}

impl Default for EventCatalog {
    fn default() -> Self {
        Self::empty()
            .with_actions(CharacterState::Work, ["stretch", "drink", "think", "nob"])
            .with_actions(CharacterState::Break, ["stretch"])
    }
}

#[derive(Debug)]
struct PendingTimer {
    generation: u64,
    delay: Duration,
    handle: JoinHandle<()>,
}

/// Arms and cancels the random event timer
#[derive(Debug)]
pub struct RandomEventScheduler {
    catalog: EventCatalog,
    min_delay: Duration,
    max_delay: Duration,
    rng: StdRng,
    pending: Option<PendingTimer>,
    generation: u64,
}

impl RandomEventScheduler {
    /// Create a scheduler with an entropy-seeded RNG
    pub fn new(catalog: EventCatalog, min_delay: Duration, max_delay: Duration) -> Self {
        Self::with_rng(catalog, min_delay, max_delay, StdRng::from_entropy())
    }

    /// Create a scheduler with a fixed seed (deterministic delays and picks)
    pub fn with_seed(
        catalog: EventCatalog,
        min_delay: Duration,
        max_delay: Duration,
        seed: u64,
    ) -> Self {
        Self::with_rng(catalog, min_delay, max_delay, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: EventCatalog, min_delay: Duration, max_delay: Duration, rng: StdRng) -> Self {
        Self {
            catalog,
            min_delay,
            max_delay,
            rng,
            pending: None,
            generation: 0,
        }
    }

    /// The event catalog
    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    /// Arm the timer for `state`, replacing any pending one
    ///
    /// `fire` runs after the delay with the generation of this arming; pass
    /// it to [`RandomEventScheduler::claim`] to make sure the fire is not
    /// stale. Returns the chosen delay, or `None` if the state has no events.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&mut self, state: CharacterState, fire: F) -> Option<Duration>
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        if self.catalog.actions(state).is_empty() {
            return None;
        }

        let delay = self.next_delay();
        self.generation += 1;
        let generation = self.generation;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(generation).await;
        });

        tracing::debug!(
            state = %state,
            delay_secs = delay.as_secs(),
            generation,
            "Random event armed"
        );

        self.pending = Some(PendingTimer {
            generation,
            delay,
            handle,
        });
        Some(delay)
    }

    /// Disarm the pending timer, if any
    ///
    /// Returns whether a timer was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                tracing::trace!(generation = pending.generation, "Random event cancelled");
                true
            }
            None => false,
        }
    }

    /// Consume the pending timer if `generation` is the one that fired
    ///
    /// Returns `false` for a stale fire, which must then do nothing.
    pub fn claim(&mut self, generation: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.generation == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Whether a timer is pending
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Delay of the pending timer
    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.delay)
    }

    /// Pick a uniformly random action for `state`
    pub fn pick_action(&mut self, state: CharacterState) -> Option<String> {
        self.catalog.actions(state).choose(&mut self.rng).cloned()
    }

    fn next_delay(&mut self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(self.rng.gen_range(min..max))
    }
}

impl Drop for RandomEventScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
