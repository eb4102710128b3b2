//! Character State Machine
//!
//! Drives what the character is showing. Accepts state changes, decides
//! between a transition clip and a direct cut to the destination loop, feeds
//! clips through the [`Preloader`] into the [`DoubleBuffer`], and keeps the
//! [`RandomEventScheduler`] armed while a loop is stably playing.
//!
//! # Request chains
//!
//! Every piece of playback work (a loop, a transition followed by a loop, an
//! event followed by a loop) runs as a spawned task holding a
//! [`PreloadToken`]. The token is renewed at each step under the engine lock
//! and checked again before anything visible happens. `set_state` issues a new
//! token synchronously, so any chain started for an earlier state stops at its
//! next step without touching the display.
//!
//! # Locking
//!
//! All engine state lives in one `parking_lot::Mutex`. It is only held for
//! short synchronous sections and never across an `.await`.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::buffer::{DoubleBuffer, LoadedClip};
use crate::media::{AssetLayout, ClipId, MediaResolver};
use crate::preload::{PreloadOutcome, PreloadTarget, PreloadToken, Preloader, TokenIssuer};
use crate::scheduler::{EventCatalog, RandomEventScheduler, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY};
use crate::state::{CharacterState, PlaybackKind};
use crate::surface::{PlaybackSurface, SlotId};

/// Receives every accepted state change, synchronously
pub trait StateListener: Send + Sync {
    /// Called once per accepted transition with the new state
    fn on_state_change(&self, state: CharacterState);
}

/// Engine construction parameters
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Asset naming and location
    pub layout: AssetLayout,
    /// Event actions per state
    pub catalog: EventCatalog,
    /// Lower bound of the random event delay
    pub min_event_delay: Duration,
    /// Upper bound (exclusive) of the random event delay
    pub max_event_delay: Duration,
    /// State shown at startup
    pub initial_state: CharacterState,
    /// Fixed RNG seed for event timing and picks
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: AssetLayout::default(),
            catalog: EventCatalog::default(),
            min_event_delay: DEFAULT_MIN_DELAY,
            max_event_delay: DEFAULT_MAX_DELAY,
            initial_state: CharacterState::Work,
            seed: None,
        }
    }
}

struct EngineInner {
    current: CharacterState,
    previous: Option<CharacterState>,
    playing: PlaybackKind,
    event_in_progress: bool,
    buffer: DoubleBuffer,
    tokens: TokenIssuer,
    scheduler: RandomEventScheduler,
}

struct Shared {
    surface: Arc<dyn PlaybackSurface>,
    resolver: MediaResolver,
    inner: Mutex<EngineInner>,
    listeners: RwLock<Vec<Arc<dyn StateListener>>>,
}

impl PreloadTarget for Shared {
    fn renew(&self, token: PreloadToken) -> Option<(PreloadToken, SlotId)> {
        let mut inner = self.inner.lock();
        let next = inner.tokens.renew(token)?;
        Some((next, inner.buffer.standby()))
    }

    fn is_current(&self, token: PreloadToken) -> bool {
        self.inner.lock().tokens.is_current(token)
    }
}

/// The character animation engine
///
/// Cheap to clone; clones drive the same character. Methods that start
/// playback spawn tokio tasks and must be called from within a runtime.
#[derive(Clone)]
pub struct CharacterEngine {
    shared: Arc<Shared>,
}

impl CharacterEngine {
    /// Create an engine over a surface
    ///
    /// Nothing is displayed until [`CharacterEngine::start`].
    pub fn new(surface: Arc<dyn PlaybackSurface>, config: EngineConfig) -> Self {
        let scheduler = match config.seed {
            Some(seed) => RandomEventScheduler::with_seed(
                config.catalog,
                config.min_event_delay,
                config.max_event_delay,
                seed,
            ),
            None => RandomEventScheduler::new(
                config.catalog,
                config.min_event_delay,
                config.max_event_delay,
            ),
        };

        let inner = EngineInner {
            current: config.initial_state,
            previous: None,
            playing: PlaybackKind::Loop,
            event_in_progress: false,
            buffer: DoubleBuffer::new(),
            tokens: TokenIssuer::new(),
            scheduler,
        };

        Self {
            shared: Arc::new(Shared {
                surface,
                resolver: MediaResolver::new(config.layout),
                inner: Mutex::new(inner),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a state change listener
    pub fn add_listener(&self, listener: Arc<dyn StateListener>) {
        self.shared.listeners.write().push(listener);
    }

    /// Show the initial state: label and loop clip
    pub fn start(&self) {
        let token = {
            let mut inner = self.shared.inner.lock();
            inner.scheduler.cancel();
            inner.event_in_progress = false;
            self.shared.surface.set_label(inner.current);
            info!(state = %inner.current, "Character engine starting");
            inner.tokens.issue()
        };

        tokio::spawn(play_loop(self.shared.clone(), token));
    }

    /// Move the character to `state`
    ///
    /// Returns `false` (and does nothing at all) if the character is already
    /// in `state`. Otherwise cancels any pending or playing event, starts the
    /// transition or loop for the new state, and notifies listeners before
    /// returning.
    pub fn set_state(&self, state: CharacterState) -> bool {
        let (token, transition) = {
            let mut inner = self.shared.inner.lock();
            if inner.current == state {
                return false;
            }

            inner.scheduler.cancel();
            inner.event_in_progress = false;

            let from = inner.current;
            inner.previous = Some(from);
            inner.current = state;

            let transition = self.shared.resolver.transition_clip(from, state);
            inner.playing = if transition.is_some() {
                PlaybackKind::Transition
            } else {
                PlaybackKind::Loop
            };

            self.shared.surface.set_label(state);
            info!(
                from = %from,
                to = %state,
                transition = transition.is_some(),
                "Character state changed"
            );

            (inner.tokens.issue(), transition)
        };

        match transition {
            Some(clip) => {
                tokio::spawn(play_transition(self.shared.clone(), clip, token));
            }
            None => {
                tokio::spawn(play_loop(self.shared.clone(), token));
            }
        }

        self.notify(state);
        true
    }

    fn notify(&self, state: CharacterState) {
        let listeners = self.shared.listeners.read().clone();
        for listener in listeners {
            listener.on_state_change(state);
        }
    }

    /// Current character state
    pub fn current_state(&self) -> CharacterState {
        self.shared.inner.lock().current
    }

    /// State before the last accepted change
    pub fn previous_state(&self) -> Option<CharacterState> {
        self.shared.inner.lock().previous
    }

    /// What kind of clip the engine is currently playing or preparing
    pub fn playback_kind(&self) -> PlaybackKind {
        self.shared.inner.lock().playing
    }

    /// Whether a random event clip is in progress
    pub fn is_event_in_progress(&self) -> bool {
        self.shared.inner.lock().event_in_progress
    }

    /// Whether a random event timer is pending
    pub fn is_event_armed(&self) -> bool {
        self.shared.inner.lock().scheduler.is_armed()
    }

    /// Delay the pending random event timer was armed with
    pub fn pending_event_delay(&self) -> Option<Duration> {
        self.shared.inner.lock().scheduler.pending_delay()
    }

    /// The visible slot
    pub fn active_slot(&self) -> SlotId {
        self.shared.inner.lock().buffer.active()
    }

    /// Clip held by the visible slot
    pub fn active_clip(&self) -> Option<LoadedClip> {
        self.shared.inner.lock().buffer.active_clip().cloned()
    }

    /// Number of buffer swaps so far
    pub fn swap_count(&self) -> u64 {
        self.shared.inner.lock().buffer.swap_count()
    }

    /// Resolver used for clip names
    pub fn resolver(&self) -> &MediaResolver {
        &self.shared.resolver
    }
}

impl std::fmt::Debug for CharacterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("CharacterEngine")
            .field("current", &inner.current)
            .field("previous", &inner.previous)
            .field("playing", &inner.playing)
            .field("event_in_progress", &inner.event_in_progress)
            .field("active", &inner.buffer.active())
            .finish()
    }
}

/// Commit a ready preload: stage it into standby and swap it in
///
/// Returns the newly active slot, or `None` if `token` went stale.
fn commit(
    shared: &Shared,
    token: PreloadToken,
    clip: &ClipId,
    path: String,
    kind: PlaybackKind,
) -> Option<SlotId> {
    let mut inner = shared.inner.lock();
    if !inner.tokens.is_current(token) {
        return None;
    }

    inner.buffer.stage(LoadedClip {
        clip: clip.clone(),
        path,
        kind,
    });
    let active = inner.buffer.swap(shared.surface.as_ref());

    if kind != PlaybackKind::Event {
        shared
            .surface
            .set_background(&shared.resolver.background(inner.current));
    }
    Some(active)
}

/// Play the current state's loop clip
///
/// Arms the random event scheduler once the loop is swapped in.
fn play_loop(shared: Arc<Shared>, token: PreloadToken) -> BoxFuture<'static, ()> {
    async move {
        let (state, media) = {
            let mut inner = shared.inner.lock();
            if !inner.tokens.is_current(token) {
                return;
            }
            inner.playing = PlaybackKind::Loop;
            let state = inner.current;
            let clip = shared.resolver.loop_clip(state);
            (state, shared.resolver.candidates(&clip))
        };

        let outcome = Preloader::new(shared.surface.as_ref(), &*shared)
            .load(&media, true, token)
            .await;

        match outcome {
            PreloadOutcome::Superseded => {}
            PreloadOutcome::Unavailable { token } => {
                if shared.is_current(token) {
                    error!(
                        state = %state,
                        clip = %media.clip,
                        "No media available for loop clip, character has no visual"
                    );
                    shared
                        .surface
                        .set_background(&shared.resolver.background(state));
                }
            }
            PreloadOutcome::Ready { path, token, .. } => {
                let Some(active) = commit(&shared, token, &media.clip, path, PlaybackKind::Loop)
                else {
                    return;
                };

                {
                    let mut inner = shared.inner.lock();
                    if inner.tokens.is_current(token) && !inner.event_in_progress {
                        let weak = Arc::downgrade(&shared);
                        inner
                            .scheduler
                            .arm(state, move |generation| fire_event(weak, generation));
                    }
                }

                match shared.surface.play(active).await {
                    Ok(()) => info!(state = %state, clip = %media.clip, "Loop playing"),
                    Err(error) => warn!(
                        state = %state,
                        clip = %media.clip,
                        %error,
                        "Loop clip failed to start"
                    ),
                }
            }
        }
    }
    .boxed()
}

/// Play a transition clip, then the destination loop
///
/// Any failure along the way cuts straight to the destination loop.
async fn play_transition(shared: Arc<Shared>, clip: ClipId, token: PreloadToken) {
    {
        let mut inner = shared.inner.lock();
        if !inner.tokens.is_current(token) {
            return;
        }
        inner.playing = PlaybackKind::Transition;
    }

    let media = shared.resolver.candidates(&clip);
    let outcome = Preloader::new(shared.surface.as_ref(), &*shared)
        .load(&media, false, token)
        .await;

    match outcome {
        PreloadOutcome::Superseded => {}
        PreloadOutcome::Unavailable { token } => {
            warn!(clip = %clip, "Transition clip unavailable, cutting to loop");
            play_loop(shared, token).await;
        }
        PreloadOutcome::Ready { path, token, .. } => {
            let Some(active) = commit(&shared, token, &clip, path, PlaybackKind::Transition) else {
                return;
            };

            if let Err(error) = shared.surface.play(active).await {
                warn!(clip = %clip, %error, "Transition failed to start, cutting to loop");
                play_loop(shared, token).await;
                return;
            }

            debug!(clip = %clip, "Transition playing");
            shared.surface.finished(active).await;
            play_loop(shared, token).await;
        }
    }
}

/// Random event timer callback
fn fire_event(shared: Weak<Shared>, generation: u64) -> BoxFuture<'static, ()> {
    async move {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let (state, media, token) = {
            let mut inner = shared.inner.lock();
            if !inner.scheduler.claim(generation) {
                debug!(generation, "Ignoring stale random event");
                return;
            }
            if inner.playing != PlaybackKind::Loop || inner.event_in_progress {
                debug!(playing = ?inner.playing, "Not looping, skipping random event");
                return;
            }

            let state = inner.current;
            let Some(action) = inner.scheduler.pick_action(state) else {
                return;
            };

            inner.event_in_progress = true;
            inner.playing = PlaybackKind::Event;

            let clip = shared.resolver.event_clip(state, &action);
            info!(state = %state, action = %action, "Random event firing");
            (state, shared.resolver.candidates(&clip), inner.tokens.issue())
        };

        let outcome = Preloader::new(shared.surface.as_ref(), &*shared)
            .load(&media, false, token)
            .await;

        match outcome {
            PreloadOutcome::Superseded => {}
            PreloadOutcome::Unavailable { token } => {
                warn!(state = %state, clip = %media.clip, "Event clip unavailable, resuming loop");
                resume_after_event(shared, token).await;
            }
            PreloadOutcome::Ready { path, token, .. } => {
                let Some(active) = commit(&shared, token, &media.clip, path, PlaybackKind::Event)
                else {
                    return;
                };

                match shared.surface.play(active).await {
                    Ok(()) => {
                        shared.surface.finished(active).await;
                        debug!(clip = %media.clip, "Event finished");
                    }
                    Err(error) => {
                        warn!(clip = %media.clip, %error, "Event failed to start, resuming loop");
                    }
                }
                resume_after_event(shared, token).await;
            }
        }
    }
    .boxed()
}

async fn resume_after_event(shared: Arc<Shared>, token: PreloadToken) {
    {
        let mut inner = shared.inner.lock();
        if !inner.tokens.is_current(token) {
            return;
        }
        inner.event_in_progress = false;
    }
    play_loop(shared, token).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{settle, MockSurface, SurfaceCall};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine_with(surface: &Arc<MockSurface>) -> CharacterEngine {
        let config = EngineConfig {
            seed: Some(42),
            ..EngineConfig::default()
        };
        CharacterEngine::new(surface.clone(), config)
    }

    async fn started(surface: &Arc<MockSurface>) -> CharacterEngine {
        let engine = engine_with(surface);
        engine.start();
        settle().await;
        engine
    }

    #[derive(Default)]
    struct CountingListener {
        calls: AtomicUsize,
        last: Mutex<Option<CharacterState>>,
    }

    impl StateListener for CountingListener {
        fn on_state_change(&self, state: CharacterState) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some(state);
        }
    }

    #[tokio::test]
    async fn test_start_plays_initial_loop() {
        let surface = Arc::new(MockSurface::new());
        let engine = started(&surface).await;

        assert_eq!(
            surface.visible_source().as_deref(),
            Some("demo/loop/loop_work_pen_day.webm")
        );
        assert_eq!(engine.active_slot(), SlotId::Secondary);
        assert_eq!(engine.playback_kind(), PlaybackKind::Loop);
        assert_eq!(
            surface.background().as_deref(),
            Some("demo/background/bg_work_day.png")
        );
        assert_eq!(surface.label(), Some(CharacterState::Work));
        assert!(engine.is_event_armed());
    }

    #[tokio::test]
    async fn test_same_state_is_noop() {
        let surface = Arc::new(MockSurface::new());
        let engine = started(&surface).await;
        let listener = Arc::new(CountingListener::default());
        engine.add_listener(listener.clone());
        surface.clear_calls();

        assert!(!engine.set_state(CharacterState::Work));
        settle().await;

        assert!(surface.calls().is_empty());
        assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.previous_state(), None);
    }

    #[tokio::test]
    async fn test_transition_then_loop() {
        let surface = Arc::new(MockSurface::new());
        let engine = started(&surface).await;
        surface.clear_calls();

        assert!(engine.set_state(CharacterState::Break));
        assert_eq!(engine.playback_kind(), PlaybackKind::Transition);
        assert!(!engine.is_event_armed());
        settle().await;

        let active = engine.active_slot();
        assert_eq!(
            surface.visible_source().as_deref(),
            Some("demo/transition/trans_work_to_break_day.webm")
        );
        assert!(!surface.is_looping(active));
        assert_eq!(engine.previous_state(), Some(CharacterState::Work));

        surface.finish(active);
        settle().await;

        assert_eq!(
            surface.visible_source().as_deref(),
            Some("demo/loop/loop_break_day.webm")
        );
        assert!(surface.is_looping(engine.active_slot()));
        assert_eq!(engine.playback_kind(), PlaybackKind::Loop);
        assert_eq!(
            surface.loads(),
            vec![
                "demo/transition/trans_work_to_break_day.webm".to_string(),
                "demo/loop/loop_break_day.webm".to_string(),
            ]
        );
        assert_eq!(
            surface.background().as_deref(),
            Some("demo/background/bg_break_day.png")
        );
    }

    #[tokio::test]
    async fn test_no_transition_goes_straight_to_loop() {
        let surface = Arc::new(MockSurface::new());
        let engine = started(&surface).await;
        surface.clear_calls();

        engine.set_state(CharacterState::Away);
        settle().await;

        assert_eq!(surface.loads(), vec!["demo/loop/loop_away_day.webm".to_string()]);
        assert_eq!(
            surface.visible_source().as_deref(),
            Some("demo/loop/loop_away_day.webm")
        );
        // Away has no events
        assert!(!engine.is_event_armed());
    }

    #[tokio::test]
    async fn test_missing_transition_media_falls_back_to_loop() {
        let surface = Arc::new(MockSurface::new());
        surface.fail_clip("trans_work_to_slack_day");
        let engine = started(&surface).await;
        surface.clear_calls();

        engine.set_state(CharacterState::Slacking);
        settle().await;

        assert_eq!(
            surface.loads(),
            vec![
                "demo/transition/trans_work_to_slack_day.webm".to_string(),
                "demo/transition/trans_work_to_slack_day.mp4".to_string(),
                "demo/loop/loop_slack_day.webm".to_string(),
            ]
        );
        assert_eq!(
            surface.visible_source().as_deref(),
            Some("demo/loop/loop_slack_day.webm")
        );
    }

    #[tokio::test]
    async fn test_rejected_transition_falls_back_to_loop() {
        let surface = Arc::new(MockSurface::new());
        surface.reject_play("trans_work_to_break_day");
        let engine = started(&surface).await;

        engine.set_state(CharacterState::Break);
        settle().await;

        assert_eq!(
            surface.visible_source().as_deref(),
            Some("demo/loop/loop_break_day.webm")
        );
        assert_eq!(engine.playback_kind(), PlaybackKind::Loop);
    }

    #[tokio::test]
    async fn test_listeners_notified_once_per_change() {
        let surface = Arc::new(MockSurface::new());
        let engine = started(&surface).await;
        let listener = Arc::new(CountingListener::default());
        engine.add_listener(listener.clone());

        engine.set_state(CharacterState::Slacking);
        // Synchronous: visible before any task runs
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*listener.last.lock(), Some(CharacterState::Slacking));

        engine.set_state(CharacterState::Slacking);
        engine.set_state(CharacterState::Away);
        assert_eq!(listener.calls.load(Ordering::SeqCst), 2);
        assert_eq!(surface.label(), Some(CharacterState::Away));
    }

    #[tokio::test]
    async fn test_set_state_cancels_pending_event() {
        let surface = Arc::new(MockSurface::new());
        let engine = started(&surface).await;
        assert!(engine.is_event_armed());

        engine.set_state(CharacterState::Break);
        assert!(!engine.is_event_armed());
        assert!(!engine.is_event_in_progress());
    }

    #[tokio::test]
    async fn test_exactly_one_slot_visible() {
        let surface = Arc::new(MockSurface::new());
        let engine = started(&surface).await;

        for state in [
            CharacterState::Slacking,
            CharacterState::Away,
            CharacterState::Work,
            CharacterState::Break,
        ] {
            engine.set_state(state);
            settle().await;
            surface.finish(engine.active_slot());
            settle().await;
            assert_eq!(surface.visible_slots(), vec![engine.active_slot()]);
        }
        assert!(surface
            .calls()
            .iter()
            .any(|call| matches!(call, SurfaceCall::Pause(_))));
    }
}
