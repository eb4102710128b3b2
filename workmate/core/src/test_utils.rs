//! Engine Test Utilities
//!
//! A recording [`PlaybackSurface`] for exercising the engine without a real
//! display. Loads can be scripted to fail, held open until the test releases
//! them (to reorder completions), and one-shot clips only finish when the test
//! says so.
//!
//! # Usage
//!
//! ```ignore
//! use workmate_core::test_utils::{settle, MockSurface};
//!
//! let surface = Arc::new(MockSurface::new());
//! surface.fail_clip("loop_work_pen_day");
//!
//! let engine = CharacterEngine::new(surface.clone(), EngineConfig::default());
//! engine.start();
//! settle().await;
//!
//! assert!(surface.visible_source().is_none());
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::state::CharacterState;
use crate::surface::{LoadSignal, PlaybackError, PlaybackSurface, SlotId};

/// A recorded surface interaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceCall {
    /// `load` was called
    Load {
        /// Target slot
        slot: SlotId,
        /// Requested path
        path: String,
        /// Native loop flag
        looping: bool,
    },
    /// `play` was called
    Play(SlotId),
    /// `show` was called
    Show(SlotId),
    /// `hide` was called
    Hide(SlotId),
    /// `pause` was called
    Pause(SlotId),
    /// `set_background` was called
    Background(String),
    /// `set_label` was called
    Label(CharacterState),
}

#[derive(Clone, Debug, Default)]
struct SlotState {
    source: Option<String>,
    looping: bool,
    visible: bool,
    playing: bool,
}

#[derive(Default)]
struct MockState {
    calls: Vec<SurfaceCall>,
    failing_paths: HashSet<String>,
    failing_clips: Vec<String>,
    rejected_clips: Vec<String>,
    pending: Vec<(String, oneshot::Sender<LoadSignal>)>,
    preset: HashMap<String, LoadSignal>,
    slots: [SlotState; 2],
}

impl MockState {
    fn load_fails(&self, path: &str) -> bool {
        self.failing_paths.contains(path) || self.failing_clips.iter().any(|c| path.contains(c))
    }

    fn play_rejected(&self, path: &str) -> bool {
        self.rejected_clips.iter().any(|c| path.contains(c))
    }
}

/// Recording surface with scriptable media behavior
pub struct MockSurface {
    state: Mutex<MockState>,
    finish: [watch::Sender<u64>; 2],
    gated: bool,
}

impl MockSurface {
    /// Surface where every load resolves immediately
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Surface where loads stay pending until [`MockSurface::release`]
    pub fn gated() -> Self {
        Self::build(true)
    }

    fn build(gated: bool) -> Self {
        let mut state = MockState::default();
        state.slots[SlotId::Primary.index()].visible = true;

        Self {
            state: Mutex::new(state),
            finish: [watch::channel(0).0, watch::channel(0).0],
            gated,
        }
    }

    /// Make loads of exactly this path fail
    pub fn fail_path(&self, path: &str) {
        self.state.lock().failing_paths.insert(path.to_string());
    }

    /// Make every encoding of a clip fail to load
    pub fn fail_clip(&self, clip_name: &str) {
        self.state.lock().failing_clips.push(clip_name.to_string());
    }

    /// Make the platform refuse to play a clip
    pub fn reject_play(&self, clip_name: &str) {
        self.state.lock().rejected_clips.push(clip_name.to_string());
    }

    /// Resolve a pending gated load of `path`
    ///
    /// If no load of `path` is pending yet, the next one resolves with
    /// `signal` immediately.
    pub fn release(&self, path: &str, signal: LoadSignal) {
        let mut state = self.state.lock();
        match state.pending.iter().position(|(p, _)| p == path) {
            Some(idx) => {
                let (_, tx) = state.pending.remove(idx);
                let _ = tx.send(signal);
            }
            None => {
                state.preset.insert(path.to_string(), signal);
            }
        }
    }

    /// Paths of loads still waiting for [`MockSurface::release`]
    pub fn pending_loads(&self) -> Vec<String> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Signal that the clip in `slot` played to its end
    ///
    /// Wakes every task currently waiting in `finished(slot)`.
    pub fn finish(&self, slot: SlotId) {
        self.state.lock().slots[slot.index()].playing = false;
        self.finish[slot.index()].send_modify(|ends| *ends += 1);
    }

    /// Every recorded call, oldest first
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Paths passed to `load`, oldest first
    pub fn loads(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Load { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `play` calls
    pub fn play_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Play(_)))
            .count()
    }

    /// Current source of a slot
    pub fn source(&self, slot: SlotId) -> Option<String> {
        self.state.lock().slots[slot.index()].source.clone()
    }

    /// Current loop flag of a slot
    pub fn is_looping(&self, slot: SlotId) -> bool {
        self.state.lock().slots[slot.index()].looping
    }

    /// Whether a slot is currently playing
    pub fn is_playing(&self, slot: SlotId) -> bool {
        self.state.lock().slots[slot.index()].playing
    }

    /// Slots currently visible
    pub fn visible_slots(&self) -> Vec<SlotId> {
        let state = self.state.lock();
        [SlotId::Primary, SlotId::Secondary]
            .into_iter()
            .filter(|slot| state.slots[slot.index()].visible)
            .collect()
    }

    /// Source of the visible slot, if it is playing something
    pub fn visible_source(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .slots
            .iter()
            .find(|slot| slot.visible && slot.playing)
            .and_then(|slot| slot.source.clone())
    }

    /// Last background plate set
    pub fn background(&self) -> Option<String> {
        self.state
            .lock()
            .calls
            .iter()
            .rev()
            .find_map(|call| match call {
                SurfaceCall::Background(path) => Some(path.clone()),
                _ => None,
            })
    }

    /// Last label set
    pub fn label(&self) -> Option<CharacterState> {
        self.state
            .lock()
            .calls
            .iter()
            .rev()
            .find_map(|call| match call {
                SurfaceCall::Label(state) => Some(*state),
                _ => None,
            })
    }
}

impl Default for MockSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackSurface for MockSurface {
    async fn load(&self, slot: SlotId, path: &str, looping: bool) -> LoadSignal {
        let rx = {
            let mut state = self.state.lock();
            state.calls.push(SurfaceCall::Load {
                slot,
                path: path.to_string(),
                looping,
            });

            let target = &mut state.slots[slot.index()];
            target.source = Some(path.to_string());
            target.looping = looping;
            target.playing = false;

            if let Some(signal) = state.preset.remove(path) {
                return signal;
            }
            if !self.gated {
                return if state.load_fails(path) {
                    LoadSignal::Failed
                } else {
                    LoadSignal::Ready
                };
            }

            let (tx, rx) = oneshot::channel();
            state.pending.push((path.to_string(), tx));
            rx
        };

        rx.await.unwrap_or(LoadSignal::Failed)
    }

    async fn play(&self, slot: SlotId) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::Play(slot));

        let source = state.slots[slot.index()].source.clone();
        match source {
            None => Err(PlaybackError::NothingLoaded(slot)),
            Some(path) if state.play_rejected(&path) => Err(PlaybackError::Rejected {
                slot,
                reason: "autoplay blocked".to_string(),
            }),
            Some(_) => {
                state.slots[slot.index()].playing = true;
                Ok(())
            }
        }
    }

    async fn finished(&self, slot: SlotId) {
        let mut ends = self.finish[slot.index()].subscribe();
        // The sender lives as long as the surface
        let _ = ends.changed().await;
    }

    fn show(&self, slot: SlotId) {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::Show(slot));
        state.slots[slot.index()].visible = true;
    }

    fn hide(&self, slot: SlotId) {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::Hide(slot));
        state.slots[slot.index()].visible = false;
    }

    fn pause(&self, slot: SlotId) {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::Pause(slot));
        state.slots[slot.index()].playing = false;
    }

    fn set_background(&self, path: &str) {
        self.state
            .lock()
            .calls
            .push(SurfaceCall::Background(path.to_string()));
    }

    fn set_label(&self, state: CharacterState) {
        self.state.lock().calls.push(SurfaceCall::Label(state));
    }
}

/// Let spawned engine tasks run until they block
///
/// Only yields; never advances the (possibly paused) clock.
pub async fn settle() {
    for _ in 0..128 {
        tokio::task::yield_now().await;
    }
}
