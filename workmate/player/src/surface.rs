//! Filesystem-backed playback surface
//!
//! Stands in for a real video widget: a candidate is "ready" when its file
//! exists, one-shot clips end after a fixed length, and everything visible is
//! reported through tracing.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use workmate_core::{CharacterState, LoadSignal, PlaybackError, PlaybackSurface, SlotId};

#[derive(Clone, Debug, Default)]
struct Slot {
    source: Option<String>,
    looping: bool,
    playing: bool,
}

/// Surface that resolves clips against the local filesystem
pub struct FsSurface {
    root: PathBuf,
    clip_length: Duration,
    slots: Mutex<[Slot; 2]>,
}

impl FsSurface {
    /// Create a surface resolving relative asset paths against `root`
    pub fn new(root: PathBuf, clip_length: Duration) -> Self {
        Self {
            root,
            clip_length,
            slots: Mutex::new([Slot::default(), Slot::default()]),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl PlaybackSurface for FsSurface {
    async fn load(&self, slot: SlotId, path: &str, looping: bool) -> LoadSignal {
        {
            let mut slots = self.slots.lock();
            let target = &mut slots[slot.index()];
            target.source = Some(path.to_string());
            target.looping = looping;
            target.playing = false;
        }

        match tokio::fs::try_exists(self.resolve(path)).await {
            Ok(true) => LoadSignal::Ready,
            Ok(false) => {
                debug!(path, "Clip file not found");
                LoadSignal::Failed
            }
            Err(e) => {
                debug!(path, error = %e, "Clip file not accessible");
                LoadSignal::Failed
            }
        }
    }

    async fn play(&self, slot: SlotId) -> Result<(), PlaybackError> {
        let mut slots = self.slots.lock();
        let target = &mut slots[slot.index()];
        let Some(source) = target.source.clone() else {
            return Err(PlaybackError::NothingLoaded(slot));
        };
        target.playing = true;
        info!(slot = %slot, clip = %source, looping = target.looping, "Playing");
        Ok(())
    }

    async fn finished(&self, slot: SlotId) {
        tokio::time::sleep(self.clip_length).await;
        self.slots.lock()[slot.index()].playing = false;
    }

    fn show(&self, slot: SlotId) {
        debug!(slot = %slot, "Show");
    }

    fn hide(&self, slot: SlotId) {
        debug!(slot = %slot, "Hide");
    }

    fn pause(&self, slot: SlotId) {
        self.slots.lock()[slot.index()].playing = false;
    }

    fn set_background(&self, path: &str) {
        info!(background = %path, "Background");
    }

    fn set_label(&self, state: CharacterState) {
        info!(label = state.label(), "Label");
    }
}
