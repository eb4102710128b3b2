//! Double-Buffered Playback
//!
//! Two playback slots, exactly one of which is active (visible, playing) at
//! any time. The standby slot receives preloads; once a preload is ready the
//! roles are swapped in one step, so the viewer never sees a half-loaded clip.
//!
//! Only [`DoubleBuffer`] flips roles. Everything else asks it which slot is
//! standby and writes there.

use crate::media::ClipId;
use crate::state::PlaybackKind;
use crate::surface::{PlaybackSurface, SlotId};

/// What a slot currently holds
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedClip {
    /// Logical clip
    pub clip: ClipId,
    /// Resolved asset path (the encoding that loaded)
    pub path: String,
    /// How the clip is being played
    pub kind: PlaybackKind,
}

/// Owner of the active/standby role assignment
#[derive(Debug)]
pub struct DoubleBuffer {
    active: SlotId,
    contents: [Option<LoadedClip>; 2],
    swaps: u64,
}

impl DoubleBuffer {
    /// Create a buffer with the primary slot active and both slots empty
    pub fn new() -> Self {
        Self {
            active: SlotId::Primary,
            contents: [None, None],
            swaps: 0,
        }
    }

    /// The visible slot
    pub fn active(&self) -> SlotId {
        self.active
    }

    /// The slot used for preloading
    pub fn standby(&self) -> SlotId {
        self.active.other()
    }

    /// Record what the standby slot now holds
    ///
    /// Called once a preload into the standby slot has reported ready.
    pub fn stage(&mut self, clip: LoadedClip) {
        self.contents[self.standby().index()] = Some(clip);
    }

    /// Exchange roles: show the standby slot, hide and pause the old one
    ///
    /// Returns the newly active slot.
    pub fn swap(&mut self, surface: &dyn PlaybackSurface) -> SlotId {
        let old = self.active;
        let new = old.other();
        self.active = new;
        self.swaps += 1;

        surface.show(new);
        surface.hide(old);
        surface.pause(old);

        tracing::trace!(active = %new, swaps = self.swaps, "Buffer swapped");
        new
    }

    /// Clip in the active slot, if any
    pub fn active_clip(&self) -> Option<&LoadedClip> {
        self.contents[self.active.index()].as_ref()
    }

    /// Clip in the standby slot, if any
    pub fn standby_clip(&self) -> Option<&LoadedClip> {
        self.contents[self.standby().index()].as_ref()
    }

    /// Number of swaps performed so far
    pub fn swap_count(&self) -> u64 {
        self.swaps
    }
}

impl Default for DoubleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
