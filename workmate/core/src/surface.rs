//! Playback Surface Trait
//!
//! The display boundary of the engine. A surface owns two interchangeable
//! video targets, a static background plate and a state label. It does not
//! decide anything: the engine tells it what to load, show and play, and the
//! surface reports back when media is ready, failed, or has finished.
//!
//! Implementations exist for the browser-less player (filesystem-backed) and
//! for tests ([`crate::test_utils::MockSurface`]).

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::state::CharacterState;

/// One of the two video targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// First target (active at startup)
    Primary,
    /// Second target (standby at startup)
    Secondary,
}

impl SlotId {
    /// The other slot
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    /// Array index of the slot
    pub fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Result of pointing a slot at a media file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSignal {
    /// Enough data buffered to play through
    Ready,
    /// The media could not be loaded
    Failed,
}

/// Errors reported by a surface when starting playback
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The platform refused to start playback (autoplay policy and the like)
    #[error("playback rejected on {slot} slot: {reason}")]
    Rejected {
        /// Slot that failed to start
        slot: SlotId,
        /// Platform-provided reason
        reason: String,
    },

    /// The slot has no media to play
    #[error("{0} slot has no media loaded")]
    NothingLoaded(SlotId),
}

/// Display boundary driven by the character engine
///
/// Synchronous methods are plain property writes and must not block.
/// Asynchronous methods resolve when the platform signals completion.
#[async_trait]
pub trait PlaybackSurface: Send + Sync {
    /// Set the slot's source and loop flag, then wait for ready or failed
    async fn load(&self, slot: SlotId, path: &str, looping: bool) -> LoadSignal;

    /// Start playing the slot
    async fn play(&self, slot: SlotId) -> Result<(), PlaybackError>;

    /// Resolve once the one-shot clip in the slot has played to the end
    ///
    /// Only awaited for one-shot clips.
    async fn finished(&self, slot: SlotId);

    /// Make the slot visible
    fn show(&self, slot: SlotId);

    /// Hide the slot
    fn hide(&self, slot: SlotId);

    /// Pause the slot
    fn pause(&self, slot: SlotId);

    /// Replace the background plate image
    fn set_background(&self, path: &str);

    /// Update the state label next to the character
    fn set_label(&self, _state: CharacterState) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_other_is_involution() {
        assert_eq!(SlotId::Primary.other(), SlotId::Secondary);
        assert_eq!(SlotId::Secondary.other().other(), SlotId::Secondary);
        assert_ne!(SlotId::Primary.index(), SlotId::Secondary.index());
    }

    #[test]
    fn test_error_display() {
        let err = PlaybackError::Rejected {
            slot: SlotId::Secondary,
            reason: "autoplay blocked".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "playback rejected on secondary slot: autoplay blocked"
        );
    }
}
