//! Character States
//!
//! The four life-like states the character can be shown in, plus the tag
//! describing what kind of clip the double buffer is currently showing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The state the character is displayed in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterState {
    /// Working at the desk
    #[default]
    Work,
    /// Taking a break
    Break,
    /// Away from the desk
    Away,
    /// Slacking off
    #[serde(alias = "slack")]
    Slacking,
}

impl CharacterState {
    /// Every state, in display order
    pub const ALL: [CharacterState; 4] = [Self::Work, Self::Break, Self::Away, Self::Slacking];

    /// Lowercase name used on the control surface
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
            Self::Away => "away",
            Self::Slacking => "slacking",
        }
    }

    /// Short name used inside asset file names
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Slacking => "slack",
            other => other.as_str(),
        }
    }

    /// Label shown next to the character
    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "WORK",
            Self::Break => "BREAK",
            Self::Away => "AWAY",
            Self::Slacking => "SLACKING",
        }
    }

    /// Whether a hand-authored transition clip exists from `self` to `to`
    ///
    /// Only visually compatible pairs have connecting animation. Every other
    /// change cuts straight to the destination loop.
    pub fn has_transition_to(self, to: CharacterState) -> bool {
        use CharacterState::*;

        matches!(
            (self, to),
            (Work, Slacking)
                | (Slacking, Work)
                | (Away, Work)
                | (Work, Break)
                | (Break, Work)
                | (Slacking, Away)
        )
    }
}

impl fmt::Display for CharacterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown character state name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown character state '{0}' (expected work, break, away or slacking)")]
pub struct ParseStateError(pub String);

impl FromStr for CharacterState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Self::Work),
            "break" => Ok(Self::Break),
            "away" => Ok(Self::Away),
            "slacking" | "slack" => Ok(Self::Slacking),
            _ => Err(ParseStateError(s.to_string())),
        }
    }
}

/// What kind of clip the active buffer slot is playing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackKind {
    /// A steady-state clip that repeats indefinitely
    #[default]
    Loop,
    /// A one-shot clip bridging two states
    Transition,
    /// A one-shot clip injected during a loop
    Event,
}

impl PlaybackKind {
    /// Whether the clip repeats natively
    pub fn is_looping(self) -> bool {
        matches!(self, Self::Loop)
    }
}
