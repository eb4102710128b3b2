//! Media Resolution
//!
//! Pure naming and path logic. Maps character states and event actions to
//! clip identifiers, and clip identifiers to the ordered list of encodings
//! that should be tried when loading them.
//!
//! # Asset Layout
//!
//! ```text
//! <base>/loop/loop_work_pen_day.webm
//! <base>/loop/loop_work_pen_day.mp4
//! <base>/transition/trans_work_to_break_day.webm
//! <base>/event/event_work_stretch_day.webm
//! <base>/background/bg_work_day.png
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::CharacterState;

/// Container encoding of a clip file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// WebM (VP9 with alpha), preferred
    Webm,
    /// MP4 (H.264), fallback
    Mp4,
}

impl Encoding {
    /// File extension for this encoding
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Family a clip belongs to, which also decides its asset folder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipKind {
    /// Steady-state clip
    Loop,
    /// Clip bridging two states
    Transition,
    /// One-shot clip injected during a loop
    Event,
}

impl ClipKind {
    /// Folder under the asset base path
    pub fn folder(self) -> &'static str {
        match self {
            Self::Loop => "loop",
            Self::Transition => "transition",
            Self::Event => "event",
        }
    }
}

/// Logical clip identifier, independent of encoding
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClipId {
    /// Clip family
    pub kind: ClipKind,
    /// Base file name without extension
    pub name: String,
}

impl ClipId {
    fn new(kind: ClipKind, name: String) -> Self {
        Self { kind, name }
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One encoding of a clip and where to find it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Encoding of the file
    pub encoding: Encoding,
    /// Full asset path
    pub path: String,
}

/// Ordered candidates for one logical clip, highest priority first
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaCandidate {
    /// The clip these candidates belong to
    pub clip: ClipId,
    /// Candidates in the order they should be tried
    pub candidates: Vec<Candidate>,
}

impl MediaCandidate {
    /// Iterate candidate paths in priority order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.path.as_str())
    }
}

/// Where assets live and how they are named
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetLayout {
    /// Root folder, with or without trailing slash
    pub base_path: String,
    /// Time-of-day suffix appended to every clip name
    pub period: String,
    /// Encodings to try, primary first
    pub encodings: Vec<Encoding>,
    /// Extension of the background plate images
    pub background_extension: String,
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self {
            base_path: "demo/".to_string(),
            period: "day".to_string(),
            encodings: vec![Encoding::Webm, Encoding::Mp4],
            background_extension: "png".to_string(),
        }
    }
}

/// Maps states and actions to clips and clips to asset paths
#[derive(Clone, Debug, Default)]
pub struct MediaResolver {
    layout: AssetLayout,
}

impl MediaResolver {
    /// Create a resolver for the given asset layout
    pub fn new(layout: AssetLayout) -> Self {
        Self { layout }
    }

    /// The asset layout in use
    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    /// Loop clip for a state
    ///
    /// Work uses the pen-writing variant of its loop.
    pub fn loop_clip(&self, state: CharacterState) -> ClipId {
        let name = match state {
            CharacterState::Work => format!("loop_work_pen_{}", self.layout.period),
            other => format!("loop_{}_{}", other.short_name(), self.layout.period),
        };
        ClipId::new(ClipKind::Loop, name)
    }

    /// Transition clip for an ordered state pair, if one was authored
    ///
    /// `None` is the normal answer for most pairs: the caller plays the
    /// destination loop directly.
    pub fn transition_clip(&self, from: CharacterState, to: CharacterState) -> Option<ClipId> {
        if !from.has_transition_to(to) {
            return None;
        }
        Some(ClipId::new(
            ClipKind::Transition,
            format!(
                "trans_{}_to_{}_{}",
                from.short_name(),
                to.short_name(),
                self.layout.period
            ),
        ))
    }

    /// Event clip for a state and action
    pub fn event_clip(&self, state: CharacterState, action: &str) -> ClipId {
        ClipId::new(
            ClipKind::Event,
            format!(
                "event_{}_{}_{}",
                state.short_name(),
                action,
                self.layout.period
            ),
        )
    }

    /// Expand a clip into its ordered encoding candidates
    pub fn candidates(&self, clip: &ClipId) -> MediaCandidate {
        let folder = self.join(clip.kind.folder());
        let candidates = self
            .layout
            .encodings
            .iter()
            .map(|&encoding| Candidate {
                encoding,
                path: format!("{}/{}.{}", folder, clip.name, encoding.extension()),
            })
            .collect();

        MediaCandidate {
            clip: clip.clone(),
            candidates,
        }
    }

    /// Background plate image for a state
    pub fn background(&self, state: CharacterState) -> String {
        format!(
            "{}/bg_{}_{}.{}",
            self.join("background"),
            state.short_name(),
            self.layout.period,
            self.layout.background_extension
        )
    }

    fn join(&self, folder: &str) -> String {
        let base = self.layout.base_path.trim_end_matches('/');
        if base.is_empty() {
            folder.to_string()
        } else {
            format!("{base}/{folder}")
        }
    }
}
