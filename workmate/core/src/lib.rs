//! Work Mate Core - Animated Desk Companion Engine
//!
//! This crate drives an on-screen character that reacts to a handful of
//! life-like states (working, on break, slacking, away) using pre-rendered
//! video clips, and keeps a focus timer in step with it. It does no decoding
//! or drawing itself: everything visible goes through a [`PlaybackSurface`]
//! supplied by the host.
//!
//! # Architecture
//!
//! ```text
//!            set_state(state)
//!                  │
//! ┌────────────────┼─────────────────────────────────────────────┐
//! │                ▼               CharacterEngine               │
//! │  ┌──────────────────┐   ┌───────────┐   ┌─────────────────┐  │
//! │  │  MediaResolver   │──▶│ Preloader │──▶│  DoubleBuffer   │  │
//! │  │ (clip + paths)   │   │ (tokens)  │   │ (active/standby)│  │
//! │  └──────────────────┘   └───────────┘   └────────┬────────┘  │
//! │           ▲                                      │           │
//! │  ┌────────┴───────────┐                          │           │
//! │  │RandomEventScheduler│                          │           │
//! │  └────────────────────┘                          │           │
//! └──────────────┬───────────────────────────────────┼───────────┘
//!                │ StateListener                     │
//!        ┌───────┴────────┐                          ▼
//!        │ Clock          │                   PlaybackSurface
//!        │ WorkTimeCounter│              (two slots, background, label)
//!        └────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`CharacterEngine`]: the state machine; accepts state changes
//! - [`Companion`]: the engine plus the focus timer and work time counter
//! - [`PlaybackSurface`]: what a host implements to display clips
//! - [`ClockTimer`]: the work/break countdown gated by the character
//! - [`WorkmateConfig`]: file and environment configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use workmate_core::{load_config, CharacterState, Companion};
//!
//! let config = load_config()?;
//! config.validate()?;
//!
//! let companion = Companion::new(Arc::new(MySurface::new()), &config);
//! companion.start();
//! companion.clock().start();
//!
//! companion.set_state(CharacterState::Break);
//! println!("{}", companion.status());
//! ```
//!
//! # Module Overview
//!
//! - [`state`]: character states and playback kinds
//! - [`media`]: clip naming and candidate paths
//! - [`surface`]: the display boundary
//! - [`buffer`]: active/standby slot ownership
//! - [`preload`]: candidate fallback and request tokens
//! - [`scheduler`]: random event timer
//! - [`engine`]: the character state machine
//! - [`clock`]: focus timer
//! - [`counter`]: work time counter
//! - [`companion`]: top-level wiring
//! - [`config`]: TOML and environment configuration
//! - [`test_utils`]: recording mock surface

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod clock;
pub mod companion;
pub mod config;
pub mod counter;
pub mod engine;
pub mod media;
pub mod preload;
pub mod scheduler;
pub mod state;
pub mod surface;
pub mod test_utils;

pub use buffer::{DoubleBuffer, LoadedClip};
pub use clock::{Clock, ClockTimer, TickOutcome, TimerPhase};
pub use companion::{Companion, CompanionStatus};
pub use counter::WorkTimeCounter;
pub use engine::{CharacterEngine, EngineConfig, StateListener};
pub use media::{AssetLayout, Candidate, ClipId, ClipKind, Encoding, MediaCandidate, MediaResolver};
pub use preload::{PreloadOutcome, PreloadTarget, PreloadToken, Preloader, TokenIssuer};
pub use scheduler::{EventCatalog, RandomEventScheduler};
pub use state::{CharacterState, ParseStateError, PlaybackKind};
pub use surface::{LoadSignal, PlaybackError, PlaybackSurface, SlotId};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env, ConfigError,
    ConfigOverrides, ConfigSource, WorkmateConfig, WorkmateToml,
};
