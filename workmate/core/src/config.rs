//! TOML Configuration File Support
//!
//! Configuration is loaded from `~/.config/workmate/workmate.toml`.
//!
//! # Configuration Priority
//!
//! Values are applied in the following order (highest priority first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [assets]
//! base_path = "/usr/share/workmate/clips"
//! period = "night"
//! encodings = ["webm", "mp4"]
//! background_extension = "jpg"
//!
//! [character]
//! initial_state = "work"
//!
//! [events]
//! min_delay_secs = 30
//! max_delay_secs = 90
//! work = ["stretch", "drink"]
//! break = ["stretch"]
//!
//! [timer]
//! work_minutes = 50
//! rest_minutes = 10
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::clock::{ClockTimer, DEFAULT_REST_DURATION, DEFAULT_WORK_DURATION};
use crate::engine::EngineConfig;
use crate::media::{AssetLayout, Encoding};
use crate::scheduler::{EventCatalog, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY};
use crate::state::CharacterState;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Assets section of the TOML configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssetsToml {
    /// Root folder of the clip tree
    pub base_path: Option<String>,

    /// Time-of-day suffix of clip names
    pub period: Option<String>,

    /// Encodings to try, primary first
    pub encodings: Option<Vec<Encoding>>,

    /// Extension of background plates
    pub background_extension: Option<String>,
}

/// Character section of the TOML configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CharacterToml {
    /// State shown at startup
    pub initial_state: Option<CharacterState>,
}

/// Random events section of the TOML configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventsToml {
    /// Minimum delay before an event, in seconds
    pub min_delay_secs: Option<u64>,

    /// Maximum delay before an event, in seconds (exclusive)
    pub max_delay_secs: Option<u64>,

    /// Event actions while working
    pub work: Option<Vec<String>>,

    /// Event actions while on break
    #[serde(rename = "break")]
    pub rest: Option<Vec<String>>,

    /// Event actions while away
    pub away: Option<Vec<String>>,

    /// Event actions while slacking
    pub slacking: Option<Vec<String>>,
}

/// Timer section of the TOML configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimerToml {
    /// Length of a work phase in minutes
    pub work_minutes: Option<u64>,

    /// Length of a break phase in minutes
    pub rest_minutes: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkmateToml {
    /// Asset layout section
    pub assets: AssetsToml,

    /// Character section
    pub character: CharacterToml,

    /// Random events section
    pub events: EventsToml,

    /// Focus timer section
    pub timer: TimerToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for the companion
///
/// Use [`load_config`] to load with proper priority handling, then
/// [`WorkmateConfig::validate`] before building anything from it.
#[derive(Clone, Debug)]
pub struct WorkmateConfig {
    /// Asset naming and location
    pub layout: AssetLayout,

    /// Initial character state
    pub initial_state: CharacterState,

    /// Event actions per state
    pub catalog: EventCatalog,

    /// Lower bound of the random event delay
    pub min_event_delay: Duration,

    /// Upper bound of the random event delay
    pub max_event_delay: Duration,

    /// Length of a work phase
    pub work_duration: Duration,

    /// Length of a break phase
    pub rest_duration: Duration,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for WorkmateConfig {
    fn default() -> Self {
        Self {
            layout: AssetLayout::default(),
            initial_state: CharacterState::Work,
            catalog: EventCatalog::default(),
            min_event_delay: DEFAULT_MIN_DELAY,
            max_event_delay: DEFAULT_MAX_DELAY,
            work_duration: DEFAULT_WORK_DURATION,
            rest_duration: DEFAULT_REST_DURATION,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl WorkmateConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make the engine or timer misbehave
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layout.encodings.is_empty() {
            return Err(ConfigError::ValidationError(
                "assets.encodings must list at least one encoding".to_string(),
            ));
        }
        if self.work_duration.is_zero() {
            return Err(ConfigError::ValidationError(
                "timer.work_minutes must be greater than zero".to_string(),
            ));
        }
        if self.rest_duration.is_zero() {
            return Err(ConfigError::ValidationError(
                "timer.rest_minutes must be greater than zero".to_string(),
            ));
        }
        if self.max_event_delay <= self.min_event_delay {
            return Err(ConfigError::ValidationError(format!(
                "events.max_delay_secs ({}) must be greater than events.min_delay_secs ({})",
                self.max_event_delay.as_secs(),
                self.min_event_delay.as_secs()
            )));
        }
        Ok(())
    }

    /// Engine parameters from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            layout: self.layout.clone(),
            catalog: self.catalog.clone(),
            min_event_delay: self.min_event_delay,
            max_event_delay: self.max_event_delay,
            initial_state: self.initial_state,
            seed: None,
        }
    }

    /// An idle focus timer with the configured durations
    pub fn clock_timer(&self) -> ClockTimer {
        ClockTimer::new(self.work_duration, self.rest_duration)
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/workmate/workmate.toml` or
/// `~/.config/workmate/workmate.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("workmate").join("workmate.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or names an unknown initial state.
pub fn load_config() -> Result<WorkmateConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// A missing file is not an error (defaults are used).
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<WorkmateConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration, reading environment overrides through `env`
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<WorkmateConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = WorkmateConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: WorkmateToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut WorkmateConfig, toml: &WorkmateToml) -> Result<(), ConfigError> {
    // Assets
    if let Some(ref base) = toml.assets.base_path {
        config.layout.base_path = base.clone();
    }
    if let Some(ref period) = toml.assets.period {
        config.layout.period = period.clone();
    }
    if let Some(ref encodings) = toml.assets.encodings {
        config.layout.encodings = encodings.clone();
    }
    if let Some(ref ext) = toml.assets.background_extension {
        config.layout.background_extension = ext.clone();
    }

    // Character
    if let Some(state) = toml.character.initial_state {
        config.initial_state = state;
    }

    // Events
    if let Some(secs) = toml.events.min_delay_secs {
        config.min_event_delay = Duration::from_secs(secs);
    }
    if let Some(secs) = toml.events.max_delay_secs {
        config.max_event_delay = Duration::from_secs(secs);
    }
    let per_state = [
        (CharacterState::Work, &toml.events.work),
        (CharacterState::Break, &toml.events.rest),
        (CharacterState::Away, &toml.events.away),
        (CharacterState::Slacking, &toml.events.slacking),
    ];
    for (state, actions) in per_state {
        if let Some(actions) = actions {
            config.catalog.set_actions(state, actions.iter().cloned());
        }
    }

    // Timer
    if let Some(minutes) = toml.timer.work_minutes {
        config.work_duration = minutes_to_duration(minutes).ok_or_else(|| {
            ConfigError::ValidationError(format!("timer.work_minutes is too large: {minutes}"))
        })?;
    }
    if let Some(minutes) = toml.timer.rest_minutes {
        config.rest_duration = minutes_to_duration(minutes).ok_or_else(|| {
            ConfigError::ValidationError(format!("timer.rest_minutes is too large: {minutes}"))
        })?;
    }

    Ok(())
}

/// Whole minutes as a duration, `None` if the seconds overflow
fn minutes_to_duration(minutes: u64) -> Option<Duration> {
    minutes.checked_mul(60).map(Duration::from_secs)
}

/// Apply environment variable overrides to the config
///
/// Unparseable values are ignored with a warning.
fn apply_env_config<F>(config: &mut WorkmateConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = env("WORKMATE_ASSETS") {
        config.layout.base_path = base;
        config.source = ConfigSource::Env;
    }
    if let Some(period) = env("WORKMATE_PERIOD") {
        config.layout.period = period;
        config.source = ConfigSource::Env;
    }
    if let Some(minutes) = env("WORKMATE_WORK_MINUTES") {
        match minutes.parse::<u64>().ok().and_then(minutes_to_duration) {
            Some(duration) => {
                config.work_duration = duration;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %minutes, "Ignoring invalid WORKMATE_WORK_MINUTES"),
        }
    }
    if let Some(minutes) = env("WORKMATE_REST_MINUTES") {
        match minutes.parse::<u64>().ok().and_then(minutes_to_duration) {
            Some(duration) => {
                config.rest_duration = duration;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %minutes, "Ignoring invalid WORKMATE_REST_MINUTES"),
        }
    }
    if let Some(state) = env("WORKMATE_INITIAL_STATE") {
        match state.parse::<CharacterState>() {
            Ok(s) => {
                config.initial_state = s;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid WORKMATE_INITIAL_STATE"),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Asset base path override
    pub base_path: Option<String>,

    /// Initial state override
    pub initial_state: Option<CharacterState>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set asset base path override
    #[must_use]
    pub fn with_base_path(mut self, path: String) -> Self {
        self.base_path = Some(path);
        self
    }

    /// Set initial state override
    #[must_use]
    pub fn with_initial_state(mut self, state: CharacterState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut WorkmateConfig) {
        if self.base_path.is_some() || self.initial_state.is_some() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref base) = self.base_path {
            config.layout.base_path = base.clone();
        }

        if let Some(state) = self.initial_state {
            config.initial_state = state;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
