//! Standby Preloading
//!
//! Loads a clip into the standby slot, trying each encoding candidate in
//! order until one reports ready.
//!
//! # Staleness
//!
//! Loads cannot be aborted once the surface has started them. Instead every
//! attempt is stamped with a [`PreloadToken`] from a [`TokenIssuer`]. Only the
//! most recently issued token may commit; a completion carrying an older token
//! is dropped without side effects. Rapid state changes therefore cannot race
//! each other into showing a superseded clip.

use crate::media::{Encoding, MediaCandidate};
use crate::surface::{LoadSignal, PlaybackSurface, SlotId};

/// Stamp identifying one preload attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreloadToken(u64);

impl PreloadToken {
    /// Raw token value
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing preload tokens
///
/// Owned by whoever issues loads. Comparing against [`TokenIssuer::is_current`]
/// is the only cancellation mechanism.
#[derive(Debug, Default)]
pub struct TokenIssuer {
    latest: u64,
}

impl TokenIssuer {
    /// Create an issuer that has not issued anything yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token, superseding all earlier ones
    pub fn issue(&mut self) -> PreloadToken {
        self.latest += 1;
        PreloadToken(self.latest)
    }

    /// Replace `token` with a fresh one if it is still current
    ///
    /// A request chain renews its token for every step, so a chain that has
    /// been superseded stops at its next step instead of issuing a token that
    /// would in turn supersede its successor.
    pub fn renew(&mut self, token: PreloadToken) -> Option<PreloadToken> {
        if self.is_current(token) {
            Some(self.issue())
        } else {
            None
        }
    }

    /// Whether `token` is the latest issued
    pub fn is_current(&self, token: PreloadToken) -> bool {
        token.0 == self.latest
    }
}

/// Where preloads go and how their tokens are checked
///
/// Implemented by the engine so that token issuance and standby-slot
/// selection happen under the same lock as the swap that applies the result.
pub trait PreloadTarget: Send + Sync {
    /// Renew `token` and return the new token with the slot to load into
    ///
    /// `None` if `token` has been superseded.
    fn renew(&self, token: PreloadToken) -> Option<(PreloadToken, SlotId)>;

    /// Whether `token` may still commit
    fn is_current(&self, token: PreloadToken) -> bool;
}

/// Result of a preload request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// A candidate loaded and its token is still current
    Ready {
        /// Path of the candidate that loaded
        path: String,
        /// Its encoding
        encoding: Encoding,
        /// Slot it was loaded into
        slot: SlotId,
        /// Token of the successful attempt
        token: PreloadToken,
    },
    /// Every candidate failed
    Unavailable {
        /// Token of the last attempt
        token: PreloadToken,
    },
    /// A newer request was issued while this one was in flight
    Superseded,
}

/// Loads a clip's candidates into the standby slot
pub struct Preloader<'a> {
    surface: &'a dyn PlaybackSurface,
    target: &'a dyn PreloadTarget,
}

impl<'a> Preloader<'a> {
    /// Create a preloader over a surface and token target
    pub fn new(surface: &'a dyn PlaybackSurface, target: &'a dyn PreloadTarget) -> Self {
        Self { surface, target }
    }

    /// Try candidates in order, committing to the first that is ready
    ///
    /// `token` is the caller's current request token. Each attempt renews it,
    /// so the returned outcome carries the token to continue the chain with.
    pub async fn load(
        &self,
        media: &MediaCandidate,
        looping: bool,
        token: PreloadToken,
    ) -> PreloadOutcome {
        let mut token = token;

        for candidate in &media.candidates {
            let Some((attempt, slot)) = self.target.renew(token) else {
                return PreloadOutcome::Superseded;
            };
            token = attempt;

            tracing::debug!(
                clip = %media.clip,
                path = %candidate.path,
                slot = %slot,
                token = token.value(),
                "Preloading candidate"
            );

            let signal = self.surface.load(slot, &candidate.path, looping).await;

            if !self.target.is_current(token) {
                tracing::debug!(
                    clip = %media.clip,
                    token = token.value(),
                    "Dropping superseded preload"
                );
                return PreloadOutcome::Superseded;
            }

            match signal {
                LoadSignal::Ready => {
                    return PreloadOutcome::Ready {
                        path: candidate.path.clone(),
                        encoding: candidate.encoding,
                        slot,
                        token,
                    };
                }
                LoadSignal::Failed => {
                    tracing::warn!(
                        clip = %media.clip,
                        path = %candidate.path,
                        encoding = %candidate.encoding,
                        "Candidate failed to load, trying next"
                    );
                }
            }
        }

        PreloadOutcome::Unavailable { token }
    }
}
