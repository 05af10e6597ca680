//! Capabilities the state machine consumes from its host.
//!
//! The machine never holds a pointer back to its character. Instead the host
//! supplies a world-owned [`TimerScheduler`] and a character-owned
//! [`CharacterRig`] at construction. Callbacks flow back as plain values:
//! expired timers as [`FiredTimer`], finished clips as [`ClipCompletion`].

use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of an animation clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(String);

impl ClipId {
    /// Creates a clip ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the clip name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClipId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a visual effect asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(String);

impl EffectId {
    /// Creates an effect ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the effect name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EffectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Timers
// ============================================================================

/// Opaque token for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Creates a handle from a raw value. Schedulers mint these.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Ends a stun.
    StunRecovery,
    /// Finalizes death after the death animation and buffer.
    DeathFinalize,
}

/// A timer that has elapsed and must be delivered back to its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    /// Handle returned by [`TimerScheduler::schedule`].
    pub handle: TimerHandle,
    /// Purpose the timer was armed with.
    pub kind: TimerKind,
}

/// Single-shot delayed callbacks with cancellation by handle.
pub trait TimerScheduler {
    /// Schedules a timer `delay` seconds from now.
    fn schedule(&mut self, delay: f32, kind: TimerKind) -> TimerHandle;

    /// Cancels a timer. Cancelling an unknown or fired handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

// ============================================================================
// Animation
// ============================================================================

/// Why a clip was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipPurpose {
    /// A combo step.
    Attack {
        /// Combo index the clip belongs to.
        step: usize,
    },
}

/// Completion token handed to [`AnimationDriver::play_clip`].
///
/// The token is move-only, so it can be returned to the machine at most once
/// via `CombatStateMachine::on_clip_finished`. Tokens minted for an earlier
/// swing are recognised and ignored.
#[derive(Debug, PartialEq, Eq)]
pub struct ClipCompletion {
    pub(crate) serial: u64,
    clip: ClipId,
    purpose: ClipPurpose,
}

impl ClipCompletion {
    pub(crate) fn new(serial: u64, clip: ClipId, purpose: ClipPurpose) -> Self {
        Self {
            serial,
            clip,
            purpose,
        }
    }

    /// Clip this token was issued for.
    #[must_use]
    pub fn clip(&self) -> &ClipId {
        &self.clip
    }

    /// Purpose of the clip.
    #[must_use]
    pub fn purpose(&self) -> ClipPurpose {
        self.purpose
    }
}

/// Plays and stops animation clips on the character.
pub trait AnimationDriver {
    /// Plays `clip` at `rate` and returns its duration in seconds.
    ///
    /// Returns `0.0` when the clip could not be played, in which case
    /// `on_end` is dropped and never delivered.
    fn play_clip(&mut self, clip: &ClipId, rate: f32, on_end: Option<ClipCompletion>) -> f32;

    /// Stops `clip` with the given blend-out time.
    fn stop_clip(&mut self, clip: &ClipId, blend_out: f32);
}

// ============================================================================
// Effects, damage, locomotion
// ============================================================================

/// Attached visual effects.
pub trait EffectController {
    /// Spawns `effect` attached to `attach_point`.
    fn activate(&mut self, effect: &EffectId, attach_point: &str);

    /// Removes the active effect.
    fn deactivate(&mut self);
}

/// Applies damage to other actors.
pub trait DamageSink {
    /// Applies `amount` damage to `target`.
    fn apply(&mut self, target: EntityId, amount: f32, instigator: EntityId, cause: EntityId);
}

/// Locomotion capability toggles.
pub trait Locomotion {
    /// Allows or forbids walking.
    fn set_walking_enabled(&mut self, enabled: bool);

    /// Stops any movement this frame.
    fn halt_immediately(&mut self);

    /// Disables movement for good.
    fn disable_permanently(&mut self);
}

/// Everything the machine needs from the owning character.
pub trait CharacterRig: AnimationDriver + EffectController + DamageSink + Locomotion {}

impl<T> CharacterRig for T where T: AnimationDriver + EffectController + DamageSink + Locomotion {}
