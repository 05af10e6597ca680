//! Recording character rig for testing hosts and the machine itself.

use ahash::AHashMap;
use skirmish_common::EntityId;

use crate::collaborators::{
    AnimationDriver, ClipCompletion, ClipId, DamageSink, EffectController, EffectId, Locomotion,
};

/// A collaborator call observed by [`RecordingRig`].
#[derive(Debug, Clone, PartialEq)]
pub enum RigCall {
    /// `AnimationDriver::play_clip`.
    PlayClip {
        /// Clip played.
        clip: ClipId,
        /// Playback rate.
        rate: f32,
        /// Whether a completion token was attached.
        with_completion: bool,
    },
    /// `AnimationDriver::stop_clip`.
    StopClip {
        /// Clip stopped.
        clip: ClipId,
        /// Blend-out time.
        blend_out: f32,
    },
    /// `EffectController::activate`.
    ActivateEffect {
        /// Effect spawned.
        effect: EffectId,
        /// Attachment point.
        attach_point: String,
    },
    /// `EffectController::deactivate`.
    DeactivateEffect,
    /// `DamageSink::apply`.
    ApplyDamage {
        /// Target.
        target: EntityId,
        /// Damage amount.
        amount: f32,
        /// Instigator.
        instigator: EntityId,
        /// Cause.
        cause: EntityId,
    },
    /// `Locomotion::set_walking_enabled`.
    SetWalkingEnabled(bool),
    /// `Locomotion::halt_immediately`.
    HaltImmediately,
    /// `Locomotion::disable_permanently`.
    DisablePermanently,
}

/// Rig that records every call and keeps completion tokens for the test to
/// hand back.
#[derive(Debug)]
pub struct RecordingRig {
    calls: Vec<RigCall>,
    clip_lengths: AHashMap<ClipId, f32>,
    default_clip_length: f32,
    completions: Vec<ClipCompletion>,
}

impl Default for RecordingRig {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            clip_lengths: AHashMap::new(),
            default_clip_length: 1.0,
            completions: Vec::new(),
        }
    }
}

impl RecordingRig {
    /// Creates a rig where every clip lasts one second.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duration reported for `clip`.
    #[must_use]
    pub fn with_clip_length(mut self, clip: impl Into<ClipId>, seconds: f32) -> Self {
        self.clip_lengths.insert(clip.into(), seconds);
        self
    }

    /// Sets the duration reported for clips without an explicit length.
    #[must_use]
    pub fn with_default_clip_length(mut self, seconds: f32) -> Self {
        self.default_clip_length = seconds;
        self
    }

    /// All recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> &[RigCall] {
        &self.calls
    }

    /// Forgets recorded calls (completion tokens are kept).
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&RigCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Damage calls, in order.
    #[must_use]
    pub fn damage_calls(&self) -> Vec<(EntityId, f32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RigCall::ApplyDamage { target, amount, .. } => Some((*target, *amount)),
                _ => None,
            })
            .collect()
    }

    /// Number of `play_clip` calls for `clip`.
    #[must_use]
    pub fn play_count(&self, clip: &str) -> usize {
        self.count(|c| matches!(c, RigCall::PlayClip { clip: played, .. } if played.as_str() == clip))
    }

    /// Position of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&RigCall) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    /// Completion tokens not yet taken.
    #[must_use]
    pub fn pending_completions(&self) -> usize {
        self.completions.len()
    }

    /// Takes the most recent completion token.
    pub fn take_latest_completion(&mut self) -> Option<ClipCompletion> {
        self.completions.pop()
    }

    /// Takes the oldest completion token.
    pub fn take_oldest_completion(&mut self) -> Option<ClipCompletion> {
        if self.completions.is_empty() {
            None
        } else {
            Some(self.completions.remove(0))
        }
    }
}

impl AnimationDriver for RecordingRig {
    fn play_clip(&mut self, clip: &ClipId, rate: f32, on_end: Option<ClipCompletion>) -> f32 {
        self.calls.push(RigCall::PlayClip {
            clip: clip.clone(),
            rate,
            with_completion: on_end.is_some(),
        });
        let length = self
            .clip_lengths
            .get(clip)
            .copied()
            .unwrap_or(self.default_clip_length);
        if length > 0.0 {
            if let Some(token) = on_end {
                self.completions.push(token);
            }
        }
        length / rate.max(0.01)
    }

    fn stop_clip(&mut self, clip: &ClipId, blend_out: f32) {
        self.calls.push(RigCall::StopClip {
            clip: clip.clone(),
            blend_out,
        });
    }
}

impl EffectController for RecordingRig {
    fn activate(&mut self, effect: &EffectId, attach_point: &str) {
        self.calls.push(RigCall::ActivateEffect {
            effect: effect.clone(),
            attach_point: attach_point.to_string(),
        });
    }

    fn deactivate(&mut self) {
        self.calls.push(RigCall::DeactivateEffect);
    }
}

impl DamageSink for RecordingRig {
    fn apply(&mut self, target: EntityId, amount: f32, instigator: EntityId, cause: EntityId) {
        self.calls.push(RigCall::ApplyDamage {
            target,
            amount,
            instigator,
            cause,
        });
    }
}

impl Locomotion for RecordingRig {
    fn set_walking_enabled(&mut self, enabled: bool) {
        self.calls.push(RigCall::SetWalkingEnabled(enabled));
    }

    fn halt_immediately(&mut self) {
        self.calls.push(RigCall::HaltImmediately);
    }

    fn disable_permanently(&mut self) {
        self.calls.push(RigCall::DisablePermanently);
    }
}
