//! Headless character rig.
//!
//! Plays clips against a simulated clock and queues their completion tokens
//! for the runner to deliver. Damage is logged rather than applied.

use ahash::AHashMap;
use skirmish_combat::{
    AnimationDriver, ClipCompletion, ClipId, DamageSink, EffectController, EffectId, Locomotion,
};
use skirmish_common::EntityId;
use tracing::{debug, trace};

/// A clip currently playing.
#[derive(Debug)]
struct PlayingClip {
    clip: ClipId,
    remaining: f32,
    on_end: Option<ClipCompletion>,
}

/// Damage the rig was asked to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRecord {
    /// Actor damaged.
    pub target: EntityId,
    /// Amount applied.
    pub amount: f32,
}

/// Character rig driven by simulated time.
#[derive(Debug)]
pub struct SimRig {
    clip_lengths: AHashMap<ClipId, f32>,
    default_clip_length: f32,
    playing: Vec<PlayingClip>,
    finished: Vec<(ClipCompletion, bool)>,
    damage: Vec<DamageRecord>,
    active_effect: Option<EffectId>,
    walking_enabled: bool,
    disabled: bool,
}

impl SimRig {
    /// Creates a rig. Clips not in `clip_lengths` last `default_clip_length`.
    #[must_use]
    pub fn new<'a>(
        clip_lengths: impl IntoIterator<Item = (&'a String, &'a f32)>,
        default_clip_length: f32,
    ) -> Self {
        Self {
            clip_lengths: clip_lengths
                .into_iter()
                .map(|(clip, len)| (ClipId::new(clip.as_str()), *len))
                .collect(),
            default_clip_length,
            playing: Vec::new(),
            finished: Vec::new(),
            damage: Vec::new(),
            active_effect: None,
            walking_enabled: true,
            disabled: false,
        }
    }

    /// Advances every playing clip. Clips that reach their end queue a
    /// natural completion.
    pub fn advance(&mut self, dt: f32) {
        for playing in &mut self.playing {
            playing.remaining -= dt;
        }
        let (done, still): (Vec<_>, Vec<_>) = self
            .playing
            .drain(..)
            .partition(|p| p.remaining <= 0.0);
        self.playing = still;
        for clip in done {
            trace!("Clip '{}' finished", clip.clip);
            if let Some(token) = clip.on_end {
                self.finished.push((token, false));
            }
        }
    }

    /// Takes queued completions as `(token, interrupted)` pairs, oldest first.
    pub fn take_finished(&mut self) -> Vec<(ClipCompletion, bool)> {
        std::mem::take(&mut self.finished)
    }

    /// Names of clips still playing.
    #[must_use]
    pub fn playing(&self) -> Vec<&ClipId> {
        self.playing.iter().map(|p| &p.clip).collect()
    }

    /// Damage applied so far.
    #[must_use]
    pub fn damage(&self) -> &[DamageRecord] {
        &self.damage
    }

    /// Effect currently attached, if any.
    #[must_use]
    pub fn active_effect(&self) -> Option<&EffectId> {
        self.active_effect.as_ref()
    }

    /// Whether the character may walk.
    #[must_use]
    pub fn walking_enabled(&self) -> bool {
        self.walking_enabled && !self.disabled
    }

    fn interrupt(&mut self, index: usize) {
        let clip = self.playing.remove(index);
        if let Some(token) = clip.on_end {
            self.finished.push((token, true));
        }
    }
}

impl AnimationDriver for SimRig {
    fn play_clip(&mut self, clip: &ClipId, rate: f32, on_end: Option<ClipCompletion>) -> f32 {
        let length = self
            .clip_lengths
            .get(clip)
            .copied()
            .unwrap_or(self.default_clip_length)
            / rate.max(0.01);
        if length <= 0.0 {
            debug!("Clip '{clip}' has no length; not played");
            return 0.0;
        }

        // A new tracked clip takes over the slot of the previous one.
        if on_end.is_some() {
            if let Some(index) = self.playing.iter().position(|p| p.on_end.is_some()) {
                self.interrupt(index);
            }
        }
        if let Some(index) = self.playing.iter().position(|p| &p.clip == clip) {
            self.interrupt(index);
        }

        trace!("Playing '{clip}' for {length:.2}s");
        self.playing.push(PlayingClip {
            clip: clip.clone(),
            remaining: length,
            on_end,
        });
        length
    }

    fn stop_clip(&mut self, clip: &ClipId, blend_out: f32) {
        if let Some(index) = self.playing.iter().position(|p| &p.clip == clip) {
            trace!("Stopping '{clip}' (blend {blend_out:.2}s)");
            self.interrupt(index);
        }
    }
}

impl EffectController for SimRig {
    fn activate(&mut self, effect: &EffectId, attach_point: &str) {
        debug!("Effect '{effect}' attached to {attach_point}");
        self.active_effect = Some(effect.clone());
    }

    fn deactivate(&mut self) {
        if let Some(effect) = self.active_effect.take() {
            debug!("Effect '{effect}' removed");
        }
    }
}

impl DamageSink for SimRig {
    fn apply(&mut self, target: EntityId, amount: f32, instigator: EntityId, _cause: EntityId) {
        debug!("{instigator} deals {amount} to {target}");
        self.damage.push(DamageRecord { target, amount });
    }
}

impl Locomotion for SimRig {
    fn set_walking_enabled(&mut self, enabled: bool) {
        self.walking_enabled = enabled;
    }

    fn halt_immediately(&mut self) {
        trace!("Movement halted");
    }

    fn disable_permanently(&mut self) {
        self.disabled = true;
        self.walking_enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_combat::{CombatProfile, CombatState, CombatStateMachine, SimTimerScheduler};
    use std::collections::BTreeMap;

    fn rig(lengths: &[(&str, f32)]) -> SimRig {
        let map: BTreeMap<String, f32> = lengths.iter().map(|(c, l)| ((*c).to_string(), *l)).collect();
        SimRig::new(&map, 1.0)
    }

    #[test]
    fn test_clip_finishes_after_length() {
        let mut rig = rig(&[("stunned", 0.5)]);
        assert_eq!(rig.play_clip(&ClipId::from("stunned"), 1.0, None), 0.5);

        rig.advance(0.25);
        assert_eq!(rig.playing().len(), 1);
        rig.advance(0.25);
        assert!(rig.playing().is_empty());
        // Untracked clips queue nothing.
        assert!(rig.take_finished().is_empty());
    }

    #[test]
    fn test_zero_length_clip_not_played() {
        let mut rig = rig(&[("empty", 0.0)]);
        assert_eq!(rig.play_clip(&ClipId::from("empty"), 1.0, None), 0.0);
        assert!(rig.playing().is_empty());
    }

    #[test]
    fn test_rate_scales_length() {
        let mut rig = rig(&[]);
        assert_eq!(rig.play_clip(&ClipId::from("any"), 2.0, None), 0.5);
    }

    #[test]
    fn test_machine_attack_completes_naturally() {
        let mut m = CombatStateMachine::new(
            EntityId::from_raw(1),
            CombatProfile::default(),
            SimTimerScheduler::new(),
            rig(&[("attack_1", 0.5)]),
        );
        m.start_attack();

        let rig = m.rig_mut().unwrap();
        rig.advance(0.5);
        let finished = rig.take_finished();
        assert_eq!(finished.len(), 1);
        for (token, interrupted) in finished {
            assert!(!interrupted);
            m.on_clip_finished(token, interrupted);
        }
        assert_eq!(m.current_state(), CombatState::Idle);
    }

    #[test]
    fn test_combo_step_interrupts_previous_clip() {
        let mut m = CombatStateMachine::new(
            EntityId::from_raw(1),
            CombatProfile::default(),
            SimTimerScheduler::new(),
            rig(&[]),
        );
        m.start_attack();
        m.enable_combo_window();
        m.handle_attack_input();

        let rig = m.rig_mut().unwrap();
        assert_eq!(rig.playing(), vec![&ClipId::from("attack_2")]);
        let finished = rig.take_finished();
        assert_eq!(finished.len(), 1);
        assert!(finished[0].1);
        for (token, interrupted) in finished {
            m.on_clip_finished(token, interrupted);
        }
        // The superseded step's completion does not end the attack.
        assert_eq!(m.current_state(), CombatState::Attacking);
    }

    #[test]
    fn test_effect_and_locomotion() {
        let mut rig = rig(&[]);
        rig.activate(&EffectId::from("stun_stars"), "head");
        assert_eq!(rig.active_effect(), Some(&EffectId::from("stun_stars")));
        rig.deactivate();
        assert!(rig.active_effect().is_none());

        rig.disable_permanently();
        rig.set_walking_enabled(true);
        assert!(!rig.walking_enabled());
    }
}
