//! Timed states: stun application and recovery, death and finalization.

use skirmish_common::{EntityId, Vec3};
use tracing::{debug, info, trace};

use crate::collaborators::{CharacterRig, FiredTimer, TimerKind, TimerScheduler};
use crate::events::CombatEvent;
use crate::machine::CombatStateMachine;
use crate::state::CombatState;

impl<T, R> CombatStateMachine<T, R>
where
    T: TimerScheduler,
    R: CharacterRig,
{
    /// Stuns the character.
    ///
    /// A positive `duration` overrides the profile's stun duration for this
    /// application only. Applying a stun while stunned restarts the timer.
    /// Returns `false` if the character cannot be stunned (e.g. dead).
    pub fn apply_stun(&mut self, duration: f32) -> bool {
        if duration > 0.0 {
            self.ctx.stun_override = Some(duration);
        }
        let applied = self.request_transition(CombatState::Stunned);
        if !applied {
            self.ctx.stun_override = None;
        }
        applied
    }

    /// Kills the character. Returns `false` if already dead.
    pub fn trigger_death(&mut self) -> bool {
        let died = self.request_transition(CombatState::Dead);
        if died {
            info!("{} died", self.owner);
        }
        died
    }

    /// Gate for incoming damage. Health is tracked by the host; this only
    /// reports whether the hit should count.
    pub fn process_damage(&mut self, amount: f32, causer: EntityId, location: Vec3) -> bool {
        let accepted = self.ctx.current_state != CombatState::Dead;
        trace!(
            "{}: {amount} damage from {causer} at {location} {}",
            self.owner,
            if accepted { "accepted" } else { "ignored" }
        );
        accepted
    }

    /// Delivers an elapsed timer.
    ///
    /// Timers that were cancelled or replaced are ignored.
    pub fn on_timer_fired(&mut self, fired: FiredTimer) {
        match fired.kind {
            TimerKind::StunRecovery => {
                if self.ctx.stun_timer != Some(fired.handle) {
                    trace!("{}: stale stun timer {:?}", self.owner, fired.handle);
                    return;
                }
                self.ctx.stun_timer = None;
                self.on_stun_timer_expired();
            },
            TimerKind::DeathFinalize => {
                if self.ctx.death_timer != Some(fired.handle) {
                    trace!("{}: stale death timer {:?}", self.owner, fired.handle);
                    return;
                }
                self.ctx.death_timer = None;
                self.on_death_finalized();
            },
        }
    }

    /// Ends a stun that ran its course. Ignored unless stunned.
    pub fn on_stun_timer_expired(&mut self) {
        if self.ctx.current_state != CombatState::Stunned {
            return;
        }
        self.perform_transition(CombatState::Idle);
        debug!("{}: recovered from stun", self.owner);
        self.events.emit(CombatEvent::StunEnded);
    }

    /// Announces that death handling is complete. Fires at most once and
    /// only while dead. Cancels the death timer if it is still armed.
    pub fn on_death_finalized(&mut self) {
        if let Some(handle) = self.ctx.death_timer.take() {
            self.timers.cancel(handle);
        }
        if self.ctx.current_state != CombatState::Dead || self.ctx.death_finalized {
            return;
        }
        self.ctx.death_finalized = true;
        debug!("{}: death finalized", self.owner);
        self.events.emit(CombatEvent::DeathFinalized);
    }

    /// Whether the death timer has elapsed.
    #[must_use]
    pub fn is_death_finalized(&self) -> bool {
        self.ctx.death_finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::TimerHandle;
    use crate::mock::{RecordingRig, RigCall};
    use crate::profile::CombatProfile;
    use crate::timers::SimTimerScheduler;

    type TestMachine = CombatStateMachine<SimTimerScheduler, RecordingRig>;

    const OWNER: EntityId = EntityId::from_raw(1);
    const ENEMY: EntityId = EntityId::from_raw(2);

    fn machine() -> TestMachine {
        CombatStateMachine::new(OWNER, CombatProfile::default(), SimTimerScheduler::new(), RecordingRig::new())
    }

    fn rig(m: &TestMachine) -> &RecordingRig {
        m.rig().unwrap()
    }

    #[test]
    fn test_stun_recovers_after_default_duration() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        assert!(m.apply_stun(0.0));

        m.tick(1.9);
        assert_eq!(m.current_state(), CombatState::Stunned);

        m.tick(0.2);
        assert_eq!(m.current_state(), CombatState::Idle);
        assert!(m.context().stun_timer().is_none());
        assert!(!m.context().stun_effect_active());

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                CombatEvent::StateChanged {
                    old: CombatState::Idle,
                    new: CombatState::Stunned
                },
                CombatEvent::StateChanged {
                    old: CombatState::Stunned,
                    new: CombatState::Idle
                },
                CombatEvent::StunEnded,
            ]
        );
    }

    #[test]
    fn test_stun_duration_override() {
        let mut m = machine();
        m.apply_stun(0.5);
        m.tick(0.5);
        assert_eq!(m.current_state(), CombatState::Idle);
    }

    #[test]
    fn test_stun_override_is_one_shot() {
        let mut m = machine();
        m.apply_stun(0.5);
        m.tick(0.5);

        m.apply_stun(-1.0);
        m.tick(1.0);
        assert_eq!(m.current_state(), CombatState::Stunned);
        m.tick(1.0);
        assert_eq!(m.current_state(), CombatState::Idle);
    }

    #[test]
    fn test_restun_restarts_timer() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        m.apply_stun(2.0);
        m.tick(1.5);

        assert!(m.apply_stun(2.0));
        m.tick(1.0);
        assert_eq!(m.current_state(), CombatState::Stunned);

        m.tick(1.0);
        assert_eq!(m.current_state(), CombatState::Idle);
        assert_eq!(rx.try_iter().filter(|e| *e == CombatEvent::StunEnded).count(), 1);
        assert_eq!(rig(&m).count(|c| matches!(c, RigCall::ActivateEffect { .. })), 1);
        assert_eq!(rig(&m).count(|c| matches!(c, RigCall::DeactivateEffect)), 1);
    }

    #[test]
    fn test_restun_uses_new_override() {
        let mut m = machine();
        m.apply_stun(5.0);
        m.tick(1.0);

        m.apply_stun(0.5);
        let handle = m.context().stun_timer().unwrap();
        assert!((m.timers().remaining(handle).unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_stun_interrupts_attack() {
        let mut m = machine();
        m.start_attack();
        m.set_weapon_collision_enabled(true);
        m.on_weapon_hit(ENEMY, Vec3::ZERO, Vec3::X);

        assert!(m.apply_stun(0.0));
        assert!(m.context().invariants_hold());
        assert!(m.context().hit_actors().is_empty());
        assert!(!m.context().weapon_collision_enabled());
        assert_eq!(m.context().combo().index(), 0);
    }

    #[test]
    fn test_stun_rejected_when_dead() {
        let mut m = machine();
        m.trigger_death();

        assert!(!m.apply_stun(3.0));
        assert!(m.context().stun_timer().is_none());
        // The rejected override must not leak into a later stun.
        assert!(m.context().stun_override.is_none());
    }

    #[test]
    fn test_death_from_stun_cancels_stun_timer() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        m.apply_stun(1.0);
        let stun = m.context().stun_timer().unwrap();

        assert!(m.trigger_death());
        assert!(!m.timers().is_pending(stun));

        m.tick(10.0);
        assert_eq!(m.current_state(), CombatState::Dead);
        let events: Vec<_> = rx.try_iter().collect();
        assert!(!events.contains(&CombatEvent::StunEnded));
        assert!(events.contains(&CombatEvent::DeathFinalized));
    }

    #[test]
    fn test_death_finalizes_after_clip_and_delay() {
        let profile = CombatProfile::default().with_death_finish_delay(0.5);
        let recording = RecordingRig::new().with_clip_length("death", 1.5);
        let mut m = CombatStateMachine::new(OWNER, profile, SimTimerScheduler::new(), recording);
        let rx = m.events_mut().channel(16);

        m.trigger_death();
        m.tick(1.9);
        assert!(!m.is_death_finalized());

        m.tick(0.2);
        assert!(m.is_death_finalized());
        assert!(m.context().death_timer().is_none());
        assert_eq!(rx.try_iter().last(), Some(CombatEvent::DeathFinalized));
    }

    #[test]
    fn test_death_during_attack_runs_exit_hooks_first() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        m.start_attack();
        m.set_weapon_collision_enabled(true);
        m.rig_mut().unwrap().clear_calls();

        assert!(m.trigger_death());

        let stop = rig(&m).position(|c| matches!(c, RigCall::StopClip { .. }));
        let disable = rig(&m).position(|c| *c == RigCall::DisablePermanently);
        assert!(stop.unwrap() < disable.unwrap());
        assert!(!m.context().weapon_collision_enabled());

        assert_eq!(m.handle_attack_input(), crate::combo::AttackInput::Rejected);
        assert_eq!(m.current_state(), CombatState::Dead);
        assert_eq!(rx.try_iter().filter(|e| *e == CombatEvent::Died).count(), 1);
    }

    #[test]
    fn test_second_death_rejected() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        assert!(m.trigger_death());
        assert!(!m.trigger_death());

        assert_eq!(rx.try_iter().filter(|e| *e == CombatEvent::Died).count(), 1);
        assert_eq!(m.timers().pending_count(), 1);
    }

    #[test]
    fn test_death_finalized_once() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        m.trigger_death();
        m.tick(10.0);

        m.on_death_finalized();
        assert_eq!(
            rx.try_iter().filter(|e| *e == CombatEvent::DeathFinalized).count(),
            1
        );
    }

    #[test]
    fn test_early_finalize_cancels_death_timer() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        m.trigger_death();
        assert_eq!(m.timers().pending_count(), 1);

        m.on_death_finalized();
        assert!(m.is_death_finalized());
        assert!(m.context().death_timer().is_none());
        assert_eq!(m.timers().pending_count(), 0);

        m.tick(10.0);
        assert_eq!(
            rx.try_iter().filter(|e| *e == CombatEvent::DeathFinalized).count(),
            1
        );

        let (timers, _) = m.teardown();
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_stale_timers_ignored() {
        let mut m = machine();
        m.apply_stun(2.0);

        m.on_timer_fired(FiredTimer {
            handle: TimerHandle::from_raw(999),
            kind: TimerKind::StunRecovery,
        });
        assert_eq!(m.current_state(), CombatState::Stunned);

        m.on_timer_fired(FiredTimer {
            handle: TimerHandle::from_raw(999),
            kind: TimerKind::DeathFinalize,
        });
        assert!(!m.is_death_finalized());
    }

    #[test]
    fn test_stun_expiry_ignored_outside_stun() {
        let mut m = machine();
        let rx = m.events_mut().channel(16);
        m.on_stun_timer_expired();
        assert_eq!(m.current_state(), CombatState::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_process_damage_gate() {
        let mut m = machine();
        assert!(m.process_damage(5.0, ENEMY, Vec3::ZERO));
        m.apply_stun(0.0);
        assert!(m.process_damage(5.0, ENEMY, Vec3::ZERO));
        m.trigger_death();
        assert!(!m.process_damage(5.0, ENEMY, Vec3::ZERO));
    }

    #[test]
    fn test_death_disables_owner() {
        let mut m = machine();
        m.trigger_death();
        assert_eq!(rig(&m).calls()[0], RigCall::DisablePermanently);
        assert!(!m.can_move() && !m.can_attack() && !m.can_sprint());
    }
}
