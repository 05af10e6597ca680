//! Transition engine.
//!
//! [`CombatStateMachine`] is the only writer of a character's
//! [`CharacterCombatContext`]. Every mutation funnels through
//! [`CombatStateMachine::request_transition`] or one of the attack and
//! timed-state entry points built on it (see `attack.rs` and `timed.rs`).
//!
//! Ordering within one transition: exit hooks of the old state, then the
//! state swap, then enter hooks of the new state, then the `StateChanged`
//! notification.

use skirmish_common::EntityId;
use tracing::{debug, trace, warn};

use crate::collaborators::{CharacterRig, ClipCompletion, ClipPurpose, TimerKind, TimerScheduler};
use crate::context::CharacterCombatContext;
use crate::events::{CombatEvent, CombatEventBus, SubscriptionId};
use crate::ledger::HitLedger;
use crate::profile::CombatProfile;
use crate::state::CombatState;
use crate::timers::SimTimerScheduler;

/// Playback rate for stun and death clips.
const REACTION_PLAY_RATE: f32 = 1.0;

/// Combat state machine for one character.
///
/// `T` is the world's timer scheduler, `R` the owning character's
/// capabilities. A machine built with [`CombatStateMachine::without_rig`]
/// keeps its bookkeeping but skips every character-side effect.
pub struct CombatStateMachine<T: TimerScheduler, R: CharacterRig> {
    pub(crate) owner: EntityId,
    pub(crate) profile: CombatProfile,
    pub(crate) ctx: CharacterCombatContext,
    pub(crate) timers: T,
    pub(crate) rig: Option<R>,
    pub(crate) events: CombatEventBus,
    /// Last clip completion serial handed out.
    pub(crate) clip_serial: u64,
}

impl<T, R> std::fmt::Debug for CombatStateMachine<T, R>
where
    T: TimerScheduler,
    R: CharacterRig,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatStateMachine")
            .field("owner", &self.owner)
            .field("profile", &self.profile.name)
            .field("state", &self.ctx.current_state)
            .field("combo_index", &self.ctx.combo.index())
            .field("has_rig", &self.rig.is_some())
            .finish_non_exhaustive()
    }
}

impl<T, R> CombatStateMachine<T, R>
where
    T: TimerScheduler,
    R: CharacterRig,
{
    /// Creates a machine in `Idle` for `owner`.
    #[must_use]
    pub fn new(owner: EntityId, mut profile: CombatProfile, timers: T, rig: R) -> Self {
        profile.validate();
        Self {
            owner,
            ctx: CharacterCombatContext::new(profile.max_combo_count),
            profile,
            timers,
            rig: Some(rig),
            events: CombatEventBus::new(),
            clip_serial: 0,
        }
    }

    /// Creates an inert machine whose owner has no character rig.
    ///
    /// Transitions still update the context and timers still run, but
    /// animation, effects, damage and locomotion calls are skipped.
    #[must_use]
    pub fn without_rig(owner: EntityId, mut profile: CombatProfile, timers: T) -> Self {
        warn!(
            "Combat state machine for {owner} has no character rig; character effects are disabled"
        );
        profile.validate();
        Self {
            owner,
            ctx: CharacterCombatContext::new(profile.max_combo_count),
            profile,
            timers,
            rig: None,
            events: CombatEventBus::new(),
            clip_serial: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Owning character.
    #[must_use]
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Configuration this machine was built with.
    #[must_use]
    pub fn profile(&self) -> &CombatProfile {
        &self.profile
    }

    /// Read-only view of the live state.
    #[must_use]
    pub fn context(&self) -> &CharacterCombatContext {
        &self.ctx
    }

    /// Active state.
    #[must_use]
    pub fn current_state(&self) -> CombatState {
        self.ctx.current_state
    }

    /// State before the last full transition.
    #[must_use]
    pub fn previous_state(&self) -> CombatState {
        self.ctx.previous_state
    }

    /// Check if the machine is in `state`.
    #[must_use]
    pub fn is_in_state(&self, state: CombatState) -> bool {
        self.ctx.current_state == state
    }

    /// Whether weapon-hit events are honored.
    #[must_use]
    pub fn is_weapon_collision_enabled(&self) -> bool {
        self.ctx.weapon_collision_enabled
    }

    /// Current combo step.
    #[must_use]
    pub fn combo_index(&self) -> usize {
        self.ctx.combo.index()
    }

    /// Check if the combo window is open.
    #[must_use]
    pub fn is_accepting_combo_input(&self) -> bool {
        self.ctx.combo.is_accepting_input()
    }

    /// Check if an attack press is waiting for the combo window.
    #[must_use]
    pub fn has_buffered_input(&self) -> bool {
        self.ctx.combo.has_buffered_input()
    }

    /// Actors damaged during the current swing.
    #[must_use]
    pub fn hit_actors(&self) -> &HitLedger {
        &self.ctx.hits
    }

    /// Whether this machine has a character rig.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.rig.is_none()
    }

    /// Timer scheduler.
    #[must_use]
    pub fn timers(&self) -> &T {
        &self.timers
    }

    /// Mutable timer scheduler.
    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    /// Character rig, if any.
    #[must_use]
    pub fn rig(&self) -> Option<&R> {
        self.rig.as_ref()
    }

    /// Mutable character rig, if any.
    pub fn rig_mut(&mut self) -> Option<&mut R> {
        self.rig.as_mut()
    }

    /// Notification bus.
    pub fn events_mut(&mut self) -> &mut CombatEventBus {
        &mut self.events
    }

    /// Registers an observer callback.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + Send + 'static,
    {
        self.events.subscribe(callback)
    }

    // ========================================================================
    // Capability queries
    // ========================================================================

    /// Check if the character may walk.
    #[must_use]
    pub fn can_move(&self) -> bool {
        self.ctx.current_state.is_free()
    }

    /// Check if the character may start an attack.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.ctx.current_state.is_free()
    }

    /// Check if the sprint modifier may apply. Sprinting is a locomotion
    /// speed modifier, not a combat state.
    #[must_use]
    pub fn can_sprint(&self) -> bool {
        self.ctx.current_state.is_free()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Evaluates the legality table against the current state.
    #[must_use]
    pub fn can_transition(&self, new_state: CombatState) -> bool {
        self.ctx.current_state.can_transition_to(new_state)
    }

    /// Requests a transition to `new_state`.
    ///
    /// `Stunned -> Stunned` refreshes the stun timer without re-running any
    /// hooks. Any other legal request runs exit hooks, swaps the state, runs
    /// enter hooks and emits `StateChanged`. Illegal requests return `false`
    /// with no side effects. In particular a stunned character cannot be
    /// moved to `Idle`, `Moving` or `Attacking` from outside.
    pub fn request_transition(&mut self, new_state: CombatState) -> bool {
        let current = self.ctx.current_state;

        if current == CombatState::Stunned && new_state == CombatState::Stunned {
            self.refresh_stun();
            return true;
        }

        if !self.can_transition(new_state) {
            trace!("{}: rejected transition {current} -> {new_state}", self.owner);
            return false;
        }

        self.perform_transition(new_state);
        true
    }

    /// Runs a full transition without consulting the legality table.
    ///
    /// Used directly only for stun recovery, which leaves `Stunned` through
    /// its own timer rather than through an external request.
    pub(crate) fn perform_transition(&mut self, new_state: CombatState) {
        let current = self.ctx.current_state;
        self.ctx.previous_state = current;
        self.exit_state(current);
        self.ctx.current_state = new_state;
        self.enter_state(new_state);

        debug!("{}: {current} -> {new_state}", self.owner);
        debug_assert!(self.ctx.invariants_hold(), "invariants broken after {current} -> {new_state}");

        self.events.emit(CombatEvent::StateChanged {
            old: current,
            new: new_state,
        });
    }

    /// Mirrors movement input onto `Idle`/`Moving`.
    ///
    /// Returns `true` if a transition happened. Never disturbs `Attacking`,
    /// `Stunned` or `Dead`.
    pub fn update_locomotion(&mut self, is_moving: bool) -> bool {
        match (self.ctx.current_state, is_moving) {
            (CombatState::Idle, true) => self.request_transition(CombatState::Moving),
            (CombatState::Moving, false) => self.request_transition(CombatState::Idle),
            _ => false,
        }
    }

    fn exit_state(&mut self, state: CombatState) {
        match state {
            CombatState::Attacking => {
                if let Some(rig) = self.rig.as_mut() {
                    if let Some(clip) = self.profile.step_clip(self.ctx.combo.index()) {
                        rig.stop_clip(clip, self.profile.attack_blend_out);
                    }
                }
                self.set_weapon_collision_enabled(false);
                self.ctx.hits.clear();
                self.ctx.combo.reset();
                self.ctx.attack_serial = None;
            },
            CombatState::Stunned => {
                if let Some(handle) = self.ctx.stun_timer.take() {
                    self.timers.cancel(handle);
                }
                self.deactivate_stun_effect();
                if let Some(rig) = self.rig.as_mut() {
                    if let Some(clip) = &self.profile.stun_clip {
                        rig.stop_clip(clip, self.profile.stun_blend_out);
                    }
                }
            },
            CombatState::Idle | CombatState::Moving | CombatState::Dead => {},
        }
    }

    fn enter_state(&mut self, state: CombatState) {
        match state {
            CombatState::Idle => {
                if let Some(rig) = self.rig.as_mut() {
                    rig.set_walking_enabled(true);
                }
            },
            // Driven by the external movement system.
            CombatState::Moving => {},
            CombatState::Attacking => {
                self.ctx.hits.clear();
                self.ctx.combo.reset();
                self.play_attack_step();
            },
            CombatState::Stunned => {
                let duration = self
                    .ctx
                    .stun_override
                    .take()
                    .unwrap_or(self.profile.stun_duration);
                self.arm_stun_timer(duration);

                if let Some(rig) = self.rig.as_mut() {
                    if let Some(clip) = &self.profile.stun_clip {
                        rig.play_clip(clip, REACTION_PLAY_RATE, None);
                    }
                }
                self.activate_stun_effect();
                if let Some(rig) = self.rig.as_mut() {
                    rig.halt_immediately();
                }
            },
            CombatState::Dead => {
                let mut clip_length = None;
                if let Some(rig) = self.rig.as_mut() {
                    rig.disable_permanently();
                    if let Some(clip) = &self.profile.death_clip {
                        clip_length = Some(rig.play_clip(clip, REACTION_PLAY_RATE, None));
                    }
                }
                let delay = match clip_length {
                    Some(length) => length.max(0.0) + self.profile.death_finish_delay,
                    None => self.profile.death_finish_delay,
                };
                self.ctx.death_timer = Some(self.timers.schedule(delay, TimerKind::DeathFinalize));
                debug!("{}: death finalizes in {delay:.2}s", self.owner);

                self.events.emit(CombatEvent::Died);
            },
        }
    }

    // ========================================================================
    // Hook helpers
    // ========================================================================

    /// Plays the clip for the current combo step and claims the attack for
    /// its completion token.
    pub(crate) fn play_attack_step(&mut self) {
        let step = self.ctx.combo.index();
        self.clip_serial += 1;
        let serial = self.clip_serial;
        self.ctx.attack_serial = Some(serial);

        let Some(rig) = self.rig.as_mut() else {
            return;
        };
        let Some(clip) = self.profile.step_clip(step) else {
            trace!("{}: no clip for combo step {step}", self.owner);
            return;
        };
        let token = ClipCompletion::new(serial, clip.clone(), ClipPurpose::Attack { step });
        let length = rig.play_clip(clip, self.profile.attack_play_rate, Some(token));
        debug!("{}: combo step {step} playing '{clip}' ({length:.2}s)", self.owner);
    }

    pub(crate) fn arm_stun_timer(&mut self, duration: f32) {
        if let Some(old) = self.ctx.stun_timer.take() {
            self.timers.cancel(old);
        }
        self.ctx.stun_timer = Some(self.timers.schedule(duration, TimerKind::StunRecovery));
        debug!("{}: stunned for {duration:.2}s", self.owner);
    }

    fn refresh_stun(&mut self) {
        let duration = self
            .ctx
            .stun_override
            .take()
            .unwrap_or(self.profile.stun_duration);
        self.arm_stun_timer(duration);
    }

    fn activate_stun_effect(&mut self) {
        if self.ctx.stun_effect_active {
            return;
        }
        let (Some(rig), Some(effect)) = (self.rig.as_mut(), &self.profile.stun_effect) else {
            return;
        };
        rig.activate(&effect.effect, &effect.attach_point);
        self.ctx.stun_effect_active = true;
    }

    fn deactivate_stun_effect(&mut self) {
        if !self.ctx.stun_effect_active {
            return;
        }
        if let Some(rig) = self.rig.as_mut() {
            rig.deactivate();
        }
        self.ctx.stun_effect_active = false;
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Destroys the machine: cancels armed timers, removes an active stun
    /// effect, and hands the collaborators back to the host.
    pub fn teardown(mut self) -> (T, Option<R>) {
        if let Some(handle) = self.ctx.stun_timer.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = self.ctx.death_timer.take() {
            self.timers.cancel(handle);
        }
        self.deactivate_stun_effect();
        debug!("{}: combat state machine torn down", self.owner);
        (self.timers, self.rig)
    }
}

impl<R: CharacterRig> CombatStateMachine<SimTimerScheduler, R> {
    /// Advances simulated time and delivers every timer that came due.
    pub fn tick(&mut self, dt: f32) {
        for fired in self.timers.advance(dt) {
            self.on_timer_fired(fired);
        }
    }
}
