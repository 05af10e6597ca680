//! Attack entry points: starting swings, combo windows, weapon hits, and
//! attack clip completion.

use glam::Vec3;
use skirmish_common::EntityId;
use tracing::{debug, trace};

use crate::collaborators::{CharacterRig, ClipCompletion, ClipPurpose, TimerScheduler};
use crate::combo::AttackInput;
use crate::events::CombatEvent;
use crate::machine::CombatStateMachine;
use crate::state::CombatState;

impl<T, R> CombatStateMachine<T, R>
where
    T: TimerScheduler,
    R: CharacterRig,
{
    /// Starts the first step of a combo.
    ///
    /// Only succeeds from `Idle` or `Moving`.
    pub fn start_attack(&mut self) -> bool {
        self.request_transition(CombatState::Attacking)
    }

    /// Routes an attack button press.
    ///
    /// While attacking, a press advances the combo if the window is open and
    /// is buffered otherwise. From any other state it tries to start an
    /// attack.
    pub fn handle_attack_input(&mut self) -> AttackInput {
        if self.ctx.current_state != CombatState::Attacking {
            return if self.start_attack() {
                AttackInput::Started
            } else {
                AttackInput::Rejected
            };
        }

        if self.ctx.combo.is_accepting_input() {
            self.advance_combo()
        } else {
            self.ctx.combo.buffer_input();
            trace!("{}: attack input buffered", self.owner);
            AttackInput::Buffered
        }
    }

    /// Opens the combo window (animation notify).
    ///
    /// A buffered press is consumed immediately and its outcome returned.
    /// Ignored outside `Attacking`.
    pub fn enable_combo_window(&mut self) -> Option<AttackInput> {
        if self.ctx.current_state != CombatState::Attacking {
            return None;
        }
        if self.ctx.combo.open_window() {
            Some(self.advance_combo())
        } else {
            None
        }
    }

    /// Closes the combo window (animation notify). Ignored outside
    /// `Attacking`.
    pub fn disable_combo_window(&mut self) {
        if self.ctx.current_state == CombatState::Attacking {
            self.ctx.combo.close_window();
        }
    }

    /// Toggles whether weapon hits are honored (animation notify).
    ///
    /// Disabling always clears the hit ledger. Enabling outside `Attacking`
    /// is ignored.
    pub fn set_weapon_collision_enabled(&mut self, enabled: bool) {
        if enabled {
            if self.ctx.current_state != CombatState::Attacking {
                trace!("{}: weapon collision enable ignored in {}", self.owner, self.ctx.current_state);
                return;
            }
            self.ctx.weapon_collision_enabled = true;
        } else {
            self.ctx.weapon_collision_enabled = false;
            self.ctx.hits.clear();
        }
    }

    /// Handles the weapon volume overlapping `actor`.
    ///
    /// Damage for the current combo step is applied at most once per actor
    /// per swing. The owner never hits itself and unresolved actors are
    /// ignored. Returns `true` if damage was applied.
    pub fn on_weapon_hit(&mut self, actor: EntityId, location: Vec3, normal: Vec3) -> bool {
        if self.ctx.current_state != CombatState::Attacking || !self.ctx.weapon_collision_enabled {
            return false;
        }
        if !actor.is_valid() || actor == self.owner || self.ctx.hits.contains(actor) {
            return false;
        }

        self.ctx.hits.register(actor);
        let damage = self.profile.step_damage(self.ctx.combo.index());
        trace!("{}: hit {actor} at {location} (normal {normal})", self.owner);

        if let Some(rig) = self.rig.as_mut() {
            rig.apply(actor, damage, self.owner, self.owner);
            debug!("{}: dealt {damage} to {actor}", self.owner);
        }
        true
    }

    /// Delivers a clip completion token back from the animation driver.
    ///
    /// Tokens from superseded clips are ignored.
    pub fn on_clip_finished(&mut self, completion: ClipCompletion, interrupted: bool) {
        if self.ctx.attack_serial != Some(completion.serial) {
            trace!("{}: stale completion for '{}'", self.owner, completion.clip());
            return;
        }
        let ClipPurpose::Attack { step } = completion.purpose();
        trace!("{}: combo step {step} clip finished", self.owner);
        self.on_attack_animation_ended(interrupted);
    }

    /// Ends the current attack and returns to `Idle`. Ignored outside
    /// `Attacking`.
    pub fn on_attack_animation_ended(&mut self, interrupted: bool) {
        if self.ctx.current_state != CombatState::Attacking {
            return;
        }
        let combo_index = self.ctx.combo.index();
        if self.request_transition(CombatState::Idle) {
            self.events.emit(CombatEvent::AttackEnded {
                interrupted,
                combo_index,
            });
        }
    }

    /// Moves to the next combo step: clears the swing, then plays the new
    /// step's clip. The previous clip is left for the driver to blend.
    fn advance_combo(&mut self) -> AttackInput {
        let Some(combo_index) = self.ctx.combo.advance() else {
            trace!("{}: combo exhausted", self.owner);
            return AttackInput::Exhausted;
        };
        self.ctx.hits.clear();
        self.play_attack_step();
        debug!("{}: combo advanced to step {combo_index}", self.owner);
        AttackInput::Advanced { combo_index }
    }
}
