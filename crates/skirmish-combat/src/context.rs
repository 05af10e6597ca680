//! Live combat state owned by one character.

use skirmish_common::EntityId;

use crate::collaborators::TimerHandle;
use crate::combo::ComboController;
use crate::ledger::HitLedger;
use crate::state::CombatState;

/// Everything a character's state machine mutates.
///
/// Only the machine's transition entry points write to this; hosts get a
/// read-only view through `CombatStateMachine::context`.
#[derive(Debug, Clone)]
pub struct CharacterCombatContext {
    pub(crate) current_state: CombatState,
    pub(crate) previous_state: CombatState,
    pub(crate) combo: ComboController,
    pub(crate) hits: HitLedger,
    pub(crate) weapon_collision_enabled: bool,
    pub(crate) stun_timer: Option<TimerHandle>,
    pub(crate) death_timer: Option<TimerHandle>,
    /// One-shot stun duration set by `apply_stun`.
    pub(crate) stun_override: Option<f32>,
    pub(crate) stun_effect_active: bool,
    /// Serial of the clip completion that may end the current attack.
    pub(crate) attack_serial: Option<u64>,
    pub(crate) death_finalized: bool,
}

impl CharacterCombatContext {
    /// Fresh context in `Idle`.
    #[must_use]
    pub fn new(max_combo_count: usize) -> Self {
        Self {
            current_state: CombatState::Idle,
            previous_state: CombatState::Idle,
            combo: ComboController::new(max_combo_count),
            hits: HitLedger::new(),
            weapon_collision_enabled: false,
            stun_timer: None,
            death_timer: None,
            stun_override: None,
            stun_effect_active: false,
            attack_serial: None,
            death_finalized: false,
        }
    }

    /// Active state.
    #[must_use]
    pub fn current_state(&self) -> CombatState {
        self.current_state
    }

    /// State before the last full transition.
    #[must_use]
    pub fn previous_state(&self) -> CombatState {
        self.previous_state
    }

    /// Combo bookkeeping.
    #[must_use]
    pub fn combo(&self) -> &ComboController {
        &self.combo
    }

    /// Actors damaged during the current swing.
    #[must_use]
    pub fn hit_actors(&self) -> &HitLedger {
        &self.hits
    }

    /// Check if a given actor was damaged during the current swing.
    #[must_use]
    pub fn was_hit(&self, actor: EntityId) -> bool {
        self.hits.contains(actor)
    }

    /// Whether weapon-hit events are honored.
    #[must_use]
    pub fn weapon_collision_enabled(&self) -> bool {
        self.weapon_collision_enabled
    }

    /// Armed stun-recovery timer.
    #[must_use]
    pub fn stun_timer(&self) -> Option<TimerHandle> {
        self.stun_timer
    }

    /// Armed death-finalize timer.
    #[must_use]
    pub fn death_timer(&self) -> Option<TimerHandle> {
        self.death_timer
    }

    /// Whether the stun effect is currently shown.
    #[must_use]
    pub fn stun_effect_active(&self) -> bool {
        self.stun_effect_active
    }

    /// Checks the data-model invariants.
    ///
    /// - ledger, weapon collision and combo index are idle outside `Attacking`
    /// - at most one timer is armed, and only in its owning state
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let attacking = self.current_state == CombatState::Attacking;
        let attack_clean = attacking
            || (self.hits.is_empty()
                && !self.weapon_collision_enabled
                && self.combo.index() == 0
                && self.attack_serial.is_none());
        let single_timer = !(self.stun_timer.is_some() && self.death_timer.is_some());
        let stun_owned = self.stun_timer.is_none() || self.current_state == CombatState::Stunned;
        let death_owned = self.death_timer.is_none() || self.current_state == CombatState::Dead;

        attack_clean && single_timer && stun_owned && death_owned
    }
}
