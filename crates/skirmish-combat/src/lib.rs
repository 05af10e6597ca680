//! # Skirmish Combat
//!
//! Per-character combat state machine for action games.
//!
//! This crate provides:
//! - Five mutually exclusive combat states and their legality table
//! - A transition engine with exit and enter hooks per state
//! - Multi-step melee combos with an input window and a one-press buffer
//! - Weapon hit registration with per-swing deduplication
//! - Stun with refreshable duration and death with deferred finalization
//! - Observer notifications (callbacks or bounded channels)
//! - TOML combat profiles
//!
//! ## Collaborators
//!
//! The machine never reaches back into its character. The host passes in a
//! [`TimerScheduler`] owned by the world and a [`CharacterRig`] owned by the
//! character. Expired timers and finished clips come back as values
//! ([`FiredTimer`], [`ClipCompletion`]) that the host delivers with
//! [`CombatStateMachine::on_timer_fired`] and
//! [`CombatStateMachine::on_clip_finished`]. Stale deliveries are ignored.
//!
//! ## Simulated Time
//!
//! [`SimTimerScheduler`] advances only when told to, which makes every stun
//! and death sequence reproducible. Machines built on it get a `tick` method,
//! and [`CombatRoster`] ticks a whole world of them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod attack;
pub mod collaborators;
pub mod combo;
pub mod context;
pub mod events;
pub mod ledger;
pub mod machine;
pub mod mock;
pub mod profile;
pub mod roster;
pub mod state;
pub mod timed;
pub mod timers;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::collaborators::*;
    pub use crate::combo::*;
    pub use crate::context::*;
    pub use crate::events::*;
    pub use crate::ledger::*;
    pub use crate::machine::*;
    pub use crate::mock::*;
    pub use crate::profile::*;
    pub use crate::roster::*;
    pub use crate::state::*;
    pub use crate::timers::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_common::{EntityId, Vec3};

    type Machine = CombatStateMachine<SimTimerScheduler, RecordingRig>;

    fn machine() -> Machine {
        CombatStateMachine::new(
            EntityId::from_raw(1),
            CombatProfile::default(),
            SimTimerScheduler::new(),
            RecordingRig::new(),
        )
    }

    #[test]
    fn test_full_combo_then_recover() {
        let mut m = machine();
        let rx = m.events_mut().channel(64);
        let target = EntityId::from_raw(2);

        assert_eq!(m.handle_attack_input(), AttackInput::Started);
        for _ in 0..2 {
            m.set_weapon_collision_enabled(true);
            m.on_weapon_hit(target, Vec3::ZERO, Vec3::Z);
            assert!(m.handle_attack_input() == AttackInput::Buffered);
            assert!(m.enable_combo_window().is_some_and(AttackInput::is_accepted));
        }
        m.set_weapon_collision_enabled(true);
        m.on_weapon_hit(target, Vec3::ZERO, Vec3::Z);

        let rig = m.rig_mut().unwrap();
        let token = rig.take_latest_completion().unwrap();
        assert_eq!(rig.damage_calls(), vec![(target, 10.0), (target, 12.0), (target, 18.0)]);
        m.on_clip_finished(token, false);

        assert_eq!(m.current_state(), CombatState::Idle);
        assert!(m.context().invariants_hold());
        assert_eq!(
            rx.try_iter().last(),
            Some(CombatEvent::AttackEnded {
                interrupted: false,
                combo_index: 2
            })
        );
    }

    #[test]
    fn test_attack_stun_death_sequence() {
        let mut m = machine();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        m.subscribe(move |e| sink.lock().unwrap().push(*e));

        m.start_attack();
        m.apply_stun(1.0);
        m.tick(0.5);
        m.trigger_death();
        m.tick(5.0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&CombatEvent::StateChanged {
            old: CombatState::Idle,
            new: CombatState::Attacking
        }));
        assert!(!seen.contains(&CombatEvent::StunEnded));
        assert_eq!(seen.last(), Some(&CombatEvent::DeathFinalized));
        assert!(m.timers().pending_count() == 0);
    }
}
