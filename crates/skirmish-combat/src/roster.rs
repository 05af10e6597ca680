//! Per-world collection of combat state machines, each with its own
//! simulated timer scheduler, ticked together in `EntityId` order.

use ahash::AHashMap;
use skirmish_common::EntityId;
use thiserror::Error;
use tracing::debug;

use crate::collaborators::CharacterRig;
use crate::machine::CombatStateMachine;
use crate::profile::CombatProfile;
use crate::timers::SimTimerScheduler;

/// Errors from roster bookkeeping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    /// A machine for this character already exists.
    #[error("Character {0} already has a combat state machine")]
    AlreadySpawned(EntityId),
}

/// Machine type managed by a [`CombatRoster`].
pub type RosterMachine<R> = CombatStateMachine<SimTimerScheduler, R>;

/// Owns the combat state machines of every character in a simulated world.
///
/// Each machine keeps its own [`SimTimerScheduler`]; [`CombatRoster::tick`]
/// advances all of them by the same step, in entity order.
#[derive(Debug)]
pub struct CombatRoster<R: CharacterRig> {
    machines: AHashMap<EntityId, RosterMachine<R>>,
}

impl<R: CharacterRig> Default for CombatRoster<R> {
    fn default() -> Self {
        Self {
            machines: AHashMap::new(),
        }
    }
}

impl<R: CharacterRig> CombatRoster<R> {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a machine for `owner`. `rig` is `None` for characters
    /// without animation or locomotion, which yields an inert machine.
    pub fn spawn(
        &mut self,
        owner: EntityId,
        profile: CombatProfile,
        rig: Option<R>,
    ) -> Result<&mut RosterMachine<R>, RosterError> {
        if self.machines.contains_key(&owner) {
            return Err(RosterError::AlreadySpawned(owner));
        }
        let timers = SimTimerScheduler::new();
        let machine = match rig {
            Some(rig) => CombatStateMachine::new(owner, profile, timers, rig),
            None => CombatStateMachine::without_rig(owner, profile, timers),
        };
        debug!("Spawned combat state machine for {owner}");
        Ok(self.machines.entry(owner).or_insert(machine))
    }

    /// Machine for `owner`.
    #[must_use]
    pub fn get(&self, owner: EntityId) -> Option<&RosterMachine<R>> {
        self.machines.get(&owner)
    }

    /// Mutable machine for `owner`.
    pub fn get_mut(&mut self, owner: EntityId) -> Option<&mut RosterMachine<R>> {
        self.machines.get_mut(&owner)
    }

    /// Removes and tears down the machine for `owner`, returning its rig.
    pub fn despawn(&mut self, owner: EntityId) -> Option<R> {
        let machine = self.machines.remove(&owner)?;
        let (_, rig) = machine.teardown();
        debug!("Despawned combat state machine for {owner}");
        rig
    }

    /// Number of machines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Owners in ascending order.
    #[must_use]
    pub fn owners(&self) -> Vec<EntityId> {
        let mut owners: Vec<_> = self.machines.keys().copied().collect();
        owners.sort_unstable();
        owners
    }

    /// Advances every machine by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        for owner in self.owners() {
            if let Some(machine) = self.machines.get_mut(&owner) {
                machine.tick(dt);
            }
        }
    }
}
