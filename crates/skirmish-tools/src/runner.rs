//! Frame-stepped scenario execution.

use crossbeam_channel::Receiver;
use serde::Serialize;
use skirmish_combat::{CombatEvent, CombatState, CombatStateMachine, SimTimerScheduler};
use skirmish_common::{EntityId, Vec3};
use tracing::{debug, info};

use crate::scenario::{Scenario, ScriptedAction};
use crate::sim_rig::SimRig;

/// Entity ID of the scripted character.
pub const SCRIPTED_OWNER: EntityId = EntityId::from_raw(1);

/// Capacity of the notification channel drained every frame.
const EVENT_CAPACITY: usize = 256;

/// A notification stamped with the simulated time it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedEvent {
    /// Simulated time in seconds.
    pub at: f64,
    /// The notification.
    #[serde(flatten)]
    pub event: CombatEvent,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Frames simulated.
    pub frames: u64,
    /// State at the end of the run.
    pub final_state: CombatState,
    /// Total damage dealt by the scripted character.
    pub damage_dealt: f32,
}

/// Drives one scripted character through a [`Scenario`].
#[derive(Debug)]
pub struct ScenarioRunner {
    scenario: Scenario,
    machine: CombatStateMachine<SimTimerScheduler, SimRig>,
    events: Receiver<CombatEvent>,
    next_action: usize,
    frame: u64,
    now: f64,
}

impl ScenarioRunner {
    /// Builds the character described by `scenario`.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        let rig = SimRig::new(&scenario.clip_lengths, scenario.default_clip_length);
        let mut machine = CombatStateMachine::new(
            SCRIPTED_OWNER,
            scenario.profile.clone(),
            SimTimerScheduler::new(),
            rig,
        );
        let events = machine.events_mut().channel(EVENT_CAPACITY);
        Self {
            scenario,
            machine,
            events,
            next_action: 0,
            frame: 0,
            now: 0.0,
        }
    }

    /// The machine under test.
    #[must_use]
    pub fn machine(&self) -> &CombatStateMachine<SimTimerScheduler, SimRig> {
        &self.machine
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Applies due actions, then advances one frame. Returns the
    /// notifications observed during the frame.
    pub fn step(&mut self) -> Vec<TimedEvent> {
        let mut out = Vec::new();

        while let Some(entry) = self.scenario.script.get(self.next_action) {
            if f64::from(entry.at) > self.now + 1e-6 {
                break;
            }
            let action = entry.action.clone();
            self.next_action += 1;
            self.apply(&action);
            self.deliver_completions();
        }
        self.collect(&mut out);

        let dt = self.scenario.tick;
        if let Some(rig) = self.machine.rig_mut() {
            rig.advance(dt);
        }
        self.deliver_completions();
        self.frame += 1;
        self.now = self.frame as f64 * f64::from(dt);
        self.machine.tick(dt);
        self.deliver_completions();
        self.collect(&mut out);

        out
    }

    /// Runs every frame and returns all notifications in order.
    pub fn run(&mut self) -> (Vec<TimedEvent>, RunSummary) {
        info!("Running scenario '{}'", self.scenario.name);
        let frames = self.scenario.frame_count();
        let mut events = Vec::new();
        while self.frame < frames {
            events.extend(self.step());
        }
        let summary = self.summary();
        info!(
            "Scenario '{}' finished in {:?} after {} frames",
            summary.scenario, summary.final_state, summary.frames
        );
        (events, summary)
    }

    /// Summary of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            scenario: self.scenario.name.clone(),
            frames: self.frame,
            final_state: self.machine.current_state(),
            damage_dealt: self
                .machine
                .rig()
                .map_or(0.0, |rig| rig.damage().iter().map(|d| d.amount).sum()),
        }
    }

    fn apply(&mut self, action: &ScriptedAction) {
        debug!("t={:.3}: {action:?}", self.now);
        let m = &mut self.machine;
        match *action {
            ScriptedAction::Attack => {
                let outcome = m.handle_attack_input();
                debug!("Attack input: {outcome:?}");
            },
            ScriptedAction::OpenComboWindow => {
                if let Some(outcome) = m.enable_combo_window() {
                    debug!("Buffered attack input: {outcome:?}");
                }
            },
            ScriptedAction::CloseComboWindow => m.disable_combo_window(),
            ScriptedAction::WeaponCollision { enabled } => m.set_weapon_collision_enabled(enabled),
            ScriptedAction::Hit { target } => {
                m.on_weapon_hit(EntityId::from_raw(target), Vec3::ZERO, Vec3::Z);
            },
            ScriptedAction::Stun { duration } => {
                m.apply_stun(duration);
            },
            ScriptedAction::Death => {
                m.trigger_death();
            },
            ScriptedAction::Move { moving } => {
                m.update_locomotion(moving);
            },
        }
    }

    fn deliver_completions(&mut self) {
        loop {
            let finished = match self.machine.rig_mut() {
                Some(rig) => rig.take_finished(),
                None => return,
            };
            if finished.is_empty() {
                return;
            }
            for (token, interrupted) in finished {
                self.machine.on_clip_finished(token, interrupted);
            }
        }
    }

    fn collect(&self, out: &mut Vec<TimedEvent>) {
        out.extend(self.events.try_iter().map(|event| TimedEvent { at: self.now, event }));
    }
}
