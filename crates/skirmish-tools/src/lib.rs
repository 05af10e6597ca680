//! # Skirmish Tools
//!
//! Development tools for Project Skirmish.
//!
//! This crate provides:
//! - TOML combat scenarios with a scripted input timeline
//! - A headless character rig driven by simulated time
//! - A frame-stepped scenario runner (`skirmish-sim`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod runner;
pub mod scenario;
pub mod sim_rig;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::runner::*;
    pub use crate::scenario::*;
    pub use crate::sim_rig::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_combat::CombatState;

    #[test]
    fn test_bundled_scenario_runs() {
        let text = include_str!("../scenarios/combo_then_stun.toml");
        let scenario = Scenario::from_toml_str(text).unwrap();
        let (events, summary) = ScenarioRunner::new(scenario).run();

        assert!(!events.is_empty());
        assert_eq!(summary.final_state, CombatState::Idle);
        assert!(summary.damage_dealt > 0.0);
    }
}
