//! Scripted combat scenarios.
//!
//! A scenario is a TOML file describing one character's combat profile, the
//! clip lengths its animation driver reports, and a timeline of inputs:
//!
//! ```toml
//! name = "three hit combo"
//! tick = 0.05
//! duration = 4.0
//!
//! [clip_lengths]
//! attack_1 = 0.6
//!
//! [[script]]
//! at = 0.0
//! action = "attack"
//!
//! [[script]]
//! at = 0.2
//! action = "weapon_collision"
//! enabled = true
//! ```

use serde::{Deserialize, Serialize};
use skirmish_combat::CombatProfile;
use skirmish_common::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

fn default_tick() -> f32 {
    1.0 / 60.0
}

fn default_clip_length() -> f32 {
    1.0
}

/// Input applied to the character at a scripted time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptedAction {
    /// Attack button press.
    Attack,
    /// Combo window opens (animation notify).
    OpenComboWindow,
    /// Combo window closes (animation notify).
    CloseComboWindow,
    /// Weapon collision toggled (animation notify).
    WeaponCollision {
        /// New collision state.
        enabled: bool,
    },
    /// Weapon overlaps another actor.
    Hit {
        /// Raw entity ID of the actor hit.
        target: u64,
    },
    /// Stun applied. Zero uses the profile's duration.
    Stun {
        /// Stun duration override in seconds.
        #[serde(default)]
        duration: f32,
    },
    /// Character dies.
    Death,
    /// Movement input changes.
    Move {
        /// Whether movement input is held.
        moving: bool,
    },
}

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Simulated time in seconds.
    pub at: f32,
    /// What happens.
    #[serde(flatten)]
    pub action: ScriptedAction,
}

/// A complete scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Seconds per simulated frame.
    #[serde(default = "default_tick")]
    pub tick: f32,
    /// Total simulated time in seconds.
    pub duration: f32,
    /// Length of clips missing from `clip_lengths`.
    #[serde(default = "default_clip_length")]
    pub default_clip_length: f32,
    /// Per-clip lengths in seconds.
    #[serde(default)]
    pub clip_lengths: BTreeMap<String, f32>,
    /// Combat profile of the scripted character.
    #[serde(default)]
    pub profile: CombatProfile,
    /// Timeline, sorted by time after loading.
    #[serde(default)]
    pub script: Vec<ScriptEntry>,
}

impl Scenario {
    /// Parse a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let mut scenario: Self =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        scenario.validate()?;
        scenario.profile.validate();
        scenario.script.sort_by(|a, b| a.at.total_cmp(&b.at));
        Ok(scenario)
    }

    /// Load a scenario from a TOML file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let scenario = Self::from_toml_str(&text)?;
        info!(
            "Loaded scenario '{}' ({} actions) from {}",
            scenario.name,
            scenario.script.len(),
            path.display()
        );
        Ok(scenario)
    }

    /// Number of frames needed to cover `duration`.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        (f64::from(self.duration) / f64::from(self.tick)).ceil() as u64
    }

    fn validate(&self) -> ConfigResult<()> {
        if !self.tick.is_finite() || self.tick <= 0.0 {
            return Err(ConfigError::invalid("tick", "must be a positive number of seconds"));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ConfigError::invalid("duration", "must be zero or more seconds"));
        }
        if !self.default_clip_length.is_finite() || self.default_clip_length < 0.0 {
            return Err(ConfigError::invalid("default_clip_length", "must be zero or more seconds"));
        }
        if let Some((clip, _)) = self
            .clip_lengths
            .iter()
            .find(|(_, len)| !len.is_finite() || **len < 0.0)
        {
            return Err(ConfigError::invalid(
                "clip_lengths",
                format!("length of '{clip}' must be zero or more seconds"),
            ));
        }
        if self.script.iter().any(|e| !e.at.is_finite() || e.at < 0.0) {
            return Err(ConfigError::invalid("script", "action times must be zero or more seconds"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
        name = "basic"
        tick = 0.1
        duration = 1.0

        [clip_lengths]
        attack_1 = 0.4

        [profile]
        name = "grunt"
        stun_duration = 1.5

        [[script]]
        at = 0.5
        action = "stun"
        duration = 0.25

        [[script]]
        at = 0.0
        action = "attack"

        [[script]]
        at = 0.1
        action = "hit"
        target = 7

        [[script]]
        at = 0.2
        action = "move"
        moving = true
    "#;

    #[test]
    fn test_parse_and_sort() {
        let scenario = Scenario::from_toml_str(BASIC).unwrap();

        assert_eq!(scenario.name, "basic");
        assert_eq!(scenario.profile.name, "grunt");
        assert_eq!(scenario.profile.stun_duration, 1.5);
        assert_eq!(scenario.clip_lengths.get("attack_1"), Some(&0.4));
        assert_eq!(scenario.default_clip_length, 1.0);
        assert_eq!(scenario.frame_count(), 10);

        let actions: Vec<_> = scenario.script.iter().map(|e| e.action.clone()).collect();
        assert_eq!(
            actions,
            vec![
                ScriptedAction::Attack,
                ScriptedAction::Hit { target: 7 },
                ScriptedAction::Move { moving: true },
                ScriptedAction::Stun { duration: 0.25 },
            ]
        );
    }

    #[test]
    fn test_stun_duration_defaults_to_zero() {
        let scenario = Scenario::from_toml_str(
            r#"
            name = "s"
            duration = 1.0

            [[script]]
            at = 0.0
            action = "stun"
            "#,
        )
        .unwrap();
        assert_eq!(scenario.script[0].action, ScriptedAction::Stun { duration: 0.0 });
    }

    #[test]
    fn test_invalid_tick() {
        let err = Scenario::from_toml_str("name = \"x\"\ntick = 0.0\nduration = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "tick"));
    }

    #[test]
    fn test_negative_action_time() {
        let err = Scenario::from_toml_str(
            r#"
            name = "x"
            duration = 1.0

            [[script]]
            at = -1.0
            action = "death"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "script"));
    }

    #[test]
    fn test_unknown_action() {
        let err = Scenario::from_toml_str(
            r#"
            name = "x"
            duration = 1.0

            [[script]]
            at = 0.0
            action = "dance"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.toml");
        fs::write(&path, BASIC).unwrap();

        let scenario = Scenario::load_from(&path).unwrap();
        assert_eq!(scenario.script.len(), 4);
    }
}
