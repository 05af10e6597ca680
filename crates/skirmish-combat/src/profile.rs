//! Per-archetype combat configuration.
//!
//! A profile is immutable once a machine is built from it. Profiles are
//! stored as TOML; missing fields fall back to [`CombatProfile::default`].

use serde::{Deserialize, Serialize};
use skirmish_common::{ConfigError, ConfigResult};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::collaborators::{ClipId, EffectId};

/// Default attachment point for the stun effect.
pub const DEFAULT_STUN_ATTACH_POINT: &str = "head";

/// One step of a melee combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboStep {
    /// Clip played for this step. `None` skips playback.
    #[serde(default)]
    pub clip: Option<ClipId>,
    /// Damage applied per target hit during this step.
    pub damage: f32,
}

impl ComboStep {
    /// Create a combo step.
    #[must_use]
    pub fn new(clip: impl Into<ClipId>, damage: f32) -> Self {
        Self {
            clip: Some(clip.into()),
            damage,
        }
    }

    /// Create a step without an animation.
    #[must_use]
    pub fn without_clip(damage: f32) -> Self {
        Self { clip: None, damage }
    }
}

/// Visual effect shown while stunned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StunEffect {
    /// Effect asset.
    pub effect: EffectId,
    /// Attachment point on the character.
    #[serde(default = "default_attach_point")]
    pub attach_point: String,
}

fn default_attach_point() -> String {
    DEFAULT_STUN_ATTACH_POINT.to_string()
}

/// Combat configuration for a character archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatProfile {
    /// Archetype name (diagnostics only).
    pub name: String,

    // === Attack ===
    /// Number of steps in a full combo.
    pub max_combo_count: usize,
    /// Damage for steps without an entry in `combo_steps`.
    pub base_damage: f32,
    /// Playback rate for attack clips.
    pub attack_play_rate: f32,
    /// Blend-out when an attack clip is stopped early.
    pub attack_blend_out: f32,

    // === Stun ===
    /// Default stun duration (seconds).
    pub stun_duration: f32,
    /// Clip looped while stunned.
    pub stun_clip: Option<ClipId>,
    /// Blend-out when the stun clip is stopped.
    pub stun_blend_out: f32,

    // === Death ===
    /// Death animation.
    pub death_clip: Option<ClipId>,
    /// Buffer after the death animation before finalizing (seconds).
    pub death_finish_delay: f32,

    // === Tables (TOML requires these after plain values) ===
    /// Per-step clip and damage, indexed by combo index.
    pub combo_steps: Vec<ComboStep>,
    /// Effect shown while stunned.
    pub stun_effect: Option<StunEffect>,
}

impl Default for CombatProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),

            // Attack
            max_combo_count: 3,
            combo_steps: vec![
                ComboStep::new("attack_1", 10.0),
                ComboStep::new("attack_2", 12.0),
                ComboStep::new("attack_3", 18.0),
            ],
            base_damage: 10.0,
            attack_play_rate: 1.0,
            attack_blend_out: 0.2,

            // Stun
            stun_duration: 2.0,
            stun_clip: Some(ClipId::from("stunned")),
            stun_blend_out: 0.2,
            stun_effect: Some(StunEffect {
                effect: EffectId::from("stun_stars"),
                attach_point: default_attach_point(),
            }),

            // Death
            death_clip: Some(ClipId::from("death")),
            death_finish_delay: 2.0,
        }
    }
}

impl CombatProfile {
    /// Create a profile with defaults and the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Replace the combo steps; the combo count follows the step count.
    #[must_use]
    pub fn with_combo(mut self, steps: Vec<ComboStep>) -> Self {
        self.max_combo_count = steps.len().max(1);
        self.combo_steps = steps;
        self
    }

    /// Set the default stun duration.
    #[must_use]
    pub fn with_stun_duration(mut self, seconds: f32) -> Self {
        self.stun_duration = seconds;
        self
    }

    /// Set the death finish delay.
    #[must_use]
    pub fn with_death_finish_delay(mut self, seconds: f32) -> Self {
        self.death_finish_delay = seconds;
        self
    }

    /// Set or clear the death clip.
    #[must_use]
    pub fn with_death_clip(mut self, clip: Option<ClipId>) -> Self {
        self.death_clip = clip;
        self
    }

    /// Set or clear the stun clip.
    #[must_use]
    pub fn with_stun_clip(mut self, clip: Option<ClipId>) -> Self {
        self.stun_clip = clip;
        self
    }

    /// Set or clear the stun effect.
    #[must_use]
    pub fn with_stun_effect(mut self, effect: Option<StunEffect>) -> Self {
        self.stun_effect = effect;
        self
    }

    /// Clip for combo step `index`, if configured.
    #[must_use]
    pub fn step_clip(&self, index: usize) -> Option<&ClipId> {
        self.combo_steps.get(index).and_then(|s| s.clip.as_ref())
    }

    /// Damage for combo step `index`.
    #[must_use]
    pub fn step_damage(&self, index: usize) -> f32 {
        self.combo_steps
            .get(index)
            .map_or(self.base_damage, |s| s.damage)
    }

    /// Index of the final combo step.
    #[must_use]
    pub fn last_step(&self) -> usize {
        self.max_combo_count.saturating_sub(1)
    }

    /// Clamp every value into its legal range.
    pub fn validate(&mut self) {
        self.max_combo_count = self.max_combo_count.max(1);
        self.base_damage = self.base_damage.max(0.0);
        for step in &mut self.combo_steps {
            step.damage = step.damage.max(0.0);
        }
        self.attack_play_rate = self.attack_play_rate.max(0.01);
        self.attack_blend_out = self.attack_blend_out.max(0.0);

        self.stun_duration = self.stun_duration.max(0.1);
        self.stun_blend_out = self.stun_blend_out.max(0.0);

        self.death_finish_delay = self.death_finish_delay.max(0.0);
    }

    /// Parse a profile from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let mut profile: Self =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if !profile.stun_duration.is_finite() {
            return Err(ConfigError::invalid("stun_duration", "must be finite"));
        }
        if !profile.death_finish_delay.is_finite() {
            return Err(ConfigError::invalid("death_finish_delay", "must be finite"));
        }
        profile.validate();
        Ok(profile)
    }

    /// Load a profile from a TOML file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let profile = Self::from_toml_str(&text)?;
        info!("Loaded combat profile '{}' from {}", profile.name, path.display());
        Ok(profile)
    }

    /// Save the profile as TOML.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved combat profile to {}", path.display());
        Ok(())
    }
}
