//! Combat states and the transition legality table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioral mode of a character.
///
/// Exactly one state is active at any instant. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatState {
    /// Standing still, free to act.
    #[default]
    Idle,
    /// Locomotion indicator (driven by the movement system).
    Moving,
    /// Performing a melee combo.
    Attacking,
    /// Unable to act until the stun timer expires.
    Stunned,
    /// Terminal state.
    Dead,
}

impl CombatState {
    /// All states, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Idle,
        Self::Moving,
        Self::Attacking,
        Self::Stunned,
        Self::Dead,
    ];

    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Moving => "Moving",
            Self::Attacking => "Attacking",
            Self::Stunned => "Stunned",
            Self::Dead => "Dead",
        }
    }

    /// Check if the character may walk, sprint, or start an attack.
    #[must_use]
    pub fn is_free(self) -> bool {
        matches!(self, Self::Idle | Self::Moving)
    }

    /// Check if this state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Dead
    }

    /// Evaluates the legality table for `self -> to`.
    ///
    /// Rules, in order:
    /// 1. nothing leaves `Dead`;
    /// 2. self-transitions are rejected, except `Stunned -> Stunned`;
    /// 3. `Stunned` may only go to `Dead` or `Stunned`.
    ///
    /// `Stunned -> Stunned` passes the table but is handled by the machine as
    /// a stun refresh rather than a full transition.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if self == Self::Dead && to != Self::Dead {
            return false;
        }
        if self == to && to != Self::Stunned {
            return false;
        }
        if self == Self::Stunned && !matches!(to, Self::Dead | Self::Stunned) {
            return false;
        }
        true
    }
}

impl fmt::Display for CombatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
