//! Combo bookkeeping: step index, input window, and input buffer.
//!
//! The controller is pure state. The state machine owns it and performs the
//! side effects (clip playback, ledger reset) when a step advances.

use serde::{Deserialize, Serialize};

/// What an attack button press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackInput {
    /// A new attack started at step 0.
    Started,
    /// The combo moved to the given step.
    Advanced {
        /// New combo index.
        combo_index: usize,
    },
    /// The press was remembered until the combo window opens.
    Buffered,
    /// The combo is already at its final step.
    Exhausted,
    /// The character cannot attack right now.
    Rejected,
}

impl AttackInput {
    /// Check if the press changed what the character is doing.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Started | Self::Advanced { .. })
    }
}

/// Combo state for one character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboController {
    /// Current step, `0..max_combo_count`.
    index: usize,
    /// Number of steps in a full combo.
    max_combo_count: usize,
    /// Whether a press advances immediately.
    accepting_input: bool,
    /// A press arrived while the window was closed.
    buffered_input: bool,
}

impl ComboController {
    /// Create a controller for a combo of `max_combo_count` steps.
    #[must_use]
    pub fn new(max_combo_count: usize) -> Self {
        Self {
            index: 0,
            max_combo_count: max_combo_count.max(1),
            accepting_input: false,
            buffered_input: false,
        }
    }

    /// Current combo index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of steps in a full combo.
    #[must_use]
    pub fn max_combo_count(&self) -> usize {
        self.max_combo_count
    }

    /// Check if the combo window is open.
    #[must_use]
    pub fn is_accepting_input(&self) -> bool {
        self.accepting_input
    }

    /// Check if a press is waiting for the window.
    #[must_use]
    pub fn has_buffered_input(&self) -> bool {
        self.buffered_input
    }

    /// Check if the current step is the last one.
    #[must_use]
    pub fn is_final_step(&self) -> bool {
        self.index + 1 >= self.max_combo_count
    }

    /// Back to the first step with the window closed and no buffered press.
    pub fn reset(&mut self) {
        self.index = 0;
        self.accepting_input = false;
        self.buffered_input = false;
    }

    /// Moves to the next step and closes the window.
    ///
    /// Returns the new index, or `None` if the combo is exhausted, in which
    /// case nothing changes.
    pub fn advance(&mut self) -> Option<usize> {
        if self.is_final_step() {
            return None;
        }
        self.index += 1;
        self.accepting_input = false;
        Some(self.index)
    }

    /// Remembers a press for the next window. Repeated presses coalesce.
    pub fn buffer_input(&mut self) {
        self.buffered_input = true;
    }

    /// Opens the window and hands back a buffered press, if any.
    pub fn open_window(&mut self) -> bool {
        self.accepting_input = true;
        std::mem::take(&mut self.buffered_input)
    }

    /// Closes the window. A buffered press stays pending.
    pub fn close_window(&mut self) {
        self.accepting_input = false;
    }
}
