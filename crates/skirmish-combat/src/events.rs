//! Notifications broadcast to observers (UI, audio, gameplay rules).

use crossbeam_channel::{bounded, Receiver};
use serde::{Deserialize, Serialize};

use crate::state::CombatState;

/// Notification emitted by a combat state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    /// A full transition completed.
    StateChanged {
        /// State that was exited.
        old: CombatState,
        /// State that was entered.
        new: CombatState,
    },
    /// The character entered `Dead`.
    Died,
    /// A stun ran its full course.
    StunEnded,
    /// The attack animation finished and the character returned to idle.
    AttackEnded {
        /// Whether the clip was cut short.
        interrupted: bool,
        /// Combo step that was playing when the attack ended.
        combo_index: usize,
    },
    /// The death timer elapsed; respawn or cleanup may proceed.
    DeathFinalized,
}

/// Handle for removing a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&CombatEvent) + Send>;

/// Synchronous observer list.
///
/// Subscribers run in registration order, on the caller's thread, at the
/// moment the event is emitted.
#[derive(Default)]
pub struct CombatEventBus {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl std::fmt::Debug for CombatEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatEventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl CombatEventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Registers a bounded channel subscriber and returns its receiving end.
    ///
    /// Events are dropped when the channel is full or the receiver is gone.
    pub fn channel(&mut self, capacity: usize) -> Receiver<CombatEvent> {
        let (sender, receiver) = bounded(capacity);
        self.subscribe(move |event| {
            // Non-blocking send - if full, event is dropped
            let _ = sender.try_send(*event);
        });
        receiver
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers `event` to every subscriber.
    pub fn emit(&mut self, event: CombatEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(&event);
        }
    }
}
