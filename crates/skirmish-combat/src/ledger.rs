//! Per-swing hit registration.

use ahash::AHashSet;
use skirmish_common::EntityId;

/// Actors already damaged during the current attack swing.
///
/// A weapon's overlap volume usually reports the same target on several
/// consecutive frames; the ledger turns those into a single damage event.
#[derive(Debug, Clone, Default)]
pub struct HitLedger {
    hit: AHashSet<EntityId>,
}

impl HitLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `target`. Returns `true` the first time a target is seen
    /// since the last [`HitLedger::clear`].
    pub fn register(&mut self, target: EntityId) -> bool {
        self.hit.insert(target)
    }

    /// Check if `target` was already hit.
    #[must_use]
    pub fn contains(&self, target: EntityId) -> bool {
        self.hit.contains(&target)
    }

    /// Forgets every recorded target.
    pub fn clear(&mut self) {
        self.hit.clear();
    }

    /// Number of distinct targets hit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hit.len()
    }

    /// Check if nothing was hit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hit.is_empty()
    }

    /// Iterates recorded targets in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.hit.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_register_once() {
        let mut ledger = HitLedger::new();
        let target = EntityId::from_raw(2);

        assert!(ledger.register(target));
        assert!(!ledger.register(target));
        assert!(ledger.contains(target));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut ledger = HitLedger::new();
        ledger.register(EntityId::from_raw(2));
        ledger.register(EntityId::from_raw(3));
        ledger.clear();

        assert!(ledger.is_empty());
        assert!(ledger.register(EntityId::from_raw(2)));
    }

    proptest! {
        #[test]
        fn prop_first_registration_wins(raw in proptest::collection::vec(1u64..20, 0..64)) {
            let mut ledger = HitLedger::new();
            let accepted = raw
                .iter()
                .filter(|&&r| ledger.register(EntityId::from_raw(r)))
                .count();

            let distinct: std::collections::HashSet<_> = raw.iter().collect();
            prop_assert_eq!(accepted, distinct.len());
            prop_assert_eq!(ledger.len(), distinct.len());
        }
    }
}
