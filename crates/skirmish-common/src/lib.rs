//! # Skirmish Common
//!
//! Shared types for Project Skirmish.
//!
//! This crate provides the foundations every other Skirmish crate builds on:
//! - Entity identifiers for characters, targets and damage causers
//! - The configuration error type used by profile and scenario loaders
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use glam::Vec3;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
        assert!(!EntityId::NULL.is_valid());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("stun_duration", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid value for stun_duration: must be positive"
        );
    }
}
