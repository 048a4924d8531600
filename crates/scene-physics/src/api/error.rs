use thiserror::Error;

use crate::api::types::EntityId;

/// Errors surfaced by the physics core.
///
/// Most failures are absorbed as no-ops (unknown entities, unsupported geometry, stale
/// constraint handles). Only the cases below reach the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// The world could not be created from the given configuration.
    #[error("invalid physics configuration: {0}")]
    InvalidConfig(String),

    /// Removing the entity would leave constraints pointing at destroyed bodies.
    #[error("entity {entity:?} is still referenced by {count} live constraint(s)")]
    LiveConstraints { entity: EntityId, count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = PhysicsError::InvalidConfig("tick_rate must be positive".into());
        assert_eq!(
            err.to_string(),
            "invalid physics configuration: tick_rate must be positive"
        );

        let err = PhysicsError::LiveConstraints {
            entity: EntityId(7),
            count: 2,
        };
        assert!(err.to_string().contains("EntityId(7)"));
        assert!(err.to_string().contains("2 live constraint"));
    }
}
