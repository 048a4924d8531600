use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::components::entity::EntityKind;

/// Unique identifier for an entity in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Classification flags applied when an entity is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyFlags {
    /// Reports contacts to the entity's contact handler.
    pub is_trigger: bool,
    /// Driven by the entity transform, never integrated by the solver.
    pub is_kinematic: bool,
    /// Produces contact manifolds but no collision response.
    pub no_contact_response: bool,
}

impl BodyFlags {
    pub const NONE: BodyFlags = BodyFlags {
        is_trigger: false,
        is_kinematic: false,
        no_contact_response: false,
    };

    pub fn trigger() -> Self {
        Self {
            is_trigger: true,
            ..Self::NONE
        }
    }

    pub fn kinematic() -> Self {
        Self {
            is_kinematic: true,
            ..Self::NONE
        }
    }

    pub fn with_trigger(mut self, enabled: bool) -> Self {
        self.is_trigger = enabled;
        self
    }

    pub fn with_kinematic(mut self, enabled: bool) -> Self {
        self.is_kinematic = enabled;
        self
    }

    pub fn with_no_contact_response(mut self, enabled: bool) -> Self {
        self.no_contact_response = enabled;
        self
    }
}

/// Returned by registration. Identifies the entity and the shape of its body set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHandle {
    pub entity: EntityId,
    pub kind: EntityKind,
}

impl EntityHandle {
    /// Number of bodies owned by the entity (1 for singular entities).
    pub fn body_count(&self) -> usize {
        self.kind.instance_count()
    }
}

/// Opaque handle to a live constraint.
///
/// Ids are never reused, so a handle kept across `reset()` can never alias a newer constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle(pub(crate) u64);

/// A trigger contact found during the last tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    /// The entity flagged `is_trigger`.
    pub trigger: EntityId,
    /// Instance index on the trigger side (0 for singular entities).
    pub trigger_index: usize,
    /// The non-trigger participant.
    pub other: EntityId,
    /// Instance index on the other side (0 for singular entities).
    pub other_index: usize,
    /// World-space position of the first penetrating contact point.
    pub point: Vec3,
}
