use glam::{Mat4, Quat, Vec3};

use crate::api::types::EntityId;
use crate::components::geometry::{Geometry, ShapeDescriptor};
use crate::components::instances::InstanceBuffer;

/// How an entity maps onto bodies. Decided once, at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// One transform, one body.
    Singular,
    /// A fixed-size ensemble of identical instances, one body per instance.
    Batched { count: usize },
}

impl EntityKind {
    pub fn instance_count(&self) -> usize {
        match *self {
            EntityKind::Singular => 1,
            EntityKind::Batched { count } => count,
        }
    }
}

/// Fat Entity: a single struct with optional components.
/// The physics core reads and writes it but never owns it.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Whether this entity is active (inactive entities are skipped by the sync passes).
    pub active: bool,
    /// Position relative to the parent.
    pub position: Vec3,
    /// Rotation relative to the parent.
    pub rotation: Quat,
    /// Scale relative to the parent. Never touched by physics.
    pub scale: Vec3,
    /// World matrix of the parent node (identity for scene roots).
    pub parent_world: Mat4,
    /// Render geometry, used to infer a collision shape.
    pub geometry: Option<Geometry>,
    /// Explicit collision shape; wins over `geometry`.
    pub physics: Option<ShapeDescriptor>,
    /// Per-instance matrices. `Some` makes this a batched entity.
    pub instances: Option<InstanceBuffer>,
}

impl Entity {
    /// Create a new entity with the given ID at the origin.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            active: true,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent_world: Mat4::IDENTITY,
            geometry: None,
            physics: None,
            instances: None,
        }
    }

    // -- Builder pattern --

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_parent_world(mut self, parent_world: Mat4) -> Self {
        self.parent_world = parent_world;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_physics(mut self, physics: ShapeDescriptor) -> Self {
        self.physics = Some(physics);
        self
    }

    pub fn with_instances(mut self, instances: InstanceBuffer) -> Self {
        self.instances = Some(instances);
        self
    }

    pub fn kind(&self) -> EntityKind {
        match &self.instances {
            Some(buf) => EntityKind::Batched { count: buf.count() },
            None => EntityKind::Singular,
        }
    }

    /// Local transform as a matrix.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// World transform: parent world matrix times the local transform.
    pub fn world_matrix(&self) -> Mat4 {
        self.parent_world * self.local_matrix()
    }

    /// Explicit descriptor for this entity: its own, else its geometry's.
    pub fn shape_descriptor(&self) -> Option<&ShapeDescriptor> {
        self.physics
            .as_ref()
            .or_else(|| self.geometry.as_ref().and_then(|g| g.physics.as_ref()))
    }
}
