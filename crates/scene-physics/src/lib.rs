pub mod api;
pub mod core;
pub mod components;
pub mod input;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::config::{ColliderMaterial, PhysicsConfig};
pub use api::error::PhysicsError;
pub use api::physics::Physics;
pub use api::types::{BodyFlags, ConstraintHandle, ContactEvent, EntityHandle, EntityId};
pub use components::entity::{Entity, EntityKind};
pub use components::geometry::{Geometry, GeometryKind, PrimitiveShape, ShapeDescriptor, ShapePart};
pub use components::instances::InstanceBuffer;
pub use crate::core::constraints::{ConstraintSpec, ConstraintTarget, JointKind};
pub use crate::core::contacts::ContactHandler;
pub use crate::core::scene::Scene;
pub use crate::core::time::{FixedTimestep, TickScheduler};
pub use crate::core::world::PhysicsWorld;
pub use input::commands::{CommandQueue, PhysicsCommand};
pub use systems::debug::{collider_outlines, ColliderOutline};
