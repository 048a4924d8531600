//! Entity ↔ body association table.
//!
//! The table is the only owner of body data. Entities carry nothing but their id; a body's
//! `user_data` packs `(entity id, instance index)` so the engine can point back.

use std::collections::HashMap;

use glam::Mat4;
use rapier3d::prelude::*;

use crate::api::config::ColliderMaterial;
use crate::api::types::{BodyFlags, EntityHandle, EntityId};
use crate::components::entity::{Entity, EntityKind};
use crate::core::convert::{iso_from_matrix, iso_from_parts};
use crate::core::shapes::{self, ShapeCache, ShapeKey};
use crate::core::world::Simulation;

/// Engine handles of one body and its collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BodyEntry {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

#[derive(Debug, Clone)]
pub(crate) enum Bodies {
    Single(BodyEntry),
    /// One body per instance, in instance order.
    Batched(Vec<BodyEntry>),
}

impl Bodies {
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &BodyEntry)> {
        let entries: &[BodyEntry] = match self {
            Bodies::Single(entry) => std::slice::from_ref(entry),
            Bodies::Batched(entries) => entries,
        };
        entries.iter().enumerate()
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Bodies::Single(_) => 1,
            Bodies::Batched(entries) => entries.len(),
        }
    }

    fn kind(&self) -> EntityKind {
        match self {
            Bodies::Single(_) => EntityKind::Singular,
            Bodies::Batched(entries) => EntityKind::Batched {
                count: entries.len(),
            },
        }
    }
}

/// Everything the physics core knows about one registered entity.
#[derive(Debug, Clone)]
pub(crate) struct Registration {
    pub mass: f32,
    pub flags: BodyFlags,
    pub bodies: Bodies,
    pub shape: ShapeKey,
}

impl Registration {
    /// Integrated by the solver (as opposed to fixed or externally driven).
    pub(crate) fn is_dynamic(&self) -> bool {
        self.mass > 0.0 && !self.flags.is_kinematic
    }

    fn handle(&self, entity: EntityId) -> EntityHandle {
        EntityHandle {
            entity,
            kind: self.bodies.kind(),
        }
    }
}

pub(crate) fn pack_user_data(entity: EntityId, index: usize) -> u128 {
    entity.0 as u128 | ((index as u32 as u128) << 32)
}

pub(crate) fn unpack_user_data(data: u128) -> (EntityId, usize) {
    (
        EntityId((data & 0xFFFF_FFFF) as u32),
        ((data >> 32) & 0xFFFF_FFFF) as usize,
    )
}

#[derive(Default)]
pub(crate) struct EntityRegistry {
    entries: HashMap<EntityId, Registration>,
}

impl EntityRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(
        &mut self,
        sim: &mut Simulation,
        shapes: &mut ShapeCache,
        material: ColliderMaterial,
        entity: &Entity,
        mass: f32,
        flags: BodyFlags,
    ) -> Option<EntityHandle> {
        if let Some(existing) = self.entries.get(&entity.id) {
            log::warn!("{:?} is already registered; keeping its bodies", entity.id);
            return Some(existing.handle(entity.id));
        }

        let Some(desc) = shapes::resolve(entity.shape_descriptor(), entity.geometry.as_ref()) else {
            log::debug!("{:?} has no collision shape; not registered", entity.id);
            return None;
        };

        let poses: Vec<Isometry<Real>> = match (entity.kind(), &entity.instances) {
            (EntityKind::Batched { .. }, Some(buffer)) => {
                if buffer.count() == 0 {
                    log::warn!("{:?} is batched with zero instances; not registered", entity.id);
                    return None;
                }
                buffer.matrices().iter().map(iso_from_matrix).collect()
            }
            _ if entity.parent_world == Mat4::IDENTITY => {
                vec![iso_from_parts(entity.position, entity.rotation)]
            }
            _ => vec![iso_from_matrix(&entity.world_matrix())],
        };

        let (key, shape) = shapes.acquire(&desc);
        let dynamic = mass > 0.0 && !flags.is_kinematic;
        let body_type = if flags.is_kinematic {
            RigidBodyType::KinematicPositionBased
        } else if dynamic {
            RigidBodyType::Dynamic
        } else {
            RigidBodyType::Fixed
        };

        let mut entries: Vec<BodyEntry> = poses
            .into_iter()
            .enumerate()
            .map(|(index, pose)| {
                let user_data = pack_user_data(entity.id, index);
                let rb = RigidBodyBuilder::new(body_type)
                    .position(pose)
                    .can_sleep(body_type == RigidBodyType::Fixed)
                    .user_data(user_data)
                    .build();

                let mut collider = ColliderBuilder::new(shape.clone())
                    .friction(material.friction)
                    .restitution(material.restitution)
                    .user_data(user_data);
                if dynamic {
                    collider = collider.mass(mass);
                }
                if flags.is_trigger {
                    // Triggers also see kinematic and fixed bodies.
                    collider = collider.active_collision_types(ActiveCollisionTypes::all());
                }
                if flags.no_contact_response {
                    collider = collider.solver_groups(InteractionGroups::none());
                }
                sim.insert_body(rb, collider.build())
            })
            .collect();

        let bodies = match entity.kind() {
            EntityKind::Singular => match entries.pop() {
                Some(entry) => Bodies::Single(entry),
                None => return None,
            },
            EntityKind::Batched { .. } => Bodies::Batched(entries),
        };
        let registration = Registration {
            mass,
            flags,
            bodies,
            shape: key,
        };
        let handle = registration.handle(entity.id);
        self.entries.insert(entity.id, registration);
        Some(handle)
    }

    /// Destroy every body of `id` and release its shape. Unknown ids return `false`.
    pub(crate) fn remove(&mut self, sim: &mut Simulation, shapes: &mut ShapeCache, id: EntityId) -> bool {
        let Some(registration) = self.entries.remove(&id) else {
            log::debug!("remove: {:?} is not registered", id);
            return false;
        };
        for (_, entry) in registration.bodies.iter() {
            sim.remove_body(entry.body);
        }
        shapes.release(&registration.shape);
        true
    }

    /// Destroy every body. Returns the number of bodies removed.
    /// Shapes are left to the caller, which drops the whole cache.
    pub(crate) fn clear(&mut self, sim: &mut Simulation) -> usize {
        let mut removed = 0;
        for (_, registration) in self.entries.drain() {
            for (_, entry) in registration.bodies.iter() {
                sim.remove_body(entry.body);
                removed += 1;
            }
        }
        removed
    }

    /// Body of one instance. Singular entities ignore `index`.
    pub(crate) fn body(&self, id: EntityId, index: usize) -> Option<BodyEntry> {
        match &self.entries.get(&id)?.bodies {
            Bodies::Single(entry) => Some(*entry),
            Bodies::Batched(entries) => entries.get(index).copied(),
        }
    }

    pub(crate) fn is_trigger(&self, id: EntityId) -> bool {
        self.entries
            .get(&id)
            .map(|r| r.flags.is_trigger)
            .unwrap_or(false)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&EntityId, &Registration)> {
        self.entries.iter()
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total number of bodies across all entities.
    pub(crate) fn body_count(&self) -> usize {
        self.entries.values().map(|r| r.bodies.len()).sum()
    }
}
