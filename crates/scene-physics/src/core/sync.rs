//! Transform sync between the scene and the engine.
//!
//! Kinematic bodies follow their entity (push, before stepping). Dynamic bodies drive their
//! entity (pull, after stepping). Fixed bodies are never synced. Entities missing from the
//! scene or marked inactive are skipped.

use glam::{Mat4, Quat, Vec3};
use rapier3d::prelude::*;

use crate::components::entity::Entity;
use crate::core::convert::{iso_from_matrix, iso_from_parts, iso_to_parts};
use crate::core::registry::{Bodies, EntityRegistry};
use crate::core::scene::Scene;
use crate::core::world::Simulation;

/// World pose of a singular entity.
pub(crate) fn entity_world_pose(entity: &Entity) -> Isometry<Real> {
    if entity.parent_world == Mat4::IDENTITY {
        iso_from_parts(entity.position, entity.rotation)
    } else {
        iso_from_matrix(&entity.world_matrix())
    }
}

/// Instance matrix for a body pose, keeping the instance's scale.
pub fn compose_instance_matrix(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

/// Copy kinematic entity transforms onto their bodies.
///
/// With `integrate` the pose becomes the next kinematic target so the solver sees the motion.
/// Without it (no step follows) the body is placed directly.
pub(crate) fn push_kinematic(
    registry: &EntityRegistry,
    sim: &mut Simulation,
    scene: &Scene,
    integrate: bool,
) {
    for (id, registration) in registry.iter() {
        if !registration.flags.is_kinematic {
            continue;
        }
        let Some(entity) = scene.get(*id).filter(|e| e.active) else {
            continue;
        };

        for (index, entry) in registration.bodies.iter() {
            let pose = match (&registration.bodies, &entity.instances) {
                (Bodies::Single(_), _) => entity_world_pose(entity),
                (Bodies::Batched(_), Some(buffer)) => match buffer.matrix(index) {
                    Some(m) => iso_from_matrix(&m),
                    None => continue,
                },
                (Bodies::Batched(_), None) => break,
            };
            let Some(rb) = sim.bodies.get_mut(entry.body) else {
                continue;
            };
            if integrate {
                rb.set_next_kinematic_position(pose);
            } else {
                rb.set_position(pose, true);
            }
        }
    }
}

/// Copy dynamic body poses back onto their entities.
pub(crate) fn pull_dynamic(registry: &EntityRegistry, sim: &Simulation, scene: &mut Scene) {
    for (id, registration) in registry.iter() {
        if !registration.is_dynamic() {
            continue;
        }
        let Some(entity) = scene.get_mut(*id).filter(|e| e.active) else {
            continue;
        };

        match &registration.bodies {
            Bodies::Single(entry) => {
                if let Some(rb) = sim.bodies.get(entry.body) {
                    let (position, rotation) = iso_to_parts(rb.position());
                    write_singular(entity, position, rotation);
                }
            }
            Bodies::Batched(entries) => {
                let Some(buffer) = entity.instances.as_mut() else {
                    continue;
                };
                for (index, entry) in entries.iter().enumerate() {
                    let (Some(rb), Some(current)) = (sim.bodies.get(entry.body), buffer.matrix(index))
                    else {
                        continue;
                    };
                    let (position, rotation) = iso_to_parts(rb.position());
                    let (scale, _, _) = current.to_scale_rotation_translation();
                    buffer.set_matrix(index, compose_instance_matrix(position, rotation, scale));
                }
                buffer.mark_dirty();
            }
        }
    }
}

fn write_singular(entity: &mut Entity, position: Vec3, rotation: Quat) {
    if entity.parent_world == Mat4::IDENTITY {
        entity.position = position;
        entity.rotation = rotation;
        return;
    }
    // Bring the world pose back into the parent's space.
    let local = entity.parent_world.inverse() * Mat4::from_rotation_translation(rotation, position);
    let (_, local_rotation, local_position) = local.to_scale_rotation_translation();
    entity.position = local_position;
    entity.rotation = local_rotation.normalize();
}
