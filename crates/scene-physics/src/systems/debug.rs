//! Debug rendering: opt-in collider visualization.
//!
//! Call `collider_outlines()` after a tick and feed the segments to a line renderer
//! to see hitboxes.

use glam::Vec3;
use rapier3d::prelude::*;

use crate::api::types::EntityId;
use crate::core::convert::{point_to_vec3, vec3_to_point};
use crate::core::registry::unpack_user_data;
use crate::core::world::PhysicsWorld;

/// Segments per sphere circle.
const CIRCLE_SEGMENTS: usize = 24;

/// Wireframe of one collider, in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderOutline {
    pub entity: EntityId,
    /// Instance index (0 for singular entities).
    pub index: usize,
    /// Line segments as `[start, end]` pairs.
    pub segments: Vec<[Vec3; 2]>,
}

/// Build wireframe outlines for every collider in the world.
///
/// Boxes give their 12 edges, spheres three great circles. Compound shapes give the
/// outlines of their parts.
pub fn collider_outlines(world: &PhysicsWorld) -> Vec<ColliderOutline> {
    world
        .sim
        .colliders
        .iter()
        .map(|(_, collider)| {
            let (entity, index) = unpack_user_data(collider.user_data);
            let mut segments = Vec::new();
            shape_outline(collider.position(), collider.shape(), &mut segments);
            ColliderOutline {
                entity,
                index,
                segments,
            }
        })
        .collect()
}

fn shape_outline(pose: &Isometry<Real>, shape: &dyn Shape, out: &mut Vec<[Vec3; 2]>) {
    if let Some(cuboid) = shape.as_cuboid() {
        box_outline(pose, cuboid.half_extents, out);
    } else if let Some(ball) = shape.as_ball() {
        sphere_outline(pose, ball.radius, out);
    } else if let Some(compound) = shape.as_compound() {
        for (part_pose, part) in compound.shapes() {
            shape_outline(&(pose * part_pose), &**part, out);
        }
    }
}

fn box_outline(pose: &Isometry<Real>, half: Vector<Real>, out: &mut Vec<[Vec3; 2]>) {
    // Corner i has bit 0 = +x, bit 1 = +y, bit 2 = +z.
    let corner = |i: usize| {
        let sign = |bit: usize| if i & bit != 0 { 1.0 } else { -1.0 };
        let local = point![sign(1) * half.x, sign(2) * half.y, sign(4) * half.z];
        point_to_vec3(&(pose * local))
    };
    for i in 0..8 {
        for bit in [1, 2, 4] {
            if i & bit == 0 {
                out.push([corner(i), corner(i | bit)]);
            }
        }
    }
}

fn sphere_outline(pose: &Isometry<Real>, radius: f32, out: &mut Vec<[Vec3; 2]>) {
    let step = std::f32::consts::TAU / CIRCLE_SEGMENTS as f32;
    // One circle in each of the XY, YZ and ZX planes.
    for plane in 0..3 {
        let point = |k: usize| {
            let (s, c) = (k as f32 * step).sin_cos();
            let local = match plane {
                0 => Vec3::new(c, s, 0.0),
                1 => Vec3::new(0.0, c, s),
                _ => Vec3::new(s, 0.0, c),
            } * radius;
            point_to_vec3(&(pose * vec3_to_point(local)))
        };
        for k in 0..CIRCLE_SEGMENTS {
            out.push([point(k), point(k + 1)]);
        }
    }
}
