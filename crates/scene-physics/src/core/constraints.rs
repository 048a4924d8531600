use std::collections::HashMap;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::api::types::{ConstraintHandle, EntityId};
use crate::core::convert::{vec3_to_point, vec3_to_unit};
use crate::core::registry::EntityRegistry;
use crate::core::world::Simulation;

/// Motor damping factor used for hinge friction.
const FRICTION_MOTOR_FACTOR: f32 = 1.0;

/// The kind of joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointKind {
    /// One rotational degree of freedom. With `friction`, a zero-velocity motor capped at that
    /// torque resists the swing.
    Hinge { friction: Option<f32> },
    /// Pins a point, leaves all rotations free.
    PointToPoint,
}

/// What the entity's body is attached to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintTarget {
    /// The world frame. `origin` and `rotation` give the joint frame in the body's local
    /// space; a hinge swings around the frame's Z axis. The frame stays where it is at creation.
    World { origin: Vec3, rotation: Quat },
    /// A body of another entity. Pivots and axes are in each body's local space.
    Body {
        entity: EntityId,
        instance: usize,
        pivot_in_a: Vec3,
        pivot_in_b: Vec3,
        axis_in_a: Vec3,
        axis_in_b: Vec3,
    },
}

/// Description of a constraint to create.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintSpec {
    pub kind: JointKind,
    pub target: ConstraintTarget,
}

impl ConstraintSpec {
    /// Hinge the body to the world.
    pub fn hinge_to_world(origin: Vec3, rotation: Quat) -> Self {
        Self {
            kind: JointKind::Hinge { friction: None },
            target: ConstraintTarget::World { origin, rotation },
        }
    }

    /// Hinge the body to a body of `entity`.
    pub fn hinge_between(
        entity: EntityId,
        instance: usize,
        pivot_in_a: Vec3,
        pivot_in_b: Vec3,
        axis_in_a: Vec3,
        axis_in_b: Vec3,
    ) -> Self {
        Self {
            kind: JointKind::Hinge { friction: None },
            target: ConstraintTarget::Body {
                entity,
                instance,
                pivot_in_a,
                pivot_in_b,
                axis_in_a,
                axis_in_b,
            },
        }
    }

    /// Pin a local point of the body to where it currently is in the world.
    pub fn point_to_world(pivot: Vec3) -> Self {
        Self {
            kind: JointKind::PointToPoint,
            target: ConstraintTarget::World {
                origin: pivot,
                rotation: Quat::IDENTITY,
            },
        }
    }

    /// Pin `pivot_in_a` on the body to `pivot_in_b` on a body of `entity`.
    pub fn point_between(entity: EntityId, instance: usize, pivot_in_a: Vec3, pivot_in_b: Vec3) -> Self {
        Self {
            kind: JointKind::PointToPoint,
            target: ConstraintTarget::Body {
                entity,
                instance,
                pivot_in_a,
                pivot_in_b,
                axis_in_a: Vec3::X,
                axis_in_b: Vec3::X,
            },
        }
    }

    /// Add hinge friction. Ignored for point-to-point joints.
    pub fn with_friction(mut self, torque: f32) -> Self {
        if let JointKind::Hinge { friction } = &mut self.kind {
            *friction = Some(torque);
        }
        self
    }

    fn other_entity(&self) -> Option<EntityId> {
        match self.target {
            ConstraintTarget::World { .. } => None,
            ConstraintTarget::Body { entity, .. } => Some(entity),
        }
    }
}

struct LiveConstraint {
    joint: ImpulseJointHandle,
    entity: EntityId,
    other: Option<EntityId>,
}

/// Live constraints, keyed by the handles given to callers.
#[derive(Default)]
pub(crate) struct ConstraintSet {
    live: HashMap<ConstraintHandle, LiveConstraint>,
}

impl ConstraintSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create the joint under `handle`. Returns `false` when an endpoint has no body.
    pub(crate) fn add(
        &mut self,
        sim: &mut Simulation,
        registry: &EntityRegistry,
        handle: ConstraintHandle,
        entity: EntityId,
        spec: &ConstraintSpec,
        index: usize,
    ) -> bool {
        let Some(a) = registry.body(entity, index) else {
            log::warn!("constraint on {:?}[{}]: no such body", entity, index);
            return false;
        };

        let (body1, body2, joint) = match spec.target {
            ConstraintTarget::World { origin, rotation } => {
                let Some(pose) = sim.bodies.get(a.body).map(|rb| *rb.position()) else {
                    return false;
                };
                let local_axis = rotation * Vec3::Z;
                let world_anchor = pose * vec3_to_point(origin);
                let world_axis = pose.rotation * vec3_to_unit(local_axis);
                let joint = build_joint(
                    spec.kind,
                    world_anchor,
                    vec3_to_point(origin),
                    world_axis,
                    vec3_to_unit(local_axis),
                );
                (sim.world_anchor(), a.body, joint)
            }
            ConstraintTarget::Body {
                entity: other,
                instance,
                pivot_in_a,
                pivot_in_b,
                axis_in_a,
                axis_in_b,
            } => {
                let Some(b) = registry.body(other, instance) else {
                    log::warn!("constraint target {:?}[{}]: no such body", other, instance);
                    return false;
                };
                let joint = build_joint(
                    spec.kind,
                    vec3_to_point(pivot_in_a),
                    vec3_to_point(pivot_in_b),
                    vec3_to_unit(axis_in_a),
                    vec3_to_unit(axis_in_b),
                );
                (a.body, b.body, joint)
            }
        };

        let joint = sim.impulse_joints.insert(body1, body2, joint, true);
        self.live.insert(
            handle,
            LiveConstraint {
                joint,
                entity,
                other: spec.other_entity(),
            },
        );
        true
    }

    /// Destroy one joint. Stale handles return `false`.
    pub(crate) fn remove(&mut self, sim: &mut Simulation, handle: ConstraintHandle) -> bool {
        match self.live.remove(&handle) {
            Some(constraint) => {
                sim.impulse_joints.remove(constraint.joint, true);
                true
            }
            None => {
                log::debug!("constraint {:?} already removed", handle);
                false
            }
        }
    }

    /// Destroy every joint. Returns how many there were.
    pub(crate) fn clear(&mut self, sim: &mut Simulation) -> usize {
        let count = self.live.len();
        for (_, constraint) in self.live.drain() {
            sim.impulse_joints.remove(constraint.joint, true);
        }
        count
    }

    /// Number of live constraints attached to any body of `entity`.
    pub(crate) fn referencing(&self, entity: EntityId) -> usize {
        self.live
            .values()
            .filter(|c| c.entity == entity || c.other == Some(entity))
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }
}

fn build_joint(
    kind: JointKind,
    anchor1: Point<Real>,
    anchor2: Point<Real>,
    axis1: UnitVector<Real>,
    axis2: UnitVector<Real>,
) -> GenericJoint {
    match kind {
        JointKind::Hinge { friction } => {
            let mut builder = GenericJointBuilder::new(JointAxesMask::LOCKED_REVOLUTE_AXES)
                .local_anchor1(anchor1)
                .local_anchor2(anchor2)
                .local_axis1(axis1)
                .local_axis2(axis2);
            if let Some(torque) = friction {
                builder = builder
                    .motor_velocity(JointAxis::AngX, 0.0, FRICTION_MOTOR_FACTOR)
                    .motor_max_force(JointAxis::AngX, torque);
            }
            builder.build()
        }
        JointKind::PointToPoint => SphericalJointBuilder::new()
            .local_anchor1(anchor1)
            .local_anchor2(anchor2)
            .build()
            .into(),
    }
}
