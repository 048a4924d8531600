use std::collections::HashMap;
use std::time::Instant;

use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use crate::api::config::{ColliderMaterial, PhysicsConfig};
use crate::api::error::PhysicsError;
use crate::api::types::{BodyFlags, ConstraintHandle, ContactEvent, EntityHandle, EntityId};
use crate::components::entity::Entity;
use crate::core::constraints::{ConstraintSet, ConstraintSpec};
use crate::core::contacts::{self, ContactHandler};
use crate::core::convert::{iso_to_parts, na_to_vec3, vec3_to_na};
use crate::core::registry::{BodyEntry, EntityRegistry};
use crate::core::scene::Scene;
use crate::core::shapes::ShapeCache;
use crate::core::sync;
use crate::core::time::FixedTimestep;
use crate::input::commands::{CommandQueue, PhysicsCommand};

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Wraps all Rapier3D boilerplate into a single struct.
pub struct Simulation {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    pub(crate) narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Fixed body standing in for the world frame in world-anchored joints.
    world_anchor: Option<RigidBodyHandle>,
}

impl Simulation {
    pub(crate) fn new(gravity: Vec3, dt: f32) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = dt;
        Self {
            gravity: vec3_to_na(gravity),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            world_anchor: None,
        }
    }

    /// Advance the engine by one fixed step.
    pub(crate) fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Insert a body with its single collider.
    pub(crate) fn insert_body(&mut self, body: RigidBody, collider: Collider) -> BodyEntry {
        let body_handle = self.bodies.insert(body);
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);
        BodyEntry {
            body: body_handle,
            collider: collider_handle,
        }
    }

    /// Remove a body and its colliders. The motion state goes with the body.
    pub(crate) fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// The world-frame anchor, created on first use.
    pub(crate) fn world_anchor(&mut self) -> RigidBodyHandle {
        match self.world_anchor {
            Some(handle) => handle,
            None => {
                let handle = self.bodies.insert(RigidBodyBuilder::fixed().build());
                self.world_anchor = Some(handle);
                handle
            }
        }
    }

    pub(crate) fn remove_world_anchor(&mut self) {
        if let Some(handle) = self.world_anchor.take() {
            self.remove_body(handle);
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// One simulation world, created per world load and dropped (or `reset`) on unload.
///
/// Owns the engine state, the entity↔body association table, the shared shapes,
/// the live constraints and the contact handlers. Entities stay with the caller's `Scene`.
pub struct PhysicsWorld {
    pub(crate) sim: Simulation,
    registry: EntityRegistry,
    shapes: ShapeCache,
    constraints: ConstraintSet,
    handlers: HashMap<EntityId, ContactHandler>,
    commands: CommandQueue,
    contacts: Vec<ContactEvent>,
    timestep: FixedTimestep,
    last_tick: Option<Instant>,
    material: ColliderMaterial,
}

impl PhysicsWorld {
    /// Create a world from a validated configuration.
    pub fn new(config: &PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        log::info!(
            "physics world created: gravity={} dt={} max_substeps={}",
            config.gravity,
            config.fixed_dt,
            config.max_substeps
        );
        Ok(Self {
            sim: Simulation::new(config.gravity, config.fixed_dt),
            registry: EntityRegistry::new(),
            shapes: ShapeCache::new(),
            constraints: ConstraintSet::new(),
            handlers: HashMap::new(),
            commands: CommandQueue::new(),
            contacts: Vec::new(),
            timestep: FixedTimestep::with_max_steps(config.fixed_dt, config.max_substeps),
            last_tick: None,
            material: config.material,
        })
    }

    // -- Registry --

    /// Create bodies for an entity at its current transform.
    ///
    /// Returns `None` when the entity has no usable shape (nothing is created).
    /// Registering an entity twice returns the existing handle.
    pub fn register(&mut self, entity: &Entity, mass: f32, flags: BodyFlags) -> Option<EntityHandle> {
        self.registry.register(
            &mut self.sim,
            &mut self.shapes,
            self.material,
            entity,
            mass,
            flags,
        )
    }

    /// Destroy every body of an entity. Removing an unknown entity is a no-op (`Ok(false)`).
    ///
    /// Refused while constraints still reference the entity; the registration is left intact.
    pub fn remove(&mut self, id: EntityId) -> Result<bool, PhysicsError> {
        let live = self.constraints.referencing(id);
        if live > 0 {
            log::error!(
                "refusing to remove {:?}: {} live constraint(s) still reference it",
                id,
                live
            );
            return Err(PhysicsError::LiveConstraints {
                entity: id,
                count: live,
            });
        }
        self.handlers.remove(&id);
        Ok(self.registry.remove(&mut self.sim, &mut self.shapes, id))
    }

    /// Full teardown: constraints, then bodies, then shapes.
    pub fn reset(&mut self) {
        let constraints = self.constraints.clear(&mut self.sim);
        let bodies = self.registry.clear(&mut self.sim);
        self.sim.remove_world_anchor();
        let shapes = self.shapes.len();
        self.shapes.clear();

        self.handlers.clear();
        self.commands.clear();
        self.contacts.clear();
        self.timestep.clear();
        self.last_tick = None;
        log::info!(
            "physics world reset: {} constraint(s), {} body(ies), {} shape(s) released",
            constraints,
            bodies,
            shapes
        );
    }

    // -- Body manipulation --

    /// Teleport a body. Velocities are zeroed and the rotation reset.
    pub fn set_position(&mut self, id: EntityId, position: Vec3, index: usize) {
        let Some(rb) = self.body_mut(id, index) else {
            return;
        };
        rb.set_linvel(Vector::zeros(), true);
        rb.set_angvel(Vector::zeros(), true);
        rb.set_position(Isometry::translation(position.x, position.y, position.z), true);
    }

    /// Apply an instantaneous impulse at the body's center of mass.
    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec3, index: usize) {
        if let Some(rb) = self.body_mut(id, index) {
            rb.apply_impulse(vec3_to_na(impulse), true);
        }
    }

    // -- Constraints --

    /// Create a joint on one body of `id`. Returns `None` if an endpoint is not registered.
    pub fn add_constraint(
        &mut self,
        id: EntityId,
        spec: &ConstraintSpec,
        index: usize,
    ) -> Option<ConstraintHandle> {
        let handle = self.commands.reserve_constraint_handle();
        self.insert_constraint(handle, id, spec, index).then_some(handle)
    }

    /// Detach and destroy a joint. Stale handles are a no-op (`false`).
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        self.constraints.remove(&mut self.sim, handle)
    }

    fn insert_constraint(
        &mut self,
        handle: ConstraintHandle,
        id: EntityId,
        spec: &ConstraintSpec,
        index: usize,
    ) -> bool {
        self.constraints
            .add(&mut self.sim, &self.registry, handle, id, spec, index)
    }

    // -- Contacts --

    /// Install the contact handler of a trigger entity, replacing any previous one.
    pub fn set_contact_handler<F>(&mut self, id: EntityId, handler: F)
    where
        F: FnMut(&ContactEvent, &mut CommandQueue) + 'static,
    {
        self.handlers.insert(id, Box::new(handler));
    }

    pub fn clear_contact_handler(&mut self, id: EntityId) {
        self.handlers.remove(&id);
    }

    /// Trigger contacts found during the most recent tick.
    pub fn contacts(&self) -> &[ContactEvent] {
        &self.contacts
    }

    /// Queue for mutations to apply at the start of the next tick.
    pub fn commands(&mut self) -> &mut CommandQueue {
        &mut self.commands
    }

    // -- Tick --

    /// Run one tick at wall-clock time `now`. Returns the number of engine steps taken.
    ///
    /// Order: queued commands, kinematic push, integration, dynamic pull, contact dispatch.
    /// The first tick after creation or `reset()` does not integrate.
    /// Contacts are only reported on ticks that take at least one engine step.
    pub fn tick(&mut self, scene: &mut Scene, now: Instant) -> u32 {
        self.apply_commands();

        let elapsed = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f32());
        sync::push_kinematic(&self.registry, &mut self.sim, scene, elapsed.is_some());

        let substeps = elapsed.map_or(0, |dt| self.timestep.accumulate(dt));
        for _ in 0..substeps {
            self.sim.step();
        }
        self.last_tick = Some(now);

        sync::pull_dynamic(&self.registry, &self.sim, scene);

        self.contacts.clear();
        if substeps > 0 {
            contacts::collect_trigger_contacts(&self.sim, &self.registry, &mut self.contacts);
            contacts::dispatch(&self.contacts, &mut self.handlers, &mut self.commands);
        }
        log::trace!(
            "physics tick: {} substep(s), {} trigger contact(s)",
            substeps,
            self.contacts.len()
        );
        substeps
    }

    fn apply_commands(&mut self) {
        for command in self.commands.drain() {
            match command {
                PhysicsCommand::SetPosition {
                    entity,
                    position,
                    index,
                } => self.set_position(entity, position, index),
                PhysicsCommand::ApplyImpulse {
                    entity,
                    impulse,
                    index,
                } => self.apply_impulse(entity, impulse, index),
                PhysicsCommand::AddConstraint {
                    handle,
                    entity,
                    spec,
                    index,
                } => {
                    self.insert_constraint(handle, entity, &spec, index);
                }
                PhysicsCommand::RemoveConstraint(handle) => {
                    self.remove_constraint(handle);
                }
                PhysicsCommand::RemoveEntity(entity) => {
                    // Already logged by `remove`.
                    let _ = self.remove(entity);
                }
            }
        }
    }

    // -- Queries --

    /// World pose of one body.
    pub fn body_transform(&self, id: EntityId, index: usize) -> Option<(Vec3, Quat)> {
        let entry = self.registry.body(id, index)?;
        self.sim
            .bodies
            .get(entry.body)
            .map(|rb| iso_to_parts(rb.position()))
    }

    /// Linear velocity of one body.
    pub fn linear_velocity(&self, id: EntityId, index: usize) -> Option<Vec3> {
        let entry = self.registry.body(id, index)?;
        self.sim.bodies.get(entry.body).map(|rb| na_to_vec3(rb.linvel()))
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.registry.contains(id)
    }

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of entity bodies (the association table's view).
    pub fn body_count(&self) -> usize {
        self.registry.body_count()
    }

    /// Number of bodies the engine holds, world anchor included.
    pub fn engine_body_count(&self) -> usize {
        self.sim.bodies.len()
    }

    /// Number of live constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of distinct shapes alive.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    fn body_mut(&mut self, id: EntityId, index: usize) -> Option<&mut RigidBody> {
        let Some(entry) = self.registry.body(id, index) else {
            log::debug!("no body for {:?}[{}]", id, index);
            return None;
        };
        self.sim.bodies.get_mut(entry.body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::geometry::{Geometry, ShapeDescriptor};
    use crate::components::instances::InstanceBuffer;
    use glam::Mat4;
    use std::time::Duration;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn zero_gravity() -> PhysicsWorld {
        PhysicsWorld::new(&PhysicsConfig::default().with_gravity(Vec3::ZERO)).unwrap()
    }

    fn ball(id: u32, radius: f32, position: Vec3) -> Entity {
        Entity::new(EntityId(id))
            .with_geometry(Geometry::sphere(radius))
            .with_position(position)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PhysicsConfig::default().with_tick_rate(-1.0);
        assert!(PhysicsWorld::new(&config).is_err());
    }

    #[test]
    fn first_tick_does_not_integrate() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default()).unwrap();
        let mut scene = Scene::new();
        let e = ball(1, 0.2, Vec3::new(0.0, 10.0, 0.0));
        world.register(&e, 1.0, BodyFlags::NONE);
        scene.spawn(e);

        let start = Instant::now();
        assert_eq!(world.tick(&mut scene, start), 0);
        assert_eq!(scene.get(EntityId(1)).unwrap().position, Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(world.tick(&mut scene, start + FRAME), 1);
        assert!(scene.get(EntityId(1)).unwrap().position.y < 10.0);
    }

    #[test]
    fn long_stall_is_capped_at_max_substeps() {
        let mut world = zero_gravity();
        let mut scene = Scene::new();
        let start = Instant::now();
        world.tick(&mut scene, start);
        assert_eq!(world.tick(&mut scene, start + Duration::from_secs(2)), 10);
    }

    #[test]
    fn set_position_teleports_and_zeroes_velocity() {
        let mut world = zero_gravity();
        let mut scene = Scene::new();
        let e = ball(1, 0.2, Vec3::ZERO);
        world.register(&e, 1.0, BodyFlags::NONE);
        scene.spawn(e);

        world.apply_impulse(EntityId(1), Vec3::new(5.0, 0.0, 0.0), 0);
        assert!(world.linear_velocity(EntityId(1), 0).unwrap().x > 0.0);

        world.set_position(EntityId(1), Vec3::new(0.0, 3.0, 0.0), 0);
        assert_eq!(world.linear_velocity(EntityId(1), 0), Some(Vec3::ZERO));

        let start = Instant::now();
        world.tick(&mut scene, start);
        world.tick(&mut scene, start + FRAME);
        let pos = scene.get(EntityId(1)).unwrap().position;
        assert!((pos - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-4, "pos={}", pos);
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let mut world = zero_gravity();
        world.set_position(EntityId(9), Vec3::ONE, 0);
        world.apply_impulse(EntityId(9), Vec3::ONE, 3);
        assert_eq!(world.remove(EntityId(9)), Ok(false));
        assert_eq!(world.body_transform(EntityId(9), 0), None);
    }

    #[test]
    fn removal_with_live_constraint_is_refused() {
        let mut world = zero_gravity();
        let door = Entity::new(EntityId(1)).with_physics(ShapeDescriptor::cuboid(Vec3::new(0.5, 1.2, 0.06)));
        world.register(&door, 5.0, BodyFlags::NONE);
        let handle = world
            .add_constraint(EntityId(1), &ConstraintSpec::hinge_to_world(Vec3::ZERO, Quat::IDENTITY), 0)
            .unwrap();

        assert_eq!(
            world.remove(EntityId(1)),
            Err(PhysicsError::LiveConstraints {
                entity: EntityId(1),
                count: 1
            })
        );
        assert!(world.is_registered(EntityId(1)));
        assert_eq!(world.body_count(), 1);

        assert!(world.remove_constraint(handle));
        assert_eq!(world.remove(EntityId(1)), Ok(true));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn reset_releases_everything() {
        let mut world = zero_gravity();
        let a = ball(1, 0.2, Vec3::ZERO);
        let b = Entity::new(EntityId(2))
            .with_geometry(Geometry::sphere(0.1))
            .with_instances(InstanceBuffer::from_matrices(vec![
                Mat4::from_translation(Vec3::X),
                Mat4::from_translation(Vec3::Y),
            ]));
        let floor = Entity::new(EntityId(3)).with_geometry(Geometry::cuboid(10.0, 0.2, 10.0));
        world.register(&a, 1.0, BodyFlags::NONE);
        world.register(&b, 1.0, BodyFlags::trigger());
        world.register(&floor, 0.0, BodyFlags::NONE);
        world.add_constraint(EntityId(1), &ConstraintSpec::point_to_world(Vec3::ZERO), 0);
        world.add_constraint(
            EntityId(1),
            &ConstraintSpec::point_between(EntityId(2), 1, Vec3::ZERO, Vec3::ZERO),
            0,
        );
        world.set_contact_handler(EntityId(2), |_, _| {});

        assert_eq!(world.body_count(), 4);
        assert_eq!(world.engine_body_count(), 5);
        assert_eq!(world.constraint_count(), 2);
        assert_eq!(world.shape_count(), 3);

        world.reset();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.engine_body_count(), 0);
        assert_eq!(world.constraint_count(), 0);
        assert_eq!(world.shape_count(), 0);
        assert_eq!(world.sim.colliders.len(), 0);
        assert_eq!(world.sim.impulse_joints.len(), 0);
    }

    #[test]
    fn world_is_reusable_after_reset() {
        let mut world = zero_gravity();
        let mut scene = Scene::new();
        let e = ball(1, 0.2, Vec3::ZERO);
        for _ in 0..3 {
            world.register(&e, 1.0, BodyFlags::NONE);
            assert_eq!(world.body_count(), 1);
            world.reset();
        }
        scene.spawn(e.clone());
        world.register(&e, 1.0, BodyFlags::NONE);
        let start = Instant::now();
        assert_eq!(world.tick(&mut scene, start), 0);
        assert_eq!(world.tick(&mut scene, start + FRAME), 1);
    }

    #[test]
    fn queued_commands_run_on_next_tick() {
        let mut world = zero_gravity();
        let mut scene = Scene::new();
        let e = ball(1, 0.2, Vec3::ZERO);
        world.register(&e, 1.0, BodyFlags::NONE);
        scene.spawn(e);

        world
            .commands()
            .set_position(EntityId(1), Vec3::new(2.0, 0.0, 0.0), 0);
        assert_eq!(world.body_transform(EntityId(1), 0).unwrap().0, Vec3::ZERO);

        world.tick(&mut scene, Instant::now());
        let (pos, _) = world.body_transform(EntityId(1), 0).unwrap();
        assert!((pos.x - 2.0).abs() < 1e-6);
        assert!(world.commands().is_empty());
    }

    #[test]
    fn queued_constraint_handle_is_usable() {
        let mut world = zero_gravity();
        let mut scene = Scene::new();
        world.register(&ball(1, 0.2, Vec3::ZERO), 1.0, BodyFlags::NONE);

        let handle = world
            .commands()
            .add_constraint(EntityId(1), ConstraintSpec::point_to_world(Vec3::ZERO), 0);
        assert_eq!(world.constraint_count(), 0);
        world.tick(&mut scene, Instant::now());
        assert_eq!(world.constraint_count(), 1);
        assert!(world.remove_constraint(handle));
        assert!(!world.remove_constraint(handle));
    }
}
