use std::time::Instant;

use glam::Vec3;

use crate::api::config::PhysicsConfig;
use crate::api::error::PhysicsError;
use crate::api::types::{BodyFlags, ConstraintHandle, ContactEvent, EntityHandle, EntityId};
use crate::components::entity::Entity;
use crate::core::constraints::ConstraintSpec;
use crate::core::scene::Scene;
use crate::core::time::TickScheduler;
use crate::core::world::PhysicsWorld;
use crate::input::commands::CommandQueue;

/// Facade used by world and gameplay code.
///
/// Holds the world (once initialized) and the fixed-rate scheduler that drives it. Until
/// `initialize` succeeds every mutation is a no-op.
pub struct Physics {
    config: PhysicsConfig,
    world: Option<PhysicsWorld>,
    scheduler: TickScheduler,
    init_failure_reported: bool,
}

impl Physics {
    pub fn new(config: PhysicsConfig) -> Self {
        let scheduler = TickScheduler::new(config.tick_rate);
        Self {
            config,
            world: None,
            scheduler,
            init_failure_reported: false,
        }
    }

    /// Acquire the world, creating it on first call. Repeated calls return the same world.
    ///
    /// A failure is logged once; the error is returned on every call.
    pub fn initialize(&mut self) -> Result<&mut PhysicsWorld, PhysicsError> {
        let world = match self.world.take() {
            Some(world) => world,
            None => PhysicsWorld::new(&self.config).map_err(|err| {
                if !self.init_failure_reported {
                    log::error!("physics initialization failed: {}", err);
                    self.init_failure_reported = true;
                }
                err
            })?,
        };
        Ok(self.world.insert(world))
    }

    /// Replace the configuration. Only allowed before a world exists.
    pub fn set_config(&mut self, config: PhysicsConfig) -> bool {
        if self.world.is_some() {
            log::warn!("physics config ignored: world already initialized");
            return false;
        }
        self.scheduler = TickScheduler::new(config.tick_rate);
        self.config = config;
        self.init_failure_reported = false;
        true
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.world.is_some()
    }

    pub fn world(&self) -> Option<&PhysicsWorld> {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.world.as_mut()
    }

    // -- Registry --

    /// Register an entity with a mass (0 = static or kinematic) and flags.
    pub fn register_entity(&mut self, entity: &Entity, mass: f32, flags: BodyFlags) -> Option<EntityHandle> {
        self.world.as_mut()?.register(entity, mass, flags)
    }

    /// Remove an entity's bodies. Unknown entities (or no world) give `Ok(false)`.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<bool, PhysicsError> {
        match self.world.as_mut() {
            Some(world) => world.remove(id),
            None => Ok(false),
        }
    }

    // -- Bodies --

    /// Teleport one body of an entity; its velocity is zeroed.
    pub fn set_position(&mut self, id: EntityId, position: Vec3, index: usize) {
        if let Some(world) = self.world.as_mut() {
            world.set_position(id, position, index);
        }
    }

    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec3, index: usize) {
        if let Some(world) = self.world.as_mut() {
            world.apply_impulse(id, impulse, index);
        }
    }

    // -- Constraints --

    pub fn add_constraint(
        &mut self,
        id: EntityId,
        spec: &ConstraintSpec,
        index: usize,
    ) -> Option<ConstraintHandle> {
        self.world.as_mut()?.add_constraint(id, spec, index)
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        self.world
            .as_mut()
            .map(|world| world.remove_constraint(handle))
            .unwrap_or(false)
    }

    // -- Contacts --

    /// Install the `on_contact` callback of a trigger entity.
    pub fn set_contact_handler<F>(&mut self, id: EntityId, handler: F)
    where
        F: FnMut(&ContactEvent, &mut CommandQueue) + 'static,
    {
        if let Some(world) = self.world.as_mut() {
            world.set_contact_handler(id, handler);
        }
    }

    // -- Lifecycle --

    /// Full teardown, safe to call before loading a new world. The world stays usable.
    pub fn reset(&mut self) {
        if let Some(world) = self.world.as_mut() {
            world.reset();
        }
        self.scheduler.restart();
    }

    /// Poll the fixed-rate scheduler and run a tick if one is due.
    /// Call from the host loop as often as convenient. Returns `true` when a tick ran.
    pub fn update(&mut self, scene: &mut Scene, now: Instant) -> bool {
        let Some(world) = self.world.as_mut() else {
            return false;
        };
        if !self.scheduler.poll(now) {
            return false;
        }
        world.tick(scene, now);
        true
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
