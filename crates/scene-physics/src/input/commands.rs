use glam::Vec3;

use crate::api::types::{ConstraintHandle, EntityId};
use crate::core::constraints::ConstraintSpec;

/// World mutations that cannot run while the world is dispatching contacts.
/// Generic: no game-specific semantics.
#[derive(Debug, Clone)]
pub enum PhysicsCommand {
    /// Teleport one body, zeroing its velocity.
    SetPosition {
        entity: EntityId,
        position: Vec3,
        index: usize,
    },
    ApplyImpulse {
        entity: EntityId,
        impulse: Vec3,
        index: usize,
    },
    /// Create a constraint under a handle reserved when the command was queued.
    AddConstraint {
        handle: ConstraintHandle,
        entity: EntityId,
        spec: ConstraintSpec,
        index: usize,
    },
    RemoveConstraint(ConstraintHandle),
    RemoveEntity(EntityId),
}

/// A queue of deferred world mutations.
/// Contact handlers write into it; the world drains it at the start of the next tick.
pub struct CommandQueue {
    commands: Vec<PhysicsCommand>,
    /// Next constraint id. Never reset, so handles stay unique for the world's lifetime.
    next_constraint: u64,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            commands: Vec::with_capacity(16),
            next_constraint: 1,
        }
    }

    /// Push a raw command.
    pub fn push(&mut self, command: PhysicsCommand) {
        self.commands.push(command);
    }

    pub fn set_position(&mut self, entity: EntityId, position: Vec3, index: usize) {
        self.push(PhysicsCommand::SetPosition {
            entity,
            position,
            index,
        });
    }

    pub fn apply_impulse(&mut self, entity: EntityId, impulse: Vec3, index: usize) {
        self.push(PhysicsCommand::ApplyImpulse {
            entity,
            impulse,
            index,
        });
    }

    /// Queue a constraint. The returned handle is valid for `remove_constraint`
    /// once the command has run; if it fails to apply the handle stays stale.
    pub fn add_constraint(
        &mut self,
        entity: EntityId,
        spec: ConstraintSpec,
        index: usize,
    ) -> ConstraintHandle {
        let handle = self.reserve_constraint_handle();
        self.push(PhysicsCommand::AddConstraint {
            handle,
            entity,
            spec,
            index,
        });
        handle
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) {
        self.push(PhysicsCommand::RemoveConstraint(handle));
    }

    pub fn remove_entity(&mut self, entity: EntityId) {
        self.push(PhysicsCommand::RemoveEntity(entity));
    }

    pub(crate) fn reserve_constraint_handle(&mut self) -> ConstraintHandle {
        let handle = ConstraintHandle(self.next_constraint);
        self.next_constraint += 1;
        handle
    }

    /// Drain all pending commands in the order they were queued.
    pub fn drain(&mut self) -> Vec<PhysicsCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Iterate over pending commands without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &PhysicsCommand> {
        self.commands.iter()
    }

    /// Drop pending commands. Handle numbering continues.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain_in_order() {
        let mut q = CommandQueue::new();
        q.apply_impulse(EntityId(1), Vec3::Y, 0);
        q.remove_entity(EntityId(2));
        assert_eq!(q.len(), 2);

        let commands = q.drain();
        assert!(matches!(commands[0], PhysicsCommand::ApplyImpulse { entity: EntityId(1), .. }));
        assert!(matches!(commands[1], PhysicsCommand::RemoveEntity(EntityId(2))));
        assert!(q.is_empty());
    }

    #[test]
    fn constraint_handles_are_never_reused() {
        let mut q = CommandQueue::new();
        let a = q.add_constraint(EntityId(1), ConstraintSpec::point_to_world(Vec3::ZERO), 0);
        q.clear();
        let b = q.reserve_constraint_handle();
        assert_ne!(a, b);
        assert!(q.is_empty());
    }
}
