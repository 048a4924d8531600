use std::collections::HashMap;

use crate::api::types::EntityId;
use crate::components::entity::Entity;

/// Caller-owned entity storage: a flat Vec plus an id index.
///
/// The physics world borrows it during a tick and looks up every registered entity by id,
/// so lookups stay O(1). Ids are unique; spawning an existing id replaces that entity.
pub struct Scene {
    entities: Vec<Entity>,
    slots: HashMap<EntityId, usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a scene with a specific entity capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Add an entity. Returns the entity it replaced, if the id was taken.
    pub fn spawn(&mut self, entity: Entity) -> Option<Entity> {
        match self.slots.get(&entity.id) {
            Some(&slot) => Some(std::mem::replace(&mut self.entities[slot], entity)),
            None => {
                self.slots.insert(entity.id, self.entities.len());
                self.entities.push(entity);
                None
            }
        }
    }

    /// Remove an entity by ID. Returns the removed entity if found.
    /// The entity's bodies are not touched; unregister it from physics as well.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.remove(&id)?;
        let removed = self.entities.swap_remove(slot);
        if let Some(moved) = self.entities.get(slot) {
            self.slots.insert(moved.id, slot);
        }
        Some(removed)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(&id).and_then(|&slot| self.entities.get(slot))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = *self.slots.get(&id)?;
        self.entities.get_mut(slot)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Iterate over all entities.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterate mutably. Entity ids must not be changed through this.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.slots.clear();
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn spawn_and_get() {
        let mut scene = Scene::new();
        let id = EntityId(1);
        scene.spawn(Entity::new(id).with_position(Vec3::new(1.0, 2.0, 3.0)));
        let e = scene.get(id).unwrap();
        assert_eq!(e.position, Vec3::new(1.0, 2.0, 3.0));
        assert!(scene.contains(id));
    }

    #[test]
    fn spawn_same_id_replaces() {
        let mut scene = Scene::new();
        scene.spawn(Entity::new(EntityId(1)).with_position(Vec3::X));
        let old = scene.spawn(Entity::new(EntityId(1)).with_position(Vec3::Y));
        assert_eq!(old.unwrap().position, Vec3::X);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.get(EntityId(1)).unwrap().position, Vec3::Y);
    }

    #[test]
    fn despawn_keeps_index_consistent() {
        let mut scene = Scene::new();
        for i in 0..4 {
            scene.spawn(Entity::new(EntityId(i)));
        }
        assert!(scene.despawn(EntityId(1)).is_some());
        assert!(scene.despawn(EntityId(1)).is_none());
        assert_eq!(scene.len(), 3);
        // The last entity was swapped into the freed slot.
        for i in [0, 2, 3] {
            assert_eq!(scene.get(EntityId(i)).unwrap().id, EntityId(i));
        }
        scene.get_mut(EntityId(3)).unwrap().position = Vec3::ONE;
        assert_eq!(scene.get(EntityId(3)).unwrap().position, Vec3::ONE);
    }
}
