use std::collections::HashMap;

use crate::entity::{Entity, EntityId, EntityType};

/// Live entities in creation order, with a per-type index.
#[derive(Debug, Default)]
pub(crate) struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,
    by_type: HashMap<EntityType, Vec<EntityId>>,
    last_id: u64,
}

impl EntityRegistry {
    /// Hand out the next id. Ids start at 1 and are never reused.
    pub(crate) fn reserve_id(&mut self) -> EntityId {
        self.last_id += 1;
        EntityId(self.last_id)
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        let id = entity.id();
        self.order.push(id);
        self.by_type
            .entry(entity.entity_type())
            .or_default()
            .push(id);
        self.entities.insert(id, entity);
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.order.retain(|e| *e != id);
        if let Some(ids) = self.by_type.get_mut(&entity.entity_type()) {
            ids.retain(|e| *e != id);
        }
        Some(entity)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub(crate) fn ids(&self) -> &[EntityId] {
        &self.order
    }

    pub(crate) fn of_type(&self, entity_type: EntityType) -> &[EntityId] {
        self.by_type
            .get(&entity_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut reg = EntityRegistry::default();
        let a = reg.reserve_id();
        reg.insert(Entity::new(a, EntityType::Trap));
        reg.remove(a);
        let b = reg.reserve_id();
        assert_eq!(a, EntityId(1));
        assert_eq!(b, EntityId(2));
    }

    #[test]
    fn type_index_follows_insert_and_remove() {
        let mut reg = EntityRegistry::default();
        let a = reg.reserve_id();
        let b = reg.reserve_id();
        reg.insert(Entity::new(a, EntityType::Monster));
        reg.insert(Entity::new(b, EntityType::Monster));
        assert_eq!(reg.of_type(EntityType::Monster), &[a, b]);
        assert!(reg.of_type(EntityType::Player).is_empty());

        reg.remove(a);
        assert_eq!(reg.of_type(EntityType::Monster), &[b]);
        assert_eq!(reg.ids(), &[b]);
        assert_eq!(reg.len(), 1);
        assert!(!reg.contains(a));
    }
}
