//! # Entity Storage
//!
//! Ordered entity storage owned by the container.
//!
//! The storage uses a dense array plus an id index:
//! - Entities stay in insertion order for iteration
//! - Lookup by id is O(1) via the index
//! - Removal shifts later entities down and patches their index entries

use std::collections::HashMap;

use super::entity::{Entity, EntityId};

/// Entities in insertion order, unique by id.
#[derive(Debug, Default)]
pub struct Entities {
    /// The dense array of entities.
    entities: Vec<Entity>,
    /// Position of each entity in `entities`.
    index: HashMap<EntityId, usize>,
}

impl Entities {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks if an entity with this id is stored.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Gets an entity by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&slot| &self.entities[slot])
    }

    /// Gets a mutable entity by id.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = *self.index.get(&id)?;
        self.entities.get_mut(slot)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterates mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// Appends an entity whose id is not stored yet.
    pub(crate) fn insert(&mut self, entity: Entity) {
        debug_assert!(!self.contains(entity.id()), "entity {} stored twice", entity.id());
        self.index.insert(entity.id(), self.entities.len());
        self.entities.push(entity);
    }

    /// Takes an entity out, preserving the order of the others.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.index.remove(&id)?;
        let entity = self.entities.remove(slot);

        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }

        Some(entity)
    }
}
