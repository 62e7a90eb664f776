//! # Deferred Commands
//!
//! Hooks only get mutable access to the entity being processed. Changes to
//! any other entity are recorded in a [`Commands`] buffer and applied by the
//! container once the current pass is over.
//!
//! Applying a command goes through the regular entity operations, so a
//! change to the component set marks the target dirty and it is reconciled
//! on the next drain, never mid-pass.

use super::component::ComponentData;
use super::entity::EntityId;
use super::storage::Entities;

/// A single deferred component change.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// [`Entity::add_component`](crate::Entity::add_component) on the target.
    AddComponent {
        /// Target entity.
        entity: EntityId,
        /// Component name.
        name: String,
        /// Initial data, empty when `None`.
        data: Option<ComponentData>,
    },
    /// [`Entity::update_component`](crate::Entity::update_component) on the target.
    UpdateComponent {
        /// Target entity.
        entity: EntityId,
        /// Component name.
        name: String,
        /// Fields merged into the component.
        data: ComponentData,
    },
    /// [`Entity::remove_component`](crate::Entity::remove_component) on the target.
    RemoveComponent {
        /// Target entity.
        entity: EntityId,
        /// Component name.
        name: String,
    },
}

impl Command {
    /// The entity this command applies to.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::AddComponent { entity, .. }
            | Self::UpdateComponent { entity, .. }
            | Self::RemoveComponent { entity, .. } => *entity,
        }
    }
}

/// Buffer of deferred component changes, in recording order.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Commands, Ecs, Entity, EntityId, System, SystemRunner};
///
/// /// Tags its partner entity while any source entity exists.
/// struct Linker(EntityId);
///
/// impl System for Linker {
///     fn test(&self, entity: &Entity) -> bool {
///         entity.has_component("source")
///     }
///
///     fn update(&mut self, _entity: &mut Entity, _elapsed: f64, commands: &mut Commands) {
///         commands.add_component(self.0, "linked", None);
///     }
/// }
///
/// let mut ecs = Ecs::new();
/// let partner = ecs.add_entity(Entity::new()).unwrap();
/// ecs.add_system(SystemRunner::new(Linker(partner)));
///
/// let source = ecs.add_entity(Entity::new()).unwrap();
/// ecs.get_entity_mut(source).unwrap().add_component("source", None).unwrap();
/// ecs.update();
///
/// assert!(ecs.get_entity_by_id(partner).unwrap().has_component("linked"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Recorded commands, oldest first.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> &[Command] {
        &self.queue
    }

    /// Records a command.
    pub fn push(&mut self, command: Command) {
        self.queue.push(command);
    }

    /// Records adding a component to `entity`.
    pub fn add_component(
        &mut self,
        entity: EntityId,
        name: impl Into<String>,
        data: Option<ComponentData>,
    ) {
        self.push(Command::AddComponent {
            entity,
            name: name.into(),
            data,
        });
    }

    /// Records merging `data` into a component of `entity`.
    pub fn update_component(
        &mut self,
        entity: EntityId,
        name: impl Into<String>,
        data: ComponentData,
    ) {
        self.push(Command::UpdateComponent {
            entity,
            name: name.into(),
            data,
        });
    }

    /// Records removing a component from `entity`.
    pub fn remove_component(&mut self, entity: EntityId, name: impl Into<String>) {
        self.push(Command::RemoveComponent {
            entity,
            name: name.into(),
        });
    }

    /// Applies and clears every recorded command, in recording order.
    ///
    /// Commands targeting an entity that is not stored are dropped. A
    /// command the target refuses (duplicate component under
    /// [`DuplicateComponentPolicy::Reject`](crate::DuplicateComponentPolicy::Reject))
    /// is logged and dropped. Returns the number of commands applied.
    pub(crate) fn apply(&mut self, entities: &mut Entities) -> usize {
        let mut applied = 0;

        for command in self.queue.drain(..) {
            let target = command.entity();
            let Some(entity) = entities.get_mut(target) else {
                tracing::trace!(entity = %target, "command target gone, dropped");
                continue;
            };

            let result = match command {
                Command::AddComponent { name, data, .. } => entity.add_component(name, data),
                Command::UpdateComponent { name, data, .. } => entity.update_component(&name, data),
                Command::RemoveComponent { name, .. } => {
                    entity.remove_component(&name);
                    Ok(())
                }
            };

            match result {
                Ok(()) => applied += 1,
                Err(error) => tracing::warn!(%error, "deferred command refused"),
            }
        }

        applied
    }
}
