//! # Entity Management
//!
//! An entity is an immutable id plus a map of named components. It also
//! remembers which systems currently track it, and reports changes of its
//! component set to the container it is attached to.

use std::collections::HashMap;
use std::fmt;

use super::component::{merge_shallow, ComponentData, ComponentDescriptor};
use super::dirty::SharedDirtyQueue;
use super::system::{SystemId, Systems};
use crate::config::DuplicateComponentPolicy;
use crate::error::{EcsError, EcsResult};
use crate::uid::{self, UidGenerator};

/// Unique identifier for an entity.
///
/// Usually produced by a [`UidGenerator`], but any caller-chosen number is
/// accepted. Uniqueness is only enforced by the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a new entity takes its id from.
#[derive(Debug)]
pub enum IdSource<'a> {
    /// Caller-assigned id.
    Explicit(EntityId),
    /// Next id of the given generator.
    Generator(&'a mut UidGenerator),
    /// Next id of the process-wide default generator.
    Default,
}

impl IdSource<'_> {
    fn resolve(self) -> EntityId {
        match self {
            Self::Explicit(id) => id,
            Self::Generator(generator) => generator.next(),
            Self::Default => uid::next_default_id(),
        }
    }
}

/// Back-reference to the owning container.
#[derive(Debug)]
struct ContainerLink {
    queue: SharedDirtyQueue,
    policy: DuplicateComponentPolicy,
}

/// An entity: id, components and system memberships.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tessera_core::{component_data, Entity, EntityId};
///
/// let mut entity = Entity::with_id(EntityId::new(42));
/// entity.add_component("pos", Some(component_data(json!({"x": 1, "y": 2})))).unwrap();
/// entity.update_component("pos", component_data(json!({"y": 5, "z": 9}))).unwrap();
///
/// assert_eq!(entity.component("pos").unwrap()["y"], 5);
/// ```
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    components: HashMap<String, ComponentData>,
    systems: Vec<SystemId>,
    dirty: bool,
    link: Option<ContainerLink>,
}

impl Entity {
    /// Creates an entity from an id source and initial components.
    ///
    /// Each descriptor contributes one component. When two descriptors share
    /// a name the last one wins.
    #[must_use]
    pub fn spawn(source: IdSource<'_>, components: &[ComponentDescriptor]) -> Self {
        let mut entity = Self {
            id: source.resolve(),
            components: HashMap::with_capacity(components.len()),
            systems: Vec::new(),
            dirty: false,
            link: None,
        };
        entity.insert_descriptors(components);
        entity
    }

    /// Creates an empty entity with an id from the default generator.
    #[must_use]
    pub fn new() -> Self {
        Self::spawn(IdSource::Default, &[])
    }

    /// Creates an empty entity with a caller-assigned id.
    #[must_use]
    pub fn with_id(id: EntityId) -> Self {
        Self::spawn(IdSource::Explicit(id), &[])
    }

    /// Creates an empty entity with the next id of `generator`.
    #[must_use]
    pub fn from_generator(generator: &mut UidGenerator) -> Self {
        Self::spawn(IdSource::Generator(generator), &[])
    }

    /// Adds the components described by `descriptors`.
    ///
    /// Meant for construction; on an attached entity prefer
    /// [`add_component`](Self::add_component).
    #[must_use]
    pub fn with_components(mut self, descriptors: &[ComponentDescriptor]) -> Self {
        self.insert_descriptors(descriptors);
        self.set_dirty();
        self
    }

    fn insert_descriptors(&mut self, descriptors: &[ComponentDescriptor]) {
        for descriptor in descriptors {
            self.components
                .insert(descriptor.name().to_owned(), descriptor.instantiate());
        }
    }

    /// The entity id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// All components by name.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &HashMap<String, ComponentData> {
        &self.components
    }

    /// A component by name.
    #[inline]
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentData> {
        self.components.get(name)
    }

    /// Mutable access to a component's data.
    ///
    /// Editing fields never changes membership, so this does not mark the
    /// entity dirty.
    #[inline]
    pub fn component_mut(&mut self, name: &str) -> Option<&mut ComponentData> {
        self.components.get_mut(name)
    }

    /// Checks if this entity has a component.
    #[inline]
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Systems currently tracking this entity, in the order they added it.
    #[inline]
    #[must_use]
    pub fn systems(&self) -> &[SystemId] {
        &self.systems
    }

    /// Checks if the given system currently tracks this entity.
    #[inline]
    #[must_use]
    pub fn is_member_of(&self, system: SystemId) -> bool {
        self.systems.contains(&system)
    }

    /// Whether memberships are waiting for reconciliation.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the entity belongs to a container.
    #[inline]
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    /// Adds a component, an empty one when `data` is `None`, and marks the
    /// entity dirty.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if the entity is attached to a
    /// container configured with [`DuplicateComponentPolicy::Reject`] and the
    /// name is already present. Detached entities always overwrite.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        data: Option<ComponentData>,
    ) -> EcsResult<()> {
        let name = name.into();

        let rejects = self
            .link
            .as_ref()
            .is_some_and(|link| link.policy == DuplicateComponentPolicy::Reject);
        if rejects && self.components.contains_key(&name) {
            return Err(EcsError::DuplicateComponent {
                entity: self.id,
                name,
            });
        }

        self.components.insert(name, data.unwrap_or_default());
        self.set_dirty();
        Ok(())
    }

    /// Merges `data` field by field into a component (not recursively).
    ///
    /// If the component does not exist it is added, exactly like
    /// [`add_component`](Self::add_component). Merging into an existing
    /// component leaves the component set unchanged and does not mark the
    /// entity dirty.
    ///
    /// # Errors
    ///
    /// Only through the [`add_component`](Self::add_component) path.
    pub fn update_component(&mut self, name: &str, data: ComponentData) -> EcsResult<()> {
        match self.components.get_mut(name) {
            Some(component) => {
                merge_shallow(component, data);
                Ok(())
            }
            None => self.add_component(name, Some(data)),
        }
    }

    /// Applies [`update_component`](Self::update_component) to each entry, in
    /// iteration order. Stops at the first error.
    ///
    /// # Errors
    ///
    /// See [`update_component`](Self::update_component).
    pub fn update_components<I, K>(&mut self, updates: I) -> EcsResult<()>
    where
        I: IntoIterator<Item = (K, ComponentData)>,
        K: AsRef<str>,
    {
        for (name, data) in updates {
            self.update_component(name.as_ref(), data)?;
        }
        Ok(())
    }

    /// Removes a component and marks the entity dirty. No-op if absent.
    pub fn remove_component(&mut self, name: &str) -> Option<ComponentData> {
        let removed = self.components.remove(name)?;
        self.set_dirty();
        Some(removed)
    }

    /// Queues the entity for reconciliation.
    ///
    /// Does nothing if the entity is already dirty or not attached to a
    /// container, so the entity is queued at most once.
    pub fn set_dirty(&mut self) {
        if self.dirty {
            return;
        }
        let Some(link) = &self.link else {
            return;
        };

        self.dirty = true;
        link.queue.lock().push(self.id);
    }

    /// Leaves every system tracking this entity, running their `exit` hooks.
    ///
    /// Iterates over a snapshot of the membership list, so no system is
    /// skipped while the list shrinks. Calling it again is a no-op.
    pub fn dispose(&mut self, systems: &mut Systems) {
        let memberships = self.systems.clone();
        for id in memberships {
            match systems.get_mut(id) {
                Some(runner) => {
                    runner.remove_entity(self);
                }
                // system no longer reachable, just forget it
                None => {
                    self.remove_system(id);
                }
            }
        }
    }

    pub(crate) fn attach(&mut self, queue: SharedDirtyQueue, policy: DuplicateComponentPolicy) {
        self.link = Some(ContainerLink { queue, policy });
        self.dirty = false;
        self.set_dirty();
    }

    pub(crate) fn detach(&mut self) {
        self.link = None;
        self.dirty = false;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn add_system(&mut self, system: SystemId) {
        if !self.systems.contains(&system) {
            self.systems.push(system);
        }
    }

    pub(crate) fn remove_system(&mut self, system: SystemId) -> bool {
        if let Some(index) = self.systems.iter().position(|&id| id == system) {
            self.systems.remove(index);
            true
        } else {
            false
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}
