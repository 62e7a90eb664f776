//! # Systems
//!
//! A system claims the entities it is interested in through [`System::test`]
//! and updates them once per eligible tick.
//!
//! The game implements the [`System`] trait; the core wraps it in a
//! [`SystemRunner`] that owns the bookkeeping: the member list, the
//! scheduling state and the buffer of deferred commands its hooks record.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::commands::Commands;
use super::entity::{Entity, EntityId};
use super::storage::Entities;

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier of a [`SystemRunner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SystemId(u64);

impl SystemId {
    fn next() -> Self {
        Self(NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// Game logic of a system.
///
/// Only [`test`](Self::test) is required. Hooks may mutate the entity they
/// are given, and record changes to any other entity in `commands`; the
/// container applies those once the pass is over. Either way, component set
/// changes are reconciled on the next dirty-queue drain, never in the middle
/// of the current pass.
pub trait System {
    /// Whether `entity` should be tracked by this system.
    ///
    /// Must be a pure predicate over the entity.
    fn test(&self, entity: &Entity) -> bool;

    /// Called when an entity starts being tracked.
    fn enter(&mut self, _entity: &mut Entity, _commands: &mut Commands) {}

    /// Called when an entity stops being tracked.
    fn exit(&mut self, _entity: &mut Entity, _commands: &mut Commands) {}

    /// Called once per executed tick, before the entities.
    fn pre_update(&mut self) {}

    /// Called for each tracked entity on every executed tick.
    ///
    /// `elapsed` is the time in milliseconds since the previous tick.
    fn update(&mut self, _entity: &mut Entity, _elapsed: f64, _commands: &mut Commands) {}

    /// Called once per executed tick, after the entities.
    fn post_update(&mut self) {}

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A [`System`] together with its member list and scheduling state.
pub struct SystemRunner {
    id: SystemId,
    frequency: u32,
    enabled: bool,
    entities: Vec<EntityId>,
    /// Changes recorded by the hooks, waiting for the container.
    commands: Commands,
    system: Box<dyn System>,
}

impl SystemRunner {
    /// Wraps a system running every tick.
    #[must_use]
    pub fn new<S: System + 'static>(system: S) -> Self {
        Self::from_boxed(Box::new(system))
    }

    /// Wraps an already boxed system.
    #[must_use]
    pub fn from_boxed(system: Box<dyn System>) -> Self {
        Self {
            id: SystemId::next(),
            frequency: 1,
            enabled: true,
            entities: Vec::new(),
            commands: Commands::new(),
            system,
        }
    }

    /// Runs the system only on ticks that are a multiple of `frequency`.
    /// A frequency of 0 is treated as 1.
    #[must_use]
    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency.max(1);
        self
    }

    /// The runner id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SystemId {
        self.id
    }

    /// The tick divider.
    #[inline]
    #[must_use]
    pub const fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Whether the tick loop runs this system.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Lets the tick loop run this system again.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Skips this system in the tick loop. Membership keeps being tracked.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Whether the system is due on the given tick.
    #[inline]
    #[must_use]
    pub fn is_due(&self, tick: u64) -> bool {
        tick % u64::from(self.frequency) == 0
    }

    /// Tracked entities, in the order they were added.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Number of tracked entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks if an entity is tracked.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    /// Commands recorded by the hooks and not applied yet.
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    /// Name of the wrapped system.
    #[must_use]
    pub fn name(&self) -> &str {
        self.system.name()
    }

    /// The wrapped system.
    #[must_use]
    pub fn system(&self) -> &dyn System {
        self.system.as_ref()
    }

    /// The wrapped system, mutably.
    pub fn system_mut(&mut self) -> &mut dyn System {
        self.system.as_mut()
    }

    /// Evaluates the eligibility predicate.
    #[inline]
    #[must_use]
    pub fn test(&self, entity: &Entity) -> bool {
        self.system.test(entity)
    }

    /// Starts tracking `entity` and runs `enter`.
    ///
    /// Returns `false` without calling `enter` if it was already tracked.
    pub fn add_entity(&mut self, entity: &mut Entity) -> bool {
        if self.contains(entity.id()) {
            return false;
        }

        entity.add_system(self.id);
        self.entities.push(entity.id());
        tracing::trace!(system = %self.id, entity = %entity.id(), "enter");

        self.system.enter(entity, &mut self.commands);
        true
    }

    /// Stops tracking `entity` and runs `exit`.
    ///
    /// Returns `false` without calling `exit` if it was not tracked.
    pub fn remove_entity(&mut self, entity: &mut Entity) -> bool {
        let Some(index) = self.entities.iter().position(|&id| id == entity.id()) else {
            return false;
        };

        entity.remove_system(self.id);
        self.entities.remove(index);
        tracing::trace!(system = %self.id, entity = %entity.id(), "exit");

        self.system.exit(entity, &mut self.commands);
        true
    }

    /// Runs `pre_update`, `update` for every tracked entity, then `post_update`.
    ///
    /// Hooks cannot reach the member list, so it is the same for the whole
    /// pass.
    pub fn update_all(&mut self, entities: &mut Entities, elapsed: f64) {
        let Self {
            system,
            entities: members,
            commands,
            ..
        } = self;

        system.pre_update();
        for &id in members.iter() {
            if let Some(entity) = entities.get_mut(id) {
                system.update(entity, elapsed, commands);
            }
        }
        system.post_update();
    }

    /// Stops tracking every entity, running `exit` for each.
    pub fn dispose(&mut self, entities: &mut Entities) {
        let members = std::mem::take(&mut self.entities);
        for id in members {
            if let Some(entity) = entities.get_mut(id) {
                entity.remove_system(self.id);
                self.system.exit(entity, &mut self.commands);
            }
        }
    }

    /// Applies the recorded commands. Returns the number applied.
    pub(crate) fn apply_commands(&mut self, entities: &mut Entities) -> usize {
        self.commands.apply(entities)
    }
}

impl fmt::Debug for SystemRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRunner")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("frequency", &self.frequency)
            .field("enabled", &self.enabled)
            .field("entities", &self.entities)
            .field("commands", &self.commands.len())
            .finish()
    }
}

/// Registered systems, in registration order.
#[derive(Debug, Default)]
pub struct Systems {
    runners: Vec<SystemRunner>,
}

impl Systems {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Returns `true` if no system is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// A system by id.
    #[must_use]
    pub fn get(&self, id: SystemId) -> Option<&SystemRunner> {
        self.runners.iter().find(|runner| runner.id == id)
    }

    /// A system by id, mutably.
    pub fn get_mut(&mut self, id: SystemId) -> Option<&mut SystemRunner> {
        self.runners.iter_mut().find(|runner| runner.id == id)
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SystemRunner> {
        self.runners.iter()
    }

    /// Iterates mutably in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SystemRunner> {
        self.runners.iter_mut()
    }

    pub(crate) fn push(&mut self, runner: SystemRunner) {
        self.runners.push(runner);
    }

    pub(crate) fn remove(&mut self, id: SystemId) -> Option<SystemRunner> {
        let index = self.runners.iter().position(|runner| runner.id == id)?;
        Some(self.runners.remove(index))
    }

    pub(crate) fn by_index_mut(&mut self, index: usize) -> Option<&mut SystemRunner> {
        self.runners.get_mut(index)
    }
}
