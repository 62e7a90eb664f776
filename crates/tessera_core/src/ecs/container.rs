//! # ECS Container
//!
//! The central container for all entities and systems. It drives the tick
//! loop and keeps system membership in line with each entity's components.
//!
//! ## Reconciliation
//!
//! Testing every entity against every system each tick does not scale, so
//! membership is reconciled lazily:
//!
//! 1. Adding or removing a component marks the entity dirty and queues it.
//! 2. Right before the first system runs in a tick, the queued batch is
//!    tested against every system in registration order, adding and removing
//!    memberships where `test` disagrees with the current state.
//! 3. Entities dirtied while that batch is processed wait for the next drain.
//!
//! Hooks reach other entities through [`Commands`](super::Commands). Each
//! runner's buffer is applied right after the pass that filled it, so the
//! targets are dirtied then and reconciled on the next drain.
//!
//! Registering a system is the one eager path: it is tested against every
//! existing entity immediately.

use std::fmt;
use std::sync::Arc;

use super::dirty::{DirtyQueue, SharedDirtyQueue};
use super::entity::{Entity, EntityId};
use super::storage::Entities;
use super::system::{SystemId, SystemRunner, Systems};
use crate::clock::{Clock, MonotonicClock};
use crate::config::{EcsConfig, FrequencyGate};
use crate::error::{EcsError, EcsResult};

/// What happened during one [`Ecs::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickStats {
    /// Index of the tick, starting at 0.
    pub tick: u64,
    /// Milliseconds since the previous tick.
    pub elapsed: f64,
    /// Number of systems whose update pass ran.
    pub systems_run: usize,
    /// Number of dirty entities reconciled before the first pass.
    pub reconciled: usize,
    /// Number of deferred commands recorded by update passes and applied.
    pub commands: usize,
}

/// The ECS container - owner of all entities and systems.
///
/// # Example
///
/// ```rust
/// use tessera_core::{Ecs, Entity, System, SystemRunner};
///
/// struct Living;
///
/// impl System for Living {
///     fn test(&self, entity: &Entity) -> bool {
///         entity.has_component("hp")
///     }
/// }
///
/// let mut ecs = Ecs::new();
/// let living = ecs.add_system(SystemRunner::new(Living));
/// let id = ecs.add_entity(Entity::new()).unwrap();
///
/// ecs.get_entity_mut(id).unwrap().add_component("hp", None).unwrap();
/// ecs.update();
///
/// assert!(ecs.system(living).unwrap().contains(id));
/// ```
pub struct Ecs {
    entities: Entities,
    systems: Systems,
    /// Pending dirty entities, shared with attached entities.
    dirty: SharedDirtyQueue,
    /// Second buffer of the dirty queue, holding the batch being drained.
    batch: Vec<EntityId>,
    tick: u64,
    last_tick: f64,
    clock: Box<dyn Clock>,
    config: EcsConfig,
}

impl Ecs {
    /// Creates an empty container with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EcsConfig::default())
    }

    /// Creates an empty container.
    #[must_use]
    pub fn with_config(config: EcsConfig) -> Self {
        let clock = MonotonicClock::new();
        Self {
            entities: Entities::new(),
            systems: Systems::new(),
            dirty: DirtyQueue::shared(),
            batch: Vec::new(),
            tick: 0,
            last_tick: clock.now(),
            clock: Box::new(clock),
            config,
        }
    }

    /// Replaces the time source. The previous-tick timestamp is reset to the
    /// new clock's current time.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.last_tick = clock.now();
        self.clock = Box::new(clock);
        self
    }

    /// The configuration this container was created with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EcsConfig {
        &self.config
    }

    /// Number of completed ticks.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Number of entities waiting for reconciliation.
    #[must_use]
    pub fn dirty_len(&self) -> usize {
        self.dirty.lock().len()
    }

    /// All entities, in insertion order.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &Entities {
        &self.entities
    }

    /// All systems, in registration order.
    #[inline]
    #[must_use]
    pub const fn systems(&self) -> &Systems {
        &self.systems
    }

    /// A system by id.
    #[must_use]
    pub fn system(&self, id: SystemId) -> Option<&SystemRunner> {
        self.systems.get(id)
    }

    /// A system by id, mutably (to enable or disable it).
    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut SystemRunner> {
        self.systems.get_mut(id)
    }

    /// Gets an entity by id.
    #[must_use]
    pub fn get_entity_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Gets a mutable entity by id.
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Adds an entity. Its memberships are evaluated on the next drain.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateEntity`] if an entity with the same id is
    /// already registered; the entity is dropped.
    pub fn add_entity(&mut self, mut entity: Entity) -> EcsResult<EntityId> {
        let id = entity.id();
        if self.entities.contains(id) {
            return Err(EcsError::DuplicateEntity(id));
        }

        entity.attach(Arc::clone(&self.dirty), self.config.duplicate_components);
        self.entities.insert(entity);
        tracing::debug!(entity = %id, "entity added");

        Ok(id)
    }

    /// Removes an entity, running `exit` for every system tracking it.
    ///
    /// The entity is disposed before it is purged from the dirty queue, so no
    /// system keeps a removed entity. Returns the detached entity, or `None`
    /// if the id is unknown.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let mut entity = self.entities.remove(id)?;

        entity.dispose(&mut self.systems);
        self.dirty.lock().purge(id);
        entity.detach();
        self.apply_commands();

        tracing::debug!(entity = %id, "entity removed");
        Some(entity)
    }

    /// Removes an entity by raw numeric id. See [`remove_entity`](Self::remove_entity).
    pub fn remove_entity_by_id(&mut self, id: u64) -> Option<Entity> {
        self.remove_entity(EntityId::new(id))
    }

    /// Registers a system and immediately adds every existing entity that
    /// passes its test.
    pub fn add_system(&mut self, mut runner: SystemRunner) -> SystemId {
        for entity in self.entities.iter_mut() {
            if runner.test(entity) {
                runner.add_entity(entity);
            }
        }
        runner.apply_commands(&mut self.entities);

        let id = runner.id();
        tracing::debug!(
            system = %id,
            name = runner.name(),
            frequency = runner.frequency(),
            members = runner.len(),
            "system added"
        );
        self.systems.push(runner);
        id
    }

    /// Unregisters a system, running `exit` for every entity it tracked.
    ///
    /// The emptied runner is handed back so it can be registered again.
    pub fn remove_system(&mut self, id: SystemId) -> Option<SystemRunner> {
        let mut runner = self.systems.remove(id)?;
        runner.dispose(&mut self.entities);
        runner.apply_commands(&mut self.entities);

        tracing::debug!(system = %id, name = runner.name(), "system removed");
        Some(runner)
    }

    /// Reconciles every queued entity against every system.
    ///
    /// The queue is swapped out before processing: entities dirtied by hooks
    /// during this pass, including the entity being reconciled, are left for
    /// the next drain. Returns the number of entities processed.
    pub fn clean_dirty_entities(&mut self) -> usize {
        let mut batch = std::mem::take(&mut self.batch);
        self.dirty.lock().swap_into(&mut batch);

        for &id in &batch {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            entity.clear_dirty();

            for runner in self.systems.iter_mut() {
                let member = entity.is_member_of(runner.id());
                let eligible = runner.test(entity);

                if eligible && !member {
                    runner.add_entity(entity);
                } else if member && !eligible {
                    runner.remove_entity(entity);
                }
            }
        }

        let reconciled = batch.len();
        tracing::trace!(reconciled, "dirty entities cleaned");

        batch.clear();
        self.batch = batch;

        self.apply_commands();
        reconciled
    }

    /// Applies every runner's recorded commands, in registration order.
    fn apply_commands(&mut self) -> usize {
        let mut applied = 0;
        for runner in self.systems.iter_mut() {
            applied += runner.apply_commands(&mut self.entities);
        }
        applied
    }

    /// Runs one tick.
    ///
    /// Systems run in registration order. A system that is not due on this
    /// tick stops the iteration: no later system runs either, unless the
    /// container is configured with [`FrequencyGate::SkipSystem`]. Disabled
    /// systems are skipped. The dirty queue is drained once, right before the
    /// first system that runs.
    pub fn update(&mut self) -> TickStats {
        let now = self.clock.now();
        let mut stats = TickStats {
            tick: self.tick,
            elapsed: now - self.last_tick,
            ..TickStats::default()
        };
        let mut drained = false;

        for index in 0..self.systems.len() {
            let Some(runner) = self.systems.by_index_mut(index) else {
                break;
            };

            if !runner.is_due(self.tick) {
                match self.config.frequency_gate {
                    FrequencyGate::HaltRemaining => break,
                    FrequencyGate::SkipSystem => continue,
                }
            }
            if !runner.is_enabled() {
                continue;
            }

            if !drained {
                drained = true;
                if self.dirty_len() > 0 {
                    stats.reconciled = self.clean_dirty_entities();
                }
            }

            if let Some(runner) = self.systems.by_index_mut(index) {
                runner.update_all(&mut self.entities, stats.elapsed);
                stats.commands += runner.apply_commands(&mut self.entities);
                stats.systems_run += 1;
            }
        }

        self.tick += 1;
        self.last_tick = now;

        tracing::trace!(
            tick = stats.tick,
            elapsed = stats.elapsed,
            systems_run = stats.systems_run,
            reconciled = stats.reconciled,
            commands = stats.commands,
            "tick"
        );
        stats
    }
}

impl Default for Ecs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ecs")
            .field("entities", &self.entities.len())
            .field("systems", &self.systems)
            .field("dirty", &self.dirty_len())
            .field("tick", &self.tick)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
