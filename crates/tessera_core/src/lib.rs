//! # TESSERA Core Engine
//!
//! Entity Component System whose hard part is membership: keeping the set of
//! systems tracking each entity equal to the systems whose `test` accepts it,
//! without re-testing every entity against every system each tick.
//!
//! ## Architecture Rules
//!
//! 1. **Deferred reconciliation** - component set changes queue the entity;
//!    the queue is drained once per tick, before the first system runs
//! 2. **Single-threaded ticks** - `update()` runs to completion, hooks run
//!    synchronously and their changes wait for the next drain
//! 3. **Salted ids** - independent generators never collide
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{Ecs, Entity, System, SystemRunner};
//!
//! struct Everything;
//!
//! impl System for Everything {
//!     fn test(&self, _entity: &Entity) -> bool {
//!         true
//!     }
//! }
//!
//! let mut ecs = Ecs::new();
//! let system = ecs.add_system(SystemRunner::new(Everything).with_frequency(2));
//! let entity = ecs.add_entity(Entity::new()).unwrap();
//!
//! ecs.update();
//! assert_eq!(ecs.system(system).unwrap().entities(), &[entity]);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod config;
pub mod ecs;
pub mod error;
pub mod uid;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{DuplicateComponentPolicy, EcsConfig, FrequencyGate};
pub use ecs::{
    component_data, Command, Commands, ComponentData, ComponentDefaults, ComponentDescriptor,
    DirtyQueue, Ecs, Entities, Entity, EntityId, IdSource, System, SystemId, SystemRunner, Systems,
    TickStats,
};
pub use error::{EcsError, EcsResult};
pub use uid::{GeneratorRegistry, UidGenerator};
