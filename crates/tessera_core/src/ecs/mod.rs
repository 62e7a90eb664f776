//! # Entity Component System
//!
//! Entities carry named components, systems claim the entities they care
//! about, and the container keeps both sides consistent.
//!
//! ## Design Philosophy
//!
//! - Membership is reconciled lazily, from a queue of dirty entities
//! - Component data is opaque to the core; only presence matters
//! - Systems are trait objects: the core owns their bookkeeping, the game
//!   owns their logic

mod commands;
mod component;
mod container;
mod dirty;
mod entity;
mod storage;
mod system;

pub use commands::{Command, Commands};
pub use component::{component_data, ComponentData, ComponentDefaults, ComponentDescriptor};
pub use container::{Ecs, TickStats};
pub use dirty::DirtyQueue;
pub use entity::{Entity, EntityId, IdSource};
pub use storage::Entities;
pub use system::{System, SystemId, SystemRunner, Systems};
