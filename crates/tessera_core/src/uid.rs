//! # Unique Id Generation
//!
//! Numeric entity ids that stay unique across independent generators, e.g.
//! one generator per simulation node in a cluster.
//!
//! The id space is partitioned by a salt:
//!
//! ```text
//! id = salt + counter * SALT_SPACE
//! ```
//!
//! Two generators with different salts can never produce the same id. At
//! most [`SALT_SPACE`] generators can be salt-disjoint at once.
//!
//! ## Capacity
//!
//! Both limits wrap around silently instead of failing:
//!
//! - A generator that has produced [`IDS_PER_GENERATOR`] ids restarts its
//!   counter at zero and will repeat ids.
//! - The registry hands out salts `1..SALT_SPACE` and then starts over at 1.
//!   Salt 0 belongs to the default generator and is never handed out.
//!
//! Callers needing strict uniqueness past these limits must track it
//! themselves.

use parking_lot::{Mutex, MutexGuard};

use crate::ecs::EntityId;
use crate::error::{EcsError, EcsResult};

/// Number of distinct salts.
pub const SALT_SPACE: u64 = 10_000;

/// Largest integer that survives a round trip through an IEEE-754 double.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Number of ids a single generator produces before its counter wraps.
pub const IDS_PER_GENERATOR: u64 = MAX_SAFE_INTEGER / SALT_SPACE - 1;

static DEFAULT_GENERATOR: Mutex<UidGenerator> = Mutex::new(UidGenerator::unsalted());

static REGISTRY: Mutex<GeneratorRegistry> = Mutex::new(GeneratorRegistry::new());

/// Salted id generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UidGenerator {
    salt: u64,
    counter: u64,
}

impl UidGenerator {
    const fn unsalted() -> Self {
        Self {
            salt: 0,
            counter: 0,
        }
    }

    /// Creates a generator with an explicit salt.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SaltOutOfRange`] if `salt >= SALT_SPACE`.
    pub fn with_salt(salt: u64) -> EcsResult<Self> {
        Self::with_state(salt, 0)
    }

    /// Resumes a generator at a known counter value.
    ///
    /// Counters at or past [`IDS_PER_GENERATOR`] restart at zero.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SaltOutOfRange`] if `salt >= SALT_SPACE`.
    pub fn with_state(salt: u64, counter: u64) -> EcsResult<Self> {
        if salt >= SALT_SPACE {
            return Err(EcsError::SaltOutOfRange {
                salt,
                space: SALT_SPACE,
            });
        }
        Ok(Self {
            salt,
            counter: if counter >= IDS_PER_GENERATOR { 0 } else { counter },
        })
    }

    /// The salt partitioning this generator's ids.
    #[inline]
    #[must_use]
    pub const fn salt(&self) -> u64 {
        self.salt
    }

    /// Number of ids produced since the last wraparound.
    #[inline]
    #[must_use]
    pub const fn counter(&self) -> u64 {
        self.counter
    }

    /// Produces the next id.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> EntityId {
        let id = self.salt + self.counter * SALT_SPACE;

        self.counter += 1;
        if self.counter >= IDS_PER_GENERATOR {
            tracing::warn!(salt = self.salt, "uid generator exhausted, counter restarts at 0");
            self.counter = 0;
        }

        EntityId::new(id)
    }
}

impl Default for UidGenerator {
    fn default() -> Self {
        Self::unsalted()
    }
}

/// Hands out salts to new generators.
///
/// The process-wide instance backs [`next_salt`] and [`next_generator`];
/// standalone instances are useful when a host wants its own salt allocation.
#[derive(Debug)]
pub struct GeneratorRegistry {
    next: u64,
}

impl GeneratorRegistry {
    /// Creates a registry whose first salt is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next salt, wrapping back to 1 after `SALT_SPACE - 1`.
    pub fn next_salt(&mut self) -> u64 {
        let salt = self.next;
        self.next += 1;
        if self.next >= SALT_SPACE {
            tracing::warn!("salt space exhausted, salts are reused from 1");
            self.next = 1;
        }
        salt
    }

    /// Creates a generator with the next salt.
    pub fn next_generator(&mut self) -> UidGenerator {
        UidGenerator {
            salt: self.next_salt(),
            counter: 0,
        }
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Next salt from the process-wide registry.
pub fn next_salt() -> u64 {
    REGISTRY.lock().next_salt()
}

/// New generator salted by the process-wide registry.
pub fn next_generator() -> UidGenerator {
    REGISTRY.lock().next_generator()
}

/// Locks the default (salt 0) generator.
///
/// Do not hold the guard while constructing entities with
/// [`IdSource::Default`](crate::IdSource::Default): that locks it again.
pub fn default_generator() -> MutexGuard<'static, UidGenerator> {
    DEFAULT_GENERATOR.lock()
}

/// Next id of the default generator.
pub fn next_default_id() -> EntityId {
    DEFAULT_GENERATOR.lock().next()
}
