//! # Error Types
//!
//! All errors that can be signaled by the membership engine.
//!
//! The taxonomy is intentionally small. Misuse such as removing an absent
//! entity or component is a silent no-op and never produces an error, and
//! id-space exhaustion wraps around instead of failing.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur in the ECS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component name was added twice while the container rejects duplicates.
    #[error("entity {entity} already has a component named '{name}'")]
    DuplicateComponent {
        /// The entity that already carries the component.
        entity: EntityId,
        /// The component name.
        name: String,
    },

    /// An entity with the same id is already registered with the container.
    #[error("entity {0} is already registered")]
    DuplicateEntity(EntityId),

    /// A generator salt outside of the salt space was requested.
    #[error("salt {salt} is outside of the salt space (0..{space})")]
    SaltOutOfRange {
        /// The requested salt.
        salt: u64,
        /// Size of the salt space.
        space: u64,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
