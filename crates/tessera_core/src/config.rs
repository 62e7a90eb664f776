//! # Container Configuration
//!
//! Policies for the two behaviors that downstream consumers disagree on.
//! Loaded once at startup, usually from a TOML file:
//!
//! ```toml
//! duplicate_components = "reject"
//! frequency_gate = "halt_remaining"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// What happens when a component name is added to an entity that already has it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateComponentPolicy {
    /// The new data replaces the old one.
    #[default]
    Overwrite,
    /// The add is refused with [`EcsError::DuplicateComponent`].
    Reject,
}

/// What the tick loop does when it meets a system that is not due this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyGate {
    /// Stop iterating: no later system in registration order runs this tick.
    #[default]
    HaltRemaining,
    /// Skip only the system that is not due and keep going.
    SkipSystem,
}

/// Configuration of an [`Ecs`](crate::Ecs) container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Duplicate component handling for attached entities.
    pub duplicate_components: DuplicateComponentPolicy,
    /// Frequency gating behavior of [`Ecs::update`](crate::Ecs::update).
    pub frequency_gate: FrequencyGate,
}

impl EcsConfig {
    /// Parses a configuration from TOML source. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the source is not valid TOML or
    /// names an unknown policy.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}
