//! # Component Data
//!
//! Components are pure data containers with no behavior. The core never
//! looks inside them: a component is a named key/value object whose shape
//! belongs to the game, and only its presence drives system membership.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Data blob of a single component.
pub type ComponentData = Map<String, Value>;

/// Converts a JSON value into component data.
///
/// Objects are taken as-is, `null` becomes an empty component, and any other
/// value is stored under a single `"value"` field.
#[must_use]
pub fn component_data(value: Value) -> ComponentData {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_owned(), other);
            map
        }
    }
}

/// Shallow merge: every field of `patch` overwrites the same field of
/// `target`, new fields are added, untouched fields are preserved. Nested
/// objects are replaced, not merged.
pub(crate) fn merge_shallow(target: &mut ComponentData, patch: ComponentData) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

/// Where the initial value of a component comes from.
#[derive(Clone)]
pub enum ComponentDefaults {
    /// Shallow copy of a default data blob.
    Data(ComponentData),
    /// Fresh value built by a factory.
    Factory(Arc<dyn Fn() -> ComponentData + Send + Sync>),
}

impl fmt::Debug for ComponentDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(data) => f.debug_tuple("Data").field(data).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Description of a component kind used to pre-populate new entities.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tessera_core::{component_data, ComponentDescriptor, Entity};
///
/// let position =
///     ComponentDescriptor::with_defaults("pos", component_data(json!({"x": 0, "y": 0})));
/// let health = ComponentDescriptor::with_factory("hp", || component_data(json!({"value": 100})));
///
/// let entity = Entity::new().with_components(&[position, health]);
/// assert!(entity.has_component("pos"));
/// assert_eq!(entity.component("hp").unwrap()["value"], 100);
/// ```
#[derive(Clone, Debug)]
pub struct ComponentDescriptor {
    name: String,
    defaults: ComponentDefaults,
}

impl ComponentDescriptor {
    /// Descriptor whose instances are copies of `defaults`.
    #[must_use]
    pub fn with_defaults(name: impl Into<String>, defaults: ComponentData) -> Self {
        Self {
            name: name.into(),
            defaults: ComponentDefaults::Data(defaults),
        }
    }

    /// Descriptor whose instances are built by `factory`.
    #[must_use]
    pub fn with_factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> ComponentData + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            defaults: ComponentDefaults::Factory(Arc::new(factory)),
        }
    }

    /// Name the component is stored under.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default source of this descriptor.
    #[inline]
    #[must_use]
    pub fn defaults(&self) -> &ComponentDefaults {
        &self.defaults
    }

    /// Builds a new instance. The factory wins over stored defaults.
    #[must_use]
    pub fn instantiate(&self) -> ComponentData {
        match &self.defaults {
            ComponentDefaults::Data(data) => data.clone(),
            ComponentDefaults::Factory(factory) => factory(),
        }
    }
}
