//! The dynamic configuration store contract and an in-memory implementation.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::PropertyKey;

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Built-in default.
    Default,
    /// Loaded from the local configuration file.
    SiteProperty,
    /// Pushed by the coordinator.
    ClusterDefault,
    /// Written at runtime by the adaptive loop.
    Runtime,
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(u64),
    Double(f64),
    Str(String),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "integer",
            ConfigValue::Double(_) => "double",
            ConfigValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Double(v) => write!(f, "{v}"),
            ConfigValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<u64> for ConfigValue {
    fn from(v: u64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Double(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Required configuration {0} is not set")]
    Missing(PropertyKey),

    #[error("Configuration {key} holds a {found}, expected {expected}")]
    TypeMismatch {
        key: PropertyKey,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Configuration {key} = {value} is outside {range}")]
    OutOfRange {
        key: PropertyKey,
        value: String,
        range: &'static str,
    },
}

/// Access to the shared, possibly dynamic, configuration.
///
/// Typed getters fail rather than default: a missing tuning parameter must
/// abort startup, not silently change eviction order.
pub trait ConfigStore: Send + Sync {
    /// Raw lookup.
    fn get(&self, key: PropertyKey) -> Option<ConfigValue>;

    /// The source that last wrote `key`.
    fn source(&self, key: PropertyKey) -> Option<Source>;

    /// Write `value` under `key`, tagged with `source`.
    fn set(&self, key: PropertyKey, value: ConfigValue, source: Source);

    /// Whether `key` accepts runtime updates.
    fn is_dynamic(&self, key: PropertyKey) -> bool {
        key.is_dynamic()
    }

    fn get_double(&self, key: PropertyKey) -> Result<f64, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Double(v)) => Ok(v),
            Some(ConfigValue::Int(v)) => Ok(v as f64),
            Some(other) => Err(mismatch(key, "double", &other)),
            None => Err(ConfigError::Missing(key)),
        }
    }

    fn get_u64(&self, key: PropertyKey) -> Result<u64, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Int(v)) => Ok(v),
            Some(other) => Err(mismatch(key, "integer", &other)),
            None => Err(ConfigError::Missing(key)),
        }
    }

    fn get_boolean(&self, key: PropertyKey) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Bool(v)) => Ok(v),
            Some(other) => Err(mismatch(key, "bool", &other)),
            None => Err(ConfigError::Missing(key)),
        }
    }

    fn get_string(&self, key: PropertyKey) -> Result<String, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Str(v)) => Ok(v),
            Some(other) => Err(mismatch(key, "string", &other)),
            None => Err(ConfigError::Missing(key)),
        }
    }
}

fn mismatch(key: PropertyKey, expected: &'static str, found: &ConfigValue) -> ConfigError {
    ConfigError::TypeMismatch {
        key,
        expected,
        found: found.type_name(),
    }
}

/// Process-local configuration store.
///
/// Each worker and coordinator owns its own instance; nothing here is global.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    entries: RwLock<HashMap<PropertyKey, (ConfigValue, Source)>>,
}

impl InMemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for seeding a store in one expression.
    pub fn with(self, key: PropertyKey, value: impl Into<ConfigValue>) -> Self {
        self.set(key, value.into(), Source::SiteProperty);
        self
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get(&self, key: PropertyKey) -> Option<ConfigValue> {
        self.entries.read().get(&key).map(|(v, _)| v.clone())
    }

    fn source(&self, key: PropertyKey) -> Option<Source> {
        self.entries.read().get(&key).map(|(_, s)| *s)
    }

    fn set(&self, key: PropertyKey, value: ConfigValue, source: Source) {
        self.entries.write().insert(key, (value, source));
    }
}
