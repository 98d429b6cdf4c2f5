//! Dynamic configuration.
//!
//! - [`key`]: the property keys the adaptive loop reads and writes
//! - [`store`]: the get/set/is-dynamic store contract
//! - [`reconfig`]: listeners refreshed when configuration changes at runtime

pub mod key;
pub mod reconfig;
pub mod store;

pub use key::PropertyKey;
pub use reconfig::{Reconfigurable, ReconfigurableRegistry};
pub use store::{ConfigError, ConfigStore, ConfigValue, InMemoryConfigStore, Source};
