//! Runtime reconfiguration hook.
//!
//! Components that cache configuration (the composite annotator's blend
//! ratio, for one) register here and are told to re-read the store whenever
//! the coordinator pushes new values.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::store::{ConfigError, ConfigStore};

/// Something that can refresh its cached configuration from a store.
pub trait Reconfigurable: Send + Sync {
    /// Re-read the relevant entries of `store`.
    fn reconfigure(&self, store: &dyn ConfigStore) -> Result<(), ConfigError>;
}

/// Set of listeners notified on configuration change.
///
/// Holds weak references, so a dropped component simply falls out of the set.
#[derive(Default)]
pub struct ReconfigurableRegistry {
    listeners: Mutex<Vec<Weak<dyn Reconfigurable>>>,
}

impl ReconfigurableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn Reconfigurable>) {
        self.listeners.lock().push(Arc::downgrade(&listener));
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every live listener. Returns how many reconfigured successfully.
    ///
    /// A failing listener keeps its previous settings; the error is logged.
    pub fn update(&self, store: &dyn ConfigStore) -> usize {
        let live: Vec<Arc<dyn Reconfigurable>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|w| w.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };

        let mut updated = 0;
        for listener in live {
            match listener.reconfigure(store) {
                Ok(()) => updated += 1,
                Err(e) => warn!("Reconfiguration rejected: {e}"),
            }
        }
        debug!(updated, "Reconfiguration pass complete");
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{InMemoryConfigStore, PropertyKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl Reconfigurable for Counter {
        fn reconfigure(&self, store: &dyn ConfigStore) -> Result<(), ConfigError> {
            store.get_double(PropertyKey::CompositeRatio)?;
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_dropped_listeners_are_skipped() {
        let registry = ReconfigurableRegistry::new();
        let kept = Arc::new(Counter(AtomicUsize::new(0)));
        registry.register(kept.clone());
        registry.register(Arc::new(Counter(AtomicUsize::new(0))));

        let store = InMemoryConfigStore::new().with(PropertyKey::CompositeRatio, 0.5);
        assert_eq!(registry.update(&store), 1);
        assert_eq!(kept.0.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failed_reconfigure_not_counted() {
        let registry = ReconfigurableRegistry::new();
        let listener = Arc::new(Counter(AtomicUsize::new(0)));
        registry.register(listener.clone());

        assert_eq!(registry.update(&InMemoryConfigStore::new()), 0);
        assert_eq!(listener.0.load(Ordering::SeqCst), 0);
    }
}
