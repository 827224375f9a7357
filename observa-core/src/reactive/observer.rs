//! Observer types for the reactive system.
//!
//! An Observer is a zero-argument callback that a store invokes when a
//! property it was subscribed to is written. Closures have no identity of
//! their own, so each observer carries an [`ObserverId`]; clones share it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for an observer.
///
/// Registries deduplicate on this ID, so subscribing clones of the same
/// observer to one property registers it only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// A callback notified when a subscribed property changes.
///
/// Cloning is cheap and keeps the identity: a clone subscribes, dedupes and
/// unsubscribes exactly like the original.
#[derive(Clone)]
pub struct Observer {
    id: ObserverId,
    notify: Arc<dyn Fn() + Send + Sync>,
}

impl Observer {
    /// Create a new observer with a fresh identity.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: ObserverId::new(),
            notify: Arc::new(notify),
        }
    }

    /// Get the observer's unique ID.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl<F> From<F> for Observer
where
    F: Fn() + Send + Sync + 'static,
{
    fn from(notify: F) -> Self {
        Observer::new(notify)
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Observer {}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish()
    }
}
