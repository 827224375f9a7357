//! Observer Registry
//!
//! Every store owns one registry mapping a property name to the observers
//! interested in that property. The registry is the only thing a write
//! talks to: `Store::set` assigns the slot, then calls [`ObserverRegistry::notify`].
//!
//! # Invariants
//!
//! 1. An observer appears at most once per property (deduplicated by
//!    [`ObserverId`]).
//! 2. A property entry exists only while it has at least one observer;
//!    removing the last observer deletes the entry.
//! 3. `notify` snapshots the observer set and releases the lock before
//!    invoking anything. Observers may subscribe, unsubscribe or write to
//!    any store (this one included) from inside the callback. Changes made
//!    during a pass take effect from the next pass.
//! 4. Observers are invoked in insertion order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::trace;

use super::observer::{Observer, ObserverId};

/// Per-store map from property to subscribed observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<HashMap<String, IndexMap<ObserverId, Observer>>>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `observer` for `property`.
    ///
    /// Adding an observer that is already registered for the property has no
    /// further effect; the returned handle still removes it.
    pub fn add(self: &Arc<Self>, property: &str, observer: Observer) -> Subscription {
        let id = observer.id();
        self.observers
            .write()
            .entry(property.to_owned())
            .or_default()
            .entry(id)
            .or_insert(observer);

        Subscription::single(Registration {
            registry: Arc::downgrade(self),
            property: property.to_owned(),
            observer: id,
        })
    }

    /// Remove the observer with `id` from `property`.
    ///
    /// Returns whether anything was removed. The property entry is deleted
    /// once its observer set is empty.
    pub fn remove(&self, property: &str, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let Some(set) = observers.get_mut(property) else {
            return false;
        };

        let removed = set.shift_remove(&id).is_some();
        if set.is_empty() {
            observers.remove(property);
            trace!(property, "registry entry compacted");
        }
        removed
    }

    /// Invoke every observer currently registered for `property`.
    ///
    /// Returns the number of observers invoked.
    pub fn notify(&self, property: &str) -> usize {
        let snapshot: Vec<Observer> = {
            let observers = self.observers.read();
            match observers.get(property) {
                Some(set) => set.values().cloned().collect(),
                None => return 0,
            }
        };

        trace!(property, observers = snapshot.len(), "notifying observers");

        for observer in &snapshot {
            observer.notify();
        }
        snapshot.len()
    }

    /// Number of observers registered for `property`.
    pub fn observer_count(&self, property: &str) -> usize {
        self.observers
            .read()
            .get(property)
            .map(IndexMap::len)
            .unwrap_or(0)
    }

    /// Whether `property` has an entry, i.e. at least one observer.
    pub fn has_observers(&self, property: &str) -> bool {
        self.observers.read().contains_key(property)
    }

    /// Number of properties with at least one observer.
    pub fn property_count(&self) -> usize {
        self.observers.read().len()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("property_count", &self.property_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Subscription handles
// ----------------------------------------------------------------------------

/// One (property, observer) pair in one registry.
#[derive(Debug, Clone)]
struct Registration {
    registry: Weak<ObserverRegistry>,
    property: String,
    observer: ObserverId,
}

impl Registration {
    fn release(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.property, self.observer);
        }
    }
}

/// Capability to remove one or more registrations.
///
/// Dropping a `Subscription` does **not** unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe), or convert it with
/// [`into_guard`](Self::into_guard) for scope-bound cleanup.
///
/// Registries are held weakly, so a pending subscription never keeps a
/// store alive.
#[must_use = "a subscription stays registered until `unsubscribe` is called"]
#[derive(Debug)]
pub struct Subscription {
    registrations: SmallVec<[Registration; 1]>,
    active: AtomicBool,
}

impl Subscription {
    fn single(registration: Registration) -> Self {
        let mut registrations = SmallVec::new();
        registrations.push(registration);
        Self {
            registrations,
            active: AtomicBool::new(true),
        }
    }

    /// A subscription covering nothing.
    pub fn empty() -> Self {
        Self {
            registrations: SmallVec::new(),
            active: AtomicBool::new(true),
        }
    }

    /// Combine several subscriptions into one.
    ///
    /// Registrations of already-released subscriptions are skipped.
    pub fn merge<I>(subscriptions: I) -> Self
    where
        I: IntoIterator<Item = Subscription>,
    {
        let mut merged = Self::empty();
        for sub in subscriptions {
            merged.extend(sub);
        }
        merged
    }

    /// Move the registrations of `other` into this subscription.
    ///
    /// If this subscription was already released, `other` is released
    /// immediately instead.
    pub fn extend(&mut self, other: Subscription) {
        if !self.is_active() {
            other.unsubscribe();
            return;
        }
        if other.active.load(Ordering::SeqCst) {
            self.registrations.extend(other.registrations);
        }
    }

    /// Remove every registration this handle covers.
    ///
    /// Only the first call does anything.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        for registration in &self.registrations {
            registration.release();
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not been called yet.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of registrations covered.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Properties covered by this handle, in registration order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.property.as_str())
    }

    /// Tie the subscription to a scope: it is released when the guard drops.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

/// Releases its subscription on drop.
#[must_use = "dropping the guard immediately unsubscribes"]
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl SubscriptionGuard {
    /// Borrow the underlying subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
