//! Store Implementation
//!
//! A Store wraps a plain object and makes every property access observable.
//!
//! # How Stores Work
//!
//! 1. Reading a property inside a tracked execution records a
//!    [`ReadAccess`](super::ReadAccess) in the active tracking frame.
//!
//! 2. Writing a property assigns the slot and then synchronously notifies
//!    every observer subscribed to that property, before `set` returns.
//!
//! 3. A plain object stored in a property is wrapped the first time it is
//!    read. The wrapped store replaces the plain object in the slot, so every
//!    later read returns the *same* store and observers on nested properties
//!    persist across re-reads of the parent. Replacing the slot is internal
//!    and does not notify anyone.
//!
//! Function values are returned untouched and never recorded.
//!
//! # Thread Safety
//!
//! Slots sit behind a `parking_lot::RwLock`. No lock is held while observers
//! run, so observers are free to read and write any store, this one
//! included. Tracking itself is thread-local.
//!
//! # Ownership
//!
//! Cloning a `Store` yields another handle to the same state. An observer
//! that captures a `Store` handle of the store it is subscribed to keeps that
//! store alive until it is unsubscribed; capture a [`WeakStore`] to avoid
//! the cycle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::ser::{Serialize, Serializer};
use tracing::trace;

use super::context::{untracked, TrackingScope};
use super::observer::Observer;
use super::registry::{ObserverRegistry, Subscription};
use crate::error::{Result, StoreError};
use crate::value::{Map, Value};

/// Unique identifier for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct StoreInner {
    id: StoreId,

    /// Property slots, copied in at construction. Plain objects are
    /// replaced by their wrapped form on first read.
    slots: RwLock<Map>,

    /// Observers of this store's properties. Owned by this store alone.
    registry: Arc<ObserverRegistry>,
}

/// A reactive wrapper around a plain object.
///
/// # Example
///
/// ```rust
/// use observa_core::{autorun, Store};
/// use serde_json::json;
///
/// let store = Store::from_json(json!({"count": 0})).unwrap();
///
/// let watched = store.clone();
/// let sub = autorun(move || {
///     if let Some(count) = watched.get("count").as_i64() {
///         println!("count = {count}");
///     }
/// });
///
/// store.set("count", 1); // prints "count = 1"
/// sub.unsubscribe();
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_map(Map::new())
    }

    /// Wrap an object-shaped value.
    ///
    /// Wrapping a value that is already a store returns that same store.
    /// Anything that is not an object is rejected.
    pub fn wrap(value: impl Into<Value>) -> Result<Self> {
        match value.into() {
            Value::Store(store) => Ok(store),
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(StoreError::InvalidArgument {
                found: other.kind(),
            }),
        }
    }

    /// Wrap a JSON object.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Self::wrap(Value::from(json))
    }

    /// Wrap a map of properties.
    pub fn from_map(map: Map) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                id: StoreId::next(),
                slots: RwLock::new(map),
                registry: ObserverRegistry::new(),
            }),
        }
    }

    /// Get the store's unique ID.
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// Read a property.
    ///
    /// Missing properties read as [`Value::Null`] and are still recorded, so
    /// a tracked execution is notified when they are later created.
    pub fn get(&self, key: &str) -> Value {
        let value = {
            let slots = self.inner.slots.read();
            match slots.get(key) {
                Some(Value::Object(_)) => None,
                other => Some(other.cloned().unwrap_or_default()),
            }
        };

        match value {
            None => match self.wrap_slot(key) {
                Some(nested) => Value::Store(nested),
                // Someone else replaced the slot between the two locks.
                None => self.get(key),
            },
            Some(value @ Value::Function(_)) => value,
            Some(value) => {
                TrackingScope::record(key, self);
                value
            }
        }
    }

    /// Read a property without recording it.
    pub fn get_untracked(&self, key: &str) -> Value {
        untracked(|| self.get(key))
    }

    /// Read a property and return it only if it is a store.
    pub fn get_store(&self, key: &str) -> Option<Store> {
        match self.get(key) {
            Value::Store(store) => Some(store),
            _ => None,
        }
    }

    /// Replace a plain object in `key` with its wrapped form.
    ///
    /// Returns `None` if the slot no longer holds a plain object.
    fn wrap_slot(&self, key: &str) -> Option<Store> {
        let mut slots = self.inner.slots.write();
        let slot = slots.get_mut(key)?;
        let Value::Object(map) = &mut *slot else {
            return None;
        };

        let nested = Store::from_map(std::mem::take(map));
        *slot = Value::Store(nested.clone());

        trace!(
            store = self.inner.id.raw(),
            nested = nested.inner.id.raw(),
            property = key,
            "wrapped nested object"
        );
        Some(nested)
    }

    /// Write a property and notify its observers.
    ///
    /// Every observer subscribed to `key` runs before this returns. Writes
    /// are never recorded as reads.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.inner.slots.write().insert(key.to_owned(), value.into());

        trace!(store = self.inner.id.raw(), property = key, "property written");
        self.inner.registry.notify(key);
    }

    /// Write a property computed from its current value.
    ///
    /// The current value is read untracked.
    pub fn update<F, V>(&self, key: &str, f: F)
    where
        F: FnOnce(&Value) -> V,
        V: Into<Value>,
    {
        let current = self.get_untracked(key);
        self.set(key, f(&current));
    }

    /// Subscribe `observer` to writes of `key`.
    ///
    /// Subscribing the same observer twice registers it once.
    pub fn subscribe(&self, key: &str, observer: impl Into<Observer>) -> Subscription {
        self.inner.registry.add(key, observer.into())
    }

    /// Remove `observer` from `key`.
    ///
    /// Returns whether it was registered.
    pub fn unsubscribe(&self, key: &str, observer: &Observer) -> bool {
        self.inner.registry.remove(key, observer.id())
    }

    /// Number of observers subscribed to `key`.
    pub fn observer_count(&self, key: &str) -> usize {
        self.inner.registry.observer_count(key)
    }

    /// Whether `key` has at least one observer.
    pub fn has_observers(&self, key: &str) -> bool {
        self.inner.registry.has_observers(key)
    }

    /// Property names in insertion order. Not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.read().keys().cloned().collect()
    }

    /// Whether `key` exists. Not tracked.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.slots.read().contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.inner.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.read().is_empty()
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Create a weak handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Snapshot the store as plain JSON without recording any reads.
    ///
    /// A store reached again while it is still being snapshotted (a cycle)
    /// is written as `null`. Shared, non-cyclic references are written in
    /// full each time.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_within(&mut Vec::new())
    }

    pub(crate) fn to_json_within(&self, visiting: &mut Vec<StoreId>) -> serde_json::Value {
        if visiting.contains(&self.inner.id) {
            trace!(store = self.inner.id.raw(), "cyclic store reference in snapshot");
            return serde_json::Value::Null;
        }

        visiting.push(self.inner.id);
        let slots = self.inner.slots.read().clone();
        let json = serde_json::Value::Object(
            slots
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json_within(visiting)))
                .collect(),
        );
        visiting.pop();
        json
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<serde_json::Value> for Store {
    type Error = StoreError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        Self::from_json(json)
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Store {}

impl Hash for Store {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("len", &self.len())
            .field("observed_properties", &self.inner.registry.property_count())
            .finish()
    }
}

impl Serialize for Store {
    /// Serializes the [`to_json`](Store::to_json) snapshot; reads are not
    /// recorded and cycles become `null`.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// A weak handle to a [`Store`].
#[derive(Clone, Default)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    /// Get a strong handle if the store is still alive.
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
