//! Reactive Store
//!
//! This module implements the dependency-tracking store: wrapped objects
//! whose property reads are recorded and whose property writes notify the
//! observers of exactly that property.
//!
//! # Concepts
//!
//! ## Stores
//!
//! A [`Store`] wraps a plain object. Reading a property inside a tracked
//! execution records a [`ReadAccess`]; writing a property synchronously
//! notifies every observer subscribed to it. Nested objects are wrapped
//! lazily on first read and the wrapped store is kept in the slot, so deep
//! mutations are trackable and identity is stable.
//!
//! ## Tracked executions
//!
//! A tracked execution runs a function inside a [`TrackingScope`]. Reads are
//! collected in the innermost scope only, so executions can nest without
//! clobbering each other's dependency sets.
//!
//! ## Autorun and Reaction
//!
//! [`autorun`] subscribes a function to what it read on its first run and
//! re-invokes it on every change; its dependency set is fixed. A
//! [`Reaction`] re-tracks on every run, the way a view re-renders.
//!
//! # Implementation Notes
//!
//! Notification is synchronous and re-entrant: an observer may write to any
//! store and the nested notifications complete before the outer write
//! returns. There is no cycle detection; an observer that unconditionally
//! writes the property it observes recurses until the stack overflows.

mod autorun;
mod context;
mod observer;
mod reaction;
mod registry;
mod store;

pub use autorun::autorun;
pub use context::{track, untracked, ReadAccess, TrackingScope};
pub use observer::{Observer, ObserverId};
pub use reaction::Reaction;
pub use registry::{ObserverRegistry, Subscription, SubscriptionGuard};
pub use store::{Store, StoreId, WeakStore};
