//! Observa Core
//!
//! This crate provides the core runtime for the Observa fine-grained
//! reactive store. It implements:
//!
//! - Reactive stores that record property reads and notify on writes
//! - Per-property observer registries with idempotent unsubscription
//! - Scoped, nestable read tracking
//! - `autorun` and `Reaction`, the two drivers of tracked executions
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: stores, observers, registries, tracking and drivers
//! - `value`: the dynamic property value type
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use observa_core::{autorun, Store};
//! use serde_json::json;
//!
//! // Wrap a plain object
//! let store = Store::from_json(json!({"count": 0, "name": "John"})).unwrap();
//!
//! // Re-run whenever `count` changes
//! let reader = store.clone();
//! let sub = autorun(move || {
//!     if let Some(count) = reader.get("count").as_i64() {
//!         println!("count: {count}");
//!     }
//! });
//!
//! store.set("count", 5); // prints "count: 5"
//! store.set("name", "Jane"); // `name` was never read, nothing runs
//!
//! sub.unsubscribe();
//! ```

pub mod error;
pub mod reactive;
pub mod value;

pub use error::{Result, StoreError};
pub use reactive::{
    autorun, track, untracked, Observer, ObserverId, Reaction, ReadAccess, Store, StoreId,
    Subscription, SubscriptionGuard, TrackingScope, WeakStore,
};
pub use value::{Map, Value};
