//! Autorun
//!
//! `autorun` runs a function once, subscribes it to every store property it
//! read, and re-runs it whenever one of those properties is written.
//!
//! # Fixed dependencies
//!
//! The dependency set is computed once, from the first run. Later runs are
//! plain re-invocations: they are not tracked and never add or drop
//! subscriptions. A function whose later runs read different properties
//! should use a [`Reaction`](super::Reaction) instead, which re-derives its
//! dependencies on every run.
//!
//! Re-runs execute untracked, so an autorun triggered from inside some other
//! tracked execution does not leak its reads into that execution.

use tracing::debug;

use super::context::{untracked, TrackingScope};
use super::observer::Observer;
use super::registry::Subscription;

/// Run `f` now and again after every write to a property it read.
///
/// Returns a subscription covering every registration; unsubscribing it
/// stops all future re-runs.
///
/// # Example
///
/// ```rust
/// use observa_core::{autorun, Store};
/// use serde_json::json;
///
/// let store = Store::from_json(json!({"count": 0})).unwrap();
/// let reader = store.clone();
/// let sub = autorun(move || {
///     let _ = reader.get("count");
/// });
///
/// assert_eq!(store.observer_count("count"), 1);
/// sub.unsubscribe();
/// assert_eq!(store.observer_count("count"), 0);
/// ```
pub fn autorun<F>(f: F) -> Subscription
where
    F: Fn() + Send + Sync + 'static,
{
    let run = Observer::new(f);

    let scope = TrackingScope::enter();
    run.notify();
    let reads = scope.finish();

    let rerun = {
        let run = run.clone();
        Observer::new(move || untracked(|| run.notify()))
    };

    debug!(
        observer = rerun.id().raw(),
        dependencies = reads.len(),
        "autorun registered"
    );

    Subscription::merge(reads.iter().map(|read| read.subscribe(rerun.clone())))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
