//! Reaction Implementation
//!
//! A Reaction is the re-render contract a UI adapter needs: run a function
//! tracked, subscribe to what it read, and on any change run it again.
//!
//! # How Reactions Work
//!
//! 1. When created, the reaction runs its function inside a fresh tracking
//!    frame and subscribes to every property read.
//!
//! 2. When any of those properties is written, the reaction re-runs.
//!
//! 3. Every run releases the previous subscriptions and tracks anew, so
//!    the dependency set follows branching logic in the function.
//!
//! # Differences from Autorun
//!
//! - [`autorun`](super::autorun) fixes its dependencies on the first run;
//!   a reaction re-derives them on every run.
//! - A reaction is a handle: dropping the last clone disposes it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::context::TrackingScope;
use super::observer::Observer;
use super::registry::Subscription;

struct ReactionInner {
    /// The tracked function.
    run: Box<dyn Fn() + Send + Sync>,

    /// Registrations from the latest run.
    subscription: Mutex<Option<Subscription>>,

    /// Number of distinct properties read by the latest run.
    dependency_count: AtomicUsize,

    disposed: AtomicBool,

    run_count: AtomicUsize,
}

impl ReactionInner {
    fn release(&self) {
        if let Some(previous) = self.subscription.lock().take() {
            previous.unsubscribe();
        }
    }

    fn execute(this: &Arc<Self>) {
        if this.disposed.load(Ordering::SeqCst) {
            return;
        }

        this.release();

        let scope = TrackingScope::enter();
        (this.run)();
        let reads = scope.finish();

        this.run_count.fetch_add(1, Ordering::SeqCst);
        this.dependency_count.store(reads.len(), Ordering::SeqCst);

        let weak: Weak<Self> = Arc::downgrade(this);
        let rerun = Observer::new(move || {
            if let Some(inner) = weak.upgrade() {
                ReactionInner::execute(&inner);
            }
        });

        let subscription =
            Subscription::merge(reads.iter().map(|read| read.subscribe(rerun.clone())));

        debug!(
            observer = rerun.id().raw(),
            dependencies = subscription.len(),
            "reaction subscribed"
        );

        // Disposed while running: do not leave registrations behind.
        if this.disposed.load(Ordering::SeqCst) {
            subscription.unsubscribe();
            return;
        }

        if let Some(stale) = this.subscription.lock().replace(subscription) {
            stale.unsubscribe();
        }
    }
}

impl Drop for ReactionInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// A tracked computation that re-runs and re-tracks on every change.
///
/// # Example
///
/// ```rust
/// use observa_core::{Reaction, Store};
/// use serde_json::json;
///
/// let store = Store::from_json(json!({"count": 0})).unwrap();
///
/// let reader = store.clone();
/// let reaction = Reaction::new(move || {
///     println!("render: {:?}", reader.get("count"));
/// });
///
/// store.set("count", 1); // re-renders
/// assert_eq!(reaction.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Reaction {
    inner: Arc<ReactionInner>,
}

impl Reaction {
    /// Create a reaction and run it immediately to establish dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let reaction = Self::new_lazy(run);
        reaction.run();
        reaction
    }

    /// Create a reaction without running it.
    ///
    /// It has no dependencies until [`run`](Self::run) is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ReactionInner {
                run: Box::new(run),
                subscription: Mutex::new(None),
                dependency_count: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Run the function now, replacing the dependency set.
    pub fn run(&self) {
        ReactionInner::execute(&self.inner);
    }

    /// Stop reacting and release every subscription.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.release();
            debug!("reaction disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of times the function has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Number of properties the latest run depends on.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependency_count.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Store;
    use serde_json::json;

    #[test]
    fn reaction_runs_on_creation() {
        let reaction = Reaction::new(|| {});
        assert_eq!(reaction.run_count(), 1);
        assert_eq!(reaction.dependency_count(), 0);
    }

    #[test]
    fn reaction_lazy_does_not_run_on_creation() {
        let reaction = Reaction::new_lazy(|| {});
        assert_eq!(reaction.run_count(), 0);

        reaction.run();
        assert_eq!(reaction.run_count(), 1);
    }

    #[test]
    fn reaction_reruns_only_for_read_properties() {
        let store = Store::from_json(json!({"count": 0, "name": "John"})).unwrap();

        let reader = store.clone();
        let reaction = Reaction::new(move || {
            let _ = reader.get("count");
        });

        store.set("count", 1);
        assert_eq!(reaction.run_count(), 2);

        store.set("name", "Jane");
        assert_eq!(reaction.run_count(), 2);

        store.set("count", 2);
        assert_eq!(reaction.run_count(), 3);
    }

    #[test]
    fn reaction_follows_branching_dependencies() {
        let store = Store::from_json(json!({"flag": false, "a": 0, "b": 0})).unwrap();

        let reader = store.clone();
        let reaction = Reaction::new(move || {
            if reader.get("flag").as_bool() == Some(true) {
                let _ = reader.get("b");
            } else {
                let _ = reader.get("a");
            }
        });
        assert_eq!(reaction.dependency_count(), 2);

        store.set("flag", true);
        assert_eq!(reaction.run_count(), 2);

        // `a` is no longer read.
        store.set("a", 1);
        assert_eq!(reaction.run_count(), 2);
        assert!(!store.has_observers("a"));

        store.set("b", 1);
        assert_eq!(reaction.run_count(), 3);
    }

    #[test]
    fn registrations_do_not_accumulate() {
        let store = Store::from_json(json!({"count": 0})).unwrap();

        let reader = store.clone();
        let _reaction = Reaction::new(move || {
            let _ = reader.get("count");
        });

        for i in 1..5 {
            store.set("count", i);
        }
        assert_eq!(store.observer_count("count"), 1);
    }

    #[test]
    fn disposed_reaction_does_not_run() {
        let store = Store::from_json(json!({"count": 0})).unwrap();

        let reader = store.clone();
        let reaction = Reaction::new(move || {
            let _ = reader.get("count");
        });

        reaction.dispose();
        assert!(reaction.is_disposed());
        assert!(!store.has_observers("count"));

        store.set("count", 1);
        reaction.run();
        assert_eq!(reaction.run_count(), 1);
    }

    #[test]
    fn dropping_reaction_releases_subscriptions() {
        let store = Store::from_json(json!({"count": 0})).unwrap();

        let reader = store.clone();
        let reaction = Reaction::new(move || {
            let _ = reader.get("count");
        });
        assert!(store.has_observers("count"));

        drop(reaction);
        assert!(!store.has_observers("count"));
    }

    #[test]
    fn reaction_clone_shares_state() {
        let reaction1 = Reaction::new(|| {});
        let reaction2 = reaction1.clone();

        reaction1.run();
        assert_eq!(reaction2.run_count(), 2);

        reaction2.dispose();
        assert!(reaction1.is_disposed());
    }
}
