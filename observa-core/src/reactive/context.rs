//! Tracking Context
//!
//! The tracking context records which store properties are read while a
//! tracked function runs. Whoever started the tracked execution (an
//! [`autorun`](super::autorun), a [`Reaction`](super::Reaction), or an
//! external adapter through [`track`]) takes the recorded reads afterwards
//! and subscribes to them.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a tracked execution
//! pushes a frame; every read recorded by a store lands in the innermost
//! frame only; dropping the [`TrackingScope`] guard pops it. Nested tracked
//! executions therefore each see exactly their own reads, and reads on other
//! threads are never mixed in.
//!
//! An [`untracked`] section pushes a frame that discards reads, hiding them
//! from any enclosing tracked execution.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;

use super::observer::Observer;
use super::registry::Subscription;
use super::store::Store;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One entry in the context stack.
#[derive(Debug)]
struct Frame {
    /// Position in the stack, used to catch mismatched guards.
    depth: usize,
    /// Reads collected so far. `None` marks an untracked section.
    reads: Option<IndexSet<ReadAccess>>,
}

/// A (property, store) pair read during a tracked execution.
///
/// Two records are equal when they name the same property on the same store.
#[derive(Debug, Clone)]
pub struct ReadAccess {
    property: String,
    store: Store,
}

impl ReadAccess {
    pub fn new(property: impl Into<String>, store: Store) -> Self {
        Self {
            property: property.into(),
            store,
        }
    }

    /// The property that was read.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// The store the property was read from.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Subscribe `observer` to this property on its store.
    pub fn subscribe(&self, observer: impl Into<Observer>) -> Subscription {
        self.store.subscribe(&self.property, observer)
    }
}

impl PartialEq for ReadAccess {
    fn eq(&self, other: &Self) -> bool {
        self.store.id() == other.store.id() && self.property == other.property
    }
}

impl Eq for ReadAccess {}

impl Hash for ReadAccess {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.store.id().hash(state);
        self.property.hash(state);
    }
}

/// Guard for one tracked execution.
///
/// The frame is popped when the guard drops, including during unwinding, so
/// a panicking tracked function never leaves a stale frame behind.
#[must_use = "the tracking frame is popped as soon as the guard drops"]
#[derive(Debug)]
pub struct TrackingScope {
    depth: usize,
}

impl TrackingScope {
    /// Push a fresh recording frame.
    pub fn enter() -> Self {
        Self::push(Some(IndexSet::new()))
    }

    /// Push a frame that discards reads.
    pub fn enter_untracked() -> Self {
        Self::push(None)
    }

    fn push(reads: Option<IndexSet<ReadAccess>>) -> Self {
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let depth = stack.len();
            stack.push(Frame { depth, reads });
            depth
        });
        Self { depth }
    }

    /// Whether reads on this thread are currently being recorded.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| frame.reads.is_some())
                .unwrap_or(false)
        })
    }

    /// Number of frames on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Record a read in the innermost frame.
    ///
    /// This is called by stores on every tracked read. Without an active
    /// frame it does nothing.
    pub fn record(property: &str, store: &Store) {
        CONTEXT_STACK.with(|stack| {
            if let Some(Frame {
                reads: Some(reads), ..
            }) = stack.borrow_mut().last_mut()
            {
                reads.insert(ReadAccess::new(property, store.clone()));
            }
        });
    }

    /// Discard everything recorded so far in the innermost frame.
    pub fn clear() {
        CONTEXT_STACK.with(|stack| {
            if let Some(Frame {
                reads: Some(reads), ..
            }) = stack.borrow_mut().last_mut()
            {
                reads.clear();
            }
        });
    }

    /// Reads recorded so far in the innermost frame.
    pub fn reads() -> Vec<ReadAccess> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|frame| frame.reads.as_ref())
                .map(|reads| reads.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// End this tracked execution and hand back its reads in first-read order.
    pub fn finish(self) -> Vec<ReadAccess> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .filter(|frame| frame.depth == self.depth)
                .and_then(|frame| frame.reads.take())
                .map(|reads| reads.into_iter().collect())
                .unwrap_or_default()
        })
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.depth, self.depth,
                    "TrackingScope mismatch: expected depth {}, got {}",
                    self.depth, frame.depth
                );
            }
        });
    }
}

/// Run `f` as a tracked execution and return its result with every
/// property it read.
///
/// This is the entry point for adapters that drive their own
/// subscribe/re-run cycle.
pub fn track<R>(f: impl FnOnce() -> R) -> (R, Vec<ReadAccess>) {
    let scope = TrackingScope::enter();
    let result = f();
    (result, scope.finish())
}

/// Run `f` without recording any of its reads, even inside a tracked
/// execution.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _scope = TrackingScope::enter_untracked();
    f()
}
