//! Integration Tests for the Reactive Store
//!
//! These tests verify that stores, tracking, autorun and reactions work
//! together through the public API.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use observa_core::{autorun, track, Observer, Reaction, Store, StoreError, Value};

fn counter() -> (Arc<AtomicI32>, Observer) {
    let count = Arc::new(AtomicI32::new(0));
    let count_clone = count.clone();
    let observer = Observer::new(move || {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });
    (count, observer)
}

/// Writes are visible to subsequent reads; objects come back as one store.
#[test]
fn read_write_round_trip() {
    let store = Store::new();

    store.set("n", 3);
    assert_eq!(store.get("n"), Value::from(3));

    store.set("user", json!({"name": "John"}));
    let first = store.get_store("user").expect("wrapped on read");
    let second = store.get_store("user").expect("same store");
    assert!(first.ptr_eq(&second));
    assert_eq!(first.to_json(), json!({"name": "John"}));
}

/// Subscribe to one property; writes to others do not notify.
#[test]
fn subscribe_scenario() {
    let store = Store::from_json(json!({"count": 0, "name": "John"})).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_clone = seen.clone();
    let weak = store.downgrade();
    let sub = store.subscribe("count", move || {
        if let Some(store) = weak.upgrade() {
            seen_clone.lock().push(store.to_json());
        }
    });

    store.set("count", 1);
    assert_eq!(*seen.lock(), vec![json!({"count": 1, "name": "John"})]);

    store.set("name", "Jane");
    assert_eq!(seen.lock().len(), 1);

    sub.unsubscribe();
    store.set("count", 2);
    assert_eq!(seen.lock().len(), 1);

    // A second unsubscribe is a no-op.
    sub.unsubscribe();
}

/// Observers of nested properties only hear about their own property.
#[test]
fn nested_properties_are_independent() {
    let store = Store::from_json(json!({"a": {"x": 1}, "b": {"y": 1}})).unwrap();
    let runs = Arc::new(AtomicI32::new(0));

    let runs_clone = runs.clone();
    let reader = store.clone();
    let _sub = autorun(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
        if let Some(a) = reader.get_store("a") {
            let _ = a.get("x");
        }
    });
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store.get_store("b").unwrap().set("y", 2);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store.get_store("a").unwrap().set("x", 2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Two views over one nested object re-render independently.
#[test]
fn nested_reactions_rerender_independently() {
    let store = Store::from_json(json!({
        "name": {"first_name": "John", "last_name": "Doe"}
    }))
    .unwrap();

    let first_reader = store.clone();
    let first = Reaction::new(move || {
        let _ = first_reader.get_store("name").map(|n| n.get("first_name"));
    });
    let last_reader = store.clone();
    let last = Reaction::new(move || {
        let _ = last_reader.get_store("name").map(|n| n.get("last_name"));
    });

    let name = store.get_store("name").unwrap();

    name.set("first_name", "Jane");
    assert_eq!(first.run_count(), 2);
    assert_eq!(last.run_count(), 1);

    name.set("last_name", "Smith");
    assert_eq!(first.run_count(), 2);
    assert_eq!(last.run_count(), 2);
}

/// Every write notifies each observer once; nested writes complete first.
#[test]
fn nested_writes_notify_before_outer_write_returns() {
    let store = Store::from_json(json!({"p": 0})).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_c1 = log.clone();
    let weak = store.downgrade();
    let _c1 = store.subscribe("p", move || {
        log_c1.lock().push("c1");
        if let Some(store) = weak.upgrade() {
            if store.get("p").as_i64() == Some(1) {
                store.set("p", 2);
            }
        }
    });

    let log_c2 = log.clone();
    let _c2 = store.subscribe("p", move || {
        log_c2.lock().push("c2");
    });

    store.set("p", 1);
    assert_eq!(*log.lock(), vec!["c1", "c1", "c2", "c2"]);
    assert_eq!(store.get("p").as_i64(), Some(2));
}

/// The same observer subscribed twice is invoked once per write.
#[test]
fn duplicate_subscription_notifies_once() {
    let store = Store::from_json(json!({"count": 0})).unwrap();
    let (count, observer) = counter();

    let _a = store.subscribe("count", observer.clone());
    let _b = store.subscribe("count", observer);

    store.set("count", 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// Autorun keeps the dependency set of its first run.
#[test]
fn autorun_fixed_dependency_set() {
    let store = Store::from_json(json!({"first": true, "a": 0, "b": 0})).unwrap();
    let runs = Arc::new(AtomicI32::new(0));

    let runs_clone = runs.clone();
    let reader = store.clone();
    let sub = autorun(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
        if reader.get("first").as_bool() == Some(true) {
            let _ = reader.get("a");
        } else {
            let _ = reader.get("b");
        }
    });

    assert_eq!(sub.properties().collect::<Vec<_>>(), vec!["first", "a"]);

    store.set("b", 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    sub.unsubscribe();
    store.set("a", 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!store.has_observers("first"));
}

/// The adapter contract: track a render, subscribe to its reads, dispose.
#[test]
fn adapter_contract_via_track() {
    let store = Store::from_json(json!({"count": 0, "title": "t"})).unwrap();
    let (renders, rerender) = counter();

    let (output, reads) = track(|| store.get("count").as_i64().unwrap_or_default() * 10);
    assert_eq!(output, 0);

    let subs: Vec<_> = reads.iter().map(|r| r.subscribe(rerender.clone())).collect();

    store.set("title", "u");
    assert_eq!(renders.load(Ordering::SeqCst), 0);

    store.set("count", 1);
    assert_eq!(renders.load(Ordering::SeqCst), 1);

    for sub in &subs {
        sub.unsubscribe();
    }
    store.set("count", 2);
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

/// Reads on another thread never land in this thread's tracking frame.
#[test]
fn tracking_is_thread_local() {
    let store = Store::from_json(json!({"a": 1, "b": 2})).unwrap();

    let (_, reads) = track(|| {
        let other = store.clone();
        std::thread::spawn(move || {
            let _ = other.get("b");
        })
        .join()
        .unwrap();
        let _ = store.get("a");
    });

    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].property(), "a");
}

/// Writes from another thread notify observers synchronously on that thread.
#[test]
fn stores_are_shareable_across_threads() {
    let store = Store::from_json(json!({"count": 0})).unwrap();
    let (count, observer) = counter();
    let _sub = store.subscribe("count", observer);

    let writer = store.clone();
    std::thread::spawn(move || writer.set("count", 1))
        .join()
        .unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(store.get("count").as_i64(), Some(1));
}

/// Only objects can be wrapped.
#[test]
fn wrapping_rejects_non_objects() {
    assert!(matches!(
        Store::from_json(json!("text")),
        Err(StoreError::InvalidArgument { found: "string" })
    ));
    assert!(Store::wrap(Value::Null).is_err());
}
