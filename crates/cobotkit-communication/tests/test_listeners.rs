//! Tests for the line listener registry.

use cobotkit_communication::LineListenerRegistry;
use std::sync::{Arc, Mutex};

#[test]
fn notifies_in_registration_order_with_duplicates() {
    let registry = LineListenerRegistry::new();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    registry.add_listener_fn(move |_| first.lock().unwrap().push("first"));
    let second = Arc::clone(&order);
    registry.add_listener_fn(move |_| second.lock().unwrap().push("second"));
    let again = Arc::clone(&order);
    registry.add_listener_fn(move |_| again.lock().unwrap().push("first"));

    assert_eq!(registry.len(), 3);
    registry.notify("line");

    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "first"]);
}

#[test]
fn removed_listener_is_skipped() {
    let registry = LineListenerRegistry::new();
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let handle = registry.add_listener_fn(move |line| sink.lock().unwrap().push(line.to_string()));

    assert!(registry.remove_listener(&handle));
    assert!(!registry.remove_listener(&handle));
    assert!(registry.is_empty());

    registry.notify("line");
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn listener_may_remove_itself_during_notification() {
    let registry = LineListenerRegistry::new();
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let handle: Arc<Mutex<Option<cobotkit_communication::ListenerHandle>>> =
        Arc::new(Mutex::new(None));
    let self_handle = Arc::clone(&handle);
    let inner_registry = registry.clone();
    let one_shot = registry.add_listener_fn(move |_| {
        if let Some(h) = self_handle.lock().unwrap().take() {
            inner_registry.remove_listener(&h);
        }
    });
    *handle.lock().unwrap() = Some(one_shot);

    let sink = Arc::clone(&seen);
    registry.add_listener_fn(move |line| sink.lock().unwrap().push(line.to_string()));

    // Snapshot iteration: the removal mid-notify corrupts nothing and the
    // remaining listener still runs, now and on later lines.
    registry.notify("a");
    registry.notify("b");

    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(registry.len(), 1);
}

#[test]
fn panicking_listener_is_isolated() {
    let registry = LineListenerRegistry::new();
    registry.add_listener_fn(|_| panic!("boom"));

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    registry.add_listener_fn(move |line| sink.lock().unwrap().push(line.to_string()));

    registry.notify("a");
    registry.notify("b");

    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
}
