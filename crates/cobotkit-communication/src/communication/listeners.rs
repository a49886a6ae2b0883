//! Line listener registry
//!
//! Ordered fan-out of published lines to registered subscribers.
//! Registration order is preserved, duplicates are allowed, and a failing
//! subscriber never prevents the remaining subscribers from running.

use cobotkit_core::types::{thread_safe_vec, ThreadSafeVec};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// A subscriber notified for every published line.
///
/// Listeners receive the line after newline splitting and CR stripping;
/// they never see empty lines.
pub trait LineListener: Send + Sync {
    /// Called with each published line, in publication order.
    fn on_line(&self, line: &str);
}

impl<F> LineListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_line(&self, line: &str) {
        self(line)
    }
}

/// Handle returned on registration, used to remove a listener later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle(Uuid);

impl ListenerHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Ordered collection of line listeners.
///
/// Cloning the registry yields another handle to the same subscriber list,
/// which is how the line reader task shares it with the manager.
#[derive(Clone)]
pub struct LineListenerRegistry {
    listeners: ThreadSafeVec<(ListenerHandle, Arc<dyn LineListener>)>,
}

impl LineListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: thread_safe_vec(),
        }
    }

    /// Register a listener; it will be notified after all earlier registrations.
    pub fn add_listener(&self, listener: Arc<dyn LineListener>) -> ListenerHandle {
        let handle = ListenerHandle::new();
        self.listeners.lock().push((handle.clone(), listener));
        handle
    }

    /// Register a closure as a listener.
    pub fn add_listener_fn<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(f))
    }

    /// Remove a previously registered listener. Returns false if the handle
    /// is unknown (e.g., already removed).
    pub fn remove_listener(&self, handle: &ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(h, _)| h != handle);
        listeners.len() < before
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether the registry has no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Notify every listener with `line`, in registration order.
    ///
    /// Iterates over a snapshot taken under the lock, so listeners may
    /// register or remove listeners without corrupting the iteration.
    /// A panicking listener is logged and skipped.
    pub fn notify(&self, line: &str) {
        let snapshot: Vec<Arc<dyn LineListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.on_line(line))) {
                tracing::error!("line listener panicked: {}", panic_reason(payload.as_ref()));
            }
        }
    }
}

/// Human-readable panic payload for listener isolation logs.
pub(crate) fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl Default for LineListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
