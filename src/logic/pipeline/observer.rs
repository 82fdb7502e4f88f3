//! Observer Lists
//!
//! Explicit callback handles, invoked synchronously in registration order.
//! The list is copy-on-write: a notification walks a snapshot, so
//! (un)subscribing from inside a callback only affects later notifications.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Shared callback handle
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Entries<T> = Arc<Vec<(ObserverId, Callback<T>)>>;

/// Registered observers for one notification type
pub struct ObserverList<T: 'static> {
    entries: RwLock<Entries<T>>,
    next_id: AtomicU64,
}

impl<T: 'static> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a closure
    pub fn subscribe<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_callback(Arc::new(callback))
    }

    /// Register an existing callback handle
    pub fn subscribe_callback(&self, callback: Callback<T>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.write();
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.extend(entries.iter().cloned());
        next.push((id, callback));
        *entries = Arc::new(next);
        id
    }

    /// Remove an observer; returns false if the id was not registered
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.write();
        if !entries.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let next: Vec<_> = entries
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        *entries = Arc::new(next);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Freeze the current set of observers
    pub fn snapshot(&self) -> ObserverSnapshot<T> {
        ObserverSnapshot(Arc::clone(&self.entries.read()))
    }

    /// Notify the current observers
    pub fn notify(&self, value: &T) {
        self.snapshot().notify(value);
    }
}

impl<T: 'static> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.len())
            .finish()
    }
}

/// Immutable view of an observer list taken at one instant
pub struct ObserverSnapshot<T: 'static>(Entries<T>);

impl<T: 'static> ObserverSnapshot<T> {
    pub fn notify(&self, value: &T) {
        for (_, callback) in self.0.iter() {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
