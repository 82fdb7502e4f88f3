//! Offloaded Observer Queue
//!
//! Observers run on the pipeline thread, so a slow one stalls every frame.
//! `QueuedObserver` moves the work onto a worker thread behind a bounded
//! queue. When the queue is full the configured policy drops either the
//! oldest queued item or the incoming one; it never grows past capacity.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_QUEUE_CAPACITY;

// ============================================================================
// CONFIG
// ============================================================================

/// What to drop when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    #[default]
    DropOldest,
    DropNewest,
}

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued items (>= 1)
    pub capacity: usize,
    pub policy: Backpressure,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            policy: Backpressure::DropOldest,
        }
    }
}

/// Queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: usize,
    pub delivered: u64,
    pub dropped: u64,
}

// ============================================================================
// SHARED STATE
// ============================================================================

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    ready: Condvar,
    capacity: usize,
    policy: Backpressure,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl<T> Shared<T> {
    fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let accepted = if state.items.len() < self.capacity {
            state.items.push_back(item);
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match self.policy {
                Backpressure::DropOldest => {
                    state.items.pop_front();
                    state.items.push_back(item);
                    true
                }
                Backpressure::DropNewest => false,
            }
        };

        drop(state);
        if accepted {
            self.ready.notify_one();
        }
        accepted
    }
}

// ============================================================================
// QUEUED OBSERVER
// ============================================================================

/// Observer whose handler runs on a dedicated worker thread
pub struct QueuedObserver<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> QueuedObserver<T> {
    /// Start the worker thread
    pub fn spawn<F>(name: &str, config: QueueConfig, mut handler: F) -> std::io::Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(config.capacity.max(1)),
                closed: false,
            }),
            ready: Condvar::new(),
            capacity: config.capacity.max(1),
            policy: config.policy,
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("observer-{}", name))
            .spawn(move || loop {
                let item = {
                    let mut state = worker_shared.state.lock();
                    while state.items.is_empty() && !state.closed {
                        worker_shared.ready.wait(&mut state);
                    }
                    match state.items.pop_front() {
                        Some(item) => item,
                        None => break,
                    }
                };
                handler(item);
                worker_shared.delivered.fetch_add(1, Ordering::Relaxed);
            })?;

        log::debug!(
            "Queued observer '{}' started (capacity {}, {:?})",
            name,
            config.capacity,
            config.policy
        );

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Enqueue one item; false if it was dropped
    pub fn push(&self, item: T) -> bool {
        self.shared.push(item)
    }

    /// Callback suitable for `ObserverList::subscribe`
    pub fn callback(&self) -> impl Fn(&T) + Send + Sync + 'static
    where
        T: Clone,
    {
        let shared = Arc::clone(&self.shared);
        move |item: &T| {
            shared.push(item.clone());
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.shared.state.lock().items.len(),
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting items, drain what is queued, join the worker
    pub fn shutdown(mut self) -> QueueStats {
        self.close_and_join();
        self.stats()
    }

    fn close_and_join(&mut self) {
        self.shared.state.lock().closed = true;
        self.shared.ready.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Observer worker panicked");
            }
        }
    }
}

impl<T: Send + 'static> Drop for QueuedObserver<T> {
    fn drop(&mut self) {
        self.close_and_join();
    }
}
