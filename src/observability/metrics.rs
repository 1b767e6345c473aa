//! Catalog counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one catalog service
#[derive(Debug, Default)]
pub struct CatalogMetrics {
    /// Committed creates, updates and deletes
    mutations_committed: AtomicU64,
    /// Requests rejected before commit
    mutations_rejected: AtomicU64,
    /// Events handed to listener inboxes
    events_delivered: AtomicU64,
    /// Events not delivered because the listener was removed
    events_dropped: AtomicU64,
    /// Listeners removed after a failed delivery
    listeners_disconnected: AtomicU64,
}

impl CatalogMetrics {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_committed(&self) {
        self.mutations_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_delivered(&self, count: u64) {
        self.events_delivered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_dropped(&self, count: u64) {
        self.events_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_disconnected(&self) {
        self.listeners_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            mutations_committed: self.mutations_committed.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            listeners_disconnected: self.listeners_disconnected.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub mutations_committed: u64,
    pub mutations_rejected: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
    pub listeners_disconnected: u64,
}
