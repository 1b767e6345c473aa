//! # Listener Registry
//!
//! One registry per entity type, mapping listener handles to their filter
//! and inbox. All access goes through a single async read/write lock:
//! delivery holds the read side, registration and removal the write side.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::model::Kind;

use super::event::{CatalogEvent, Watchable};

/// Which events a listener wants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchFilter {
    /// Tenant to watch; empty watches every tenant
    pub tenant: String,
    /// Kinds to watch; empty watches every kind. Ignored for entity types
    /// without a kind.
    pub kinds: Vec<Kind>,
}

impl WatchFilter {
    /// Watch everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Watch one tenant
    pub fn tenant(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            kinds: Vec::new(),
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Check if an event for `tenant` carrying `payload` passes this filter
    pub fn matches<T: Watchable>(&self, tenant: &str, payload: &T) -> bool {
        if !self.tenant.is_empty() && self.tenant != tenant {
            return false;
        }
        match payload.kind() {
            Some(kind) => self.kinds.is_empty() || self.kinds.contains(&kind),
            None => true,
        }
    }
}

/// Handle identifying a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sender half of a listener inbox
pub type EventSender<T> = mpsc::Sender<CatalogEvent<T>>;

/// Receiver half of a listener inbox
pub type EventReceiver<T> = mpsc::Receiver<CatalogEvent<T>>;

/// A registered listener
#[derive(Debug)]
pub(crate) struct Listener<T> {
    pub(crate) filter: WatchFilter,
    pub(crate) sender: EventSender<T>,
}

pub(crate) type ListenerMap<T> = HashMap<ListenerId, Listener<T>>;

/// Registry of listeners for one entity type
#[derive(Debug)]
pub struct ListenerRegistry<T> {
    listeners: RwLock<ListenerMap<T>>,
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Watchable> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    pub async fn register(&self, filter: WatchFilter, sender: EventSender<T>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners
            .write()
            .await
            .insert(id, Listener { filter, sender });
        id
    }

    /// Remove a listener. The inbox is not closed explicitly; it closes
    /// once the registry's sender is dropped and the subscriber drains it.
    pub async fn unregister(&self, id: ListenerId) -> bool {
        self.listeners.write().await.remove(&id).is_some()
    }

    /// Get listener count
    pub async fn len(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Check if empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, id: ListenerId) -> bool {
        self.listeners.read().await.contains_key(&id)
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, ListenerMap<T>> {
        self.listeners.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, ListenerMap<T>> {
        self.listeners.write().await
    }
}
