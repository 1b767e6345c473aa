//! # Catalog Events
//!
//! Events describing committed mutations, and the per-request queue that
//! collects them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Application, Artifact, DeploymentPackage, Kind, Registry, ResourceType};
use crate::store::CommitId;

use super::dispatcher::Dispatcher;
use super::subscription::ListenerRegistry;

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
    /// Snapshot of existing state sent to a new subscriber
    Replayed,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Created => write!(f, "created"),
            EventKind::Updated => write!(f, "updated"),
            EventKind::Deleted => write!(f, "deleted"),
            EventKind::Replayed => write!(f, "replayed"),
        }
    }
}

/// An event delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEvent<T> {
    pub kind: EventKind,

    /// Tenant owning the entity
    pub tenant: String,

    /// Commit that produced the event; for replayed events, the commit the
    /// snapshot was read at
    pub commit: CommitId,

    /// Entity after the change; for deletions, the entity as last stored
    pub payload: T,

    pub timestamp: DateTime<Utc>,
}

impl<T> CatalogEvent<T> {
    pub fn new(kind: EventKind, tenant: impl Into<String>, commit: CommitId, payload: T) -> Self {
        Self {
            kind,
            tenant: tenant.into(),
            commit,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Entities that can be watched.
pub trait Watchable: Clone + Send + Sync + 'static {
    /// Entity type, for logs and metrics
    const RESOURCE: ResourceType;

    /// Kind used by kind filters; `None` for entities without a kind
    fn kind(&self) -> Option<Kind> {
        None
    }

    /// Listener registry for this entity type
    fn listeners(dispatcher: &Dispatcher) -> &ListenerRegistry<Self>;
}

/// Per-request ordered list of pending events.
///
/// Events can only leave the queue through [`EventQueue::seal`], which needs
/// the identity of the commit that made them durable.
#[derive(Debug)]
pub struct EventQueue<T> {
    pending: Vec<(EventKind, String, T)>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event for a write that just succeeded
    pub fn append(&mut self, kind: EventKind, tenant: impl Into<String>, payload: T) {
        self.pending.push((kind, tenant.into(), payload));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Release the events of a committed transaction, in append order
    pub fn seal(self, commit: CommitId) -> Vec<CatalogEvent<T>> {
        self.pending
            .into_iter()
            .map(|(kind, tenant, payload)| CatalogEvent::new(kind, tenant, commit, payload))
            .collect()
    }
}

impl Watchable for Registry {
    const RESOURCE: ResourceType = ResourceType::Registry;

    fn listeners(dispatcher: &Dispatcher) -> &ListenerRegistry<Self> {
        dispatcher.registries()
    }
}

impl Watchable for Application {
    const RESOURCE: ResourceType = ResourceType::Application;

    fn kind(&self) -> Option<Kind> {
        Some(self.kind)
    }

    fn listeners(dispatcher: &Dispatcher) -> &ListenerRegistry<Self> {
        dispatcher.applications()
    }
}

impl Watchable for DeploymentPackage {
    const RESOURCE: ResourceType = ResourceType::DeploymentPackage;

    fn kind(&self) -> Option<Kind> {
        Some(self.kind)
    }

    fn listeners(dispatcher: &Dispatcher) -> &ListenerRegistry<Self> {
        dispatcher.packages()
    }
}

impl Watchable for Artifact {
    const RESOURCE: ResourceType = ResourceType::Artifact;

    fn listeners(dispatcher: &Dispatcher) -> &ListenerRegistry<Self> {
        dispatcher.artifacts()
    }
}
