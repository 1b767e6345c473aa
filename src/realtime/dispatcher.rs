//! # Event Dispatcher
//!
//! Fans committed events out to listener inboxes.
//!
//! Inboxes are bounded. A listener whose inbox cannot take an event is
//! removed, so one slow subscriber never stalls the others for longer than
//! the delivery timeout. Events for a batch are delivered in batch order to
//! every matching listener.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::sync::Semaphore;

use crate::model::{Application, Artifact, DeploymentPackage, Registry};
use crate::observability::{CatalogMetrics, Event, Logger};
use crate::store::CommitId;

use super::errors::{RealtimeError, RealtimeResult};
use super::event::{CatalogEvent, EventKind, Watchable};
use super::subscription::{EventReceiver, EventSender, ListenerId, ListenerRegistry, WatchFilter};

/// What to do when a listener inbox is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Remove the listener immediately
    Disconnect,
    /// Wait up to the delivery timeout, then remove the listener
    #[default]
    Block,
}

impl OverflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::Disconnect => "disconnect",
            OverflowPolicy::Block => "block",
        }
    }
}

/// Largest live inbox a listener may be given
pub const MAX_LISTENER_CAPACITY: usize = 1 << 20;

/// Inbox sizing and overflow handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Inbox capacity of a live listener
    pub capacity: usize,
    pub timeout: Duration,
    pub overflow: OverflowPolicy,
}

impl DeliveryPolicy {
    pub fn new(capacity: usize, timeout: Duration, overflow: OverflowPolicy) -> Self {
        Self {
            capacity: capacity.clamp(1, MAX_LISTENER_CAPACITY),
            timeout,
            overflow,
        }
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::new(64, Duration::from_millis(5000), OverflowPolicy::Block)
    }
}

/// Receiving end of a watch
#[derive(Debug)]
pub struct Subscription<T> {
    id: ListenerId,
    receiver: EventReceiver<T>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Wait for the next event. Returns `None` once the listener has been
    /// removed and its inbox drained.
    pub async fn recv(&mut self) -> Option<CatalogEvent<T>> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<CatalogEvent<T>> {
        self.receiver.try_recv().ok()
    }
}

/// Result of dispatching a batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    /// Event/listener pairs that passed the filter
    pub matched: usize,
    /// Events placed in an inbox
    pub delivered: usize,
    /// Matching events not delivered
    pub dropped: usize,
    /// Listeners removed during this batch
    pub disconnected: usize,
}

/// Event dispatcher, one listener registry per entity type
#[derive(Debug)]
pub struct Dispatcher {
    registries: ListenerRegistry<Registry>,
    applications: ListenerRegistry<Application>,
    packages: ListenerRegistry<DeploymentPackage>,
    artifacts: ListenerRegistry<Artifact>,
    policy: DeliveryPolicy,
    metrics: Arc<CatalogMetrics>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DeliveryPolicy::default(), Arc::new(CatalogMetrics::new()))
    }
}

impl Dispatcher {
    pub fn new(policy: DeliveryPolicy, metrics: Arc<CatalogMetrics>) -> Self {
        Self {
            registries: ListenerRegistry::new(),
            applications: ListenerRegistry::new(),
            packages: ListenerRegistry::new(),
            artifacts: ListenerRegistry::new(),
            policy,
            metrics,
        }
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    pub(crate) fn registries(&self) -> &ListenerRegistry<Registry> {
        &self.registries
    }

    pub(crate) fn applications(&self) -> &ListenerRegistry<Application> {
        &self.applications
    }

    pub(crate) fn packages(&self) -> &ListenerRegistry<DeploymentPackage> {
        &self.packages
    }

    pub(crate) fn artifacts(&self) -> &ListenerRegistry<Artifact> {
        &self.artifacts
    }

    /// Register a listener for live events only
    pub async fn subscribe<T: Watchable>(&self, filter: WatchFilter) -> Subscription<T> {
        let (sender, receiver) = mpsc::channel(self.policy.capacity);
        let id = self.register(filter, sender).await;
        Subscription { id, receiver }
    }

    /// Register a listener whose inbox is pre-filled with the matching part
    /// of `snapshot`, read at commit `at`.
    ///
    /// The caller must prevent commits between reading the snapshot and this
    /// call returning, otherwise the listener could miss or double-see a
    /// change.
    pub async fn subscribe_with_replay<T: Watchable>(
        &self,
        filter: WatchFilter,
        snapshot: Vec<(String, T)>,
        at: CommitId,
    ) -> Subscription<T> {
        let replayed: Vec<CatalogEvent<T>> = snapshot
            .into_iter()
            .filter(|(tenant, payload)| filter.matches(tenant, payload))
            .map(|(tenant, payload)| CatalogEvent::new(EventKind::Replayed, tenant, at, payload))
            .collect();

        // Room for the whole snapshot plus the regular live capacity
        let capacity = self
            .policy
            .capacity
            .saturating_add(replayed.len())
            .min(Semaphore::MAX_PERMITS);
        let (sender, receiver) = mpsc::channel(capacity);
        for event in replayed {
            // Cannot fail: capacity covers the snapshot and the receiver is held here
            let _ = sender.try_send(event);
        }
        let id = self.register(filter, sender).await;
        Subscription { id, receiver }
    }

    async fn register<T: Watchable>(&self, filter: WatchFilter, sender: EventSender<T>) -> ListenerId {
        let tenant = filter.tenant.clone();
        let id = T::listeners(self).register(filter, sender).await;
        let listener = id.to_string();
        Logger::info(
            Event::ListenerRegistered.as_str(),
            &[
                ("listener", listener.as_str()),
                ("resource", T::RESOURCE.as_str()),
                ("tenant", tenant.as_str()),
            ],
        );
        id
    }

    /// Remove a listener on request of its owner
    pub async fn unsubscribe<T: Watchable>(&self, id: ListenerId) -> RealtimeResult<()> {
        if !T::listeners(self).unregister(id).await {
            return Err(RealtimeError::ListenerNotFound(id.to_string()));
        }
        let listener = id.to_string();
        Logger::info(
            Event::ListenerRemoved.as_str(),
            &[
                ("listener", listener.as_str()),
                ("reason", "unsubscribed"),
                ("resource", T::RESOURCE.as_str()),
            ],
        );
        Ok(())
    }

    /// Number of listeners registered for `T`
    pub async fn listener_count<T: Watchable>(&self) -> usize {
        T::listeners(self).len().await
    }

    /// Deliver a committed batch to every matching listener.
    ///
    /// Listeners that fail a delivery get nothing more from this batch and
    /// are removed once the batch is done.
    pub async fn send_all<T: Watchable>(&self, events: Vec<CatalogEvent<T>>) -> DispatchResult {
        let mut result = DispatchResult::default();
        if events.is_empty() {
            return result;
        }

        let registry = T::listeners(self);
        let mut failed: HashMap<ListenerId, RealtimeError> = HashMap::new();
        {
            let listeners = registry.read().await;
            for event in &events {
                for (id, listener) in listeners.iter() {
                    if !listener.filter.matches(&event.tenant, &event.payload) {
                        continue;
                    }
                    result.matched += 1;
                    if failed.contains_key(id) {
                        result.dropped += 1;
                        continue;
                    }
                    match self.deliver(&listener.sender, event.clone()).await {
                        Ok(()) => result.delivered += 1,
                        Err(err) => {
                            result.dropped += 1;
                            failed.insert(*id, err);
                        }
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut listeners = registry.write().await;
            for (id, err) in &failed {
                if listeners.remove(id).is_none() {
                    continue;
                }
                result.disconnected += 1;
                self.metrics.increment_disconnected();
                let listener = id.to_string();
                Logger::warn(
                    Event::ListenerRemoved.as_str(),
                    &[
                        ("listener", listener.as_str()),
                        ("reason", err.code()),
                        ("resource", T::RESOURCE.as_str()),
                    ],
                );
            }
        }

        self.metrics.add_delivered(result.delivered as u64);
        if result.dropped > 0 {
            self.metrics.add_dropped(result.dropped as u64);
            let dropped = result.dropped.to_string();
            Logger::warn(
                Event::EventDropped.as_str(),
                &[("count", dropped.as_str()), ("resource", T::RESOURCE.as_str())],
            );
        }
        result
    }

    async fn deliver<T>(&self, sender: &EventSender<T>, event: CatalogEvent<T>) -> RealtimeResult<()> {
        match self.policy.overflow {
            OverflowPolicy::Disconnect => sender.try_send(event).map_err(|err| match err {
                TrySendError::Full(_) => RealtimeError::InboxFull(self.policy.capacity),
                TrySendError::Closed(_) => RealtimeError::ReceiverClosed,
            }),
            OverflowPolicy::Block => {
                sender
                    .send_timeout(event, self.policy.timeout)
                    .await
                    .map_err(|err| match err {
                        SendTimeoutError::Timeout(_) => {
                            RealtimeError::DeliveryTimeout(self.policy.timeout.as_millis() as u64)
                        }
                        SendTimeoutError::Closed(_) => RealtimeError::ReceiverClosed,
                    })
            }
        }
    }
}
