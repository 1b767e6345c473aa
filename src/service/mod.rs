//! # Catalog Service
//!
//! The mutation orchestrator. Every request follows the same flow:
//!
//! 1. Validate the request shape
//! 2. Ask the authorization oracle
//! 3. Take the commit gate and open a transaction
//! 4. Create: write the root and every child collection. Update: read the
//!    snapshot, diff, run the guards, write only the facets that changed
//! 5. Append the event, commit or roll back
//! 6. Hand the sealed events to the dispatcher, release the gate
//!
//! The commit gate serializes writers with each other and with replay
//! subscriptions, so events reach listeners in commit order and a replay
//! snapshot is never interleaved with a commit.

mod application;
mod artifact;
mod package;
mod registry;
mod views;
mod watch;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::{AllowAll, AuthorizationOracle, Decision, Operation, RequestDescriptor};
use crate::config::CatalogConfig;
use crate::content::{ContentValidator, NoopValidator, ScanVerdict};
use crate::errors::{CatalogError, CatalogResult};
use crate::model::ResourceType;
use crate::observability::{log_activity, CatalogMetrics, Event, Logger};
use crate::realtime::{CatalogEvent, Dispatcher, EventKind, EventQueue, Watchable};
use crate::store::{RecordKey, SnapshotStore, Transaction};

/// Catalog service over a snapshot store
pub struct CatalogService<S: SnapshotStore> {
    store: Arc<S>,
    dispatcher: Dispatcher,
    oracle: Arc<dyn AuthorizationOracle>,
    validator: Arc<dyn ContentValidator>,
    config: CatalogConfig,
    metrics: Arc<CatalogMetrics>,
    /// Held from transaction begin until the events are dispatched
    gate: Mutex<()>,
}

impl<S: SnapshotStore> CatalogService<S> {
    /// Create a service that allows every request and accepts every payload
    pub fn new(store: Arc<S>, config: CatalogConfig) -> Self {
        let metrics = Arc::new(CatalogMetrics::new());
        Self {
            store,
            dispatcher: Dispatcher::new(config.delivery_policy(), Arc::clone(&metrics)),
            oracle: Arc::new(AllowAll),
            validator: Arc::new(NoopValidator),
            config,
            metrics,
            gate: Mutex::new(()),
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn AuthorizationOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ContentValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<CatalogMetrics> {
        &self.metrics
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Ask the oracle; a denial is logged and counted like any rejection.
    async fn authorize(&self, request: &RequestDescriptor) -> CatalogResult<()> {
        match self.oracle.check(request).await {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                let err = CatalogError::permission_denied(request.resource, reason)
                    .with_identity(&request.name, &request.version);
                self.reject(request, &err);
                Err(err)
            }
        }
    }

    /// Scan an artifact payload. An unreachable scanner fails the request
    /// unless the service is configured permissive.
    async fn scan(&self, request: &RequestDescriptor, data: &[u8]) -> CatalogResult<()> {
        let err = match self.validator.scan(data).await {
            ScanVerdict::Clean => return Ok(()),
            ScanVerdict::Infected(finding) => CatalogError::invalid_argument(
                ResourceType::Artifact,
                format!("artifact rejected by content validator: {}", finding),
            ),
            ScanVerdict::Unavailable(reason) if self.config.content_validator_permissive => {
                Logger::warn(
                    Event::ValidatorBypassed.as_str(),
                    &[("name", request.name.as_str()), ("reason", reason.as_str())],
                );
                return Ok(());
            }
            ScanVerdict::Unavailable(reason) => CatalogError::unavailable(
                ResourceType::Artifact,
                format!("content validator unavailable: {}", reason),
            ),
        };
        let err = err.with_name(&request.name);
        self.reject(request, &err);
        Err(err)
    }

    /// Run `apply` in one transaction under the commit gate and dispatch
    /// the events it queued once the commit succeeded.
    ///
    /// Any error rolls the transaction back; nothing is dispatched.
    async fn mutate<T, R, F>(&self, request: &RequestDescriptor, apply: F) -> CatalogResult<R>
    where
        T: Watchable,
        F: FnOnce(&mut dyn Transaction, &mut EventQueue<T>) -> CatalogResult<R>,
    {
        let _gate = self.gate.lock().await;

        let (value, events) = match self.run_transaction(apply) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.reject(request, &err);
                return Err(err);
            }
        };

        for event in &events {
            self.record(request, event);
        }
        self.dispatcher.send_all(events).await;
        Ok(value)
    }

    fn run_transaction<T, R, F>(&self, apply: F) -> CatalogResult<(R, Vec<CatalogEvent<T>>)>
    where
        F: FnOnce(&mut dyn Transaction, &mut EventQueue<T>) -> CatalogResult<R>,
    {
        let mut tx = self.store.begin()?;
        let mut queue = EventQueue::new();

        match apply(tx.as_mut(), &mut queue) {
            Ok(value) => {
                let commit = tx.commit()?;
                Ok((value, queue.seal(commit)))
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Run a read-only closure against a fresh snapshot
    fn read<R>(&self, view: impl FnOnce(&dyn Transaction) -> CatalogResult<R>) -> CatalogResult<R> {
        let tx = self.store.begin()?;
        let result = view(tx.as_ref());
        tx.rollback();
        result
    }

    fn record<T: Watchable>(&self, request: &RequestDescriptor, event: &CatalogEvent<T>) {
        self.metrics.increment_committed();
        let operation = match event.kind {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
            EventKind::Replayed => "replayed",
        };
        log_activity(
            operation,
            T::RESOURCE.as_str(),
            &event.tenant,
            &request.name,
            &request.version,
        );
    }

    /// Pass a shape check through, logging it as a rejection on failure
    fn checked<R>(&self, request: &RequestDescriptor, result: CatalogResult<R>) -> CatalogResult<R> {
        result.map_err(|err| {
            self.reject(request, &err);
            err
        })
    }

    fn reject(&self, request: &RequestDescriptor, err: &CatalogError) {
        self.metrics.increment_rejected();
        let operation = request.operation_name();
        let message = err.to_string();
        Logger::warn(
            Event::Rejected.as_str(),
            &[
                ("code", err.code()),
                ("error", message.as_str()),
                ("name", request.name.as_str()),
                ("operation", operation.as_str()),
                ("tenant", request.tenant.as_str()),
                ("version", request.version.as_str()),
            ],
        );
    }
}

/// Tenant scope for listings; empty means every tenant
fn scope(tenant: &str) -> Option<&str> {
    if tenant.is_empty() {
        None
    } else {
        Some(tenant)
    }
}

fn missing(resource: ResourceType, key: &RecordKey) -> CatalogError {
    CatalogError::not_found(resource).with_identity(&key.name, &key.version)
}

/// Build the descriptor for a request against one entity
fn describe(
    operation: Operation,
    resource: ResourceType,
    tenant: &str,
    name: &str,
    version: &str,
) -> RequestDescriptor {
    RequestDescriptor::new(operation, resource, tenant).with_target(name, version)
}
