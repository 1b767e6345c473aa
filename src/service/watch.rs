//! Watch operations.
//!
//! A plain watch only sees events committed after it registers. A replay
//! watch first receives every matching entity as a `Replayed` event, read
//! at one commit, then the live events of all later commits. The snapshot
//! read and the registration happen under the commit gate, so no commit
//! can fall between them.

use crate::auth::{Operation, RequestDescriptor};
use crate::errors::{CatalogError, CatalogResult};
use crate::model::{Application, Artifact, DeploymentPackage, Registry};
use crate::realtime::{ListenerId, Subscription, WatchFilter, Watchable};
use crate::store::{CommitId, SnapshotStore, Transaction};

use super::views::{list_applications, list_packages};
use super::{scope, CatalogService};

type Snapshot<T> = Vec<(String, T)>;

impl<S: SnapshotStore> CatalogService<S> {
    pub async fn watch_registries(
        &self,
        filter: WatchFilter,
        replay: bool,
    ) -> CatalogResult<Subscription<Registry>> {
        self.watch(filter, replay, |tx, tenant| {
            Ok(tx
                .registries(tenant)?
                .into_iter()
                .map(|(key, registry)| (key.tenant, registry))
                .collect())
        })
        .await
    }

    pub async fn watch_applications(
        &self,
        filter: WatchFilter,
        replay: bool,
    ) -> CatalogResult<Subscription<Application>> {
        self.watch(filter, replay, list_applications).await
    }

    /// Watch packages. Payloads are read views, including derived
    /// profiles.
    pub async fn watch_packages(
        &self,
        filter: WatchFilter,
        replay: bool,
    ) -> CatalogResult<Subscription<DeploymentPackage>> {
        self.watch(filter, replay, list_packages).await
    }

    pub async fn watch_artifacts(
        &self,
        filter: WatchFilter,
        replay: bool,
    ) -> CatalogResult<Subscription<Artifact>> {
        self.watch(filter, replay, |tx, tenant| {
            Ok(tx
                .artifacts(tenant)?
                .into_iter()
                .map(|(key, artifact)| (key.tenant, artifact))
                .collect())
        })
        .await
    }

    /// Stop a watch. The subscription's receiver drains the events already
    /// queued and then ends.
    pub async fn unwatch<T: Watchable>(&self, id: ListenerId) -> CatalogResult<()> {
        self.dispatcher
            .unsubscribe::<T>(id)
            .await
            .map_err(|_| CatalogError::not_found(T::RESOURCE).with_name(id.to_string()))
    }

    async fn watch<T, F>(&self, filter: WatchFilter, replay: bool, snapshot: F) -> CatalogResult<Subscription<T>>
    where
        T: Watchable,
        F: FnOnce(&dyn Transaction, Option<&str>) -> CatalogResult<Snapshot<T>>,
    {
        let request = RequestDescriptor::new(Operation::Watch, T::RESOURCE, filter.tenant.clone());
        self.authorize(&request).await?;

        if !replay {
            return Ok(self.dispatcher.subscribe(filter).await);
        }

        let _gate = self.gate.lock().await;
        let (items, at) = self.checked(&request, self.snapshot_at(&filter.tenant, snapshot))?;
        Ok(self.dispatcher.subscribe_with_replay(filter, items, at).await)
    }

    /// Read a snapshot together with the commit it reflects
    fn snapshot_at<T, F>(&self, tenant: &str, snapshot: F) -> CatalogResult<(Snapshot<T>, CommitId)>
    where
        F: FnOnce(&dyn Transaction, Option<&str>) -> CatalogResult<Snapshot<T>>,
    {
        let tx = self.store.begin()?;
        match snapshot(tx.as_ref(), scope(tenant)) {
            // Nothing was written, so commit only reports the current identity
            Ok(items) => Ok((items, tx.commit()?)),
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }
}
