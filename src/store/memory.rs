//! # In-Memory Snapshot Store
//!
//! A transaction takes the writer lock, works on a private copy of the
//! committed tables, and publishes the copy on commit. Transactions are
//! therefore fully serialized.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::model::{Artifact, Profile, Registry, ResourceType};

use super::commit::{CommitAuthority, CommitId};
use super::errors::{StoreError, StoreResult};
use super::records::{
    ApplicationRecord, DeploymentProfileRecord, PackageCollection, PackageFacet, PackageRecord,
    RecordKey,
};
use super::{SnapshotStore, Transaction};

/// A keyed table that remembers insertion order.
#[derive(Debug, Clone)]
struct Table<K, V> {
    rows: BTreeMap<K, Row<V>>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct Row<V> {
    seq: u64,
    value: V,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Ord + Clone, V: Clone> Table<K, V> {
    fn get(&self, key: &K) -> Option<V> {
        self.rows.get(key).map(|row| row.value.clone())
    }

    /// Returns false if the key is taken
    fn insert(&mut self, key: K, value: V) -> bool {
        if self.rows.contains_key(&key) {
            return false;
        }
        self.put(key, value);
        true
    }

    /// Upsert, keeping the original position of an existing row
    fn put(&mut self, key: K, value: V) {
        match self.rows.get_mut(&key) {
            Some(row) => row.value = value,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.rows.insert(key, Row { seq, value });
            }
        }
    }

    fn remove(&mut self, key: &K) -> bool {
        self.rows.remove(key).is_some()
    }

    /// Rows accepted by `filter`, in key order
    fn select(&self, filter: impl Fn(&K) -> bool) -> Vec<(K, V)> {
        self.rows
            .iter()
            .filter(|(k, _)| filter(k))
            .map(|(k, row)| (k.clone(), row.value.clone()))
            .collect()
    }

    /// Rows accepted by `filter`, in insertion order
    fn select_ordered(&self, filter: impl Fn(&K) -> bool) -> Vec<V> {
        let mut rows: Vec<&Row<V>> = self
            .rows
            .iter()
            .filter(|(k, _)| filter(k))
            .map(|(_, row)| row)
            .collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| row.value.clone()).collect()
    }

    fn retain(&mut self, keep: impl Fn(&K) -> bool) {
        self.rows.retain(|k, _| keep(k));
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    registries: Table<RecordKey, Registry>,
    applications: Table<RecordKey, ApplicationRecord>,
    profiles: Table<(RecordKey, String), Profile>,
    packages: Table<RecordKey, PackageRecord>,
    package_collections: Table<(RecordKey, PackageFacet), PackageCollection>,
    deployment_profiles: Table<(RecordKey, String), DeploymentProfileRecord>,
    artifacts: Table<RecordKey, Artifact>,
    authority: CommitAuthority,
}

/// In-process snapshot store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    committed_writes: AtomicU64,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row writes published by committed transactions
    pub fn committed_writes(&self) -> u64 {
        self.committed_writes.load(Ordering::SeqCst)
    }

    /// Identity of the latest commit
    pub fn last_commit(&self) -> CommitId {
        self.tables
            .lock()
            .map(|tables| tables.authority.highest())
            .unwrap_or(CommitId::ZERO)
    }

    /// Make the next commit fail with `StoreError::Unavailable`.
    pub fn inject_commit_failure(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl SnapshotStore for MemoryStore {
    fn begin(&self) -> StoreResult<Box<dyn Transaction + '_>> {
        let committed = self
            .tables
            .lock()
            .map_err(|_| StoreError::Internal("store lock poisoned".into()))?;
        let working = committed.clone();
        Ok(Box::new(MemoryTransaction {
            store: self,
            committed,
            working,
            writes: 0,
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    committed: MutexGuard<'a, Tables>,
    working: Tables,
    writes: u64,
}

impl MemoryTransaction<'_> {
    fn wrote(&mut self) {
        self.writes += 1;
    }
}

fn constraint(resource: ResourceType, key: &RecordKey) -> StoreError {
    StoreError::Constraint {
        resource,
        name: key.name.clone(),
        version: key.version.clone(),
    }
}

fn in_tenant(key: &RecordKey, tenant: Option<&str>) -> bool {
    tenant.map_or(true, |t| key.tenant == t)
}

fn require_owner<V: Clone>(
    table: &Table<RecordKey, V>,
    resource: ResourceType,
    owner: &RecordKey,
) -> StoreResult<()> {
    if table.rows.contains_key(owner) {
        Ok(())
    } else {
        Err(StoreError::NotFound {
            resource,
            name: owner.name.clone(),
            version: owner.version.clone(),
        })
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn registry(&self, key: &RecordKey) -> StoreResult<Option<Registry>> {
        Ok(self.working.registries.get(key))
    }

    fn registries(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, Registry)>> {
        Ok(self.working.registries.select(|k| in_tenant(k, tenant)))
    }

    fn insert_registry(&mut self, key: RecordKey, registry: Registry) -> StoreResult<()> {
        if !self.working.registries.insert(key.clone(), registry) {
            return Err(constraint(ResourceType::Registry, &key));
        }
        self.wrote();
        Ok(())
    }

    fn put_registry(&mut self, key: RecordKey, registry: Registry) -> StoreResult<()> {
        self.working.registries.put(key, registry);
        self.wrote();
        Ok(())
    }

    fn delete_registry(&mut self, key: &RecordKey) -> StoreResult<bool> {
        let existed = self.working.registries.remove(key);
        if existed {
            self.wrote();
        }
        Ok(existed)
    }

    fn application(&self, key: &RecordKey) -> StoreResult<Option<ApplicationRecord>> {
        Ok(self.working.applications.get(key))
    }

    fn applications(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, ApplicationRecord)>> {
        Ok(self.working.applications.select(|k| in_tenant(k, tenant)))
    }

    fn insert_application(&mut self, key: RecordKey, record: ApplicationRecord) -> StoreResult<()> {
        if !self.working.applications.insert(key.clone(), record) {
            return Err(constraint(ResourceType::Application, &key));
        }
        self.wrote();
        Ok(())
    }

    fn put_application(&mut self, key: RecordKey, record: ApplicationRecord) -> StoreResult<()> {
        self.working.applications.put(key, record);
        self.wrote();
        Ok(())
    }

    fn delete_application(&mut self, key: &RecordKey) -> StoreResult<bool> {
        let existed = self.working.applications.remove(key);
        if existed {
            self.working.profiles.retain(|(owner, _)| owner != key);
            self.wrote();
        }
        Ok(existed)
    }

    fn profiles(&self, application: &RecordKey) -> StoreResult<Vec<Profile>> {
        Ok(self
            .working
            .profiles
            .select_ordered(|(owner, _)| owner == application))
    }

    fn insert_profile(&mut self, application: &RecordKey, profile: Profile) -> StoreResult<()> {
        require_owner(&self.working.applications, ResourceType::Application, application)?;
        let key = (application.clone(), profile.name.clone());
        if !self.working.profiles.insert(key, profile.clone()) {
            return Err(StoreError::Constraint {
                resource: ResourceType::Profile,
                name: profile.name,
                version: String::new(),
            });
        }
        self.wrote();
        Ok(())
    }

    fn put_profile(&mut self, application: &RecordKey, profile: Profile) -> StoreResult<()> {
        require_owner(&self.working.applications, ResourceType::Application, application)?;
        let key = (application.clone(), profile.name.clone());
        self.working.profiles.put(key, profile);
        self.wrote();
        Ok(())
    }

    fn delete_profile(&mut self, application: &RecordKey, name: &str) -> StoreResult<bool> {
        let existed = self
            .working
            .profiles
            .remove(&(application.clone(), name.to_string()));
        if existed {
            self.wrote();
        }
        Ok(existed)
    }

    fn package(&self, key: &RecordKey) -> StoreResult<Option<PackageRecord>> {
        Ok(self.working.packages.get(key))
    }

    fn packages(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, PackageRecord)>> {
        Ok(self.working.packages.select(|k| in_tenant(k, tenant)))
    }

    fn insert_package(&mut self, key: RecordKey, record: PackageRecord) -> StoreResult<()> {
        if !self.working.packages.insert(key.clone(), record) {
            return Err(constraint(ResourceType::DeploymentPackage, &key));
        }
        self.wrote();
        Ok(())
    }

    fn put_package(&mut self, key: RecordKey, record: PackageRecord) -> StoreResult<()> {
        self.working.packages.put(key, record);
        self.wrote();
        Ok(())
    }

    fn delete_package(&mut self, key: &RecordKey) -> StoreResult<bool> {
        let existed = self.working.packages.remove(key);
        if existed {
            self.working.package_collections.retain(|(owner, _)| owner != key);
            self.working.deployment_profiles.retain(|(owner, _)| owner != key);
            self.wrote();
        }
        Ok(existed)
    }

    fn package_collection(
        &self,
        package: &RecordKey,
        facet: PackageFacet,
    ) -> StoreResult<Option<PackageCollection>> {
        Ok(self
            .working
            .package_collections
            .get(&(package.clone(), facet)))
    }

    fn put_package_collection(
        &mut self,
        package: &RecordKey,
        collection: PackageCollection,
    ) -> StoreResult<()> {
        require_owner(&self.working.packages, ResourceType::DeploymentPackage, package)?;
        let key = (package.clone(), collection.facet());
        self.working.package_collections.put(key, collection);
        self.wrote();
        Ok(())
    }

    fn deployment_profiles(&self, package: &RecordKey) -> StoreResult<Vec<DeploymentProfileRecord>> {
        Ok(self
            .working
            .deployment_profiles
            .select_ordered(|(owner, _)| owner == package))
    }

    fn insert_deployment_profile(
        &mut self,
        package: &RecordKey,
        profile: DeploymentProfileRecord,
    ) -> StoreResult<()> {
        require_owner(&self.working.packages, ResourceType::DeploymentPackage, package)?;
        let key = (package.clone(), profile.name.clone());
        if !self.working.deployment_profiles.insert(key, profile.clone()) {
            return Err(StoreError::Constraint {
                resource: ResourceType::DeploymentProfile,
                name: profile.name,
                version: String::new(),
            });
        }
        self.wrote();
        Ok(())
    }

    fn put_deployment_profile(
        &mut self,
        package: &RecordKey,
        profile: DeploymentProfileRecord,
    ) -> StoreResult<()> {
        require_owner(&self.working.packages, ResourceType::DeploymentPackage, package)?;
        let key = (package.clone(), profile.name.clone());
        self.working.deployment_profiles.put(key, profile);
        self.wrote();
        Ok(())
    }

    fn delete_deployment_profile(&mut self, package: &RecordKey, name: &str) -> StoreResult<bool> {
        let existed = self
            .working
            .deployment_profiles
            .remove(&(package.clone(), name.to_string()));
        if existed {
            self.wrote();
        }
        Ok(existed)
    }

    fn artifact(&self, key: &RecordKey) -> StoreResult<Option<Artifact>> {
        Ok(self.working.artifacts.get(key))
    }

    fn artifacts(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, Artifact)>> {
        Ok(self.working.artifacts.select(|k| in_tenant(k, tenant)))
    }

    fn insert_artifact(&mut self, key: RecordKey, artifact: Artifact) -> StoreResult<()> {
        if !self.working.artifacts.insert(key.clone(), artifact) {
            return Err(constraint(ResourceType::Artifact, &key));
        }
        self.wrote();
        Ok(())
    }

    fn put_artifact(&mut self, key: RecordKey, artifact: Artifact) -> StoreResult<()> {
        self.working.artifacts.put(key, artifact);
        self.wrote();
        Ok(())
    }

    fn delete_artifact(&mut self, key: &RecordKey) -> StoreResult<bool> {
        let existed = self.working.artifacts.remove(key);
        if existed {
            self.wrote();
        }
        Ok(existed)
    }

    fn commit(self: Box<Self>) -> StoreResult<CommitId> {
        let MemoryTransaction {
            store,
            mut committed,
            mut working,
            writes,
        } = *self;

        if store.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        if writes == 0 {
            return Ok(committed.authority.highest());
        }

        let id = working.authority.assign();
        *committed = working;
        store.committed_writes.fetch_add(writes, Ordering::SeqCst);
        Ok(id)
    }

    fn rollback(self: Box<Self>) {}
}
