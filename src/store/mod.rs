//! # Snapshot Store
//!
//! Transactional access to persisted aggregates and their child collections.
//!
//! The catalog never talks to a backend directly; it opens a [`Transaction`]
//! through a [`SnapshotStore`], reads the persisted snapshot, writes the
//! facets that changed, and commits or rolls back. Roots are keyed by
//! `(tenant, name, version)`; unversioned roots use an empty version.
//!
//! [`MemoryStore`] is the in-process implementation.

mod commit;
mod errors;
mod memory;
mod records;

pub use commit::{CommitAuthority, CommitId};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use records::{
    ApplicationRecord, DeploymentProfileRecord, PackageCollection, PackageFacet, PackageRecord,
    ProfileBinding, RecordKey,
};

use crate::model::{Artifact, Profile, Registry};

/// A source of transactions.
pub trait SnapshotStore: Send + Sync {
    /// Open a transaction. Reads inside it observe a stable snapshot and
    /// writes stay private until `commit`.
    fn begin(&self) -> StoreResult<Box<dyn Transaction + '_>>;
}

/// One unit of isolation.
///
/// `insert_*` fails with [`StoreError::Constraint`] on a duplicate key,
/// `put_*` upserts, and `delete_*` reports whether a row existed. Deleting a
/// root also deletes the rows it owns.
pub trait Transaction {
    // ==================
    // Registries
    // ==================
    fn registry(&self, key: &RecordKey) -> StoreResult<Option<Registry>>;
    fn registries(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, Registry)>>;
    fn insert_registry(&mut self, key: RecordKey, registry: Registry) -> StoreResult<()>;
    fn put_registry(&mut self, key: RecordKey, registry: Registry) -> StoreResult<()>;
    fn delete_registry(&mut self, key: &RecordKey) -> StoreResult<bool>;

    // ==================
    // Applications
    // ==================
    fn application(&self, key: &RecordKey) -> StoreResult<Option<ApplicationRecord>>;
    fn applications(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, ApplicationRecord)>>;
    fn insert_application(&mut self, key: RecordKey, record: ApplicationRecord) -> StoreResult<()>;
    fn put_application(&mut self, key: RecordKey, record: ApplicationRecord) -> StoreResult<()>;
    fn delete_application(&mut self, key: &RecordKey) -> StoreResult<bool>;

    /// Profiles of an application in stored order
    fn profiles(&self, application: &RecordKey) -> StoreResult<Vec<Profile>>;
    fn insert_profile(&mut self, application: &RecordKey, profile: Profile) -> StoreResult<()>;
    fn put_profile(&mut self, application: &RecordKey, profile: Profile) -> StoreResult<()>;
    fn delete_profile(&mut self, application: &RecordKey, name: &str) -> StoreResult<bool>;

    // ==================
    // Deployment Packages
    // ==================
    fn package(&self, key: &RecordKey) -> StoreResult<Option<PackageRecord>>;
    fn packages(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, PackageRecord)>>;
    fn insert_package(&mut self, key: RecordKey, record: PackageRecord) -> StoreResult<()>;
    fn put_package(&mut self, key: RecordKey, record: PackageRecord) -> StoreResult<()>;
    fn delete_package(&mut self, key: &RecordKey) -> StoreResult<bool>;

    fn package_collection(
        &self,
        package: &RecordKey,
        facet: PackageFacet,
    ) -> StoreResult<Option<PackageCollection>>;
    fn put_package_collection(
        &mut self,
        package: &RecordKey,
        collection: PackageCollection,
    ) -> StoreResult<()>;

    /// Deployment profiles of a package in stored order
    fn deployment_profiles(&self, package: &RecordKey) -> StoreResult<Vec<DeploymentProfileRecord>>;
    fn insert_deployment_profile(
        &mut self,
        package: &RecordKey,
        profile: DeploymentProfileRecord,
    ) -> StoreResult<()>;
    fn put_deployment_profile(
        &mut self,
        package: &RecordKey,
        profile: DeploymentProfileRecord,
    ) -> StoreResult<()>;
    fn delete_deployment_profile(&mut self, package: &RecordKey, name: &str) -> StoreResult<bool>;

    // ==================
    // Artifacts
    // ==================
    fn artifact(&self, key: &RecordKey) -> StoreResult<Option<Artifact>>;
    fn artifacts(&self, tenant: Option<&str>) -> StoreResult<Vec<(RecordKey, Artifact)>>;
    fn insert_artifact(&mut self, key: RecordKey, artifact: Artifact) -> StoreResult<()>;
    fn put_artifact(&mut self, key: RecordKey, artifact: Artifact) -> StoreResult<()>;
    fn delete_artifact(&mut self, key: &RecordKey) -> StoreResult<bool>;

    // ==================
    // Completion
    // ==================
    /// Publish all writes. A transaction without writes keeps the current
    /// commit identity.
    fn commit(self: Box<Self>) -> StoreResult<CommitId>;

    /// Discard all writes
    fn rollback(self: Box<Self>);
}
