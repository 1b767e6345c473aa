//! Deployment package operations.

use chrono::{DateTime, Utc};

use crate::auth::Operation;
use crate::diff::{diff_package, PackageChanges};
use crate::errors::{CatalogError, CatalogResult};
use crate::guard::{
    require_application_references_resolvable, require_artifact_references_resolvable,
    require_consistent_profile_key_style, require_default_namespaces_resolvable,
    require_default_profile_resolvable, require_deployment_profile_unrequired,
    require_dependency_endpoints_resolvable, require_not_deployed, require_package_unrequired,
    require_unique_deployment_profiles, require_unique_display_name, resolve_deployment_profile,
};
use crate::model::{
    resolve_display_name, validate_name, validate_version, DeploymentPackage, Kind, ResourceType,
};
use crate::realtime::EventKind;
use crate::store::{
    DeploymentProfileRecord, PackageCollection, RecordKey, SnapshotStore, Transaction,
};

use super::views::{
    derive_package_view, list_packages, load_package, package_collections, package_record,
    read_package,
};
use super::{describe, missing, scope, CatalogService};

impl<S: SnapshotStore> CatalogService<S> {
    /// Create a deployment package with every child collection.
    pub async fn create_package(
        &self,
        tenant: &str,
        package: DeploymentPackage,
    ) -> CatalogResult<DeploymentPackage> {
        let request = describe(
            Operation::Create,
            ResourceType::DeploymentPackage,
            tenant,
            &package.name,
            &package.version,
        );
        let mut package = self.checked(&request, normalize(package))?;
        package.kind = package.kind.or_normal();
        self.authorize(&request).await?;

        self.mutate::<DeploymentPackage, _, _>(&request, |tx, queue| {
            let key = RecordKey::versioned(tenant, package.name.clone(), package.version.clone());
            if tx.package(&key)?.is_some() {
                return Err(CatalogError::already_exists(ResourceType::DeploymentPackage)
                    .with_identity(&key.name, &key.version));
            }

            require_unique_package_display_name(tx, &key, &package)?;
            require_application_references_resolvable(tx, &key, &package.application_references)?;
            require_dependency_endpoints_resolvable(
                &key,
                &package.application_dependencies,
                &package.application_references,
                &[],
            )?;
            require_default_namespaces_resolvable(
                &key,
                &package.default_namespaces,
                &package.application_references,
            )?;
            let profiles = check_deployment_profiles(tx, &key, &package)?;
            require_artifact_references_resolvable(tx, &key, &package.artifacts)?;

            let now = Utc::now();
            tx.insert_package(key.clone(), package_record(&package, package.kind, now, now))?;
            for collection in package_collections(&package) {
                tx.put_package_collection(&key, collection)?;
            }
            for profile in profiles {
                tx.insert_deployment_profile(&key, profile)?;
            }

            let view = read_package(tx, &key)?
                .ok_or_else(|| missing(ResourceType::DeploymentPackage, &key))?;
            queue.append(EventKind::Created, tenant, view.clone());
            Ok(view)
        })
        .await
    }

    /// Replace a deployment package.
    ///
    /// Flow:
    /// 1. Diff against the stored package; nothing changed means no writes
    ///    and no event
    /// 2. A change to kind and/or deployed state only is written directly
    /// 3. Otherwise a package that is and stays deployed is locked
    /// 4. Applications, dependencies, default namespaces, namespaces,
    ///    deployment profiles, default profile, extensions and artifacts
    ///    are written only if they changed
    pub async fn update_package(
        &self,
        tenant: &str,
        package: DeploymentPackage,
    ) -> CatalogResult<DeploymentPackage> {
        let request = describe(
            Operation::Update,
            ResourceType::DeploymentPackage,
            tenant,
            &package.name,
            &package.version,
        );
        let submitted = self.checked(&request, normalize(package))?;
        self.authorize(&request).await?;

        self.mutate::<DeploymentPackage, _, _>(&request, |tx, queue| {
            let key = RecordKey::versioned(tenant, submitted.name.clone(), submitted.version.clone());
            let existing = load_package(tx, &key)?
                .ok_or_else(|| missing(ResourceType::DeploymentPackage, &key))?;

            let changes = diff_package(&existing, &submitted);
            if changes.is_empty() {
                return derive_package_view(tx, tenant, existing);
            }

            let kind = submitted.kind.or_keep(existing.kind);
            let now = Utc::now();
            let created = existing.create_time.unwrap_or(now);
            if changes.is_state_only() {
                let mut record = package_record(&existing, kind, created, now);
                record.is_deployed = submitted.is_deployed;
                tx.put_package(key.clone(), record)?;
            } else {
                require_not_deployed(&key, existing.is_deployed, submitted.is_deployed, &changes)?;
                apply_changes(tx, &key, &existing, &submitted, &changes, kind, created, now)?;
            }

            let view = read_package(tx, &key)?
                .ok_or_else(|| missing(ResourceType::DeploymentPackage, &key))?;
            queue.append(EventKind::Updated, tenant, view.clone());
            Ok(view)
        })
        .await
    }

    /// Delete a deployment package that is neither deployed nor required by
    /// an application profile.
    pub async fn delete_package(&self, tenant: &str, name: &str, version: &str) -> CatalogResult<()> {
        let request = describe(Operation::Delete, ResourceType::DeploymentPackage, tenant, name, version);
        self.authorize(&request).await?;

        self.mutate::<DeploymentPackage, _, _>(&request, |tx, queue| {
            let key = RecordKey::versioned(tenant, name, version);
            let existing = read_package(tx, &key)?
                .ok_or_else(|| missing(ResourceType::DeploymentPackage, &key))?;
            if existing.is_deployed {
                return Err(CatalogError::failed_precondition(
                    ResourceType::DeploymentPackage,
                    "cannot delete deployed package",
                )
                .with_identity(&key.name, &key.version));
            }
            require_package_unrequired(tx, &key)?;

            tx.delete_package(&key)?;
            queue.append(EventKind::Deleted, tenant, existing);
            Ok(())
        })
        .await
    }

    /// Read view of a package
    pub async fn get_package(&self, tenant: &str, name: &str, version: &str) -> CatalogResult<DeploymentPackage> {
        let request = describe(Operation::Get, ResourceType::DeploymentPackage, tenant, name, version);
        self.authorize(&request).await?;

        let key = RecordKey::versioned(tenant, name, version);
        self.read(|tx| {
            read_package(tx, &key)?.ok_or_else(|| missing(ResourceType::DeploymentPackage, &key))
        })
    }

    /// Packages of a tenant, or of every tenant when `tenant` is empty,
    /// restricted to `kinds` unless it is empty
    pub async fn list_packages(&self, tenant: &str, kinds: &[Kind]) -> CatalogResult<Vec<DeploymentPackage>> {
        let request = describe(Operation::List, ResourceType::DeploymentPackage, tenant, "", "");
        self.authorize(&request).await?;

        self.read(|tx| {
            Ok(list_packages(tx, scope(tenant))?
                .into_iter()
                .map(|(_, package)| package)
                .filter(|package| package.kind.selected_by(kinds))
                .collect())
        })
    }

    /// Every stored version of the named package in a tenant
    pub async fn list_package_versions(&self, tenant: &str, name: &str) -> CatalogResult<Vec<DeploymentPackage>> {
        let request = describe(Operation::List, ResourceType::DeploymentPackage, tenant, name, "");
        if name.is_empty() {
            let err = CatalogError::invalid_argument(ResourceType::DeploymentPackage, "incomplete request");
            return self.checked(&request, Err(err));
        }
        self.authorize(&request).await?;

        let versions: Vec<DeploymentPackage> = self.read(|tx| {
            Ok(list_packages(tx, scope(tenant))?
                .into_iter()
                .map(|(_, package)| package)
                .filter(|package| package.name == name)
                .collect())
        })?;
        if versions.is_empty() {
            return Err(CatalogError::not_found(ResourceType::DeploymentPackage).with_name(name));
        }
        Ok(versions)
    }
}

fn normalize(mut package: DeploymentPackage) -> CatalogResult<DeploymentPackage> {
    validate_name(ResourceType::DeploymentPackage, &package.name)?;
    validate_version(ResourceType::DeploymentPackage, &package.name, &package.version)?;
    package.display_name = resolve_display_name(
        ResourceType::DeploymentPackage,
        &package.name,
        &package.display_name,
    )?;

    for profile in &mut package.profiles {
        validate_name(ResourceType::DeploymentProfile, &profile.name)?;
        profile.display_name = resolve_display_name(
            ResourceType::DeploymentProfile,
            &profile.name,
            &profile.display_name,
        )?;
    }
    Ok(package)
}

fn require_unique_package_display_name(
    tx: &dyn Transaction,
    key: &RecordKey,
    package: &DeploymentPackage,
) -> CatalogResult<()> {
    let others = tx
        .packages(Some(&key.tenant))?
        .into_iter()
        .map(|(other, record)| (other.name, record.display_name));
    require_unique_display_name(
        ResourceType::DeploymentPackage,
        &key.name,
        &package.display_name,
        others,
    )
}

/// Validate the deployment profile set and resolve every profile to the
/// rows to store.
fn check_deployment_profiles(
    tx: &dyn Transaction,
    key: &RecordKey,
    package: &DeploymentPackage,
) -> CatalogResult<Vec<DeploymentProfileRecord>> {
    require_unique_deployment_profiles(key, &package.profiles)?;
    require_consistent_profile_key_style(key, &package.application_references, &package.profiles)?;

    if !package.profiles.is_empty() && package.default_profile_name.is_empty() {
        return Err(CatalogError::invalid_argument(
            ResourceType::DeploymentPackage,
            "default profile name must be specified",
        )
        .with_identity(&key.name, &key.version));
    }
    require_default_profile_resolvable(
        ResourceType::DeploymentPackage,
        key,
        &package.default_profile_name,
        package.profiles.iter().map(|p| p.name.as_str()),
    )?;

    package
        .profiles
        .iter()
        .map(|profile| resolve_deployment_profile(tx, key, &package.application_references, profile))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn apply_changes(
    tx: &mut dyn Transaction,
    key: &RecordKey,
    existing: &DeploymentPackage,
    submitted: &DeploymentPackage,
    changes: &PackageChanges<'_>,
    kind: Kind,
    created: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CatalogResult<()> {
    if changes.root {
        require_unique_package_display_name(tx, key, submitted)?;
    }

    let references = &submitted.application_references;
    if changes.applications {
        require_application_references_resolvable(tx, key, references)?;
        tx.put_package_collection(key, PackageCollection::ApplicationReferences(references.clone()))?;
    }

    // Removing an application can strand dependencies and namespaces
    // that did not change themselves
    if changes.applications || changes.dependencies {
        require_dependency_endpoints_resolvable(
            key,
            &submitted.application_dependencies,
            references,
            &existing.application_references,
        )?;
    }
    if changes.dependencies {
        tx.put_package_collection(
            key,
            PackageCollection::ApplicationDependencies(submitted.application_dependencies.clone()),
        )?;
    }

    if changes.applications || changes.default_namespaces {
        require_default_namespaces_resolvable(key, &submitted.default_namespaces, references)?;
    }
    if changes.default_namespaces {
        tx.put_package_collection(
            key,
            PackageCollection::DefaultNamespaces(submitted.default_namespaces.clone()),
        )?;
    }

    if changes.namespaces {
        tx.put_package_collection(key, PackageCollection::Namespaces(submitted.namespaces.clone()))?;
    }

    if changes.applications
        || changes.profiles
        || !changes.new_profiles.is_empty()
        || changes.default_profile
    {
        let records = check_deployment_profiles(tx, key, submitted)?;
        if changes.applications || changes.profiles {
            reconcile_deployment_profiles(tx, key, records)?;
        } else {
            for record in records {
                if changes.new_profiles.iter().any(|p| p.name == record.name) {
                    tx.insert_deployment_profile(key, record)?;
                }
            }
        }
    }

    if changes.extensions {
        tx.put_package_collection(key, PackageCollection::Extensions(submitted.extensions.clone()))?;
    }

    if changes.artifacts {
        require_artifact_references_resolvable(tx, key, &submitted.artifacts)?;
        tx.put_package_collection(key, PackageCollection::Artifacts(submitted.artifacts.clone()))?;
    }

    if changes.root || changes.default_profile || changes.kind_or_state {
        tx.put_package(key.clone(), package_record(submitted, kind, created, now))?;
    }
    Ok(())
}

/// Bring the stored deployment profiles in line with `records`, matched by
/// name. Unchanged rows are not rewritten.
fn reconcile_deployment_profiles(
    tx: &mut dyn Transaction,
    key: &RecordKey,
    records: Vec<DeploymentProfileRecord>,
) -> CatalogResult<()> {
    let existing = tx.deployment_profiles(key)?;

    for current in &existing {
        if !records.iter().any(|r| r.name == current.name) {
            require_deployment_profile_unrequired(tx, key, &current.name)?;
            tx.delete_deployment_profile(key, &current.name)?;
        }
    }

    for record in records {
        match existing.iter().find(|c| c.name == record.name) {
            Some(current) if *current == record => {}
            Some(_) => tx.put_deployment_profile(key, record)?,
            None => tx.insert_deployment_profile(key, record)?,
        }
    }
    Ok(())
}
