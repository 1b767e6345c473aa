//! Assembly of aggregates from stored rows.
//!
//! Packages have two views. The stored view is exactly what was persisted
//! and is what updates are diffed against. The read view adds what is
//! derived on every read and never written back: the implicit default
//! deployment profile and a default pointer for a package with a single
//! profile.

use chrono::{DateTime, Utc};

use crate::errors::CatalogResult;
use crate::model::{
    has_duplicate_names, Application, ApplicationReference, DeploymentPackage, DeploymentProfile,
    Kind, Profile, IMPLICIT_DEFAULT_PROFILE,
};
use crate::store::{
    ApplicationRecord, DeploymentProfileRecord, PackageCollection, PackageFacet, PackageRecord,
    RecordKey, Transaction,
};

const PACKAGE_FACETS: [PackageFacet; 6] = [
    PackageFacet::ApplicationReferences,
    PackageFacet::ApplicationDependencies,
    PackageFacet::DefaultNamespaces,
    PackageFacet::Namespaces,
    PackageFacet::Extensions,
    PackageFacet::Artifacts,
];

fn optional(name: &str) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// ==================
// Applications
// ==================

pub(crate) fn application_record(
    application: &Application,
    kind: Kind,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
) -> ApplicationRecord {
    ApplicationRecord {
        display_name: application.display_name.clone(),
        description: application.description.clone(),
        chart_name: application.chart_name.clone(),
        chart_version: application.chart_version.clone(),
        helm_registry_name: application.helm_registry_name.clone(),
        image_registry_name: application.image_registry_name.clone(),
        kind,
        default_profile: optional(&application.default_profile_name),
        ignored_resources: application.ignored_resources.clone(),
        create_time,
        update_time,
    }
}

fn assemble_application(key: &RecordKey, record: ApplicationRecord, profiles: Vec<Profile>) -> Application {
    Application {
        name: key.name.clone(),
        version: key.version.clone(),
        display_name: record.display_name,
        description: record.description,
        chart_name: record.chart_name,
        chart_version: record.chart_version,
        helm_registry_name: record.helm_registry_name,
        image_registry_name: record.image_registry_name,
        profiles,
        default_profile_name: record.default_profile.unwrap_or_default(),
        ignored_resources: record.ignored_resources,
        kind: record.kind,
        create_time: Some(record.create_time),
        update_time: Some(record.update_time),
    }
}

pub(crate) fn load_application(tx: &dyn Transaction, key: &RecordKey) -> CatalogResult<Option<Application>> {
    let Some(record) = tx.application(key)? else {
        return Ok(None);
    };
    let profiles = tx.profiles(key)?;
    Ok(Some(assemble_application(key, record, profiles)))
}

/// Applications paired with their tenant, in key order
pub(crate) fn list_applications(
    tx: &dyn Transaction,
    tenant: Option<&str>,
) -> CatalogResult<Vec<(String, Application)>> {
    let mut applications = Vec::new();
    for (key, record) in tx.applications(tenant)? {
        let profiles = tx.profiles(&key)?;
        let application = assemble_application(&key, record, profiles);
        applications.push((key.tenant, application));
    }
    Ok(applications)
}

// ==================
// Deployment Packages
// ==================

pub(crate) fn package_record(
    package: &DeploymentPackage,
    kind: Kind,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
) -> PackageRecord {
    PackageRecord {
        display_name: package.display_name.clone(),
        description: package.description.clone(),
        is_visible: package.is_visible,
        is_deployed: package.is_deployed,
        allows_multiple_deployments: package.allows_multiple_deployments,
        kind,
        default_profile: optional(&package.default_profile_name),
        create_time,
        update_time,
    }
}

/// Child collections of a package that carry any items
pub(crate) fn package_collections(package: &DeploymentPackage) -> Vec<PackageCollection> {
    let collections = [
        PackageCollection::ApplicationReferences(package.application_references.clone()),
        PackageCollection::ApplicationDependencies(package.application_dependencies.clone()),
        PackageCollection::DefaultNamespaces(package.default_namespaces.clone()),
        PackageCollection::Namespaces(package.namespaces.clone()),
        PackageCollection::Extensions(package.extensions.clone()),
        PackageCollection::Artifacts(package.artifacts.clone()),
    ];
    collections.into_iter().filter(|c| !is_empty(c)).collect()
}

fn is_empty(collection: &PackageCollection) -> bool {
    match collection {
        PackageCollection::ApplicationReferences(items) => items.is_empty(),
        PackageCollection::ApplicationDependencies(items) => items.is_empty(),
        PackageCollection::DefaultNamespaces(items) => items.is_empty(),
        PackageCollection::Namespaces(items) => items.is_empty(),
        PackageCollection::Extensions(items) => items.is_empty(),
        PackageCollection::Artifacts(items) => items.is_empty(),
    }
}

/// Deployment profile as clients see it
pub(crate) fn deployment_profile_view(record: &DeploymentProfileRecord) -> DeploymentProfile {
    let application_profiles = record
        .bindings
        .iter()
        .map(|binding| {
            let key = if record.qualified_keys {
                binding.application.qualified()
            } else {
                binding.application.name.clone()
            };
            (key, binding.profile.clone())
        })
        .collect();

    DeploymentProfile {
        name: record.name.clone(),
        display_name: record.display_name.clone(),
        description: record.description.clone(),
        application_profiles,
    }
}

fn assemble_package(
    tx: &dyn Transaction,
    key: &RecordKey,
    record: PackageRecord,
) -> CatalogResult<DeploymentPackage> {
    let mut package = DeploymentPackage {
        name: key.name.clone(),
        version: key.version.clone(),
        display_name: record.display_name,
        description: record.description,
        is_visible: record.is_visible,
        is_deployed: record.is_deployed,
        allows_multiple_deployments: record.allows_multiple_deployments,
        kind: record.kind,
        default_profile_name: record.default_profile.unwrap_or_default(),
        create_time: Some(record.create_time),
        update_time: Some(record.update_time),
        ..Default::default()
    };

    for facet in PACKAGE_FACETS {
        match tx.package_collection(key, facet)? {
            Some(PackageCollection::ApplicationReferences(items)) => package.application_references = items,
            Some(PackageCollection::ApplicationDependencies(items)) => package.application_dependencies = items,
            Some(PackageCollection::DefaultNamespaces(items)) => package.default_namespaces = items,
            Some(PackageCollection::Namespaces(items)) => package.namespaces = items,
            Some(PackageCollection::Extensions(items)) => package.extensions = items,
            Some(PackageCollection::Artifacts(items)) => package.artifacts = items,
            None => {}
        }
    }

    package.profiles = tx
        .deployment_profiles(key)?
        .iter()
        .map(deployment_profile_view)
        .collect();
    Ok(package)
}

/// The package exactly as persisted
pub(crate) fn load_package(tx: &dyn Transaction, key: &RecordKey) -> CatalogResult<Option<DeploymentPackage>> {
    match tx.package(key)? {
        Some(record) => Ok(Some(assemble_package(tx, key, record)?)),
        None => Ok(None),
    }
}

/// The package as returned by reads
pub(crate) fn read_package(tx: &dyn Transaction, key: &RecordKey) -> CatalogResult<Option<DeploymentPackage>> {
    match load_package(tx, key)? {
        Some(package) => Ok(Some(derive_package_view(tx, &key.tenant, package)?)),
        None => Ok(None),
    }
}

/// Read views paired with their tenant, in key order
pub(crate) fn list_packages(
    tx: &dyn Transaction,
    tenant: Option<&str>,
) -> CatalogResult<Vec<(String, DeploymentPackage)>> {
    let mut packages = Vec::new();
    for (key, record) in tx.packages(tenant)? {
        let package = assemble_package(tx, &key, record)?;
        let package = derive_package_view(tx, &key.tenant, package)?;
        packages.push((key.tenant, package));
    }
    Ok(packages)
}

/// Add the derived parts of the read view to a stored package.
pub(crate) fn derive_package_view(
    tx: &dyn Transaction,
    tenant: &str,
    mut package: DeploymentPackage,
) -> CatalogResult<DeploymentPackage> {
    if package.profiles.is_empty() {
        if let Some(implicit) = implicit_default_profile(tx, tenant, &package.application_references)? {
            package.profiles.push(implicit);
            if package.default_profile_name.is_empty() {
                package.default_profile_name = IMPLICIT_DEFAULT_PROFILE.to_string();
            }
        }
    }

    if package.default_profile_name.is_empty() && package.profiles.len() == 1 {
        package.default_profile_name = package.profiles[0].name.clone();
    }
    Ok(package)
}

/// A deployment profile selecting each member's default profile, if at
/// least one member has one.
fn implicit_default_profile(
    tx: &dyn Transaction,
    tenant: &str,
    references: &[ApplicationReference],
) -> CatalogResult<Option<DeploymentProfile>> {
    let qualify = has_duplicate_names(references);
    let mut profile = DeploymentProfile {
        name: IMPLICIT_DEFAULT_PROFILE.to_string(),
        display_name: "Implicit Default".to_string(),
        description: "Implicit default deployment profile".to_string(),
        ..Default::default()
    };

    for reference in references {
        let key = RecordKey::versioned(tenant, reference.name.clone(), reference.version.clone());
        let Some(application) = tx.application(&key)? else {
            continue;
        };
        if let Some(default) = application.default_profile {
            let entry = if qualify {
                reference.qualified()
            } else {
                reference.name.clone()
            };
            profile.application_profiles.insert(entry, default);
        }
    }

    if profile.application_profiles.is_empty() {
        Ok(None)
    } else {
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ProfileBinding, SnapshotStore};

    fn app_record(default_profile: Option<&str>) -> ApplicationRecord {
        let now = Utc::now();
        application_record(
            &Application::new("x", "1").with_default_profile(default_profile.unwrap_or_default()),
            Kind::Normal,
            now,
            now,
        )
    }

    fn seed(tx: &mut dyn Transaction, apps: &[(&str, &str, Option<&str>)], package: &DeploymentPackage) {
        for (name, version, default) in apps {
            tx.insert_application(RecordKey::versioned("t1", *name, *version), app_record(*default))
                .unwrap();
        }
        let key = RecordKey::versioned("t1", package.name.clone(), package.version.clone());
        let now = Utc::now();
        tx.insert_package(key.clone(), package_record(package, Kind::Normal, now, now))
            .unwrap();
        for collection in package_collections(package) {
            tx.put_package_collection(&key, collection).unwrap();
        }
    }

    #[test]
    fn test_stored_view_round_trip() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let package = DeploymentPackage::new("pkg", "1")
            .with_application("web", "1")
            .with_application("db", "2")
            .with_dependency("web", "db");
        seed(tx.as_mut(), &[("web", "1", None), ("db", "2", None)], &package);

        let key = RecordKey::versioned("t1", "pkg", "1");
        let loaded = load_package(tx.as_ref(), &key).unwrap().unwrap();
        assert_eq!(loaded.application_references, package.application_references);
        assert_eq!(loaded.application_dependencies, package.application_dependencies);
        assert!(loaded.profiles.is_empty());
        assert!(loaded.default_profile_name.is_empty());
    }

    #[test]
    fn test_implicit_default_profile() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let package = DeploymentPackage::new("pkg", "1")
            .with_application("web", "1")
            .with_application("db", "2");
        seed(tx.as_mut(), &[("web", "1", Some("small")), ("db", "2", None)], &package);

        let key = RecordKey::versioned("t1", "pkg", "1");
        let view = read_package(tx.as_ref(), &key).unwrap().unwrap();
        assert_eq!(view.profiles.len(), 1);
        assert_eq!(view.profiles[0].name, IMPLICIT_DEFAULT_PROFILE);
        assert_eq!(view.profiles[0].application_profiles.get("web").unwrap(), "small");
        assert!(!view.profiles[0].application_profiles.contains_key("db"));
        assert_eq!(view.default_profile_name, IMPLICIT_DEFAULT_PROFILE);

        // Never persisted
        assert!(tx.deployment_profiles(&key).unwrap().is_empty());
    }

    #[test]
    fn test_implicit_default_qualifies_duplicate_names() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let package = DeploymentPackage::new("pkg", "1")
            .with_application("web", "1")
            .with_application("web", "2");
        seed(tx.as_mut(), &[("web", "1", Some("a")), ("web", "2", Some("b"))], &package);

        let view = read_package(tx.as_ref(), &RecordKey::versioned("t1", "pkg", "1"))
            .unwrap()
            .unwrap();
        let entries = &view.profiles[0].application_profiles;
        assert_eq!(entries.get("web:1").unwrap(), "a");
        assert_eq!(entries.get("web:2").unwrap(), "b");
    }

    #[test]
    fn test_no_implicit_profile_without_defaults() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let package = DeploymentPackage::new("pkg", "1").with_application("web", "1");
        seed(tx.as_mut(), &[("web", "1", None)], &package);

        let view = read_package(tx.as_ref(), &RecordKey::versioned("t1", "pkg", "1"))
            .unwrap()
            .unwrap();
        assert!(view.profiles.is_empty());
    }

    #[test]
    fn test_sole_profile_becomes_default() {
        let store = MemoryStore::new();
        let mut tx = store.begin().unwrap();
        let package = DeploymentPackage::new("pkg", "1").with_application("web", "1");
        seed(tx.as_mut(), &[("web", "1", Some("small"))], &package);

        let key = RecordKey::versioned("t1", "pkg", "1");
        tx.insert_deployment_profile(
            &key,
            DeploymentProfileRecord {
                name: "only".into(),
                display_name: "Only".into(),
                description: String::new(),
                bindings: vec![ProfileBinding {
                    application: ApplicationReference::new("web", "1"),
                    profile: "small".into(),
                }],
                qualified_keys: false,
            },
        )
        .unwrap();

        let view = read_package(tx.as_ref(), &key).unwrap().unwrap();
        assert_eq!(view.profiles.len(), 1);
        assert_eq!(view.default_profile_name, "only");
        assert_eq!(view.profiles[0].application_profiles.get("web").unwrap(), "small");
    }

    #[test]
    fn test_qualified_keys_preserved() {
        let record = DeploymentProfileRecord {
            name: "p".into(),
            display_name: "P".into(),
            description: String::new(),
            bindings: vec![ProfileBinding {
                application: ApplicationReference::new("web", "1"),
                profile: "small".into(),
            }],
            qualified_keys: true,
        };
        let view = deployment_profile_view(&record);
        assert!(view.application_profiles.contains_key("web:1"));
    }
}
