//! Deployment locks and in-use checks.

use crate::diff::{ApplicationChanges, PackageChanges};
use crate::errors::{CatalogError, CatalogResult};
use crate::model::{ApplicationReference, DeploymentRequirement, ResourceType};
use crate::store::{PackageCollection, PackageFacet, RecordKey, Transaction};

/// A deployed package accepts only kind and deployed-state changes while
/// the request keeps it deployed.
pub fn require_not_deployed(
    key: &RecordKey,
    existing_is_deployed: bool,
    requested_is_deployed: bool,
    changes: &PackageChanges<'_>,
) -> CatalogResult<()> {
    if changes.is_structural() && existing_is_deployed && requested_is_deployed {
        return Err(CatalogError::failed_precondition(
            ResourceType::DeploymentPackage,
            "cannot modify deployed package",
        )
        .with_identity(&key.name, &key.version));
    }
    Ok(())
}

/// An application referenced by a deployed package accepts only kind
/// changes.
pub fn require_not_referenced_by_deployed_package(
    tx: &dyn Transaction,
    key: &RecordKey,
    changes: &ApplicationChanges<'_>,
) -> CatalogResult<()> {
    if !changes.is_structural() {
        return Ok(());
    }

    let deployed = packages_referencing(tx, key)?
        .iter()
        .filter(|(_, is_deployed)| *is_deployed)
        .count();

    if deployed > 0 {
        return Err(CatalogError::failed_precondition(
            ResourceType::Application,
            format!(
                "cannot update application that is part of {} deployed packages; please create a new version instead",
                deployed
            ),
        )
        .with_identity(&key.name, &key.version));
    }
    Ok(())
}

/// Packages of the application's tenant that reference it, paired with
/// their deployed flag.
pub fn packages_referencing(
    tx: &dyn Transaction,
    application: &RecordKey,
) -> CatalogResult<Vec<(RecordKey, bool)>> {
    let target = ApplicationReference::new(application.name.clone(), application.version.clone());
    let mut referencing = Vec::new();

    for (package_key, record) in tx.packages(Some(&application.tenant))? {
        if let Some(PackageCollection::ApplicationReferences(refs)) =
            tx.package_collection(&package_key, PackageFacet::ApplicationReferences)?
        {
            if refs.contains(&target) {
                referencing.push((package_key, record.is_deployed));
            }
        }
    }
    Ok(referencing)
}

/// An application cannot be deleted while any package references it.
pub fn require_application_unreferenced(tx: &dyn Transaction, key: &RecordKey) -> CatalogResult<()> {
    if !packages_referencing(tx, key)?.is_empty() {
        return Err(CatalogError::failed_precondition(
            ResourceType::Application,
            "cannot delete application that is part of one or more deployment-package",
        )
        .with_identity(&key.name, &key.version));
    }
    Ok(())
}

/// A profile cannot be deleted while any deployment profile of the tenant
/// binds it.
pub fn require_profile_not_in_use(
    tx: &dyn Transaction,
    application: &RecordKey,
    profile: &str,
) -> CatalogResult<()> {
    let target = ApplicationReference::new(application.name.clone(), application.version.clone());

    for (package_key, _) in tx.packages(Some(&application.tenant))? {
        let in_use = tx
            .deployment_profiles(&package_key)?
            .iter()
            .flat_map(|dp| dp.bindings.iter())
            .any(|b| b.application == target && b.profile == profile);

        if in_use {
            return Err(CatalogError::failed_precondition(
                ResourceType::Profile,
                format!(
                    "profile {} cannot be deleted; it is in use by deployment-package {}:{}",
                    profile, package_key.name, package_key.version
                ),
            )
            .with_identity(&application.name, &application.version));
        }
    }
    Ok(())
}

/// Deployment requirements of the tenant's application profiles, with the
/// application that owns each.
fn requirements_in_tenant(
    tx: &dyn Transaction,
    tenant: &str,
) -> CatalogResult<Vec<(RecordKey, DeploymentRequirement)>> {
    let mut requirements = Vec::new();
    for (app_key, _) in tx.applications(Some(tenant))? {
        for profile in tx.profiles(&app_key)? {
            for requirement in profile.deployment_requirements {
                requirements.push((app_key.clone(), requirement));
            }
        }
    }
    Ok(requirements)
}

/// A package cannot be deleted while a deployment requirement names it.
pub fn require_package_unrequired(tx: &dyn Transaction, key: &RecordKey) -> CatalogResult<()> {
    let required_by = requirements_in_tenant(tx, &key.tenant)?
        .into_iter()
        .find(|(_, r)| r.name == key.name && r.version == key.version);

    if let Some((app_key, _)) = required_by {
        return Err(CatalogError::failed_precondition(
            ResourceType::DeploymentPackage,
            format!(
                "cannot delete deployment-package required by application {}:{}",
                app_key.name, app_key.version
            ),
        )
        .with_identity(&key.name, &key.version));
    }
    Ok(())
}

/// A deployment profile cannot be deleted while a deployment requirement
/// selects it, either by name or through the package's stored default.
pub fn require_deployment_profile_unrequired(
    tx: &dyn Transaction,
    package: &RecordKey,
    name: &str,
) -> CatalogResult<()> {
    let stored_default = tx.package(package)?.and_then(|record| record.default_profile);

    let required_by = requirements_in_tenant(tx, &package.tenant)?
        .into_iter()
        .filter(|(_, r)| r.name == package.name && r.version == package.version)
        .find(|(_, r)| {
            if r.deployment_profile_name.is_empty() {
                stored_default.as_deref() == Some(name)
            } else {
                r.deployment_profile_name == name
            }
        });

    if let Some((app_key, _)) = required_by {
        return Err(CatalogError::failed_precondition(
            ResourceType::DeploymentProfile,
            format!(
                "deployment profile {} cannot be deleted; it is required by application {}:{}",
                name, app_key.name, app_key.version
            ),
        )
        .with_identity(&package.name, &package.version));
    }
    Ok(())
}

/// A registry cannot be deleted, or change type, while an application uses it.
pub fn require_registry_unused(tx: &dyn Transaction, key: &RecordKey, action: &str) -> CatalogResult<()> {
    let in_use = tx.applications(Some(&key.tenant))?.iter().any(|(_, app)| {
        app.helm_registry_name == key.name || app.image_registry_name == key.name
    });
    if in_use {
        return Err(CatalogError::failed_precondition(
            ResourceType::Registry,
            format!("cannot {} registry while in use", action),
        )
        .with_name(&key.name));
    }
    Ok(())
}

/// An artifact cannot be deleted while a package references it.
pub fn require_artifact_unreferenced(tx: &dyn Transaction, key: &RecordKey) -> CatalogResult<()> {
    for (package_key, _) in tx.packages(Some(&key.tenant))? {
        if let Some(PackageCollection::Artifacts(refs)) =
            tx.package_collection(&package_key, PackageFacet::Artifacts)?
        {
            if refs.iter().any(|r| r.name == key.name) {
                return Err(CatalogError::failed_precondition(
                    ResourceType::Artifact,
                    format!(
                        "cannot delete artifact while in use by deployment-package {}:{}",
                        package_key.name, package_key.version
                    ),
                )
                .with_name(&key.name));
            }
        }
    }
    Ok(())
}
