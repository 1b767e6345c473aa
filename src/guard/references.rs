//! Referential integrity.

use std::collections::{BTreeMap, HashSet};

use crate::errors::{CatalogError, CatalogResult};
use crate::model::{
    has_duplicate_names, ApplicationDependency, ApplicationReference, ArtifactReference,
    DeploymentProfile, Profile, RegistryType, ResourceType,
};
use crate::store::{DeploymentProfileRecord, ProfileBinding, RecordKey, Transaction};

/// The named registry must exist in the tenant and host the expected type.
/// An empty name is accepted only when the registry is optional.
pub fn require_registry_type(
    tx: &dyn Transaction,
    application: &RecordKey,
    registry_name: &str,
    expected: RegistryType,
    optional: bool,
) -> CatalogResult<()> {
    if registry_name.is_empty() {
        if optional {
            return Ok(());
        }
        return Err(CatalogError::invalid_argument(
            ResourceType::Application,
            format!("{} registry must be specified", expected.as_str().to_lowercase()),
        )
        .with_identity(&application.name, &application.version));
    }

    let key = RecordKey::named(application.tenant.clone(), registry_name);
    match tx.registry(&key)? {
        Some(registry) if registry.registry_type == expected => Ok(()),
        Some(_) => Err(CatalogError::invalid_argument(
            ResourceType::Application,
            format!("registry {} is not a {} registry", registry_name, expected.as_str()),
        )
        .with_identity(&application.name, &application.version)),
        None => Err(CatalogError::invalid_argument(
            ResourceType::Application,
            format!("registry {} not found", registry_name),
        )
        .with_identity(&application.name, &application.version)),
    }
}

/// Every reference must name an existing application of the tenant, once.
pub fn require_application_references_resolvable(
    tx: &dyn Transaction,
    package: &RecordKey,
    references: &[ApplicationReference],
) -> CatalogResult<()> {
    let mut seen = HashSet::new();
    for reference in references {
        if !seen.insert(reference) {
            return Err(CatalogError::invalid_argument(
                ResourceType::DeploymentPackage,
                format!("duplicate application reference {}", reference.qualified()),
            )
            .with_identity(&package.name, &package.version));
        }
        let key = RecordKey::versioned(
            package.tenant.clone(),
            reference.name.clone(),
            reference.version.clone(),
        );
        if tx.application(&key)?.is_none() {
            return Err(CatalogError::invalid_argument(
                ResourceType::ApplicationReference,
                "not found",
            )
            .with_identity(&reference.name, &reference.version));
        }
    }
    Ok(())
}

/// Dependency edges must join two distinct applications of the reference
/// set. An endpoint that was referenced before this update but is not any
/// more is a precondition failure rather than a malformed request.
pub fn require_dependency_endpoints_resolvable(
    package: &RecordKey,
    dependencies: &[ApplicationDependency],
    references: &[ApplicationReference],
    previous: &[ApplicationReference],
) -> CatalogResult<()> {
    let names: HashSet<&str> = references.iter().map(|r| r.name.as_str()).collect();
    let removed: HashSet<&str> = previous
        .iter()
        .map(|r| r.name.as_str())
        .filter(|n| !names.contains(n))
        .collect();

    let unresolved = |role: &str, name: &str| {
        let err = if removed.contains(name) {
            CatalogError::failed_precondition(
                ResourceType::DeploymentPackage,
                format!("dependency {} {} was removed from the package", role, name),
            )
        } else {
            CatalogError::invalid_argument(
                ResourceType::DeploymentPackage,
                format!("dependency {} {} not found", role, name),
            )
        };
        err.with_identity(&package.name, &package.version)
    };

    for dependency in dependencies {
        if dependency.name == dependency.requires {
            return Err(CatalogError::invalid_argument(
                ResourceType::DeploymentPackage,
                format!("application {} cannot depend on itself", dependency.name),
            )
            .with_identity(&package.name, &package.version));
        }
        if !names.contains(dependency.name.as_str()) {
            return Err(unresolved("source", &dependency.name));
        }
        if !names.contains(dependency.requires.as_str()) {
            return Err(unresolved("target", &dependency.requires));
        }
    }
    Ok(())
}

/// Default namespaces may only be given for referenced applications.
pub fn require_default_namespaces_resolvable(
    package: &RecordKey,
    namespaces: &BTreeMap<String, String>,
    references: &[ApplicationReference],
) -> CatalogResult<()> {
    for application in namespaces.keys() {
        if !references.iter().any(|r| &r.name == application) {
            return Err(CatalogError::invalid_argument(
                ResourceType::DeploymentPackage,
                format!("application {} does not exist", application),
            )
            .with_identity(&package.name, &package.version));
        }
    }
    Ok(())
}

/// Artifact references must point at artifacts of the tenant.
pub fn require_artifact_references_resolvable(
    tx: &dyn Transaction,
    package: &RecordKey,
    references: &[ArtifactReference],
) -> CatalogResult<()> {
    for reference in references {
        let key = RecordKey::named(package.tenant.clone(), reference.name.clone());
        if tx.artifact(&key)?.is_none() {
            return Err(CatalogError::invalid_argument(
                ResourceType::DeploymentPackage,
                format!("artifact {} not found", reference.name),
            )
            .with_identity(&package.name, &package.version));
        }
    }
    Ok(())
}

/// A non-empty default profile name must match one of the candidates.
pub fn require_default_profile_resolvable<'a>(
    resource: ResourceType,
    owner: &RecordKey,
    name: &str,
    mut candidates: impl Iterator<Item = &'a str>,
) -> CatalogResult<()> {
    if name.is_empty() || candidates.any(|c| c == name) {
        return Ok(());
    }
    Err(CatalogError::invalid_argument(
        resource,
        format!("default profile {} not found", name),
    )
    .with_identity(&owner.name, &owner.version))
}

/// Profile keys must be qualified (`name:version`) when the package
/// references the same application name twice, and must not mix styles.
pub fn require_consistent_profile_key_style(
    package: &RecordKey,
    references: &[ApplicationReference],
    profiles: &[DeploymentProfile],
) -> CatalogResult<()> {
    let keys: Vec<&String> = profiles
        .iter()
        .flat_map(|p| p.application_profiles.keys())
        .collect();
    if keys.is_empty() {
        return Ok(());
    }

    let qualified = keys.iter().filter(|k| k.contains(':')).count();
    if qualified == keys.len() {
        return Ok(());
    }
    if qualified > 0 {
        return Err(CatalogError::invalid_argument(
            ResourceType::DeploymentPackage,
            "deployment profiles mix bare and fully qualified application references",
        )
        .with_identity(&package.name, &package.version));
    }
    if has_duplicate_names(references) {
        return Err(CatalogError::invalid_argument(
            ResourceType::DeploymentPackage,
            format!(
                "package {} contains duplicate application names, but does not use fully qualified profile references",
                package.name
            ),
        )
        .with_identity(&package.name, &package.version));
    }
    Ok(())
}

/// Resolve each application key of a deployment profile to a concrete
/// reference and check that the chosen profile exists on it.
///
/// A bare key selects the first reference with that name; a qualified key
/// selects the exact version.
pub fn resolve_deployment_profile(
    tx: &dyn Transaction,
    package: &RecordKey,
    references: &[ApplicationReference],
    profile: &DeploymentProfile,
) -> CatalogResult<DeploymentProfileRecord> {
    let mut bindings = Vec::with_capacity(profile.application_profiles.len());

    for (application_key, profile_name) in &profile.application_profiles {
        let reference = match application_key.split_once(':') {
            Some((name, version)) => references
                .iter()
                .find(|r| r.name == name && r.version == version),
            None => references.iter().find(|r| &r.name == application_key),
        };
        let Some(reference) = reference else {
            return Err(CatalogError::invalid_argument(
                ResourceType::DeploymentProfile,
                format!("application {} is not part of the package", application_key),
            )
            .with_name(&profile.name));
        };

        let application = RecordKey::versioned(
            package.tenant.clone(),
            reference.name.clone(),
            reference.version.clone(),
        );
        let exists = tx
            .profiles(&application)?
            .iter()
            .any(|p| &p.name == profile_name);
        if !exists {
            return Err(CatalogError::invalid_argument(
                ResourceType::DeploymentProfile,
                "application profiles are incongruent",
            )
            .with_name(&profile.name));
        }

        bindings.push(ProfileBinding {
            application: reference.clone(),
            profile: profile_name.clone(),
        });
    }

    Ok(DeploymentProfileRecord {
        name: profile.name.clone(),
        display_name: profile.display_name.clone(),
        description: profile.description.clone(),
        bindings,
        qualified_keys: !profile.application_profiles.is_empty() && profile.uses_qualified_keys(),
    })
}

/// Deployment requirements must point at existing packages and, when named,
/// at one of their deployment profiles.
pub fn resolve_requirements(tx: &dyn Transaction, tenant: &str, profile: &Profile) -> CatalogResult<()> {
    for requirement in &profile.deployment_requirements {
        let key = RecordKey::versioned(tenant, requirement.name.clone(), requirement.version.clone());
        if tx.package(&key)?.is_none() {
            return Err(CatalogError::not_found(ResourceType::DeploymentPackage)
                .with_identity(&requirement.name, &requirement.version));
        }
        if requirement.deployment_profile_name.is_empty() {
            continue;
        }
        let found = tx
            .deployment_profiles(&key)?
            .iter()
            .any(|dp| dp.name == requirement.deployment_profile_name);
        if !found {
            return Err(CatalogError::invalid_argument(
                ResourceType::Profile,
                format!(
                    "deployment profile {} not found in deployment-package {}:{}",
                    requirement.deployment_profile_name, requirement.name, requirement.version
                ),
            )
            .with_name(&profile.name));
        }
    }
    Ok(())
}
