//! Application operations.

use chrono::{DateTime, Utc};

use crate::auth::Operation;
use crate::diff::{diff_application, profiles_equal, ApplicationChanges};
use crate::errors::{CatalogError, CatalogResult};
use crate::guard::{
    packages_referencing, require_application_unreferenced, require_default_profile_resolvable,
    require_not_referenced_by_deployed_package, require_profile_not_in_use, require_registry_type,
    require_unique_display_name, require_unique_profiles, require_valid_templates,
    resolve_requirements,
};
use crate::model::{
    resolve_display_name, validate_name, validate_version, Application, Kind, Profile,
    RegistryType, ResourceType,
};
use crate::realtime::EventKind;
use crate::store::{RecordKey, SnapshotStore, Transaction};

use super::views::{application_record, list_applications, load_application};
use super::{describe, missing, scope, CatalogService};

impl<S: SnapshotStore> CatalogService<S> {
    /// Create an application together with all of its profiles.
    ///
    /// An unspecified kind is stored as normal.
    pub async fn create_application(
        &self,
        tenant: &str,
        application: Application,
    ) -> CatalogResult<Application> {
        let request = describe(
            Operation::Create,
            ResourceType::Application,
            tenant,
            &application.name,
            &application.version,
        );
        let mut application = self.checked(&request, normalize(application))?;
        application.kind = application.kind.or_normal();
        self.authorize(&request).await?;

        self.mutate::<Application, _, _>(&request, |tx, queue| {
            let key = RecordKey::versioned(tenant, application.name.clone(), application.version.clone());
            if tx.application(&key)?.is_some() {
                return Err(CatalogError::already_exists(ResourceType::Application)
                    .with_identity(&key.name, &key.version));
            }
            check_root(tx, &key, &application)?;
            check_profiles(tx, &key, &application)?;

            let now = Utc::now();
            tx.insert_application(
                key.clone(),
                application_record(&application, application.kind, now, now),
            )?;
            for profile in &application.profiles {
                tx.insert_profile(&key, profile.clone())?;
            }

            let stored = load_application(tx, &key)?
                .ok_or_else(|| missing(ResourceType::Application, &key))?;
            queue.append(EventKind::Created, tenant, stored.clone());
            Ok(stored)
        })
        .await
    }

    /// Replace an application.
    ///
    /// Flow:
    /// 1. Diff against the stored application; nothing changed means no
    ///    writes and no event
    /// 2. A kind-only change is written directly
    /// 3. Otherwise the application must not be part of a deployed package
    /// 4. Profiles, default profile, root fields and ignored resources are
    ///    written only if they changed
    pub async fn update_application(
        &self,
        tenant: &str,
        application: Application,
    ) -> CatalogResult<Application> {
        let request = describe(
            Operation::Update,
            ResourceType::Application,
            tenant,
            &application.name,
            &application.version,
        );
        let submitted = self.checked(&request, normalize(application))?;
        self.authorize(&request).await?;

        self.mutate::<Application, _, _>(&request, |tx, queue| {
            let key = RecordKey::versioned(tenant, submitted.name.clone(), submitted.version.clone());
            let existing = load_application(tx, &key)?
                .ok_or_else(|| missing(ResourceType::Application, &key))?;

            let changes = diff_application(&existing, &submitted);
            if changes.is_empty() {
                return Ok(existing);
            }

            let kind = submitted.kind.or_keep(existing.kind);
            let now = Utc::now();
            if changes.is_state_only() {
                let created = existing.create_time.unwrap_or(now);
                tx.put_application(key.clone(), application_record(&existing, kind, created, now))?;
            } else {
                require_not_referenced_by_deployed_package(tx, &key, &changes)?;
                apply_changes(tx, &key, &existing, &submitted, &changes, kind, now)?;
            }

            let updated = load_application(tx, &key)?
                .ok_or_else(|| missing(ResourceType::Application, &key))?;
            queue.append(EventKind::Updated, tenant, updated.clone());
            Ok(updated)
        })
        .await
    }

    /// Delete an application and its profiles. Refused while any package
    /// references it.
    pub async fn delete_application(&self, tenant: &str, name: &str, version: &str) -> CatalogResult<()> {
        let request = describe(Operation::Delete, ResourceType::Application, tenant, name, version);
        self.authorize(&request).await?;

        self.mutate::<Application, _, _>(&request, |tx, queue| {
            let key = RecordKey::versioned(tenant, name, version);
            let existing = load_application(tx, &key)?
                .ok_or_else(|| missing(ResourceType::Application, &key))?;
            require_application_unreferenced(tx, &key)?;

            tx.delete_application(&key)?;
            queue.append(EventKind::Deleted, tenant, existing);
            Ok(())
        })
        .await
    }

    pub async fn get_application(&self, tenant: &str, name: &str, version: &str) -> CatalogResult<Application> {
        let request = describe(Operation::Get, ResourceType::Application, tenant, name, version);
        self.authorize(&request).await?;

        let key = RecordKey::versioned(tenant, name, version);
        self.read(|tx| {
            load_application(tx, &key)?.ok_or_else(|| missing(ResourceType::Application, &key))
        })
    }

    /// Applications of a tenant, or of every tenant when `tenant` is empty,
    /// restricted to `kinds` unless it is empty
    pub async fn list_applications(&self, tenant: &str, kinds: &[Kind]) -> CatalogResult<Vec<Application>> {
        let request = describe(Operation::List, ResourceType::Application, tenant, "", "");
        self.authorize(&request).await?;

        self.read(|tx| {
            Ok(list_applications(tx, scope(tenant))?
                .into_iter()
                .map(|(_, application)| application)
                .filter(|application| application.kind.selected_by(kinds))
                .collect())
        })
    }

    /// Every stored version of the named application in a tenant
    pub async fn list_application_versions(&self, tenant: &str, name: &str) -> CatalogResult<Vec<Application>> {
        let request = describe(Operation::List, ResourceType::Application, tenant, name, "");
        if name.is_empty() {
            let err = CatalogError::invalid_argument(ResourceType::Application, "incomplete request");
            return self.checked(&request, Err(err));
        }
        self.authorize(&request).await?;

        let versions: Vec<Application> = self.read(|tx| {
            Ok(list_applications(tx, scope(tenant))?
                .into_iter()
                .map(|(_, application)| application)
                .filter(|application| application.name == name)
                .collect())
        })?;
        if versions.is_empty() {
            return Err(CatalogError::not_found(ResourceType::Application).with_name(name));
        }
        Ok(versions)
    }

    /// Number of deployment packages referencing an application version
    pub async fn application_reference_count(
        &self,
        tenant: &str,
        name: &str,
        version: &str,
    ) -> CatalogResult<usize> {
        let request = describe(Operation::Get, ResourceType::Application, tenant, name, version);
        self.authorize(&request).await?;

        let key = RecordKey::versioned(tenant, name, version);
        self.read(|tx| {
            if tx.application(&key)?.is_none() {
                return Err(missing(ResourceType::Application, &key));
            }
            Ok(packages_referencing(tx, &key)?.len())
        })
    }
}

/// Check names and resolve display names of the application and its
/// profiles. The kind is left as submitted.
fn normalize(mut application: Application) -> CatalogResult<Application> {
    validate_name(ResourceType::Application, &application.name)?;
    validate_version(ResourceType::Application, &application.name, &application.version)?;
    application.display_name = resolve_display_name(
        ResourceType::Application,
        &application.name,
        &application.display_name,
    )?;

    for profile in &mut application.profiles {
        validate_name(ResourceType::Profile, &profile.name)?;
        profile.display_name =
            resolve_display_name(ResourceType::Profile, &profile.name, &profile.display_name)?;
    }
    Ok(application)
}

/// Display name and registries
fn check_root(tx: &dyn Transaction, key: &RecordKey, application: &Application) -> CatalogResult<()> {
    let others = tx
        .applications(Some(&key.tenant))?
        .into_iter()
        .map(|(other, record)| (other.name, record.display_name));
    require_unique_display_name(
        ResourceType::Application,
        &key.name,
        &application.display_name,
        others,
    )?;

    // A chart needs a registry to come from
    require_registry_type(
        tx,
        key,
        &application.helm_registry_name,
        RegistryType::Helm,
        application.chart_name.is_empty(),
    )?;
    require_registry_type(tx, key, &application.image_registry_name, RegistryType::Image, true)
}

/// Profile set, templates, requirements and the default pointer
fn check_profiles(tx: &dyn Transaction, key: &RecordKey, application: &Application) -> CatalogResult<()> {
    if !application.profiles.is_empty() && application.default_profile_name.is_empty() {
        return Err(CatalogError::invalid_argument(
            ResourceType::Application,
            "default profile name must be specified",
        )
        .with_identity(&key.name, &key.version));
    }

    require_unique_profiles(key, &application.profiles)?;
    for profile in &application.profiles {
        require_valid_templates(profile)?;
        resolve_requirements(tx, &key.tenant, profile)?;
    }

    require_default_profile_resolvable(
        ResourceType::Application,
        key,
        &application.default_profile_name,
        application.profiles.iter().map(|p| p.name.as_str()),
    )
}

#[allow(clippy::too_many_arguments)]
fn apply_changes(
    tx: &mut dyn Transaction,
    key: &RecordKey,
    existing: &Application,
    submitted: &Application,
    changes: &ApplicationChanges<'_>,
    kind: Kind,
    now: DateTime<Utc>,
) -> CatalogResult<()> {
    if changes.profiles || !changes.new_profiles.is_empty() || changes.default_profile {
        check_profiles(tx, key, submitted)?;
    }

    if changes.profiles {
        reconcile_profiles(tx, key, &existing.profiles, &submitted.profiles)?;
    } else {
        for profile in &changes.new_profiles {
            tx.insert_profile(key, (*profile).clone())?;
        }
    }

    if changes.root {
        check_root(tx, key, submitted)?;
    }

    if changes.root || changes.default_profile || changes.ignored_resources || changes.kind {
        let created = existing.create_time.unwrap_or(now);
        let mut record = application_record(submitted, kind, created, now);
        if !changes.ignored_resources {
            record.ignored_resources = existing.ignored_resources.clone();
        }
        tx.put_application(key.clone(), record)?;
    }
    Ok(())
}

/// Bring the stored profiles in line with the submitted set, matched by
/// name. Equal profiles are not rewritten; dropped ones must not be in use.
fn reconcile_profiles(
    tx: &mut dyn Transaction,
    key: &RecordKey,
    existing: &[Profile],
    submitted: &[Profile],
) -> CatalogResult<()> {
    for profile in existing {
        if !submitted.iter().any(|p| p.name == profile.name) {
            require_profile_not_in_use(tx, key, &profile.name)?;
            tx.delete_profile(key, &profile.name)?;
        }
    }

    for profile in submitted {
        match existing.iter().find(|p| p.name == profile.name) {
            Some(current) if profiles_equal(current, profile) => {}
            Some(_) => tx.put_profile(key, profile.clone())?,
            None => tx.insert_profile(key, profile.clone())?,
        }
    }
    Ok(())
}
