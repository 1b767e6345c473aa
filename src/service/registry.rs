//! Registry operations.

use chrono::Utc;

use crate::auth::Operation;
use crate::errors::{CatalogError, CatalogResult};
use crate::guard::{require_registry_unused, require_unique_display_name};
use crate::model::{resolve_display_name, validate_name, Registry, ResourceType};
use crate::realtime::EventKind;
use crate::store::{RecordKey, SnapshotStore, Transaction};

use super::{describe, missing, scope, CatalogService};

impl<S: SnapshotStore> CatalogService<S> {
    /// Create a registry.
    pub async fn create_registry(&self, tenant: &str, registry: Registry) -> CatalogResult<Registry> {
        let request = describe(Operation::Create, ResourceType::Registry, tenant, &registry.name, "");
        let registry = self.checked(&request, normalize(registry))?;
        self.authorize(&request).await?;

        self.mutate::<Registry, _, _>(&request, |tx, queue| {
            let key = RecordKey::named(tenant, registry.name.clone());
            if tx.registry(&key)?.is_some() {
                return Err(CatalogError::already_exists(ResourceType::Registry).with_name(&key.name));
            }
            require_unique_registry_display_name(tx, &key, &registry)?;

            let now = Utc::now();
            let stored = Registry {
                create_time: Some(now),
                update_time: Some(now),
                ..registry.clone()
            };
            tx.insert_registry(key, stored.clone())?;
            queue.append(EventKind::Created, tenant, stored.clone());
            Ok(stored)
        })
        .await
    }

    /// Replace a registry. Changing the type of a registry that an
    /// application uses is refused.
    pub async fn update_registry(&self, tenant: &str, registry: Registry) -> CatalogResult<Registry> {
        let request = describe(Operation::Update, ResourceType::Registry, tenant, &registry.name, "");
        let registry = self.checked(&request, normalize(registry))?;
        self.authorize(&request).await?;

        self.mutate::<Registry, _, _>(&request, |tx, queue| {
            let key = RecordKey::named(tenant, registry.name.clone());
            let existing = tx
                .registry(&key)?
                .ok_or_else(|| missing(ResourceType::Registry, &key))?;
            if unchanged(&existing, &registry) {
                return Ok(existing);
            }

            if existing.registry_type != registry.registry_type {
                require_registry_unused(tx, &key, "change type of")?;
            }
            if existing.display_name != registry.display_name {
                require_unique_registry_display_name(tx, &key, &registry)?;
            }

            let stored = Registry {
                create_time: existing.create_time,
                update_time: Some(Utc::now()),
                ..registry.clone()
            };
            tx.put_registry(key, stored.clone())?;
            queue.append(EventKind::Updated, tenant, stored.clone());
            Ok(stored)
        })
        .await
    }

    /// Delete a registry that no application uses.
    pub async fn delete_registry(&self, tenant: &str, name: &str) -> CatalogResult<()> {
        let request = describe(Operation::Delete, ResourceType::Registry, tenant, name, "");
        self.authorize(&request).await?;

        self.mutate::<Registry, _, _>(&request, |tx, queue| {
            let key = RecordKey::named(tenant, name);
            let existing = tx
                .registry(&key)?
                .ok_or_else(|| missing(ResourceType::Registry, &key))?;
            require_registry_unused(tx, &key, "delete")?;

            tx.delete_registry(&key)?;
            queue.append(EventKind::Deleted, tenant, existing);
            Ok(())
        })
        .await
    }

    pub async fn get_registry(&self, tenant: &str, name: &str) -> CatalogResult<Registry> {
        let request = describe(Operation::Get, ResourceType::Registry, tenant, name, "");
        self.authorize(&request).await?;

        let key = RecordKey::named(tenant, name);
        self.read(|tx| {
            tx.registry(&key)?
                .ok_or_else(|| missing(ResourceType::Registry, &key))
        })
    }

    /// Registries of a tenant, or of every tenant when `tenant` is empty
    pub async fn list_registries(&self, tenant: &str) -> CatalogResult<Vec<Registry>> {
        let request = describe(Operation::List, ResourceType::Registry, tenant, "", "");
        self.authorize(&request).await?;

        self.read(|tx| {
            Ok(tx
                .registries(scope(tenant))?
                .into_iter()
                .map(|(_, registry)| registry)
                .collect())
        })
    }
}

fn normalize(mut registry: Registry) -> CatalogResult<Registry> {
    validate_name(ResourceType::Registry, &registry.name)?;
    registry.display_name =
        resolve_display_name(ResourceType::Registry, &registry.name, &registry.display_name)?;
    if registry.root_url.is_empty() {
        return Err(CatalogError::invalid_argument(
            ResourceType::Registry,
            "root url must be specified",
        )
        .with_name(&registry.name));
    }
    Ok(registry)
}

fn require_unique_registry_display_name(
    tx: &dyn Transaction,
    key: &RecordKey,
    registry: &Registry,
) -> CatalogResult<()> {
    let others = tx
        .registries(Some(&key.tenant))?
        .into_iter()
        .map(|(other, r)| (other.name, r.display_name));
    require_unique_display_name(ResourceType::Registry, &key.name, &registry.display_name, others)
}

fn unchanged(existing: &Registry, submitted: &Registry) -> bool {
    existing.display_name == submitted.display_name
        && existing.description == submitted.description
        && existing.root_url == submitted.root_url
        && existing.inventory_url == submitted.inventory_url
        && existing.registry_type == submitted.registry_type
        && existing.api_type == submitted.api_type
        && existing.auth_token == submitted.auth_token
}
