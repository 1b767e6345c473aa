//! Artifact operations.

use chrono::Utc;

use crate::auth::Operation;
use crate::content::validate_mime;
use crate::errors::{CatalogError, CatalogResult};
use crate::guard::{require_artifact_unreferenced, require_unique_display_name};
use crate::model::{resolve_display_name, validate_name, Artifact, ResourceType};
use crate::realtime::EventKind;
use crate::store::{RecordKey, SnapshotStore, Transaction};

use super::{describe, missing, scope, CatalogService};

impl<S: SnapshotStore> CatalogService<S> {
    /// Store a new artifact after checking its payload against the mime
    /// type and the content validator.
    pub async fn create_artifact(&self, tenant: &str, artifact: Artifact) -> CatalogResult<Artifact> {
        let request = describe(Operation::Create, ResourceType::Artifact, tenant, &artifact.name, "");
        let artifact = self.checked(&request, normalize(artifact))?;
        self.authorize(&request).await?;
        self.scan(&request, &artifact.data).await?;

        self.mutate::<Artifact, _, _>(&request, |tx, queue| {
            let key = RecordKey::named(tenant, artifact.name.clone());
            if tx.artifact(&key)?.is_some() {
                return Err(CatalogError::already_exists(ResourceType::Artifact).with_name(&key.name));
            }
            require_unique_artifact_display_name(tx, &key, &artifact)?;

            let now = Utc::now();
            let stored = Artifact {
                create_time: Some(now),
                update_time: Some(now),
                ..artifact.clone()
            };
            tx.insert_artifact(key, stored.clone())?;
            queue.append(EventKind::Created, tenant, stored.clone());
            Ok(stored)
        })
        .await
    }

    /// Replace an artifact
    pub async fn update_artifact(&self, tenant: &str, artifact: Artifact) -> CatalogResult<Artifact> {
        let request = describe(Operation::Update, ResourceType::Artifact, tenant, &artifact.name, "");
        let artifact = self.checked(&request, normalize(artifact))?;
        self.authorize(&request).await?;
        self.scan(&request, &artifact.data).await?;

        self.mutate::<Artifact, _, _>(&request, |tx, queue| {
            let key = RecordKey::named(tenant, artifact.name.clone());
            let existing = tx
                .artifact(&key)?
                .ok_or_else(|| missing(ResourceType::Artifact, &key))?;
            if unchanged(&existing, &artifact) {
                return Ok(existing);
            }
            if existing.display_name != artifact.display_name {
                require_unique_artifact_display_name(tx, &key, &artifact)?;
            }

            let stored = Artifact {
                create_time: existing.create_time,
                update_time: Some(Utc::now()),
                ..artifact.clone()
            };
            tx.put_artifact(key, stored.clone())?;
            queue.append(EventKind::Updated, tenant, stored.clone());
            Ok(stored)
        })
        .await
    }

    /// Delete an artifact that no package references
    pub async fn delete_artifact(&self, tenant: &str, name: &str) -> CatalogResult<()> {
        let request = describe(Operation::Delete, ResourceType::Artifact, tenant, name, "");
        self.authorize(&request).await?;

        self.mutate::<Artifact, _, _>(&request, |tx, queue| {
            let key = RecordKey::named(tenant, name);
            let existing = tx
                .artifact(&key)?
                .ok_or_else(|| missing(ResourceType::Artifact, &key))?;
            require_artifact_unreferenced(tx, &key)?;

            tx.delete_artifact(&key)?;
            queue.append(EventKind::Deleted, tenant, existing);
            Ok(())
        })
        .await
    }

    pub async fn get_artifact(&self, tenant: &str, name: &str) -> CatalogResult<Artifact> {
        let request = describe(Operation::Get, ResourceType::Artifact, tenant, name, "");
        self.authorize(&request).await?;

        let key = RecordKey::named(tenant, name);
        self.read(|tx| tx.artifact(&key)?.ok_or_else(|| missing(ResourceType::Artifact, &key)))
    }

    pub async fn list_artifacts(&self, tenant: &str) -> CatalogResult<Vec<Artifact>> {
        let request = describe(Operation::List, ResourceType::Artifact, tenant, "", "");
        self.authorize(&request).await?;

        self.read(|tx| {
            Ok(tx
                .artifacts(scope(tenant))?
                .into_iter()
                .map(|(_, artifact)| artifact)
                .collect())
        })
    }
}

fn normalize(mut artifact: Artifact) -> CatalogResult<Artifact> {
    validate_name(ResourceType::Artifact, &artifact.name)?;
    artifact.display_name =
        resolve_display_name(ResourceType::Artifact, &artifact.name, &artifact.display_name)?;
    validate_mime(&artifact.name, &artifact.mime_type, &artifact.data)?;
    Ok(artifact)
}

fn require_unique_artifact_display_name(
    tx: &dyn Transaction,
    key: &RecordKey,
    artifact: &Artifact,
) -> CatalogResult<()> {
    let others = tx
        .artifacts(Some(&key.tenant))?
        .into_iter()
        .map(|(other, a)| (other.name, a.display_name));
    require_unique_display_name(ResourceType::Artifact, &key.name, &artifact.display_name, others)
}

fn unchanged(existing: &Artifact, submitted: &Artifact) -> bool {
    existing.display_name == submitted.display_name
        && existing.description == submitted.description
        && existing.mime_type == submitted.mime_type
        && existing.data == submitted.data
}
