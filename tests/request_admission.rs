//! Request Admission Tests
//!
//! Shape checks, the authorization oracle and the content validator all run
//! before any transaction is opened; a refused request leaves no trace.

use std::sync::Arc;

use async_trait::async_trait;

use catalogd::auth::RuleOracle;
use catalogd::content::{ContentValidator, ScanVerdict};
use catalogd::model::{
    Application, Artifact, Registry, RegistryType, MIME_APPLICATION_JSON, MIME_IMAGE_PNG,
    MIME_TEXT_PLAIN,
};
use catalogd::realtime::WatchFilter;
use catalogd::{CatalogConfig, CatalogService, ErrorKind, MemoryStore};

const TENANT: &str = "t1";

fn service() -> CatalogService<MemoryStore> {
    CatalogService::new(Arc::new(MemoryStore::new()), CatalogConfig::default())
}

/// Returns the same verdict for every payload
struct FixedVerdict(ScanVerdict);

#[async_trait]
impl ContentValidator for FixedVerdict {
    async fn scan(&self, _data: &[u8]) -> ScanVerdict {
        self.0.clone()
    }
}

fn with_verdict(verdict: ScanVerdict, permissive: bool) -> CatalogService<MemoryStore> {
    let config = CatalogConfig {
        content_validator_permissive: permissive,
        ..CatalogConfig::default()
    };
    CatalogService::new(Arc::new(MemoryStore::new()), config)
        .with_validator(Arc::new(FixedVerdict(verdict)))
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

/// Test: A denied mutation is rejected before anything is written.
#[tokio::test]
async fn test_denied_operation() {
    let service = service().with_oracle(Arc::new(RuleOracle::new().deny_operation("CreateApplication")));
    let mut subscription = service.watch_applications(WatchFilter::all(), false).await.unwrap();

    let err = service
        .create_application(TENANT, Application::new("web", "1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(service.store().committed_writes(), 0);
    assert!(subscription.try_recv().is_none());
    assert_eq!(service.metrics().snapshot().mutations_rejected, 1);
}

/// Test: Denying a tenant also denies its reads and watches.
#[tokio::test]
async fn test_denied_tenant() {
    let service = service().with_oracle(Arc::new(RuleOracle::new().deny_tenant("blocked")));

    let err = service.list_registries("blocked").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = service
        .watch_registries(WatchFilter::tenant("blocked"), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    assert!(service.list_registries(TENANT).await.unwrap().is_empty());
}

// =============================================================================
// SHAPE CHECKS
// =============================================================================

/// Test: Invalid names and versions are rejected as invalid arguments.
#[tokio::test]
async fn test_invalid_identity() {
    let service = service();

    let err = service
        .create_application(TENANT, Application::new("Web", "1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .create_application(TENANT, Application::new("web", "1 0"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .create_registry(TENANT, Registry::new("charts", RegistryType::Helm, ""))
        .await
        .unwrap_err();
    assert!(err.message().contains("root url must be specified"));
}

/// Test: A profile list without a default is refused.
#[tokio::test]
async fn test_default_profile_required() {
    let service = service();
    let application = Application::new("web", "1").with_profile(catalogd::model::Profile::new("small"));

    let err = service.create_application(TENANT, application).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.message().contains("default profile name must be specified"));
}

/// Test: Display names are unique per tenant, ignoring case.
#[tokio::test]
async fn test_display_name_uniqueness() {
    let service = service();
    let mut first = Application::new("web", "1");
    first.display_name = "Web Shop".into();
    service.create_application(TENANT, first).await.unwrap();

    let mut second = Application::new("shop", "1");
    second.display_name = "web shop".into();
    let err = service.create_application(TENANT, second.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    // Other tenants are independent
    service.create_application("t2", second).await.unwrap();
}

// =============================================================================
// ARTIFACT CONTENT
// =============================================================================

/// Test: Payloads must match their declared mime type.
#[tokio::test]
async fn test_artifact_mime_checks() {
    let service = service();

    let err = service
        .create_artifact(TENANT, Artifact::new("manifest", MIME_APPLICATION_JSON, "{broken"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.to_string(), "artifact manifest artifact contents do not match mime type");

    let err = service
        .create_artifact(TENANT, Artifact::new("icon", MIME_IMAGE_PNG, "not a png"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = service
        .create_artifact(TENANT, Artifact::new("blob", "application/octet-stream", vec![0u8; 4]))
        .await
        .unwrap_err();
    assert!(err.message().contains("unsupported mime type"));

    let stored = service
        .create_artifact(TENANT, Artifact::new("readme", MIME_TEXT_PLAIN, "hello"))
        .await
        .unwrap();
    assert!(stored.create_time.is_some());
}

/// Test: Updating an artifact keeps its creation time.
#[tokio::test]
async fn test_artifact_update() {
    let service = service();
    let created = service
        .create_artifact(TENANT, Artifact::new("readme", MIME_TEXT_PLAIN, "hello"))
        .await
        .unwrap();

    let updated = service
        .update_artifact(TENANT, Artifact::new("readme", MIME_TEXT_PLAIN, "hello again"))
        .await
        .unwrap();
    assert_eq!(updated.create_time, created.create_time);
    assert_eq!(updated.data, b"hello again".to_vec());

    let fetched = service.get_artifact(TENANT, "readme").await.unwrap();
    assert_eq!(fetched, updated);
}

/// Test: An infected payload is refused.
#[tokio::test]
async fn test_infected_artifact() {
    let service = with_verdict(ScanVerdict::Infected("EICAR".into()), false);

    let err = service
        .create_artifact(TENANT, Artifact::new("readme", MIME_TEXT_PLAIN, "hello"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.message().contains("EICAR"));
    assert!(service.list_artifacts(TENANT).await.unwrap().is_empty());
}

/// Test: An unreachable validator fails the request unless the service is
/// permissive.
#[tokio::test]
async fn test_unavailable_validator() {
    let strict = with_verdict(ScanVerdict::Unavailable("connection refused".into()), false);
    let err = strict
        .create_artifact(TENANT, Artifact::new("readme", MIME_TEXT_PLAIN, "hello"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);

    let permissive = with_verdict(ScanVerdict::Unavailable("connection refused".into()), true);
    permissive
        .create_artifact(TENANT, Artifact::new("readme", MIME_TEXT_PLAIN, "hello"))
        .await
        .unwrap();
    assert_eq!(permissive.list_artifacts(TENANT).await.unwrap().len(), 1);
}
