//! Lifecycle Invariant Tests
//!
//! Deployment locks, in-use checks on deletion and referential checks that
//! depend on state outside the submitted aggregate.

use std::sync::Arc;

use catalogd::model::{
    Application, Artifact, ArtifactReference, DeploymentPackage, DeploymentProfile,
    DeploymentRequirement, Kind, Profile, Registry, RegistryType, MIME_TEXT_PLAIN,
};
use catalogd::{CatalogConfig, CatalogService, ErrorKind, MemoryStore};

const TENANT: &str = "t1";

fn service() -> CatalogService<MemoryStore> {
    CatalogService::new(Arc::new(MemoryStore::new()), CatalogConfig::default())
}

fn foo() -> Application {
    Application::new("foo", "1")
        .with_profile(Profile::new("p1"))
        .with_profile(Profile::new("p2"))
        .with_default_profile("p1")
}

fn bundle() -> DeploymentPackage {
    DeploymentPackage::new("bundle", "1")
        .with_application("foo", "1")
        .with_profile(DeploymentProfile::new("standard").with_entry("foo", "p2"))
        .with_default_profile("standard")
}

fn web_requiring(deployment_profile: &str) -> Application {
    Application::new("web", "1")
        .with_profile(
            Profile::new("p").with_requirement(DeploymentRequirement::new("bundle", "1", deployment_profile)),
        )
        .with_default_profile("p")
}

// =============================================================================
// DEPLOYMENT LOCK
// =============================================================================

/// Test: A deployed package accepts kind and deployed-state changes, refuses
/// content changes, and accepts the same content change once undeployed.
#[tokio::test]
async fn test_deployed_package_lock_symmetry() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle().deployed(true)).await.unwrap();

    let mut edited = bundle().deployed(true);
    edited.description = "new description".into();
    let err = service.update_package(TENANT, edited).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert_eq!(err.to_string(), "deployment-package bundle:1 cannot modify deployed package");

    let mut addon = bundle().deployed(true);
    addon.kind = Kind::Addon;
    let updated = service.update_package(TENANT, addon).await.unwrap();
    assert_eq!(updated.kind, Kind::Addon);

    let undeployed = service.update_package(TENANT, bundle().deployed(false)).await.unwrap();
    assert!(!undeployed.is_deployed);
    assert_eq!(undeployed.kind, Kind::Addon);

    let mut edited = bundle().deployed(false);
    edited.description = "new description".into();
    let updated = service.update_package(TENANT, edited).await.unwrap();
    assert_eq!(updated.description, "new description");
}

/// Test: Undeploying and editing in the same request is allowed.
#[tokio::test]
async fn test_undeploy_with_edit_in_one_request() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle().deployed(true)).await.unwrap();

    let mut edited = bundle().deployed(false);
    edited.description = "retired".into();
    let updated = service.update_package(TENANT, edited).await.unwrap();

    assert!(!updated.is_deployed);
    assert_eq!(updated.description, "retired");
}

/// Test: An application inside a deployed package only accepts kind changes.
#[tokio::test]
async fn test_application_in_deployed_package_is_locked() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle().deployed(true)).await.unwrap();

    let mut edited = foo();
    edited.description = "changed".into();
    let err = service.update_application(TENANT, edited).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("1 deployed packages"));

    let updated = service
        .update_application(TENANT, foo().with_kind(Kind::Addon))
        .await
        .unwrap();
    assert_eq!(updated.kind, Kind::Addon);
}

// =============================================================================
// IN-USE GUARDS
// =============================================================================

/// Test: A profile selected through a deployment requirement cannot be
/// dropped.
#[tokio::test]
async fn test_profile_in_use_cannot_be_dropped() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle()).await.unwrap();
    service
        .create_application(
            TENANT,
            Application::new("web", "1")
                .with_profile(
                    Profile::new("p").with_requirement(DeploymentRequirement::new("bundle", "1", "standard")),
                )
                .with_default_profile("p"),
        )
        .await
        .unwrap();

    let dropped = Application::new("foo", "1")
        .with_profile(Profile::new("p1"))
        .with_default_profile("p1");
    let err = service.update_application(TENANT, dropped).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("profile p2 cannot be deleted"));

    // Nothing was written
    let stored = service.get_application(TENANT, "foo", "1").await.unwrap();
    assert_eq!(stored.profiles.len(), 2);

    // Adding a profile is not affected by the guard
    let extended = foo().with_profile(Profile::new("p3"));
    let updated = service.update_application(TENANT, extended).await.unwrap();
    assert_eq!(updated.profiles.len(), 3);

    // Once no deployment profile binds it the profile can be dropped
    let rebound = DeploymentPackage::new("bundle", "1")
        .with_application("foo", "1")
        .with_profile(DeploymentProfile::new("standard").with_entry("foo", "p1"))
        .with_default_profile("standard");
    service.update_package(TENANT, rebound).await.unwrap();
    let dropped = Application::new("foo", "1")
        .with_profile(Profile::new("p1"))
        .with_default_profile("p1");
    let updated = service.update_application(TENANT, dropped).await.unwrap();
    assert_eq!(updated.profiles.len(), 1);
}

/// Test: A profile bound by a deployment profile cannot be dropped even when
/// no requirement selects that deployment profile.
#[tokio::test]
async fn test_unrequired_bound_profile_cannot_be_dropped() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle()).await.unwrap();

    let dropped = Application::new("foo", "1")
        .with_profile(Profile::new("p1"))
        .with_default_profile("p1");
    let err = service.update_application(TENANT, dropped).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("in use by deployment-package bundle:1"));

    let stored = service.get_application(TENANT, "foo", "1").await.unwrap();
    assert_eq!(stored.profiles.len(), 2);
    let package = service.get_package(TENANT, "bundle", "1").await.unwrap();
    assert_eq!(package.profiles[0].application_profiles.get("foo").map(String::as_str), Some("p2"));
}

/// Test: A package named by a deployment requirement cannot be deleted.
#[tokio::test]
async fn test_required_package_cannot_be_deleted() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle()).await.unwrap();
    service.create_application(TENANT, web_requiring("standard")).await.unwrap();

    let err = service.delete_package(TENANT, "bundle", "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("required by application web:1"));
    service.get_package(TENANT, "bundle", "1").await.unwrap();

    service
        .update_application(
            TENANT,
            Application::new("web", "1").with_profile(Profile::new("p")).with_default_profile("p"),
        )
        .await
        .unwrap();
    service.delete_package(TENANT, "bundle", "1").await.unwrap();
}

/// Test: A deployment profile selected by a requirement, by name or through
/// the package default, cannot be dropped from its package.
#[tokio::test]
async fn test_required_deployment_profile_cannot_be_dropped() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle()).await.unwrap();
    service.create_application(TENANT, web_requiring("standard")).await.unwrap();

    let replaced = DeploymentPackage::new("bundle", "1")
        .with_application("foo", "1")
        .with_profile(DeploymentProfile::new("other").with_entry("foo", "p1"))
        .with_default_profile("other");
    let err = service.update_package(TENANT, replaced.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("deployment profile standard cannot be deleted"));

    let stored = service.get_package(TENANT, "bundle", "1").await.unwrap();
    assert_eq!(stored.profiles.len(), 1);
    assert_eq!(stored.profiles[0].name, "standard");

    // An empty requirement pointer follows the stored default
    service.update_application(TENANT, web_requiring("")).await.unwrap();
    let err = service.update_package(TENANT, replaced.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);

    // A requirement on another deployment profile does not hold this one
    let widened = bundle().with_profile(DeploymentProfile::new("other").with_entry("foo", "p1"));
    service.update_package(TENANT, widened).await.unwrap();
    service.update_application(TENANT, web_requiring("other")).await.unwrap();
    let updated = service.update_package(TENANT, replaced).await.unwrap();
    assert_eq!(updated.profiles.len(), 1);
    assert_eq!(updated.profiles[0].name, "other");
}

/// Test: Referenced applications and deployed packages cannot be deleted.
#[tokio::test]
async fn test_delete_guards() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_package(TENANT, bundle().deployed(true)).await.unwrap();
    assert_eq!(service.application_reference_count(TENANT, "foo", "1").await.unwrap(), 1);

    let err = service.delete_application(TENANT, "foo", "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);

    let err = service.delete_package(TENANT, "bundle", "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("cannot delete deployed package"));

    service.update_package(TENANT, bundle()).await.unwrap();
    service.delete_package(TENANT, "bundle", "1").await.unwrap();
    service.delete_application(TENANT, "foo", "1").await.unwrap();

    let err = service.get_application(TENANT, "foo", "1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// Test: A registry used by an application can neither be deleted nor change
/// type.
#[tokio::test]
async fn test_registry_in_use() {
    let service = service();
    service
        .create_registry(TENANT, Registry::new("charts", RegistryType::Helm, "https://charts.example.com"))
        .await
        .unwrap();
    service
        .create_application(TENANT, foo().with_chart("charts", "foo-chart", "1.0.0"))
        .await
        .unwrap();

    let err = service.delete_registry(TENANT, "charts").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);

    let err = service
        .update_registry(TENANT, Registry::new("charts", RegistryType::Image, "https://charts.example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("cannot change type of registry"));

    let mut renamed = Registry::new("charts", RegistryType::Helm, "https://charts.example.com");
    renamed.display_name = "Charts".into();
    let updated = service.update_registry(TENANT, renamed).await.unwrap();
    assert_eq!(updated.display_name, "Charts");
}

/// Test: A chart needs a helm registry of the right type.
#[tokio::test]
async fn test_chart_requires_helm_registry() {
    let service = service();
    let err = service
        .create_application(TENANT, foo().with_chart("", "foo-chart", "1.0.0"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.message().contains("helm registry must be specified"));

    service
        .create_registry(TENANT, Registry::new("images", RegistryType::Image, "https://images.example.com"))
        .await
        .unwrap();
    let err = service
        .create_application(TENANT, foo().with_chart("images", "foo-chart", "1.0.0"))
        .await
        .unwrap_err();
    assert!(err.message().contains("is not a HELM registry"));
}

/// Test: An artifact referenced by a package cannot be deleted.
#[tokio::test]
async fn test_artifact_in_use() {
    let service = service();
    service
        .create_artifact(TENANT, Artifact::new("readme", MIME_TEXT_PLAIN, "hello"))
        .await
        .unwrap();
    service.create_application(TENANT, foo()).await.unwrap();
    let mut package = bundle();
    package.artifacts.push(ArtifactReference::new("readme", "readme"));
    service.create_package(TENANT, package).await.unwrap();

    let err = service.delete_artifact(TENANT, "readme").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("bundle:1"));
}

// =============================================================================
// PACKAGE REFERENCES
// =============================================================================

/// Test: Removing an application that a dependency still names is a
/// precondition failure.
#[tokio::test]
async fn test_dependency_endpoint_removed() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    service.create_application(TENANT, Application::new("bar", "1")).await.unwrap();
    let package = DeploymentPackage::new("bundle", "1")
        .with_application("foo", "1")
        .with_application("bar", "1")
        .with_dependency("foo", "bar");
    service.create_package(TENANT, package).await.unwrap();

    let shrunk = DeploymentPackage::new("bundle", "1")
        .with_application("foo", "1")
        .with_dependency("foo", "bar");
    let err = service.update_package(TENANT, shrunk).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.message().contains("was removed from the package"));
}

/// Test: Deployment profiles must name profiles that exist on the
/// referenced application.
#[tokio::test]
async fn test_incongruent_deployment_profile() {
    let service = service();
    service.create_application(TENANT, foo()).await.unwrap();
    let package = DeploymentPackage::new("bundle", "1")
        .with_application("foo", "1")
        .with_profile(DeploymentProfile::new("standard").with_entry("foo", "missing"))
        .with_default_profile("standard");

    let err = service.create_package(TENANT, package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.message().contains("incongruent"));
}
