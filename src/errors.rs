//! # Catalog Errors
//!
//! Typed errors returned by every catalog operation.
//!
//! Each error carries the resource type and, where known, the name and
//! version of the offending entity, so that callers can locate it without
//! re-querying. Rendered form: `<resource-type> <name>[:<version>] <message>`.

use thiserror::Error;

use crate::model::ResourceType;
use crate::store::StoreError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // ==================
    // Request Errors
    // ==================
    /// Malformed or incomplete request, unresolvable reference
    InvalidArgument,
    /// Name or display name already taken
    AlreadyExists,
    /// Identity does not resolve
    NotFound,

    // ==================
    // Lifecycle Errors
    // ==================
    /// Deployment lock, in-use deletion
    FailedPrecondition,
    /// Authorization oracle denied the request
    PermissionDenied,

    // ==================
    // Collaborator Errors
    // ==================
    /// Content validator unreachable in non-permissive mode
    Unavailable,
    /// Snapshot store failure
    Internal,
}

impl ErrorKind {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "CATALOG_INVALID_ARGUMENT",
            ErrorKind::AlreadyExists => "CATALOG_ALREADY_EXISTS",
            ErrorKind::NotFound => "CATALOG_NOT_FOUND",
            ErrorKind::FailedPrecondition => "CATALOG_FAILED_PRECONDITION",
            ErrorKind::PermissionDenied => "CATALOG_PERMISSION_DENIED",
            ErrorKind::Unavailable => "CATALOG_UNAVAILABLE",
            ErrorKind::Internal => "CATALOG_INTERNAL",
        }
    }
}

/// A catalog error tagged with the entity it concerns
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.resource, .name, .version, .message))]
pub struct CatalogError {
    kind: ErrorKind,
    resource: ResourceType,
    name: Option<String>,
    version: Option<String>,
    message: String,
}

fn render(
    resource: &ResourceType,
    name: &Option<String>,
    version: &Option<String>,
    message: &str,
) -> String {
    match (name, version) {
        (Some(name), Some(version)) => format!("{} {}:{} {}", resource, name, version, message),
        (Some(name), None) => format!("{} {} {}", resource, name, message),
        _ => format!("{} {}", resource, message),
    }
}

impl CatalogError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, resource: ResourceType, message: impl Into<String>) -> Self {
        Self {
            kind,
            resource,
            name: None,
            version: None,
            message: message.into(),
        }
    }

    pub fn invalid_argument(resource: ResourceType, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, resource, message)
    }

    pub fn already_exists(resource: ResourceType) -> Self {
        Self::new(ErrorKind::AlreadyExists, resource, "already exists")
    }

    pub fn not_found(resource: ResourceType) -> Self {
        Self::new(ErrorKind::NotFound, resource, "not found")
    }

    pub fn failed_precondition(resource: ResourceType, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FailedPrecondition, resource, message)
    }

    pub fn permission_denied(resource: ResourceType, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, resource, message)
    }

    pub fn unavailable(resource: ResourceType, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, resource, message)
    }

    pub fn internal(resource: ResourceType, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, resource, message)
    }

    /// Attach the entity name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = Some(name);
        }
        self
    }

    /// Attach the entity version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        if !version.is_empty() {
            self.version = Some(version);
        }
        self
    }

    /// Attach name and version in one step
    pub fn with_identity(self, name: &str, version: &str) -> Self {
        self.with_name(name).with_version(version)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get error code for callers and log lines
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Constraint { resource, name, version } => {
                CatalogError::already_exists(resource).with_identity(&name, &version)
            }
            StoreError::NotFound { resource, name, version } => {
                CatalogError::not_found(resource).with_identity(&name, &version)
            }
            StoreError::Unavailable(msg) | StoreError::Internal(msg) => {
                CatalogError::internal(ResourceType::Application, msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_version() {
        let err = CatalogError::failed_precondition(
            ResourceType::DeploymentPackage,
            "cannot modify deployed package",
        )
        .with_identity("pkg", "1.0");
        assert_eq!(
            err.to_string(),
            "deployment-package pkg:1.0 cannot modify deployed package"
        );
    }

    #[test]
    fn test_render_without_version() {
        let err = CatalogError::not_found(ResourceType::Artifact).with_name("icon");
        assert_eq!(err.to_string(), "artifact icon not found");
    }

    #[test]
    fn test_render_without_identity() {
        let err = CatalogError::invalid_argument(ResourceType::Profile, "missing name");
        assert_eq!(err.to_string(), "profile missing name");
    }

    #[test]
    fn test_empty_identity_ignored() {
        let err = CatalogError::not_found(ResourceType::Registry).with_identity("", "");
        assert!(err.name().is_none());
        assert!(err.version().is_none());
    }

    #[test]
    fn test_store_constraint_maps_to_already_exists() {
        let err: CatalogError = StoreError::Constraint {
            resource: ResourceType::Application,
            name: "web".into(),
            version: "1.0".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.code(), "CATALOG_ALREADY_EXISTS");
        assert_eq!(err.to_string(), "application web:1.0 already exists");
    }

    #[test]
    fn test_store_failure_maps_to_internal() {
        let err: CatalogError = StoreError::Internal("lock poisoned".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
