//! # Catalog Model
//!
//! Aggregates submitted by clients and returned by reads.
//!
//! Every aggregate is scoped by an opaque tenant identifier which is carried
//! next to the aggregate rather than inside it. Optional references use the
//! empty string for "unset", matching how requests arrive on the wire.

mod application;
mod artifact;
mod kind;
mod names;
mod package;
mod registry;

pub use application::{
    Application, DeploymentRequirement, ParameterTemplate, Profile, ResourceReference,
};
pub use artifact::{
    Artifact, MIME_APPLICATION_JSON, MIME_APPLICATION_YAML, MIME_IMAGE_JPEG, MIME_IMAGE_PNG,
    MIME_TEXT_PLAIN,
};
pub use kind::Kind;
pub use names::{resolve_display_name, validate_name, validate_version, MAX_NAME_LENGTH};
pub(crate) use package::has_duplicate_names;
pub use package::{
    ApiExtension, ApplicationDependency, ApplicationReference, ArtifactReference,
    DeploymentPackage, DeploymentProfile, Endpoint, Namespace, UiExtension,
    IMPLICIT_DEFAULT_PROFILE,
};
pub use registry::{Registry, RegistryType};

use serde::{Deserialize, Serialize};

/// Entity types tracked by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Registry,
    Application,
    ApplicationReference,
    Profile,
    DeploymentPackage,
    DeploymentProfile,
    Artifact,
}

impl ResourceType {
    /// Returns the name used in error messages and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Registry => "registry",
            ResourceType::Application => "application",
            ResourceType::ApplicationReference => "application-reference",
            ResourceType::Profile => "profile",
            ResourceType::DeploymentPackage => "deployment-package",
            ResourceType::DeploymentProfile => "deployment-profile",
            ResourceType::Artifact => "artifact",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
