//! Deployment packages: curated sets of applications deployed together.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Kind;

/// Name of the deployment profile synthesized on read for packages without
/// explicit profiles.
pub const IMPLICIT_DEFAULT_PROFILE: &str = "implicit-default";

/// A versioned bundle of application references with deployment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentPackage {
    pub name: String,
    pub version: String,
    pub display_name: String,
    pub description: String,

    pub is_visible: bool,
    pub is_deployed: bool,
    pub allows_multiple_deployments: bool,
    pub kind: Kind,

    pub application_references: Vec<ApplicationReference>,
    pub application_dependencies: Vec<ApplicationDependency>,
    /// Application name to namespace
    pub default_namespaces: BTreeMap<String, String>,
    pub namespaces: Vec<Namespace>,

    pub profiles: Vec<DeploymentProfile>,
    /// Name of the default deployment profile; empty when unset
    pub default_profile_name: String,

    pub extensions: Vec<ApiExtension>,
    pub artifacts: Vec<ArtifactReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl DeploymentPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.application_references.push(ApplicationReference::new(name, version));
        self
    }

    pub fn with_profile(mut self, profile: DeploymentProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn with_default_profile(mut self, name: impl Into<String>) -> Self {
        self.default_profile_name = name.into();
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, requires: impl Into<String>) -> Self {
        self.application_dependencies.push(ApplicationDependency {
            name: name.into(),
            requires: requires.into(),
        });
        self
    }

    pub fn deployed(mut self, is_deployed: bool) -> Self {
        self.is_deployed = is_deployed;
        self
    }
}

pub(crate) fn has_duplicate_names(references: &[ApplicationReference]) -> bool {
    let mut seen = std::collections::HashSet::new();
    references.iter().any(|r| !seen.insert(r.name.as_str()))
}

/// A (name, version) pointer to an application; the package does not own it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationReference {
    pub name: String,
    pub version: String,
}

impl ApplicationReference {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Fully-qualified key: `name:version`
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

/// `name` must be deployed after `requires`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationDependency {
    pub name: String,
    pub requires: String,
}

impl ApplicationDependency {
    pub fn key(&self) -> String {
        format!("{}->{}", self.name, self.requires)
    }
}

/// A namespace created for the package, with labels and annotations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespace {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// A named selection of one profile per member application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentProfile {
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Application key (`name` or `name:version`) to profile name
    pub application_profiles: BTreeMap<String, String>,
}

impl DeploymentProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_entry(mut self, application: impl Into<String>, profile: impl Into<String>) -> Self {
        self.application_profiles.insert(application.into(), profile.into());
        self
    }

    /// True if every application key is `name:version`
    pub fn uses_qualified_keys(&self) -> bool {
        self.application_profiles.keys().all(|k| k.contains(':'))
    }
}

/// An API exposed by the package through the platform gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiExtension {
    pub name: String,
    pub version: String,
    pub display_name: String,
    pub description: String,
    pub endpoints: Vec<Endpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_extension: Option<UiExtension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub service_name: String,
    pub external_path: String,
    pub internal_path: String,
    pub scheme: String,
    pub auth_type: String,
    pub app_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiExtension {
    pub label: String,
    pub service_name: String,
    pub description: String,
    pub file_name: String,
    pub app_name: String,
    pub module_name: String,
}

/// A use of an artifact by the package, e.g. `icon` or `thumbnail`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactReference {
    pub name: String,
    pub purpose: String,
}

impl ArtifactReference {
    pub fn new(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.name, self.purpose)
    }
}
