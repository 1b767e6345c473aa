//! Persisted row shapes.
//!
//! Root rows hold scalar fields only. Child collections live in their own
//! rows so that a facet can be rewritten without touching its siblings.

use chrono::{DateTime, Utc};

use crate::model::{
    ApiExtension, ApplicationDependency, ApplicationReference, ArtifactReference, Kind, Namespace,
    ResourceReference,
};
use std::collections::BTreeMap;

/// Identity of a root row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub tenant: String,
    pub name: String,
    /// Empty for unversioned roots
    pub version: String,
}

impl RecordKey {
    /// Key of an unversioned root (registry, artifact)
    pub fn named(tenant: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
            version: String::new(),
        }
    }

    /// Key of a versioned root (application, package)
    pub fn versioned(
        tenant: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Application root row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub display_name: String,
    pub description: String,
    pub chart_name: String,
    pub chart_version: String,
    pub helm_registry_name: String,
    pub image_registry_name: String,
    pub kind: Kind,
    pub default_profile: Option<String>,
    pub ignored_resources: Vec<ResourceReference>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Deployment package root row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub display_name: String,
    pub description: String,
    pub is_visible: bool,
    pub is_deployed: bool,
    pub allows_multiple_deployments: bool,
    pub kind: Kind,
    pub default_profile: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Names a child collection of a deployment package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageFacet {
    ApplicationReferences,
    ApplicationDependencies,
    DefaultNamespaces,
    Namespaces,
    Extensions,
    Artifacts,
}

/// Contents of one package child collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageCollection {
    ApplicationReferences(Vec<ApplicationReference>),
    ApplicationDependencies(Vec<ApplicationDependency>),
    DefaultNamespaces(BTreeMap<String, String>),
    Namespaces(Vec<Namespace>),
    Extensions(Vec<ApiExtension>),
    Artifacts(Vec<ArtifactReference>),
}

impl PackageCollection {
    pub fn facet(&self) -> PackageFacet {
        match self {
            PackageCollection::ApplicationReferences(_) => PackageFacet::ApplicationReferences,
            PackageCollection::ApplicationDependencies(_) => PackageFacet::ApplicationDependencies,
            PackageCollection::DefaultNamespaces(_) => PackageFacet::DefaultNamespaces,
            PackageCollection::Namespaces(_) => PackageFacet::Namespaces,
            PackageCollection::Extensions(_) => PackageFacet::Extensions,
            PackageCollection::Artifacts(_) => PackageFacet::Artifacts,
        }
    }
}

/// A deployment profile row. Entries point at concrete application
/// versions; display keys are derived on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentProfileRecord {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub bindings: Vec<ProfileBinding>,
    /// Entries were submitted as `name:version`
    pub qualified_keys: bool,
}

/// One application's profile choice inside a deployment profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBinding {
    pub application: ApplicationReference,
    pub profile: String,
}
