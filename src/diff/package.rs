//! Deployment package facets.

use crate::model::{DeploymentPackage, DeploymentProfile};

use super::{diff_keyed, diff_keyed_eq, map_changed};

/// Per-facet verdict for a deployment package update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageChanges<'a> {
    /// Kind or deployed flag moved; tracked apart from structural changes
    pub kind_or_state: bool,
    /// Display name, description, visibility or multiple-deployment flag
    pub root: bool,
    pub applications: bool,
    pub profiles: bool,
    pub new_profiles: Vec<&'a DeploymentProfile>,
    pub default_profile: bool,
    pub dependencies: bool,
    pub default_namespaces: bool,
    pub namespaces: bool,
    pub extensions: bool,
    pub artifacts: bool,
}

impl PackageChanges<'_> {
    /// Any change other than kind or deployed state
    pub fn is_structural(&self) -> bool {
        self.root
            || self.applications
            || self.profiles
            || !self.new_profiles.is_empty()
            || self.default_profile
            || self.dependencies
            || self.default_namespaces
            || self.namespaces
            || self.extensions
            || self.artifacts
    }

    /// Only kind and/or deployed state moved
    pub fn is_state_only(&self) -> bool {
        self.kind_or_state && !self.is_structural()
    }

    pub fn is_empty(&self) -> bool {
        !self.kind_or_state && !self.is_structural()
    }
}

/// Compare a submitted package against its persisted snapshot.
///
/// `existing` must be the stored view without any synthesized profile, and
/// `submitted` must carry its resolved display name.
pub fn diff_package<'a>(existing: &DeploymentPackage, submitted: &'a DeploymentPackage) -> PackageChanges<'a> {
    let kind_or_state = submitted.kind.or_keep(existing.kind) != existing.kind
        || submitted.is_deployed != existing.is_deployed;

    let root = existing.display_name != submitted.display_name
        || existing.description != submitted.description
        || existing.is_visible != submitted.is_visible
        || existing.allows_multiple_deployments != submitted.allows_multiple_deployments;

    let profiles = diff_keyed(
        &existing.profiles,
        &submitted.profiles,
        |p| p.name.clone(),
        deployment_profiles_equal,
    );

    PackageChanges {
        kind_or_state,
        root,
        applications: diff_keyed_eq(
            &existing.application_references,
            &submitted.application_references,
            |r| r.qualified(),
        )
        .is_touched(),
        profiles: profiles.is_changed(),
        new_profiles: profiles.new_items().to_vec(),
        default_profile: existing.default_profile_name != submitted.default_profile_name,
        dependencies: diff_keyed_eq(
            &existing.application_dependencies,
            &submitted.application_dependencies,
            |d| d.key(),
        )
        .is_touched(),
        default_namespaces: map_changed(&existing.default_namespaces, &submitted.default_namespaces),
        namespaces: diff_keyed_eq(&existing.namespaces, &submitted.namespaces, |n| n.name.clone())
            .is_touched(),
        extensions: diff_keyed_eq(&existing.extensions, &submitted.extensions, |e| e.name.clone())
            .is_touched(),
        artifacts: diff_keyed_eq(&existing.artifacts, &submitted.artifacts, |a| a.key())
            .is_touched(),
    }
}

fn deployment_profiles_equal(a: &DeploymentProfile, b: &DeploymentProfile) -> bool {
    a.name == b.name
        && a.display_name == b.display_name
        && a.description == b.description
        && a.application_profiles == b.application_profiles
}
