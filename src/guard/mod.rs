//! # Invariant Guard
//!
//! Checks that must pass before a classified change is applied. Every check
//! is read-only and fails with a specific [`ErrorKind`](crate::errors::ErrorKind).
//!
//! - `lifecycle`: deployment locks and in-use checks on deletion
//! - `references`: referential integrity inside and across aggregates
//! - `uniqueness`: display names, profile names and parameter templates

mod lifecycle;
mod references;
mod uniqueness;

pub use lifecycle::{
    packages_referencing, require_application_unreferenced, require_artifact_unreferenced,
    require_deployment_profile_unrequired, require_not_deployed,
    require_not_referenced_by_deployed_package, require_package_unrequired,
    require_profile_not_in_use, require_registry_unused,
};
pub use references::{
    require_application_references_resolvable, require_artifact_references_resolvable,
    require_consistent_profile_key_style, require_default_namespaces_resolvable,
    require_default_profile_resolvable, require_dependency_endpoints_resolvable,
    require_registry_type, resolve_deployment_profile, resolve_requirements,
};
pub use uniqueness::{
    require_unique_display_name, require_unique_deployment_profiles, require_unique_profiles,
    require_valid_templates,
};
