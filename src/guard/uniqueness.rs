//! Uniqueness of names and display names.

use std::collections::HashSet;

use crate::errors::{CatalogError, CatalogResult, ErrorKind};
use crate::model::{DeploymentProfile, Profile, ResourceType};
use crate::store::RecordKey;

/// Display names are unique per tenant and entity type, ignoring case.
///
/// `others` yields `(name, display_name)` of every entity of the same type
/// in the tenant. Entities sharing the candidate's name are skipped, so an
/// entity never conflicts with itself or with its other versions.
pub fn require_unique_display_name(
    resource: ResourceType,
    name: &str,
    display_name: &str,
    others: impl IntoIterator<Item = (String, String)>,
) -> CatalogResult<()> {
    let wanted = display_name.to_lowercase();
    let taken = others
        .into_iter()
        .any(|(other, other_display)| other != name && other_display.to_lowercase() == wanted);

    if taken {
        return Err(CatalogError::new(
            ErrorKind::AlreadyExists,
            resource,
            format!("display name {} is not unique", display_name),
        )
        .with_name(name));
    }
    Ok(())
}

/// Profile names and display names are unique within an application.
pub fn require_unique_profiles(application: &RecordKey, profiles: &[Profile]) -> CatalogResult<()> {
    require_unique_children(
        ResourceType::Profile,
        application,
        profiles.iter().map(|p| (p.name.as_str(), p.display_name.as_str())),
    )
}

/// Deployment profile names and display names are unique within a package.
pub fn require_unique_deployment_profiles(
    package: &RecordKey,
    profiles: &[DeploymentProfile],
) -> CatalogResult<()> {
    require_unique_children(
        ResourceType::DeploymentProfile,
        package,
        profiles.iter().map(|p| (p.name.as_str(), p.display_name.as_str())),
    )
}

fn require_unique_children<'a>(
    resource: ResourceType,
    owner: &RecordKey,
    children: impl Iterator<Item = (&'a str, &'a str)>,
) -> CatalogResult<()> {
    let mut names = HashSet::new();
    let mut display_names = HashSet::new();

    for (name, display_name) in children {
        if !names.insert(name) {
            return Err(CatalogError::already_exists(resource).with_name(name));
        }
        if !display_names.insert(display_name.to_lowercase()) {
            return Err(CatalogError::new(
                ErrorKind::AlreadyExists,
                resource,
                format!(
                    "display name {} is not unique in {}:{}",
                    display_name, owner.name, owner.version
                ),
            )
            .with_name(name));
        }
    }
    Ok(())
}

/// Template names are unique within a profile, and mandatory or secret
/// templates carry no default.
pub fn require_valid_templates(profile: &Profile) -> CatalogResult<()> {
    let mut names = HashSet::new();
    for template in &profile.parameter_templates {
        if !names.insert(template.name.as_str()) {
            return Err(CatalogError::invalid_argument(
                ResourceType::Profile,
                format!("duplicate parameter template {}", template.name),
            )
            .with_name(&profile.name));
        }
        if (template.mandatory || template.secret) && !template.default.is_empty() {
            return Err(CatalogError::invalid_argument(
                ResourceType::Profile,
                format!(
                    "parameter template {} is mandatory or secret and cannot have a default value",
                    template.name
                ),
            )
            .with_name(&profile.name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParameterTemplate;

    fn others() -> Vec<(String, String)> {
        vec![
            ("web".into(), "Web Server".into()),
            ("db".into(), "Database".into()),
        ]
    }

    #[test]
    fn test_display_name_collision_ignores_case() {
        let err = require_unique_display_name(ResourceType::Application, "cache", "web server", others())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_own_display_name_is_not_a_conflict() {
        assert!(require_unique_display_name(ResourceType::Application, "web", "Web Server", others()).is_ok());
    }

    #[test]
    fn test_duplicate_profile_names() {
        let key = RecordKey::versioned("t1", "web", "1.0");
        let mut a = Profile::new("p");
        a.display_name = "P".into();
        let mut b = Profile::new("p");
        b.display_name = "Other".into();
        let err = require_unique_profiles(&key, &[a, b]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_duplicate_profile_display_names() {
        let key = RecordKey::versioned("t1", "web", "1.0");
        let mut a = Profile::new("a");
        a.display_name = "Small".into();
        let mut b = Profile::new("b");
        b.display_name = "SMALL".into();
        assert!(require_unique_profiles(&key, &[a, b]).is_err());
    }

    #[test]
    fn test_mandatory_template_with_default() {
        let mut template = ParameterTemplate::new("password", "string");
        template.mandatory = true;
        template.default = "secret".into();
        let profile = Profile::new("p").with_template(template);
        let err = require_valid_templates(&profile).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_duplicate_template_names() {
        let profile = Profile::new("p")
            .with_template(ParameterTemplate::new("replicas", "number"))
            .with_template(ParameterTemplate::new("replicas", "string"));
        assert!(require_valid_templates(&profile).is_err());
    }

    #[test]
    fn test_optional_template_with_default() {
        let mut template = ParameterTemplate::new("replicas", "number");
        template.default = "1".into();
        assert!(require_valid_templates(&Profile::new("p").with_template(template)).is_ok());
    }
}
