//! Application facets.

use crate::model::{Application, Profile};

use super::{diff_keyed, diff_keyed_eq, FacetDiff};

/// Per-facet verdict for an application update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationChanges<'a> {
    /// Kind differs from the stored kind
    pub kind: bool,
    /// Display name, description, chart coordinates or registries differ
    pub root: bool,
    /// An existing profile was modified or dropped
    pub profiles: bool,
    /// Submitted profiles that do not exist yet
    pub new_profiles: Vec<&'a Profile>,
    /// Default profile pointer differs
    pub default_profile: bool,
    pub ignored_resources: bool,
}

impl ApplicationChanges<'_> {
    /// Any change other than kind
    pub fn is_structural(&self) -> bool {
        self.root
            || self.profiles
            || !self.new_profiles.is_empty()
            || self.default_profile
            || self.ignored_resources
    }

    /// Only the kind moved
    pub fn is_state_only(&self) -> bool {
        self.kind && !self.is_structural()
    }

    pub fn is_empty(&self) -> bool {
        !self.kind && !self.is_structural()
    }
}

/// Compare a submitted application against its persisted snapshot.
///
/// `submitted` must already carry its resolved display name. An unspecified
/// kind means "keep the stored kind". An empty ignored-resource list leaves
/// the stored list untouched.
pub fn diff_application<'a>(existing: &Application, submitted: &'a Application) -> ApplicationChanges<'a> {
    let kind = submitted.kind.or_keep(existing.kind) != existing.kind;

    let root = existing.display_name != submitted.display_name
        || existing.description != submitted.description
        || existing.chart_name != submitted.chart_name
        || existing.chart_version != submitted.chart_version
        || existing.helm_registry_name != submitted.helm_registry_name
        || existing.image_registry_name != submitted.image_registry_name;

    let profiles: FacetDiff<'a, Profile> = diff_keyed(
        &existing.profiles,
        &submitted.profiles,
        |p| p.name.clone(),
        profiles_equal,
    );

    let ignored_resources = !submitted.ignored_resources.is_empty()
        && diff_keyed_eq(&existing.ignored_resources, &submitted.ignored_resources, |r| r.key())
            .is_touched();

    ApplicationChanges {
        kind,
        root,
        profiles: profiles.is_changed(),
        new_profiles: profiles.new_items().to_vec(),
        default_profile: existing.default_profile_name != submitted.default_profile_name,
        ignored_resources,
    }
}

/// Field-for-field profile equality, including requirements and templates
/// compared as keyed collections.
pub fn profiles_equal(a: &Profile, b: &Profile) -> bool {
    a.name == b.name
        && a.display_name == b.display_name
        && a.description == b.description
        && a.chart_values == b.chart_values
        && !diff_keyed_eq(&a.deployment_requirements, &b.deployment_requirements, |r| r.key())
            .is_touched()
        && !diff_keyed_eq(&a.parameter_templates, &b.parameter_templates, |t| t.name.clone())
            .is_touched()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeploymentRequirement, Kind, ParameterTemplate, ResourceReference};

    fn base() -> Application {
        Application::new("foo", "v1")
            .with_chart("charts", "foo", "1.0.0")
            .with_profile(Profile::new("p1").with_chart_values("a: 1"))
            .with_profile(Profile::new("p2"))
            .with_default_profile("p1")
            .with_kind(Kind::Normal)
    }

    #[test]
    fn test_identical_submission_has_no_changes() {
        let existing = base();
        let submitted = base();
        assert!(diff_application(&existing, &submitted).is_empty());
    }

    #[test]
    fn test_unspecified_kind_is_not_a_change() {
        let existing = base();
        let submitted = base().with_kind(Kind::Unspecified);
        assert!(diff_application(&existing, &submitted).is_empty());
    }

    #[test]
    fn test_kind_only_is_state_only() {
        let existing = base();
        let submitted = base().with_kind(Kind::Addon);
        let changes = diff_application(&existing, &submitted);
        assert!(changes.kind);
        assert!(changes.is_state_only());
    }

    #[test]
    fn test_root_change() {
        let existing = base();
        let mut submitted = base();
        submitted.chart_version = "1.0.1".into();
        let changes = diff_application(&existing, &submitted);
        assert!(changes.root);
        assert!(!changes.profiles);
    }

    #[test]
    fn test_dropped_and_added_profile() {
        let existing = base();
        let mut submitted = base();
        submitted.profiles = vec![Profile::new("p1").with_chart_values("a: 1"), Profile::new("p3")];
        submitted.default_profile_name = "p3".into();

        let changes = diff_application(&existing, &submitted);
        assert!(changes.profiles);
        assert!(changes.default_profile);
        assert!(changes.is_structural());
    }

    #[test]
    fn test_appended_profile_is_new_not_changed() {
        let existing = base();
        let submitted = base().with_profile(Profile::new("p3"));
        let changes = diff_application(&existing, &submitted);
        assert!(!changes.profiles);
        assert_eq!(changes.new_profiles.len(), 1);
        assert_eq!(changes.new_profiles[0].name, "p3");
    }

    #[test]
    fn test_nested_requirement_change() {
        let a = Profile::new("p").with_requirement(DeploymentRequirement::new("base", "1.0", ""));
        let b = Profile::new("p").with_requirement(DeploymentRequirement::new("base", "1.0", "small"));
        assert!(!profiles_equal(&a, &b));
        assert!(profiles_equal(&a, &a.clone()));
    }

    #[test]
    fn test_template_suggested_value_order_matters() {
        let mut t1 = ParameterTemplate::new("replicas", "number");
        t1.suggested_values = vec!["1".into(), "3".into()];
        let mut t2 = t1.clone();
        t2.suggested_values.reverse();

        let a = Profile::new("p").with_template(t1);
        let b = Profile::new("p").with_template(t2);
        assert!(!profiles_equal(&a, &b));
    }

    #[test]
    fn test_empty_ignored_resources_keep_stored() {
        let mut existing = base();
        existing.ignored_resources = vec![ResourceReference {
            name: "job".into(),
            kind: "Job".into(),
            namespace: "default".into(),
        }];
        let submitted = base();
        assert!(!diff_application(&existing, &submitted).ignored_resources);

        let mut submitted = base();
        submitted.ignored_resources = vec![ResourceReference {
            name: "cron".into(),
            kind: "CronJob".into(),
            namespace: "default".into(),
        }];
        assert!(diff_application(&existing, &submitted).ignored_resources);
    }
}
