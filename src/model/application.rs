//! Applications and their profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Kind;

/// A versioned, deployable application backed by a chart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub name: String,
    pub version: String,
    pub display_name: String,
    pub description: String,

    /// Chart coordinates
    pub chart_name: String,
    pub chart_version: String,

    /// Registry hosting the chart; must be a Helm registry
    pub helm_registry_name: String,
    /// Registry hosting images; empty when unset
    pub image_registry_name: String,

    /// Profiles in stored order
    pub profiles: Vec<Profile>,
    /// Name of the default profile; empty when unset
    pub default_profile_name: String,

    /// Resources ignored when computing deployment drift
    pub ignored_resources: Vec<ResourceReference>,

    pub kind: Kind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl Application {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_chart(
        mut self,
        registry: impl Into<String>,
        chart_name: impl Into<String>,
        chart_version: impl Into<String>,
    ) -> Self {
        self.helm_registry_name = registry.into();
        self.chart_name = chart_name.into();
        self.chart_version = chart_version.into();
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn with_default_profile(mut self, name: impl Into<String>) -> Self {
        self.default_profile_name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }
}

/// A named set of chart values for an application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub chart_values: String,
    pub deployment_requirements: Vec<DeploymentRequirement>,
    pub parameter_templates: Vec<ParameterTemplate>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_chart_values(mut self, values: impl Into<String>) -> Self {
        self.chart_values = values.into();
        self
    }

    pub fn with_requirement(mut self, requirement: DeploymentRequirement) -> Self {
        self.deployment_requirements.push(requirement);
        self
    }

    pub fn with_template(mut self, template: ParameterTemplate) -> Self {
        self.parameter_templates.push(template);
        self
    }
}

/// A package that must be deployed before the owning profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentRequirement {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Deployment profile inside the package; empty for the package default
    pub deployment_profile_name: String,
}

impl DeploymentRequirement {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        deployment_profile_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            deployment_profile_name: deployment_profile_name.into(),
        }
    }

    /// Map key used when comparing requirement lists
    pub fn key(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

/// A chart parameter a deployer may override.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterTemplate {
    pub name: String,
    pub display_name: String,
    pub default: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub validator: String,
    pub suggested_values: Vec<String>,
    pub mandatory: bool,
    pub secret: bool,
}

impl ParameterTemplate {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            ..Default::default()
        }
    }
}

/// A Kubernetes resource excluded from drift detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceReference {
    pub name: String,
    pub kind: String,
    pub namespace: String,
}

impl ResourceReference {
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.name, self.namespace, self.kind)
    }
}
