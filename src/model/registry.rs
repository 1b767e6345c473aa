//! Chart and image registries referenced by applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a registry hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistryType {
    #[default]
    Helm,
    Image,
}

impl RegistryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::Helm => "HELM",
            RegistryType::Image => "IMAGE",
        }
    }
}

/// A registry hosting charts or container images.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Registry {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub root_url: String,
    pub inventory_url: String,
    #[serde(rename = "type")]
    pub registry_type: RegistryType,
    pub api_type: String,
    pub auth_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl Registry {
    pub fn new(name: impl Into<String>, registry_type: RegistryType, root_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry_type,
            root_url: root_url.into(),
            ..Default::default()
        }
    }
}
