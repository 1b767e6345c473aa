//! Binary artifacts (icons, thumbnails, descriptors) attached to packages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_APPLICATION_JSON: &str = "application/json";
pub const MIME_APPLICATION_YAML: &str = "application/yaml";
pub const MIME_IMAGE_PNG: &str = "image/png";
pub const MIME_IMAGE_JPEG: &str = "image/jpeg";

/// A named binary payload with a declared mime type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub mime_type: String,
    pub data: Vec<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
            ..Default::default()
        }
    }
}
