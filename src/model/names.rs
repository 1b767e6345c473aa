//! Name, version and display-name rules shared by every aggregate.

use crate::errors::{CatalogError, CatalogResult};

use super::ResourceType;

/// Longest accepted entity name
pub const MAX_NAME_LENGTH: usize = 40;

/// Validate an entity name.
///
/// Names are lowercase alphanumerics and dashes, starting and ending with an
/// alphanumeric.
pub fn validate_name(resource: ResourceType, name: &str) -> CatalogResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(CatalogError::invalid_argument(resource, "invalid name").with_name(name))
    }
}

/// Validate a version string: non-empty, no whitespace, no `:` separator.
pub fn validate_version(resource: ResourceType, name: &str, version: &str) -> CatalogResult<()> {
    if version.is_empty() || version.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err(CatalogError::invalid_argument(resource, "invalid version")
            .with_name(name)
            .with_version(version));
    }
    Ok(())
}

/// Resolve the display name to persist.
///
/// An empty display name falls back to the entity name. Leading or trailing
/// whitespace is rejected.
pub fn resolve_display_name(
    resource: ResourceType,
    name: &str,
    display_name: &str,
) -> CatalogResult<String> {
    if display_name.is_empty() {
        return Ok(name.to_string());
    }
    if display_name.trim() != display_name {
        return Err(CatalogError::invalid_argument(
            resource,
            "display name cannot contain leading or trailing spaces",
        )
        .with_name(name));
    }
    Ok(display_name.to_string())
}
