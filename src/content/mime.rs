//! Payload sniffing per mime type.

use crate::errors::{CatalogError, CatalogResult};
use crate::model::{
    ResourceType, MIME_APPLICATION_JSON, MIME_APPLICATION_YAML, MIME_IMAGE_JPEG, MIME_IMAGE_PNG,
    MIME_TEXT_PLAIN,
};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Check that `data` matches `mime_type`.
///
/// Text types must be UTF-8, JSON must parse, images must start with their
/// file signature. Unknown mime types are rejected.
pub fn validate_mime(name: &str, mime_type: &str, data: &[u8]) -> CatalogResult<()> {
    let matches = match mime_type {
        MIME_TEXT_PLAIN | MIME_APPLICATION_YAML => std::str::from_utf8(data).is_ok(),
        MIME_APPLICATION_JSON => serde_json::from_slice::<serde_json::Value>(data).is_ok(),
        MIME_IMAGE_PNG => data.starts_with(PNG_SIGNATURE),
        MIME_IMAGE_JPEG => data.starts_with(JPEG_SIGNATURE),
        _ => {
            return Err(CatalogError::invalid_argument(
                ResourceType::Artifact,
                format!("unsupported mime type {}", mime_type),
            )
            .with_name(name))
        }
    };

    if !matches {
        return Err(CatalogError::invalid_argument(
            ResourceType::Artifact,
            "artifact contents do not match mime type",
        )
        .with_name(name));
    }
    Ok(())
}
