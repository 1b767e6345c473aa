//! # Artifact Content Checks
//!
//! Two checks run on artifact payloads before they are stored:
//!
//! - [`validate_mime`]: the bytes must look like the declared mime type
//! - [`ContentValidator`]: an external scanner (e.g. malware) that may be
//!   unreachable

mod mime;
mod validator;

pub use mime::validate_mime;
pub use validator::{ContentValidator, NoopValidator, ScanVerdict};
