//! # Authorization
//!
//! The catalog asks an [`AuthorizationOracle`] once per request, before any
//! write. How the decision is made is up to the oracle; a denial aborts the
//! request with `PermissionDenied` and leaves the store untouched.

mod oracle;

pub use oracle::{AllowAll, AuthorizationOracle, Decision, Operation, RequestDescriptor, RuleOracle};
