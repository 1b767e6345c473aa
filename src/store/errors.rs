//! # Store Errors
//!
//! Failures reported by a snapshot store. Constraint violations are kept
//! distinct from other failures so the catalog can surface them as
//! uniqueness errors.

use thiserror::Error;

use crate::model::ResourceType;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Snapshot store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A row with the same key already exists
    #[error("constraint violation: {resource} {name}:{version} already exists")]
    Constraint {
        resource: ResourceType,
        name: String,
        version: String,
    },

    /// A row that must exist was missing
    #[error("{resource} {name}:{version} not found")]
    NotFound {
        resource: ResourceType,
        name: String,
        version: String,
    },

    /// Backend cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("store failure: {0}")]
    Internal(String),
}

impl StoreError {
    /// True for uniqueness or foreign-key violations
    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }
}
