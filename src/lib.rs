//! catalogd - reconciliation and notification engine for a multi-tenant
//! application catalog
//!
//! Clients submit whole aggregates. The diff engine decides which child
//! collections actually changed, the invariant guard enforces lifecycle
//! and referential rules, the service writes only the changed facets in
//! one transaction, and committed events fan out to live listeners.

pub mod auth;
pub mod cli;
pub mod config;
pub mod content;
pub mod diff;
pub mod errors;
pub mod guard;
pub mod model;
pub mod observability;
pub mod realtime;
pub mod service;
pub mod store;

pub use config::CatalogConfig;
pub use errors::{CatalogError, CatalogResult, ErrorKind};
pub use service::CatalogService;
pub use store::{MemoryStore, SnapshotStore};
