//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Operational counters
//! - Typed event names
//!
//! Observability is read-only: nothing here affects the outcome of a
//! catalog operation.
//!
//! ```ignore
//! use catalogd::observability::{log_event_with_fields, Event, Logger};
//!
//! Logger::info("CATALOG_MUTATION", &[("operation", "created")]);
//! log_event_with_fields(Event::ListenerRegistered, &[("resource", "application")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{CatalogMetrics, MetricsSnapshot};

/// Log an event at INFO
pub fn log_event(event: Event) {
    Logger::log(Severity::Info, event.as_str(), &[]);
}

/// Log an event with fields at INFO
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(Severity::Info, event.as_str(), fields);
}

/// Record one catalog activity: what happened to which entity of which
/// tenant.
pub fn log_activity(operation: &str, resource: &str, tenant: &str, name: &str, version: &str) {
    log_event_with_fields(
        Event::Mutation,
        &[
            ("operation", operation),
            ("resource", resource),
            ("tenant", tenant),
            ("name", name),
            ("version", version),
        ],
    );
}
