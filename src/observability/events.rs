//! Observable catalog events
//!
//! Names of the log lines emitted by the catalog. Events are explicit and
//! typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Mutations
    /// A create, update or delete committed
    Mutation,
    /// A request was rejected before commit
    Rejected,
    /// A read completed
    Retrieved,
    /// Content validator unreachable, request allowed in permissive mode
    ValidatorBypassed,

    // Listeners
    /// Listener added
    ListenerRegistered,
    /// Listener removed by its owner or after a failed delivery
    ListenerRemoved,
    /// Event not delivered to a listener
    EventDropped,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Mutation => "CATALOG_MUTATION",
            Event::Rejected => "CATALOG_REJECTED",
            Event::Retrieved => "CATALOG_RETRIEVED",
            Event::ValidatorBypassed => "CONTENT_VALIDATOR_BYPASSED",
            Event::ListenerRegistered => "LISTENER_REGISTERED",
            Event::ListenerRemoved => "LISTENER_REMOVED",
            Event::EventDropped => "EVENT_DROPPED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
