//! # Real-Time Errors
//!
//! Error types for listener registration and event delivery.

use thiserror::Error;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    // ==================
    // Registration Errors
    // ==================
    /// Listener not registered for this entity type
    #[error("Listener not found: {0}")]
    ListenerNotFound(String),

    // ==================
    // Delivery Errors
    // ==================
    /// Inbox full under the disconnect policy
    #[error("Listener inbox full (capacity: {0})")]
    InboxFull(usize),

    /// Inbox stayed full past the delivery timeout
    #[error("Delivery timed out after {0} ms")]
    DeliveryTimeout(u64),

    /// Receiver dropped by the subscriber
    #[error("Listener receiver closed")]
    ReceiverClosed,
}

impl RealtimeError {
    /// Returns the error code for log lines
    pub fn code(&self) -> &'static str {
        match self {
            RealtimeError::ListenerNotFound(_) => "REALTIME_LISTENER_NOT_FOUND",
            RealtimeError::InboxFull(_) => "REALTIME_INBOX_FULL",
            RealtimeError::DeliveryTimeout(_) => "REALTIME_DELIVERY_TIMEOUT",
            RealtimeError::ReceiverClosed => "REALTIME_RECEIVER_CLOSED",
        }
    }

    /// True if the listener was removed because of this error
    pub fn disconnects(&self) -> bool {
        !matches!(self, RealtimeError::ListenerNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RealtimeError::InboxFull(8).code(), "REALTIME_INBOX_FULL");
        assert_eq!(RealtimeError::ReceiverClosed.code(), "REALTIME_RECEIVER_CLOSED");
    }

    #[test]
    fn test_delivery_errors_disconnect() {
        assert!(RealtimeError::DeliveryTimeout(10).disconnects());
        assert!(!RealtimeError::ListenerNotFound("x".into()).disconnects());
    }
}
