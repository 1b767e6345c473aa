//! # Catalog Notifications
//!
//! Committed mutations become [`CatalogEvent`]s, collected per request in an
//! [`EventQueue`] and released to listeners by the [`Dispatcher`] only after
//! the transaction commits.
//!
//! - **Events**: typed per entity, stamped with the producing commit
//! - **Listeners**: per-type registries with tenant and kind filters
//! - **Dispatcher**: bounded inboxes, replay of existing state on watch

pub mod dispatcher;
pub mod errors;
pub mod event;
pub mod subscription;

pub use dispatcher::{
    DeliveryPolicy, DispatchResult, Dispatcher, OverflowPolicy, Subscription, MAX_LISTENER_CAPACITY,
};
pub use errors::{RealtimeError, RealtimeResult};
pub use event::{CatalogEvent, EventKind, EventQueue, Watchable};
pub use subscription::{EventReceiver, EventSender, ListenerId, ListenerRegistry, WatchFilter};
