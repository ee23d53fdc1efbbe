//! Haven event bus and notification infrastructure.
//!
//! Building blocks for the platform-wide event system:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] — the canonical domain event envelope.
//! - [`NotificationDispatcher`] — the collaborator boundary the
//!   lifecycle services call into. Infallible from the caller's
//!   perspective: failures are logged, never propagated, so a broken
//!   notification channel can never roll back a state transition.
//! - [`EventPersistence`] — background service that durably writes every
//!   event to the `events` table.

pub mod bus;
pub mod dispatcher;
pub mod persistence;

pub use bus::{event_types, EventBus, PlatformEvent};
pub use dispatcher::{NotificationDispatcher, NotificationPriority, Notify};
pub use persistence::EventPersistence;
