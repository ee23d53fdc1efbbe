//! Notification dispatch boundary.
//!
//! [`NotificationDispatcher`] is the seam between the lifecycle services
//! and the delivery world (in-app rows today, email/webhook fan-out
//! downstream of the bus). Dispatch is fire-and-forget relative to the
//! caller's transaction: every failure is caught here and logged, and
//! the methods return `()`, so record-state correctness can never depend
//! on this channel succeeding.

use std::sync::Arc;

use haven_core::types::DbId;
use haven_db::repositories::NotificationRepo;
use haven_db::DbPool;

use crate::bus::{EventBus, PlatformEvent};

/// Delivery priority for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

impl NotificationPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }
}

/// A single notification to be dispatched.
#[derive(Debug, Clone)]
pub struct Notify {
    pub user_id: DbId,
    /// Event-type name, one of [`crate::bus::event_types`].
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub action_url: Option<String>,
    pub priority: NotificationPriority,
}

impl Notify {
    pub fn new(user_id: DbId, kind: &'static str, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            data: serde_json::Value::Object(Default::default()),
            action_url: None,
            priority: NotificationPriority::Normal,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// Writes per-user notification rows and publishes the matching
/// [`PlatformEvent`] on the bus.
pub struct NotificationDispatcher {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl NotificationDispatcher {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    /// Dispatch a single notification. Never fails from the caller's
    /// perspective; storage errors are logged and swallowed.
    pub async fn notify(&self, notification: Notify) {
        if let Err(e) = NotificationRepo::create(
            &self.pool,
            notification.user_id,
            notification.kind,
            &notification.title,
            &notification.message,
            &notification.data,
            notification.action_url.as_deref(),
            notification.priority.as_str(),
        )
        .await
        {
            tracing::error!(
                error = %e,
                user_id = notification.user_id,
                kind = notification.kind,
                "Failed to persist notification"
            );
        }

        self.bus.publish(
            PlatformEvent::new(notification.kind)
                .with_actor(notification.user_id)
                .with_payload(notification.data),
        );
    }

    /// Dispatch a batch. Each entry is delivered independently; one
    /// failure does not stop the rest.
    pub async fn notify_many(&self, notifications: Vec<Notify>) {
        for notification in notifications {
            self.notify(notification).await;
        }
    }

    /// Publish a bare platform event without a per-user notification
    /// (e.g. for audit subscribers).
    pub fn publish(&self, event: PlatformEvent) {
        self.bus.publish(event);
    }
}
