//! Per-user notification rows written by the dispatcher.

use haven_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    /// Event-type name this notification was fanned out from.
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub action_url: Option<String>,
    /// `"low"`, `"normal"`, or `"high"`.
    pub priority: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
