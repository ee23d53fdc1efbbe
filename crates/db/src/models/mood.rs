//! Mood entry model (read path for permission-bounded queries).

use haven_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `mood_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MoodEntry {
    pub id: DbId,
    pub child_id: DbId,
    pub mood: String,
    /// 1 (mild) .. 5 (intense).
    pub intensity: i16,
    pub note: Option<String>,
    pub recorded_at: Timestamp,
    pub created_at: Timestamp,
}

/// Insert parameters for a mood entry.
#[derive(Debug, Clone)]
pub struct CreateMoodEntry {
    pub child_id: DbId,
    pub mood: String,
    pub intensity: i16,
    pub note: Option<String>,
    pub recorded_at: Timestamp,
}
