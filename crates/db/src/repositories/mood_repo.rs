//! Repository for the `mood_entries` table.

use haven_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::mood::{CreateMoodEntry, MoodEntry};

/// Column list for `mood_entries` queries.
const COLUMNS: &str = "id, child_id, mood, intensity, note, recorded_at, created_at";

/// Reads and writes for mood entries.
pub struct MoodRepo;

impl MoodRepo {
    /// Insert a mood entry.
    pub async fn create(pool: &PgPool, input: &CreateMoodEntry) -> Result<MoodEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO mood_entries (child_id, mood, intensity, note, recorded_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MoodEntry>(&query)
            .bind(input.child_id)
            .bind(&input.mood)
            .bind(input.intensity)
            .bind(&input.note)
            .bind(input.recorded_at)
            .fetch_one(pool)
            .await
    }

    /// List a child's entries within `[from, until]`, newest first.
    /// Either bound may be absent.
    pub async fn list_for_child(
        pool: &PgPool,
        child_id: DbId,
        from: Option<Timestamp>,
        until: Option<Timestamp>,
    ) -> Result<Vec<MoodEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM mood_entries \
             WHERE child_id = $1 \
               AND ($2::TIMESTAMPTZ IS NULL OR recorded_at >= $2) \
               AND ($3::TIMESTAMPTZ IS NULL OR recorded_at <= $3) \
             ORDER BY recorded_at DESC"
        );
        sqlx::query_as::<_, MoodEntry>(&query)
            .bind(child_id)
            .bind(from)
            .bind(until)
            .fetch_all(pool)
            .await
    }
}
