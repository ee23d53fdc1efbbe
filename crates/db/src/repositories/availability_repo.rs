//! Repositories for the availability tables.

use chrono::NaiveDate;
use haven_core::types::DbId;
use sqlx::PgPool;

use crate::models::availability::{
    AvailabilityOverride, AvailabilityWindow, CreateAvailabilityOverride,
    CreateAvailabilityWindow,
};

const WINDOW_COLUMNS: &str = "id, therapist_id, weekday, start_time, end_time, created_at";

const OVERRIDE_COLUMNS: &str =
    "id, therapist_id, date, kind, start_time, end_time, created_at";

/// Reads and writes for weekly windows and date overrides.
pub struct AvailabilityRepo;

impl AvailabilityRepo {
    /// All weekly windows for a therapist, ordered by weekday and start.
    pub async fn windows_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
    ) -> Result<Vec<AvailabilityWindow>, sqlx::Error> {
        let query = format!(
            "SELECT {WINDOW_COLUMNS} FROM availability_windows \
             WHERE therapist_id = $1 \
             ORDER BY weekday ASC, start_time ASC"
        );
        sqlx::query_as::<_, AvailabilityWindow>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    /// The override for a specific date, if any.
    pub async fn override_for_date(
        pool: &PgPool,
        therapist_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityOverride>, sqlx::Error> {
        let query = format!(
            "SELECT {OVERRIDE_COLUMNS} FROM availability_overrides \
             WHERE therapist_id = $1 AND date = $2 \
             LIMIT 1"
        );
        sqlx::query_as::<_, AvailabilityOverride>(&query)
            .bind(therapist_id)
            .bind(date)
            .fetch_optional(pool)
            .await
    }

    /// Create a weekly window.
    pub async fn create_window(
        pool: &PgPool,
        input: &CreateAvailabilityWindow,
    ) -> Result<AvailabilityWindow, sqlx::Error> {
        let query = format!(
            "INSERT INTO availability_windows (therapist_id, weekday, start_time, end_time) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {WINDOW_COLUMNS}"
        );
        sqlx::query_as::<_, AvailabilityWindow>(&query)
            .bind(input.therapist_id)
            .bind(input.weekday)
            .bind(input.start_time)
            .bind(input.end_time)
            .fetch_one(pool)
            .await
    }

    /// Create (or replace) the override for a date.
    pub async fn create_override(
        pool: &PgPool,
        input: &CreateAvailabilityOverride,
    ) -> Result<AvailabilityOverride, sqlx::Error> {
        let query = format!(
            "INSERT INTO availability_overrides (therapist_id, date, kind, start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (therapist_id, date) \
             DO UPDATE SET kind = $3, start_time = $4, end_time = $5 \
             RETURNING {OVERRIDE_COLUMNS}"
        );
        sqlx::query_as::<_, AvailabilityOverride>(&query)
            .bind(input.therapist_id)
            .bind(input.date)
            .bind(&input.kind)
            .bind(input.start_time)
            .bind(input.end_time)
            .fetch_one(pool)
            .await
    }

    /// Delete a weekly window. Returns `true` if a row was removed.
    pub async fn delete_window(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM availability_windows WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
