//! Repository for the `appointments` table.
//!
//! Appointments are mutated by the scheduler and, during connection
//! cascades, by the permission layer — always through these methods so
//! the no-overlap invariant stays in one place. The
//! `ex_appointments_no_overlap` exclusion constraint (half-open
//! tstzrange per therapist over blocking statuses) backstops the
//! check-then-insert booking path.

use haven_core::appointment::AppointmentStatus;
use haven_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::appointment::{Appointment, CreateAppointment};

/// Column list for `appointments` queries.
const COLUMNS: &str = "\
    id, therapist_id, child_id, guardian_id, scheduled_at, duration_minutes, \
    status, notes, cancellation_reason, cancelled_at, cancelled_by, \
    created_at, updated_at";

/// CRUD and lifecycle writes for appointments.
pub struct AppointmentRepo;

impl AppointmentRepo {
    /// Transaction-scoped insert. Booking always runs inside a
    /// transaction holding the therapist's advisory lock.
    pub async fn create_in(
        conn: &mut PgConnection,
        input: &CreateAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "INSERT INTO appointments \
                (therapist_id, child_id, guardian_id, scheduled_at, duration_minutes, \
                 status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(input.therapist_id)
            .bind(input.child_id)
            .bind(input.guardian_id)
            .bind(input.scheduled_at)
            .bind(input.duration_minutes)
            .bind(input.status.as_str())
            .bind(&input.notes)
            .fetch_one(conn)
            .await
    }

    /// Find an appointment by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a therapist's appointments, newest first.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE therapist_id = $1 \
             ORDER BY scheduled_at DESC"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    /// Blocking (requested/confirmed) appointments for a therapist that
    /// intersect `[from, to)`. Used to build the busy set for slot
    /// generation and conflict probes.
    pub async fn list_blocking_between(
        pool: &PgPool,
        therapist_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::list_blocking_between_in(&mut conn, therapist_id, from, to).await
    }

    /// Transaction-scoped variant of [`Self::list_blocking_between`],
    /// used by booking so the conflict re-check sees rows committed
    /// while waiting on the advisory lock.
    pub async fn list_blocking_between_in(
        conn: &mut PgConnection,
        therapist_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE therapist_id = $1 \
               AND status IN ('requested', 'confirmed') \
               AND scheduled_at < $3 \
               AND scheduled_at + make_interval(mins => duration_minutes) > $2 \
             ORDER BY scheduled_at ASC"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(therapist_id)
            .bind(from)
            .bind(to)
            .fetch_all(conn)
            .await
    }

    /// Transaction-scoped cascade write: cancel every blocking
    /// appointment for the exact (therapist, client) pair scheduled
    /// strictly after `now`. Past appointments and other pairs are left
    /// untouched. Returns the cancelled rows.
    pub async fn cancel_future_for_pair_in(
        conn: &mut PgConnection,
        therapist_id: DbId,
        client_id: DbId,
        reason: &str,
        cancelled_by: DbId,
        now: Timestamp,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments \
             SET status = 'cancelled', cancellation_reason = $3, cancelled_at = $5, \
                 cancelled_by = $4, updated_at = $5 \
             WHERE therapist_id = $1 \
               AND (child_id = $2 OR guardian_id = $2) \
               AND status IN ('requested', 'confirmed') \
               AND scheduled_at > $5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(therapist_id)
            .bind(client_id)
            .bind(reason)
            .bind(cancelled_by)
            .bind(now)
            .fetch_all(conn)
            .await
    }

    /// Cancel one appointment. The blocking-status guard turns a repeat
    /// cancel into a no-row update; callers map that to a state conflict.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        reason: Option<&str>,
        cancelled_by: DbId,
        at: Timestamp,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments \
             SET status = 'cancelled', cancellation_reason = $2, cancelled_at = $4, \
                 cancelled_by = $3, updated_at = $4 \
             WHERE id = $1 AND status IN ('requested', 'confirmed') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(reason)
            .bind(cancelled_by)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Guarded single-step status transition (`from` → `to`). Returns
    /// `None` when the row is not currently in `from`.
    pub async fn transition_status(
        pool: &PgPool,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
        at: Timestamp,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments \
             SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Transaction-scoped reschedule write. The blocking-status guard
    /// keeps cancelled/completed rows immutable.
    pub async fn reschedule_in(
        conn: &mut PgConnection,
        id: DbId,
        new_start: Timestamp,
        at: Timestamp,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments \
             SET scheduled_at = $2, updated_at = $3 \
             WHERE id = $1 AND status IN ('requested', 'confirmed') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(new_start)
            .bind(at)
            .fetch_optional(conn)
            .await
    }
}
