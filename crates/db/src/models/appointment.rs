//! Appointment entity model and DTOs.

use chrono::Duration;
use haven_core::appointment::AppointmentStatus;
use haven_core::error::{CoreError, CoreResult};
use haven_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `appointments` table.
///
/// Exactly one of `child_id` / `guardian_id` is set; it names the client
/// side of the therapist pair. Cancelled rows keep their reason, actor,
/// and timestamp for the historical record.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: DbId,
    pub therapist_id: DbId,
    pub child_id: Option<DbId>,
    pub guardian_id: Option<DbId>,
    pub scheduled_at: Timestamp,
    pub duration_minutes: i32,
    pub status: String,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<Timestamp>,
    pub cancelled_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Appointment {
    pub fn status(&self) -> CoreResult<AppointmentStatus> {
        AppointmentStatus::parse(&self.status).ok_or_else(|| {
            CoreError::Internal(format!("unknown appointment status '{}'", self.status))
        })
    }

    /// The client side of the pair (child if set, guardian otherwise).
    pub fn client_id(&self) -> CoreResult<DbId> {
        self.child_id.or(self.guardian_id).ok_or_else(|| {
            CoreError::Internal(format!("appointment {} has no client party", self.id))
        })
    }

    /// End of the occupied interval.
    pub fn ends_at(&self) -> Timestamp {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Insert parameters for a new appointment.
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub therapist_id: DbId,
    pub child_id: Option<DbId>,
    pub guardian_id: Option<DbId>,
    pub scheduled_at: Timestamp,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}
