//! Slot computation and race-safe appointment booking.
//!
//! Availability is never materialized: every read recomputes slots from
//! the therapist's weekly windows, the date's override, and the current
//! blocking appointments. Booking serializes per therapist with a
//! transaction-scoped advisory lock and re-checks the slot inside the
//! transaction; the database exclusion constraint backstops both.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use haven_core::appointment::AppointmentStatus;
use haven_core::clock::Clock;
use haven_core::connection::ClientType;
use haven_core::roles::Role;
use haven_core::slots::{self, BusyInterval, Slot, WeeklyWindow};
use haven_core::types::{DbId, Timestamp};
use haven_db::models::appointment::{Appointment, CreateAppointment};
use haven_db::repositories::{AppointmentRepo, AvailabilityRepo, ConnectionRepo};
use haven_db::DbPool;
use haven_events::bus::event_types;
use haven_events::dispatcher::{NotificationDispatcher, Notify};

use crate::actors::{load_role, load_user};
use crate::error::{is_exclusion_violation, ServiceError, ServiceResult};

/// Parameters for booking a new appointment.
#[derive(Debug, Clone)]
pub struct BookingParams {
    pub therapist_id: DbId,
    pub client_id: DbId,
    pub scheduled_at: Timestamp,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    /// Book directly as confirmed instead of requested.
    pub confirmed: bool,
}

/// Computes availability and books appointments.
#[derive(Clone)]
pub struct SchedulingService {
    pool: DbPool,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl SchedulingService {
    pub fn new(
        pool: DbPool,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            dispatcher,
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Availability
    // -----------------------------------------------------------------------

    /// Bookable slots for a therapist on a date.
    pub async fn available_slots(
        &self,
        therapist_id: DbId,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> ServiceResult<Vec<Slot>> {
        let windows = self.windows_for(therapist_id, date).await?;
        let busy = self.busy_for(therapist_id, date, None).await?;
        Ok(slots::generate_slots(
            &windows,
            date,
            duration_minutes,
            &busy,
            self.clock.now(),
        ))
    }

    /// Whether a specific candidate interval is bookable right now.
    ///
    /// `exclude_appointment_id` removes one appointment from the conflict
    /// probe so a reschedule does not collide with itself.
    pub async fn is_slot_available(
        &self,
        therapist_id: DbId,
        start: Timestamp,
        duration_minutes: i32,
        exclude_appointment_id: Option<DbId>,
    ) -> ServiceResult<bool> {
        let date = start.date_naive();
        let windows = self.windows_for(therapist_id, date).await?;
        let busy = self
            .busy_for(therapist_id, date, exclude_appointment_id)
            .await?;
        Ok(slots::candidate_fits(
            &windows,
            date,
            start,
            duration_minutes,
            &busy,
            self.clock.now(),
        ))
    }

    // -----------------------------------------------------------------------
    // Booking
    // -----------------------------------------------------------------------

    /// Book an appointment.
    ///
    /// The insert runs under `pg_advisory_xact_lock(therapist_id)` with an
    /// in-transaction availability re-check, so of two concurrent
    /// overlapping attempts exactly one commits; the loser fails the
    /// re-check (or, at worst, the exclusion constraint) as a validation
    /// error.
    pub async fn book(&self, params: BookingParams, actor_id: DbId) -> ServiceResult<Appointment> {
        let now = self.clock.now();
        if params.duration_minutes <= 0 {
            return Err(ServiceError::validation(
                "appointment duration must be positive",
            ));
        }
        if params.scheduled_at <= now {
            return Err(ServiceError::validation(
                "appointments must be scheduled in the future",
            ));
        }

        let client_type = self.client_type_of(params.client_id).await?;
        self.authorize_party(actor_id, &params, client_type).await?;

        let actor_role = load_role(&self.pool, actor_id).await?;
        if actor_role != Role::Admin
            && ConnectionRepo::find_active_for_pair(
                &self.pool,
                params.therapist_id,
                params.client_id,
            )
            .await?
            .is_none()
        {
            return Err(ServiceError::validation(
                "no active connection between this therapist and client",
            ));
        }

        let date = params.scheduled_at.date_naive();
        let windows = self.windows_for(params.therapist_id, date).await?;

        let status = if params.confirmed {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Requested
        };
        let (child_id, guardian_id) = match client_type {
            ClientType::Child => (Some(params.client_id), None),
            ClientType::Guardian => (None, Some(params.client_id)),
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(params.therapist_id)
            .execute(&mut *tx)
            .await?;

        let busy = Self::busy_in(
            &mut tx,
            params.therapist_id,
            date,
            params.duration_minutes,
            None,
        )
        .await?;
        if !slots::candidate_fits(
            &windows,
            date,
            params.scheduled_at,
            params.duration_minutes,
            &busy,
            now,
        ) {
            return Err(ServiceError::validation(
                "the requested slot is not available",
            ));
        }

        let appointment = AppointmentRepo::create_in(
            &mut tx,
            &CreateAppointment {
                therapist_id: params.therapist_id,
                child_id,
                guardian_id,
                scheduled_at: params.scheduled_at,
                duration_minutes: params.duration_minutes,
                status,
                notes: params.notes.clone(),
            },
        )
        .await
        .map_err(Self::map_overlap)?;

        tx.commit().await.map_err(Self::map_overlap)?;

        tracing::info!(
            appointment_id = appointment.id,
            therapist_id = params.therapist_id,
            client_id = params.client_id,
            scheduled_at = %params.scheduled_at,
            "Appointment booked"
        );

        self.dispatcher
            .notify(
                Notify::new(
                    params.therapist_id,
                    event_types::APPOINTMENT_BOOKED,
                    "New appointment",
                    "An appointment has been booked with you.",
                )
                .with_data(serde_json::json!({ "appointment_id": appointment.id })),
            )
            .await;

        Ok(appointment)
    }

    /// Move a live appointment to a new start time.
    pub async fn reschedule(
        &self,
        appointment_id: DbId,
        new_start: Timestamp,
        actor_id: DbId,
    ) -> ServiceResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        if !appointment.status()?.is_blocking() {
            return Err(ServiceError::conflict(format!(
                "appointment {appointment_id} can no longer be rescheduled"
            )));
        }
        self.authorize_appointment_actor(actor_id, &appointment)
            .await?;

        let now = self.clock.now();
        if new_start <= now {
            return Err(ServiceError::validation(
                "appointments must be scheduled in the future",
            ));
        }

        let date = new_start.date_naive();
        let windows = self.windows_for(appointment.therapist_id, date).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(appointment.therapist_id)
            .execute(&mut *tx)
            .await?;

        let busy = Self::busy_in(
            &mut tx,
            appointment.therapist_id,
            date,
            appointment.duration_minutes,
            Some(appointment_id),
        )
        .await?;
        if !slots::candidate_fits(
            &windows,
            date,
            new_start,
            appointment.duration_minutes,
            &busy,
            now,
        ) {
            return Err(ServiceError::validation(
                "the requested slot is not available",
            ));
        }

        let updated = AppointmentRepo::reschedule_in(&mut tx, appointment_id, new_start, now)
            .await
            .map_err(Self::map_overlap)?
            .ok_or_else(|| {
                ServiceError::conflict(format!(
                    "appointment {appointment_id} can no longer be rescheduled"
                ))
            })?;

        tx.commit().await.map_err(Self::map_overlap)?;

        tracing::info!(
            appointment_id,
            new_start = %new_start,
            actor_id,
            "Appointment rescheduled"
        );

        self.notify_counterpart(
            &updated,
            actor_id,
            event_types::APPOINTMENT_RESCHEDULED,
            "Appointment rescheduled",
            "One of your appointments has been moved to a new time.",
        )
        .await;

        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Cancel a live appointment.
    pub async fn cancel(
        &self,
        appointment_id: DbId,
        actor_id: DbId,
        reason: Option<&str>,
    ) -> ServiceResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        self.authorize_appointment_actor(actor_id, &appointment)
            .await?;

        let cancelled =
            AppointmentRepo::cancel(&self.pool, appointment_id, reason, actor_id, self.clock.now())
                .await?
                .ok_or_else(|| {
                    ServiceError::conflict(format!(
                        "appointment {appointment_id} can no longer be cancelled"
                    ))
                })?;

        tracing::info!(appointment_id, actor_id, "Appointment cancelled");

        self.notify_counterpart(
            &cancelled,
            actor_id,
            event_types::APPOINTMENT_CANCELLED,
            "Appointment cancelled",
            "One of your appointments has been cancelled.",
        )
        .await;

        Ok(cancelled)
    }

    /// Therapist accepts a requested appointment.
    pub async fn confirm(
        &self,
        appointment_id: DbId,
        actor_id: DbId,
    ) -> ServiceResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        self.authorize_therapist_action(actor_id, &appointment)
            .await?;

        let confirmed = AppointmentRepo::transition_status(
            &self.pool,
            appointment_id,
            AppointmentStatus::Requested,
            AppointmentStatus::Confirmed,
            self.clock.now(),
        )
        .await?
        .ok_or_else(|| {
            ServiceError::conflict(format!(
                "appointment {appointment_id} is not awaiting confirmation"
            ))
        })?;

        self.notify_counterpart(
            &confirmed,
            actor_id,
            event_types::APPOINTMENT_CONFIRMED,
            "Appointment confirmed",
            "Your appointment has been confirmed.",
        )
        .await;

        Ok(confirmed)
    }

    /// Therapist marks a confirmed appointment as held.
    pub async fn complete(
        &self,
        appointment_id: DbId,
        actor_id: DbId,
    ) -> ServiceResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        self.authorize_therapist_action(actor_id, &appointment)
            .await?;

        AppointmentRepo::transition_status(
            &self.pool,
            appointment_id,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            self.clock.now(),
        )
        .await?
        .ok_or_else(|| {
            ServiceError::conflict(format!("appointment {appointment_id} is not confirmed"))
        })
        .map_err(Into::into)
    }

    /// A therapist's appointments, newest first.
    pub async fn appointments_for_therapist(
        &self,
        therapist_id: DbId,
    ) -> ServiceResult<Vec<Appointment>> {
        Ok(AppointmentRepo::list_for_therapist(&self.pool, therapist_id).await?)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Resolved bookable windows for a therapist on a date.
    async fn windows_for(
        &self,
        therapist_id: DbId,
        date: NaiveDate,
    ) -> ServiceResult<Vec<(chrono::NaiveTime, chrono::NaiveTime)>> {
        let weekly = AvailabilityRepo::windows_for_therapist(&self.pool, therapist_id)
            .await?
            .iter()
            .map(|w| w.to_weekly_window())
            .collect::<Result<Vec<WeeklyWindow>, _>>()?;
        let day_override = AvailabilityRepo::override_for_date(&self.pool, therapist_id, date)
            .await?
            .map(|o| o.to_day_override())
            .transpose()?;
        Ok(slots::windows_for_date(
            &weekly,
            day_override.as_ref(),
            date,
        ))
    }

    /// Busy intervals for the whole date, via the pool.
    async fn busy_for(
        &self,
        therapist_id: DbId,
        date: NaiveDate,
        exclude: Option<DbId>,
    ) -> ServiceResult<Vec<BusyInterval>> {
        let (from, to) = Self::day_bounds(date);
        let appointments =
            AppointmentRepo::list_blocking_between(&self.pool, therapist_id, from, to).await?;
        Ok(Self::to_busy(appointments, exclude))
    }

    /// Busy intervals inside the booking transaction. The probe range is
    /// widened by one duration on each side of the date so a candidate
    /// near midnight still sees its neighbours.
    async fn busy_in(
        conn: &mut sqlx::PgConnection,
        therapist_id: DbId,
        date: NaiveDate,
        duration_minutes: i32,
        exclude: Option<DbId>,
    ) -> Result<Vec<BusyInterval>, sqlx::Error> {
        let margin = Duration::minutes(i64::from(duration_minutes.max(0)));
        let (from, to) = Self::day_bounds(date);
        let appointments = AppointmentRepo::list_blocking_between_in(
            conn,
            therapist_id,
            from - margin,
            to + margin,
        )
        .await?;
        Ok(Self::to_busy(appointments, exclude))
    }

    fn to_busy(appointments: Vec<Appointment>, exclude: Option<DbId>) -> Vec<BusyInterval> {
        appointments
            .into_iter()
            .filter(|a| Some(a.id) != exclude)
            .map(|a| BusyInterval {
                start: a.scheduled_at,
                end: a.ends_at(),
            })
            .collect()
    }

    fn day_bounds(date: NaiveDate) -> (Timestamp, Timestamp) {
        let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        (start, start + Duration::days(1))
    }

    async fn client_type_of(&self, client_id: DbId) -> ServiceResult<ClientType> {
        match load_role(&self.pool, client_id).await? {
            Role::Child => Ok(ClientType::Child),
            Role::Guardian => Ok(ClientType::Guardian),
            _ => Err(ServiceError::validation(format!(
                "user {client_id} cannot be the client of an appointment"
            ))),
        }
    }

    /// Booking may be initiated by the client, the client's guardian, the
    /// therapist, or an administrator.
    async fn authorize_party(
        &self,
        actor_id: DbId,
        params: &BookingParams,
        client_type: ClientType,
    ) -> ServiceResult<()> {
        if actor_id == params.client_id || actor_id == params.therapist_id {
            return Ok(());
        }
        if load_role(&self.pool, actor_id).await? == Role::Admin {
            return Ok(());
        }
        if client_type == ClientType::Child {
            let child = load_user(&self.pool, params.client_id).await?;
            if child.guardian_id == Some(actor_id) {
                return Ok(());
            }
        }
        Err(ServiceError::forbidden(
            "not a party to this appointment",
        ))
    }

    /// Mutating an existing appointment is allowed for its parties, the
    /// client's guardian, and administrators.
    async fn authorize_appointment_actor(
        &self,
        actor_id: DbId,
        appointment: &Appointment,
    ) -> ServiceResult<()> {
        let client_id = appointment.client_id()?;
        if actor_id == client_id || actor_id == appointment.therapist_id {
            return Ok(());
        }
        if load_role(&self.pool, actor_id).await? == Role::Admin {
            return Ok(());
        }
        if appointment.child_id.is_some() {
            let child = load_user(&self.pool, client_id).await?;
            if child.guardian_id == Some(actor_id) {
                return Ok(());
            }
        }
        Err(ServiceError::forbidden(
            "not a party to this appointment",
        ))
    }

    /// Confirm/complete are for the owning therapist (or an admin).
    async fn authorize_therapist_action(
        &self,
        actor_id: DbId,
        appointment: &Appointment,
    ) -> ServiceResult<()> {
        if actor_id == appointment.therapist_id {
            return Ok(());
        }
        if load_role(&self.pool, actor_id).await? == Role::Admin {
            return Ok(());
        }
        Err(ServiceError::forbidden(
            "only the appointment's therapist may do this",
        ))
    }

    async fn load_appointment(&self, id: DbId) -> ServiceResult<Appointment> {
        AppointmentRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("appointment", id))
    }

    /// Notify the other party of an appointment after a lifecycle change.
    /// Runs after the change is committed, so failures are logged rather
    /// than returned.
    async fn notify_counterpart(
        &self,
        appointment: &Appointment,
        actor_id: DbId,
        kind: &'static str,
        title: &str,
        body: &str,
    ) {
        let client_id = match appointment.client_id() {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    appointment_id = appointment.id,
                    "Failed to resolve the appointment client for a notification"
                );
                return;
            }
        };
        let counterpart = if actor_id == appointment.therapist_id {
            client_id
        } else {
            appointment.therapist_id
        };
        self.dispatcher
            .notify(
                Notify::new(counterpart, kind, title, body).with_data(serde_json::json!({
                    "appointment_id": appointment.id,
                    "scheduled_at": appointment.scheduled_at,
                })),
            )
            .await;
    }

    /// The exclusion constraint fires only when two bookings slipped past
    /// the advisory lock, which should not happen; treat it as the same
    /// slot-taken validation failure either way.
    fn map_overlap(err: sqlx::Error) -> ServiceError {
        if is_exclusion_violation(&err, "ex_appointments_no_overlap") {
            ServiceError::validation("the requested slot is not available")
        } else {
            err.into()
        }
    }
}
