//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use haven_core::clock::FixedClock;
use haven_core::types::{DbId, Timestamp};
use haven_events::{EventBus, NotificationDispatcher};
use haven_services::{
    ConnectionRequestService, ConnectionService, PermissionService, SchedulingService,
};
use sqlx::PgPool;

/// The full service stack over one pool, on a pinned clock.
pub struct TestApp {
    pub pool: PgPool,
    pub clock: Arc<FixedClock>,
    pub connections: ConnectionService,
    pub requests: ConnectionRequestService,
    pub permissions: PermissionService,
    pub scheduling: SchedulingService,
}

/// Build the service stack the way production wiring does, except the
/// clock is pinned to [`monday_nine`].
pub fn build_test_app(pool: PgPool) -> TestApp {
    let clock = Arc::new(FixedClock::new(monday_nine()));
    let clock_dyn: Arc<dyn haven_core::clock::Clock> = clock.clone();
    let bus = Arc::new(EventBus::default());
    let dispatcher = Arc::new(NotificationDispatcher::new(pool.clone(), bus));

    TestApp {
        connections: ConnectionService::new(pool.clone(), dispatcher.clone(), clock_dyn.clone()),
        requests: ConnectionRequestService::new(
            pool.clone(),
            dispatcher.clone(),
            clock_dyn.clone(),
        ),
        permissions: PermissionService::new(pool.clone(), clock_dyn.clone()),
        scheduling: SchedulingService::new(pool.clone(), dispatcher, clock_dyn),
        pool,
        clock,
    }
}

/// Insert a user row and return its id.
pub async fn create_user(
    pool: &PgPool,
    name: &str,
    role: &str,
    guardian_id: Option<DbId>,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO users (display_name, email, role, guardian_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(name)
    .bind(format!("{name}@example.test"))
    .bind(role)
    .bind(guardian_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn admin(pool: &PgPool) -> DbId {
    create_user(pool, "admin", "admin", None).await
}

pub async fn therapist(pool: &PgPool, name: &str) -> DbId {
    create_user(pool, name, "therapist", None).await
}

pub async fn guardian(pool: &PgPool, name: &str) -> DbId {
    create_user(pool, name, "guardian", None).await
}

pub async fn child(pool: &PgPool, name: &str, guardian_id: DbId) -> DbId {
    create_user(pool, name, "child", Some(guardian_id)).await
}

/// A fixed reference instant: Monday 2026-03-02 09:00 UTC.
pub fn monday_nine() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// `hours` after [`monday_nine`].
pub fn hours_after(hours: i64) -> Timestamp {
    monday_nine() + chrono::Duration::hours(hours)
}

/// Give a therapist a 09:00-17:00 window on every weekday.
pub async fn full_weekday_availability(pool: &PgPool, therapist_id: DbId) {
    for weekday in 1..=5i16 {
        haven_db::repositories::AvailabilityRepo::create_window(
            pool,
            &haven_db::models::availability::CreateAvailabilityWindow {
                therapist_id,
                weekday,
                start_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap();
    }
}
