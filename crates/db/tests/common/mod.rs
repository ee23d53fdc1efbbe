//! Shared fixtures for the repository integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use haven_core::connection::{ClientType, ConnectionType};
use haven_core::types::{DbId, Timestamp};
use haven_db::models::connection::{Connection, CreateConnection};
use haven_db::repositories::ConnectionRepo;
use sqlx::PgPool;

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

/// Create an active connection between a therapist and a guardian.
pub async fn guardian_connection(
    pool: &PgPool,
    therapist_id: DbId,
    guardian_id: DbId,
    assigned_by: DbId,
) -> Connection {
    ConnectionRepo::create(
        pool,
        &CreateConnection {
            therapist_id,
            client_id: guardian_id,
            client_type: ClientType::Guardian,
            connection_type: ConnectionType::AdminAssigned,
            assigned_by,
        },
    )
    .await
    .unwrap()
}

/// Create an active connection between a therapist and a child.
pub async fn child_connection(
    pool: &PgPool,
    therapist_id: DbId,
    child_id: DbId,
    assigned_by: DbId,
) -> Connection {
    ConnectionRepo::create(
        pool,
        &CreateConnection {
            therapist_id,
            client_id: child_id,
            client_type: ClientType::Child,
            connection_type: ConnectionType::GuardianChildAssignment,
            assigned_by,
        },
    )
    .await
    .unwrap()
}

/// A fixed reference instant: Monday 2026-03-02 09:00 UTC.
pub fn monday_nine() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// `hours` after [`monday_nine`].
pub fn hours_after(hours: i64) -> Timestamp {
    monday_nine() + chrono::Duration::hours(hours)
}
