//! Service-level tests for admin assignment and the connection status
//! lifecycle, including the appointment cascade.

mod common;

use assert_matches::assert_matches;
use common::{admin, build_test_app, child, full_weekday_availability, guardian, hours_after, therapist};
use haven_core::error::CoreError;
use haven_db::repositories::{AppointmentRepo, NotificationRepo};
use haven_services::scheduling::BookingParams;
use haven_services::ServiceError;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: admin assignment creates an active guardian connection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_assignment_creates_active_connection(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;

    let connection = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();

    assert_eq!(connection.status, "active");
    assert_eq!(connection.client_type, "guardian");
    assert_eq!(connection.connection_type, "admin_assigned");
    assert_eq!(connection.assigned_by, admin_id);

    assert!(app
        .connections
        .has_active_connection(guardian_id, therapist_id)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Test: only administrators may assign directly
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_admin_cannot_assign(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;

    let err = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, therapist_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Core(CoreError::Forbidden(_)));
}

// ---------------------------------------------------------------------------
// Test: admins cannot assign children directly
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_admin_cannot_assign_a_child(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;
    let child_id = child(&pool, "c1", guardian_id).await;

    let err = app
        .connections
        .create_admin_assignment(therapist_id, child_id, admin_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Test: assigning an already-connected pair fails validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_assignment_fails(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;

    app.connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();

    let err = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Test: termination cancels only future appointments of the pair
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_terminate_cascades_to_future_appointments(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;
    let other_guardian = guardian(&pool, "g2").await;
    full_weekday_availability(&pool, therapist_id).await;

    let connection = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();
    app.connections
        .create_admin_assignment(therapist_id, other_guardian, admin_id)
        .await
        .unwrap();

    // Tuesday 10:00 for the pair, Tuesday 13:00 for the other pair.
    let future = app
        .scheduling
        .book(
            BookingParams {
                therapist_id,
                client_id: guardian_id,
                scheduled_at: hours_after(25),
                duration_minutes: 60,
                notes: None,
                confirmed: true,
            },
            guardian_id,
        )
        .await
        .unwrap();
    let other_pair = app
        .scheduling
        .book(
            BookingParams {
                therapist_id,
                client_id: other_guardian,
                scheduled_at: hours_after(28),
                duration_minutes: 60,
                notes: None,
                confirmed: true,
            },
            other_guardian,
        )
        .await
        .unwrap();

    app.connections
        .terminate(connection.id, therapist_id, Some("care ended"))
        .await
        .unwrap();

    let future_after = AppointmentRepo::find_by_id(&pool, future.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(future_after.status, "cancelled");
    assert_eq!(
        future_after.cancellation_reason.as_deref(),
        Some("connection terminated")
    );

    let other_after = AppointmentRepo::find_by_id(&pool, other_pair.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(other_after.status, "confirmed");

    // Both parties were notified after commit.
    let guardian_inbox = NotificationRepo::list_for_user(&pool, guardian_id, false, 50, 0)
        .await
        .unwrap();
    assert!(guardian_inbox
        .iter()
        .any(|n| n.kind == "connection.terminated"));
}

// ---------------------------------------------------------------------------
// Test: terminating twice is a state conflict
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_double_terminate_is_a_conflict(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;

    let connection = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();

    app.connections
        .terminate(connection.id, admin_id, None)
        .await
        .unwrap();
    let err = app
        .connections
        .terminate(connection.id, admin_id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Core(CoreError::Conflict(_)));
}

// ---------------------------------------------------------------------------
// Test: only an admin or the owning therapist may terminate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unrelated_user_cannot_terminate(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let other_therapist = therapist(&pool, "t2").await;
    let guardian_id = guardian(&pool, "g1").await;

    let connection = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();

    let err = app
        .connections
        .terminate(connection.id, other_therapist, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Core(CoreError::Forbidden(_)));

    let err = app
        .connections
        .terminate(connection.id, guardian_id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Core(CoreError::Forbidden(_)));
}

// ---------------------------------------------------------------------------
// Test: deactivation cascades but is reversible
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deactivate_cancels_future_and_reactivate_restores(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;
    full_weekday_availability(&pool, therapist_id).await;

    let connection = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();
    let future = app
        .scheduling
        .book(
            BookingParams {
                therapist_id,
                client_id: guardian_id,
                scheduled_at: hours_after(25),
                duration_minutes: 60,
                notes: None,
                confirmed: false,
            },
            guardian_id,
        )
        .await
        .unwrap();

    let deactivated = app
        .connections
        .deactivate(connection.id, therapist_id)
        .await
        .unwrap();
    assert_eq!(deactivated.status, "inactive");
    assert_eq!(deactivated.terminated_at, None);

    let future_after = AppointmentRepo::find_by_id(&pool, future.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(future_after.status, "cancelled");
    assert_eq!(
        future_after.cancellation_reason.as_deref(),
        Some("connection deactivated")
    );

    let reactivated = app
        .connections
        .reactivate(connection.id, therapist_id)
        .await
        .unwrap();
    assert_eq!(reactivated.status, "active");
    assert!(app
        .connections
        .has_active_connection(therapist_id, guardian_id)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Test: a committed child termination notifies all three parties
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_child_termination_notifies_guardian_too(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;
    let child_id = child(&pool, "c1", guardian_id).await;

    app.connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();
    let request = app
        .requests
        .create_child_assignment_request(guardian_id, child_id, therapist_id, None)
        .await
        .unwrap();
    let (_, child_conn) = app.requests.approve(request.id, therapist_id).await.unwrap();

    // The transition itself commits; notification fan-out happens after
    // and must not affect the returned result.
    let terminated = app
        .connections
        .terminate(child_conn.id, therapist_id, Some("care ended"))
        .await
        .unwrap();
    assert_eq!(terminated.status, "terminated");

    for user_id in [therapist_id, child_id, guardian_id] {
        let inbox = NotificationRepo::list_for_user(&pool, user_id, false, 50, 0)
            .await
            .unwrap();
        assert!(
            inbox.iter().any(|n| n.kind == "connection.terminated"),
            "user {user_id} should have been told the connection ended"
        );
    }
}
