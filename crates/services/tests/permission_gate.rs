//! Service-level tests for the feature-access gate: the family
//! exemption, the terminated-history allow-list, and mood-data bounding.

mod common;

use assert_matches::assert_matches;
use common::{admin, build_test_app, child, guardian, hours_after, therapist};
use haven_core::access::{Feature, Relationship};
use haven_core::error::CoreError;
use haven_db::models::mood::CreateMoodEntry;
use haven_db::repositories::MoodRepo;
use haven_services::ServiceError;
use sqlx::PgPool;

async fn record_mood(pool: &PgPool, child_id: i64, mood: &str, at: chrono::DateTime<chrono::Utc>) {
    MoodRepo::create(
        pool,
        &CreateMoodEntry {
            child_id,
            mood: mood.to_string(),
            intensity: 3,
            note: None,
            recorded_at: at,
        },
    )
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Test: guardian and child interact without any connection record
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_family_exemption(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let guardian_id = guardian(&pool, "g1").await;
    let child_id = child(&pool, "c1", guardian_id).await;

    assert_eq!(
        app.permissions
            .resolve_relationship(guardian_id, child_id)
            .await
            .unwrap(),
        Relationship::Family
    );

    for feature in [
        Feature::Messaging,
        Feature::MoodDataView,
        Feature::AppointmentScheduling,
    ] {
        assert!(
            app.permissions
                .can_access_feature(guardian_id, child_id, feature)
                .await
                .unwrap(),
            "family should have {feature:?}"
        );
    }
    assert!(!app
        .permissions
        .can_access_feature(guardian_id, child_id, Feature::VideoSession)
        .await
        .unwrap());

    // The link works in both directions.
    assert!(app
        .permissions
        .can_access_feature(child_id, guardian_id, Feature::Messaging)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Test: strangers get nothing, admins get everything
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_none_and_admin_relationships(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let guardian_a = guardian(&pool, "g1").await;
    let guardian_b = guardian(&pool, "g2").await;

    assert_eq!(
        app.permissions
            .resolve_relationship(guardian_a, guardian_b)
            .await
            .unwrap(),
        Relationship::None
    );
    assert!(!app
        .permissions
        .can_access_feature(guardian_a, guardian_b, Feature::Messaging)
        .await
        .unwrap());

    assert_eq!(
        app.permissions
            .resolve_relationship(admin_id, guardian_a)
            .await
            .unwrap(),
        Relationship::Admin
    );
    assert!(app
        .permissions
        .can_access_feature(admin_id, guardian_a, Feature::VideoSession)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Test: termination downgrades access to history only
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_terminated_connection_keeps_history_access_only(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;

    let connection = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();

    assert!(app
        .permissions
        .can_access_feature(therapist_id, guardian_id, Feature::Messaging)
        .await
        .unwrap());

    app.connections
        .terminate(connection.id, therapist_id, None)
        .await
        .unwrap();

    assert_eq!(
        app.permissions
            .resolve_relationship(therapist_id, guardian_id)
            .await
            .unwrap(),
        Relationship::TerminatedConnection
    );
    for feature in [
        Feature::AppointmentHistory,
        Feature::MoodDataHistory,
        Feature::MessageHistory,
    ] {
        assert!(
            app.permissions
                .can_access_feature(therapist_id, guardian_id, feature)
                .await
                .unwrap(),
            "terminated connection should keep {feature:?}"
        );
    }
    for feature in [
        Feature::Messaging,
        Feature::MoodDataView,
        Feature::AppointmentScheduling,
        Feature::VideoSession,
    ] {
        assert!(
            !app.permissions
                .can_access_feature(therapist_id, guardian_id, feature)
                .await
                .unwrap(),
            "terminated connection should lose {feature:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Test: family access survives the child's therapist termination
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_family_link_outranks_terminated_connection(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let admin_id = admin(&pool).await;
    let therapist_id = therapist(&pool, "t1").await;
    let guardian_id = guardian(&pool, "g1").await;
    let child_id = child(&pool, "c1", guardian_id).await;

    // Wire the child to a therapist, then end that connection.
    let request_conn = app
        .connections
        .create_admin_assignment(therapist_id, guardian_id, admin_id)
        .await
        .unwrap();
    let request = app
        .requests
        .create_child_assignment_request(guardian_id, child_id, therapist_id, None)
        .await
        .unwrap();
    let (_, child_conn) = app.requests.approve(request.id, therapist_id).await.unwrap();
    app.connections
        .terminate(child_conn.id, therapist_id, None)
        .await
        .unwrap();
    app.connections
        .terminate(request_conn.id, therapist_id, None)
        .await
        .unwrap();

    // The guardian still has live access to their own child.
    assert_eq!(
        app.permissions
            .resolve_relationship(guardian_id, child_id)
            .await
            .unwrap(),
        Relationship::Family
    );
    assert!(app
        .permissions
        .can_access_feature(guardian_id, child_id, Feature::MoodDataView)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Test: mood reads under a terminated connection stop at terminated_at
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_terminated_mood_reads_are_clamped(pool: PgPool) {
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

    record_mood(&pool, child_id, "calm", hours_after(-24)).await;

    // Termination is stamped at the pinned clock's Monday 09:00.
    app.connections
        .terminate(child_conn.id, therapist_id, None)
        .await
        .unwrap();

    record_mood(&pool, child_id, "sad", hours_after(24)).await;

    let visible = app
        .permissions
        .accessible_mood_entries(therapist_id, child_id, None, None)
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].mood, "calm");

    // Even an explicit wider range stays clamped.
    let visible = app
        .permissions
        .accessible_mood_entries(therapist_id, child_id, None, Some(hours_after(48)))
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);

    // The guardian, as family, sees everything.
    let family_view = app
        .permissions
        .accessible_mood_entries(guardian_id, child_id, None, None)
        .await
        .unwrap();
    assert_eq!(family_view.len(), 2);

    // A stranger sees nothing at all.
    let stranger = guardian(&pool, "g2").await;
    let err = app
        .permissions
        .accessible_mood_entries(stranger, child_id, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Core(CoreError::Forbidden(_)));
}
