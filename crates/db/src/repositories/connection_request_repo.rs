//! Repository for the `connection_requests` table.
//!
//! At most one pending request may exist per
//! (requester, therapist, target client) tuple; the partial unique index
//! `uq_connection_requests_pending` backstops the service-level check.

use haven_core::connection::RequestStatus;
use haven_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::connection_request::{ConnectionRequest, CreateConnectionRequest};

/// Column list for `connection_requests` queries.
const COLUMNS: &str = "\
    id, requester_id, requester_type, target_therapist_id, target_client_id, \
    request_type, status, message, reviewed_by, reviewed_at, created_at, updated_at";

/// CRUD and review writes for connection requests.
pub struct ConnectionRequestRepo;

impl ConnectionRequestRepo {
    /// Insert a new request with status `pending`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateConnectionRequest,
    ) -> Result<ConnectionRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO connection_requests \
                (requester_id, requester_type, target_therapist_id, target_client_id, \
                 request_type, status, message) \
             VALUES ($1, 'guardian', $2, $3, $4, 'pending', $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConnectionRequest>(&query)
            .bind(input.requester_id)
            .bind(input.target_therapist_id)
            .bind(input.target_client_id)
            .bind(input.request_type.as_str())
            .bind(&input.message)
            .fetch_one(pool)
            .await
    }

    /// Find a request by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ConnectionRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM connection_requests WHERE id = $1");
        sqlx::query_as::<_, ConnectionRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the pending request for a (requester, therapist, target
    /// client) tuple, if any. `target_client_id = NULL` matches only
    /// guardian-to-therapist requests.
    pub async fn find_pending_for(
        pool: &PgPool,
        requester_id: DbId,
        target_therapist_id: DbId,
        target_client_id: Option<DbId>,
    ) -> Result<Option<ConnectionRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connection_requests \
             WHERE requester_id = $1 \
               AND target_therapist_id = $2 \
               AND target_client_id IS NOT DISTINCT FROM $3 \
               AND status = 'pending' \
             LIMIT 1"
        );
        sqlx::query_as::<_, ConnectionRequest>(&query)
            .bind(requester_id)
            .bind(target_therapist_id)
            .bind(target_client_id)
            .fetch_optional(pool)
            .await
    }

    /// List requests addressed to a therapist, pending first.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        pending_only: bool,
    ) -> Result<Vec<ConnectionRequest>, sqlx::Error> {
        let filter = if pending_only {
            "AND status = 'pending'"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM connection_requests \
             WHERE target_therapist_id = $1 {filter} \
             ORDER BY (status = 'pending') DESC, created_at DESC"
        );
        sqlx::query_as::<_, ConnectionRequest>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    /// List requests created by a requester.
    pub async fn list_for_requester(
        pool: &PgPool,
        requester_id: DbId,
    ) -> Result<Vec<ConnectionRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connection_requests \
             WHERE requester_id = $1 \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ConnectionRequest>(&query)
            .bind(requester_id)
            .fetch_all(pool)
            .await
    }

    /// Transaction-scoped review write (approve or decline).
    ///
    /// The `status = 'pending'` guard makes the write a no-row update if
    /// a concurrent reviewer got there first; callers treat the
    /// `RowNotFound` as a state conflict.
    pub async fn review_in(
        conn: &mut PgConnection,
        id: DbId,
        outcome: RequestStatus,
        reviewer_id: DbId,
        at: Timestamp,
    ) -> Result<ConnectionRequest, sqlx::Error> {
        let query = format!(
            "UPDATE connection_requests \
             SET status = $2, reviewed_by = $3, reviewed_at = $4, updated_at = $4 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConnectionRequest>(&query)
            .bind(id)
            .bind(outcome.as_str())
            .bind(reviewer_id)
            .bind(at)
            .fetch_one(conn)
            .await
    }

    /// Cancel a pending request. Returns the updated row, or `None` if
    /// the request was no longer pending.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<ConnectionRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE connection_requests \
             SET status = 'cancelled', updated_at = $2 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConnectionRequest>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }
}
