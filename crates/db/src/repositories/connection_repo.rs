//! Repository for the `connections` table.
//!
//! The one-active-connection-per-pair invariant is enforced twice: the
//! queries here check both role orderings, and the partial unique index
//! `uq_connections_active_pair` (over the LEAST/GREATEST of the two ids)
//! backstops races at the database level.

use haven_core::connection::{ClientType, ConnectionStatus};
use haven_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::connection::{Connection, CreateConnection};

/// Column list for `connections` queries.
const COLUMNS: &str = "\
    id, therapist_id, client_id, client_type, connection_type, status, \
    assigned_by, assigned_at, terminated_at, created_at, updated_at";

/// CRUD and lifecycle writes for connections.
pub struct ConnectionRepo;

impl ConnectionRepo {
    /// Insert a new connection with status `active`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateConnection,
    ) -> Result<Connection, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::create_in(&mut conn, input).await
    }

    /// Transaction-scoped insert.
    pub async fn create_in(
        conn: &mut PgConnection,
        input: &CreateConnection,
    ) -> Result<Connection, sqlx::Error> {
        let query = format!(
            "INSERT INTO connections \
                (therapist_id, client_id, client_type, connection_type, status, assigned_by) \
             VALUES ($1, $2, $3, $4, 'active', $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(input.therapist_id)
            .bind(input.client_id)
            .bind(input.client_type.as_str())
            .bind(input.connection_type.as_str())
            .bind(input.assigned_by)
            .fetch_one(conn)
            .await
    }

    /// Find a connection by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Connection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM connections WHERE id = $1");
        sqlx::query_as::<_, Connection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the active connection for a pair, checked in both role
    /// orderings (the relationship is undirected for this check).
    pub async fn find_active_for_pair(
        pool: &PgPool,
        a: DbId,
        b: DbId,
    ) -> Result<Option<Connection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connections \
             WHERE status = 'active' \
               AND ((therapist_id = $1 AND client_id = $2) \
                 OR (therapist_id = $2 AND client_id = $1)) \
             LIMIT 1"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(a)
            .bind(b)
            .fetch_optional(pool)
            .await
    }

    /// Find the most recent connection of any status for a pair, in
    /// either orientation. Active rows sort first, then latest assigned.
    pub async fn find_any_for_pair(
        pool: &PgPool,
        a: DbId,
        b: DbId,
    ) -> Result<Option<Connection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connections \
             WHERE (therapist_id = $1 AND client_id = $2) \
                OR (therapist_id = $2 AND client_id = $1) \
             ORDER BY (status = 'active') DESC, assigned_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(a)
            .bind(b)
            .fetch_optional(pool)
            .await
    }

    /// Find the most recent terminated connection for a pair, in either
    /// orientation. Used for historical-access decisions and for
    /// bounding mood-data reads to `terminated_at`.
    pub async fn find_terminated_for_pair(
        pool: &PgPool,
        a: DbId,
        b: DbId,
    ) -> Result<Option<Connection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connections \
             WHERE status = 'terminated' \
               AND ((therapist_id = $1 AND client_id = $2) \
                 OR (therapist_id = $2 AND client_id = $1)) \
             ORDER BY terminated_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(a)
            .bind(b)
            .fetch_optional(pool)
            .await
    }

    /// List a therapist's connections, optionally filtered by client type.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        client_type: Option<ClientType>,
    ) -> Result<Vec<Connection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connections \
             WHERE therapist_id = $1 \
               AND ($2::TEXT IS NULL OR client_type = $2) \
             ORDER BY assigned_at DESC"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(therapist_id)
            .bind(client_type.map(ClientType::as_str))
            .fetch_all(pool)
            .await
    }

    /// List a client's connections (their therapists).
    pub async fn list_for_client(
        pool: &PgPool,
        client_id: DbId,
    ) -> Result<Vec<Connection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connections \
             WHERE client_id = $1 \
             ORDER BY assigned_at DESC"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }

    /// Unfiltered list for the admin view.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Connection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM connections ORDER BY assigned_at DESC");
        sqlx::query_as::<_, Connection>(&query).fetch_all(pool).await
    }

    /// Transaction-scoped status write.
    ///
    /// Stamps `terminated_at` when transitioning to `terminated` and
    /// leaves it untouched otherwise, so a reversible deactivation never
    /// looks like a termination.
    pub async fn set_status_in(
        conn: &mut PgConnection,
        id: DbId,
        status: ConnectionStatus,
        at: Timestamp,
    ) -> Result<Connection, sqlx::Error> {
        let query = format!(
            "UPDATE connections \
             SET status = $2, \
                 terminated_at = CASE WHEN $2 = 'terminated' THEN $3 ELSE terminated_at END, \
                 updated_at = $3 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(at)
            .fetch_one(conn)
            .await
    }
}
