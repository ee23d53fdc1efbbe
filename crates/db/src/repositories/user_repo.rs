//! Repository for the `users` table.

use haven_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "\
    id, display_name, email, role, guardian_id, is_active, created_at, updated_at";

/// Read operations for users.
///
/// Account creation and authentication belong to the identity
/// collaborator; this core only reads role and family structure.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All children whose `guardian_id` points at this guardian.
    pub async fn find_children_of(
        pool: &PgPool,
        guardian_id: DbId,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE guardian_id = $1 AND role = 'child' \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(guardian_id)
            .fetch_all(pool)
            .await
    }

    /// Whether `child_id` is a child of `guardian_id`, verified against
    /// the child's `guardian_id` field (not against connections).
    pub async fn is_child_of(
        pool: &PgPool,
        child_id: DbId,
        guardian_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users \
             WHERE id = $1 AND guardian_id = $2 AND role = 'child'",
        )
        .bind(child_id)
        .bind(guardian_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }
}
