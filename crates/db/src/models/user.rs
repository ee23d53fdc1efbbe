//! User entity model.

use haven_core::error::{CoreError, CoreResult};
use haven_core::roles::Role;
use haven_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
///
/// Authentication lives outside this core; the row carries only what the
/// connection and scheduling subsystems need: the role and, for
/// children, the owning guardian.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub display_name: String,
    pub email: String,
    pub role: String,
    /// Set only for users with the `child` role.
    pub guardian_id: Option<DbId>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Resolve the stored role string to the closed [`Role`] enum.
    pub fn role(&self) -> CoreResult<Role> {
        Role::parse(&self.role)
            .ok_or_else(|| CoreError::Internal(format!("unknown role '{}'", self.role)))
    }
}
