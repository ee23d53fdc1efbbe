//! Shared actor lookup helpers.

use haven_core::roles::Role;
use haven_core::types::DbId;
use haven_db::models::user::User;
use haven_db::repositories::UserRepo;
use haven_db::DbPool;

use crate::error::{ServiceError, ServiceResult};

/// Load a user or fail with `NotFound`.
pub(crate) async fn load_user(pool: &DbPool, id: DbId) -> ServiceResult<User> {
    UserRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ServiceError::not_found("user", id))
}

/// Load a user's resolved role or fail with `NotFound`.
pub(crate) async fn load_role(pool: &DbPool, id: DbId) -> ServiceResult<Role> {
    let user = load_user(pool, id).await?;
    Ok(user.role()?)
}
