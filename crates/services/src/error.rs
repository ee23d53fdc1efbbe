//! Service-level error type.

use haven_core::error::CoreError;

/// Error surfaced by every service operation.
///
/// Domain failures arrive as [`CoreError`] and pass through untouched;
/// storage failures are wrapped so callers can distinguish "you may not"
/// from "the database broke".
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A domain-level error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience alias for service results.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Core(CoreError::Validation(msg.into()))
    }

    /// Shorthand for a state conflict.
    pub fn conflict(msg: impl Into<String>) -> Self {
        ServiceError::Core(CoreError::Conflict(msg.into()))
    }

    /// Shorthand for an authorization failure.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        ServiceError::Core(CoreError::Forbidden(msg.into()))
    }

    /// Shorthand for a missing entity.
    pub fn not_found(entity: &'static str, id: haven_core::types::DbId) -> Self {
        ServiceError::Core(CoreError::not_found(entity, id))
    }
}

/// Whether a sqlx error is a unique-constraint violation (SQLSTATE 23505)
/// on the named constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505") && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Whether a sqlx error is an exclusion-constraint violation
/// (SQLSTATE 23P01) on the named constraint.
pub(crate) fn is_exclusion_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23P01") && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}
