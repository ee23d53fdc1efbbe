//! Domain error taxonomy shared by every layer.
//!
//! All four kinds are raised synchronously, before any persistent
//! mutation, and are surfaced to callers untouched. Notification
//! side effects are isolated at the dispatcher boundary and never
//! feed back into these results.

use crate::types::DbId;

/// A domain-level error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Malformed input, role mismatch, duplicate active relationship,
    /// unavailable slot, or missing prerequisite relationship.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The entity is already in a terminal or incompatible state.
    #[error("State conflict: {0}")]
    Conflict(String),

    /// The actor lacks the right to perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An invariant was violated inside the core itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        CoreError::NotFound { entity, id }
    }
}

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;
