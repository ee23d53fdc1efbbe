//! Connection entity model and DTOs.

use haven_core::connection::{ClientType, ConnectionStatus, ConnectionType};
use haven_core::error::{CoreError, CoreResult};
use haven_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `connections` table.
///
/// Rows are never deleted. Termination stamps `terminated_at` and flips
/// the status; the record stays behind for audit and historical-access
/// queries.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Connection {
    pub id: DbId,
    pub therapist_id: DbId,
    pub client_id: DbId,
    pub client_type: String,
    pub connection_type: String,
    pub status: String,
    pub assigned_by: DbId,
    pub assigned_at: Timestamp,
    pub terminated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Connection {
    pub fn status(&self) -> CoreResult<ConnectionStatus> {
        ConnectionStatus::parse(&self.status).ok_or_else(|| {
            CoreError::Internal(format!("unknown connection status '{}'", self.status))
        })
    }

    pub fn client_type(&self) -> CoreResult<ClientType> {
        ClientType::parse(&self.client_type).ok_or_else(|| {
            CoreError::Internal(format!("unknown client type '{}'", self.client_type))
        })
    }

    pub fn connection_type(&self) -> CoreResult<ConnectionType> {
        ConnectionType::parse(&self.connection_type).ok_or_else(|| {
            CoreError::Internal(format!(
                "unknown connection type '{}'",
                self.connection_type
            ))
        })
    }

    /// Whether `user_id` is one of the two parties.
    pub fn involves(&self, user_id: DbId) -> bool {
        self.therapist_id == user_id || self.client_id == user_id
    }
}

/// Insert parameters for a new connection.
#[derive(Debug, Clone)]
pub struct CreateConnection {
    pub therapist_id: DbId,
    pub client_id: DbId,
    pub client_type: ClientType,
    pub connection_type: ConnectionType,
    pub assigned_by: DbId,
}
