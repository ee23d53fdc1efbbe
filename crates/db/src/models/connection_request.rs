//! Connection request entity model and DTOs.

use haven_core::connection::{RequestStatus, RequestType};
use haven_core::error::{CoreError, CoreResult};
use haven_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `connection_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConnectionRequest {
    pub id: DbId,
    pub requester_id: DbId,
    pub requester_type: String,
    pub target_therapist_id: DbId,
    /// Present only for child-assignment requests.
    pub target_client_id: Option<DbId>,
    pub request_type: String,
    pub status: String,
    pub message: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConnectionRequest {
    pub fn status(&self) -> CoreResult<RequestStatus> {
        RequestStatus::parse(&self.status).ok_or_else(|| {
            CoreError::Internal(format!("unknown request status '{}'", self.status))
        })
    }

    pub fn request_type(&self) -> CoreResult<RequestType> {
        RequestType::parse(&self.request_type).ok_or_else(|| {
            CoreError::Internal(format!("unknown request type '{}'", self.request_type))
        })
    }
}

/// Insert parameters for a new connection request.
#[derive(Debug, Clone)]
pub struct CreateConnectionRequest {
    pub requester_id: DbId,
    pub target_therapist_id: DbId,
    pub target_client_id: Option<DbId>,
    pub request_type: RequestType,
    pub message: Option<String>,
}
