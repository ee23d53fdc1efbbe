//! Guardian-initiated connection request workflow.
//!
//! Guardians ask, therapists review. A request is a pending record that
//! resolves exactly once (approved, declined, or cancelled); approval
//! atomically creates the connection it asked for.

use std::sync::Arc;

use haven_core::clock::Clock;
use haven_core::connection::{RequestStatus, RequestType};
use haven_core::roles::Role;
use haven_core::types::DbId;
use haven_db::models::connection::{Connection, CreateConnection};
use haven_db::models::connection_request::{ConnectionRequest, CreateConnectionRequest};
use haven_db::repositories::{ConnectionRepo, ConnectionRequestRepo, UserRepo};
use haven_db::DbPool;
use haven_events::bus::event_types;
use haven_events::dispatcher::{NotificationDispatcher, Notify};

use crate::actors::load_role;
use crate::error::{is_unique_violation, ServiceError, ServiceResult};

/// Creates, reviews, and cancels connection requests.
#[derive(Clone)]
pub struct ConnectionRequestService {
    pool: DbPool,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl ConnectionRequestService {
    pub fn new(
        pool: DbPool,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            dispatcher,
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// A guardian asks a therapist for a connection to themselves.
    pub async fn create_guardian_request(
        &self,
        guardian_id: DbId,
        therapist_id: DbId,
        message: Option<String>,
    ) -> ServiceResult<ConnectionRequest> {
        let guardian_role = load_role(&self.pool, guardian_id).await?;
        if !guardian_role.can_initiate_requests() {
            return Err(ServiceError::validation(
                "only guardians may create connection requests",
            ));
        }

        self.ensure_therapist(therapist_id).await?;
        self.ensure_no_active_connection(therapist_id, guardian_id)
            .await?;
        self.ensure_no_pending_duplicate(guardian_id, therapist_id, None)
            .await?;

        let request = ConnectionRequestRepo::create(
            &self.pool,
            &CreateConnectionRequest {
                requester_id: guardian_id,
                target_therapist_id: therapist_id,
                target_client_id: None,
                request_type: RequestType::GuardianToTherapist,
                message,
            },
        )
        .await?;

        tracing::info!(
            request_id = request.id,
            guardian_id,
            therapist_id,
            "Guardian connection request created"
        );

        self.dispatcher
            .notify(
                Notify::new(
                    therapist_id,
                    event_types::CONNECTION_REQUEST_RECEIVED,
                    "New connection request",
                    "A guardian has requested a connection with you.",
                )
                .with_data(serde_json::json!({ "request_id": request.id })),
            )
            .await;

        Ok(request)
    }

    /// A guardian asks for one of their own children to be assigned to a
    /// therapist the guardian already has an active connection with.
    pub async fn create_child_assignment_request(
        &self,
        guardian_id: DbId,
        child_id: DbId,
        therapist_id: DbId,
        message: Option<String>,
    ) -> ServiceResult<ConnectionRequest> {
        let guardian_role = load_role(&self.pool, guardian_id).await?;
        if !guardian_role.can_initiate_requests() {
            return Err(ServiceError::validation(
                "only guardians may create connection requests",
            ));
        }

        if !UserRepo::is_child_of(&self.pool, child_id, guardian_id).await? {
            return Err(ServiceError::validation(
                "a guardian may only request assignments for their own children",
            ));
        }

        self.ensure_therapist(therapist_id).await?;

        // The guardian's own relationship with the therapist is the
        // prerequisite for handing over a child.
        if ConnectionRepo::find_active_for_pair(&self.pool, therapist_id, guardian_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::validation(
                "the guardian must have an active connection with this \
                 therapist before assigning a child",
            ));
        }

        self.ensure_no_active_connection(therapist_id, child_id)
            .await?;
        self.ensure_no_pending_duplicate(guardian_id, therapist_id, Some(child_id))
            .await?;

        let request = ConnectionRequestRepo::create(
            &self.pool,
            &CreateConnectionRequest {
                requester_id: guardian_id,
                target_therapist_id: therapist_id,
                target_client_id: Some(child_id),
                request_type: RequestType::GuardianChildAssignment,
                message,
            },
        )
        .await?;

        tracing::info!(
            request_id = request.id,
            guardian_id,
            child_id,
            therapist_id,
            "Child assignment request created"
        );

        self.dispatcher
            .notify(
                Notify::new(
                    therapist_id,
                    event_types::CONNECTION_REQUEST_RECEIVED,
                    "New child assignment request",
                    "A guardian has requested that you take on their child.",
                )
                .with_data(serde_json::json!({ "request_id": request.id })),
            )
            .await;

        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Requests addressed to a therapist, pending first.
    pub async fn requests_for_therapist(
        &self,
        therapist_id: DbId,
        pending_only: bool,
    ) -> ServiceResult<Vec<ConnectionRequest>> {
        Ok(
            ConnectionRequestRepo::list_for_therapist(&self.pool, therapist_id, pending_only)
                .await?,
        )
    }

    /// Requests created by a guardian.
    pub async fn requests_for_requester(
        &self,
        requester_id: DbId,
    ) -> ServiceResult<Vec<ConnectionRequest>> {
        Ok(ConnectionRequestRepo::list_for_requester(&self.pool, requester_id).await?)
    }

    // -----------------------------------------------------------------------
    // Review
    // -----------------------------------------------------------------------

    /// Approve a pending request, creating the connection it asked for.
    ///
    /// The connection insert and the request status write share one
    /// transaction: an approved request whose connection failed to
    /// materialize (or the reverse) must never be observable.
    pub async fn approve(
        &self,
        request_id: DbId,
        reviewer_id: DbId,
    ) -> ServiceResult<(ConnectionRequest, Connection)> {
        let request = self.load_pending(request_id).await?;
        self.authorize_reviewer(&request, reviewer_id).await?;

        let request_type = request.request_type()?;
        let (client_type, connection_type) = request_type.approved_connection();
        let client_id = request.target_client_id.unwrap_or(request.requester_id);

        // A child assignment rides on the guardian's own connection; if
        // that lapsed while the request sat pending, approval is refused.
        if request_type == RequestType::GuardianChildAssignment
            && ConnectionRepo::find_active_for_pair(
                &self.pool,
                request.target_therapist_id,
                request.requester_id,
            )
            .await?
            .is_none()
        {
            return Err(ServiceError::conflict(
                "the guardian's own connection with this therapist is no longer active",
            ));
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let connection = ConnectionRepo::create_in(
            &mut tx,
            &CreateConnection {
                therapist_id: request.target_therapist_id,
                client_id,
                client_type,
                connection_type,
                assigned_by: reviewer_id,
            },
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "uq_connections_active_pair") {
                ServiceError::conflict("an active connection already exists for this pair")
            } else {
                e.into()
            }
        })?;

        let reviewed = ConnectionRequestRepo::review_in(
            &mut tx,
            request_id,
            RequestStatus::Approved,
            reviewer_id,
            now,
        )
        .await
        .map_err(Self::map_concurrent_review)?;

        tx.commit().await?;

        tracing::info!(
            request_id,
            connection_id = connection.id,
            reviewer_id,
            "Connection request approved"
        );

        self.dispatcher
            .notify(
                Notify::new(
                    request.requester_id,
                    event_types::CONNECTION_REQUEST_APPROVED,
                    "Connection request approved",
                    "Your connection request has been approved.",
                )
                .with_data(serde_json::json!({
                    "request_id": request_id,
                    "connection_id": connection.id,
                })),
            )
            .await;

        Ok((reviewed, connection))
    }

    /// Decline a pending request. No connection is created.
    pub async fn decline(
        &self,
        request_id: DbId,
        reviewer_id: DbId,
    ) -> ServiceResult<ConnectionRequest> {
        let request = self.load_pending(request_id).await?;
        self.authorize_reviewer(&request, reviewer_id).await?;

        let mut conn = self.pool.acquire().await?;
        let reviewed = ConnectionRequestRepo::review_in(
            &mut conn,
            request_id,
            RequestStatus::Declined,
            reviewer_id,
            self.clock.now(),
        )
        .await
        .map_err(Self::map_concurrent_review)?;

        tracing::info!(request_id, reviewer_id, "Connection request declined");

        self.dispatcher
            .notify(
                Notify::new(
                    request.requester_id,
                    event_types::CONNECTION_REQUEST_DECLINED,
                    "Connection request declined",
                    "Your connection request has been declined.",
                )
                .with_data(serde_json::json!({ "request_id": request_id })),
            )
            .await;

        Ok(reviewed)
    }

    /// The requester withdraws their own pending request.
    pub async fn cancel(
        &self,
        request_id: DbId,
        actor_id: DbId,
    ) -> ServiceResult<ConnectionRequest> {
        let request = ConnectionRequestRepo::find_by_id(&self.pool, request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("connection request", request_id))?;

        if request.requester_id != actor_id {
            return Err(ServiceError::forbidden(
                "only the requester may cancel a connection request",
            ));
        }

        let cancelled = ConnectionRequestRepo::cancel(&self.pool, request_id, self.clock.now())
            .await?
            .ok_or_else(|| {
                ServiceError::conflict(format!("request {request_id} is no longer pending"))
            })?;

        tracing::info!(request_id, actor_id, "Connection request cancelled");

        self.dispatcher
            .notify(
                Notify::new(
                    request.target_therapist_id,
                    event_types::CONNECTION_REQUEST_CANCELLED,
                    "Connection request withdrawn",
                    "A pending connection request has been withdrawn.",
                )
                .with_data(serde_json::json!({ "request_id": request_id })),
            )
            .await;

        Ok(cancelled)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn ensure_therapist(&self, therapist_id: DbId) -> ServiceResult<()> {
        if load_role(&self.pool, therapist_id).await? != Role::Therapist {
            return Err(ServiceError::validation(format!(
                "user {therapist_id} is not a therapist"
            )));
        }
        Ok(())
    }

    async fn ensure_no_active_connection(&self, a: DbId, b: DbId) -> ServiceResult<()> {
        if ConnectionRepo::find_active_for_pair(&self.pool, a, b)
            .await?
            .is_some()
        {
            return Err(ServiceError::validation(
                "an active connection already exists for this pair",
            ));
        }
        Ok(())
    }

    async fn ensure_no_pending_duplicate(
        &self,
        requester_id: DbId,
        therapist_id: DbId,
        target_client_id: Option<DbId>,
    ) -> ServiceResult<()> {
        if ConnectionRequestRepo::find_pending_for(
            &self.pool,
            requester_id,
            therapist_id,
            target_client_id,
        )
        .await?
        .is_some()
        {
            return Err(ServiceError::validation(
                "an identical request is already pending",
            ));
        }
        Ok(())
    }

    /// Load a request and require it to still be pending.
    async fn load_pending(&self, request_id: DbId) -> ServiceResult<ConnectionRequest> {
        let request = ConnectionRequestRepo::find_by_id(&self.pool, request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("connection request", request_id))?;
        let status = request.status()?;
        if status != RequestStatus::Pending {
            return Err(ServiceError::conflict(format!(
                "request {request_id} has already been {status}",
                status = status.as_str()
            )));
        }
        Ok(request)
    }

    /// Review belongs to the target therapist alone; administrators
    /// route around requests by assigning connections directly.
    async fn authorize_reviewer(
        &self,
        request: &ConnectionRequest,
        reviewer_id: DbId,
    ) -> ServiceResult<()> {
        let role = load_role(&self.pool, reviewer_id).await?;
        if role.can_review_requests() && request.target_therapist_id == reviewer_id {
            return Ok(());
        }
        Err(ServiceError::forbidden(
            "only the target therapist may review this request",
        ))
    }

    /// The `status = 'pending'` guard in the review write turns a lost
    /// race into `RowNotFound`.
    fn map_concurrent_review(err: sqlx::Error) -> ServiceError {
        match err {
            sqlx::Error::RowNotFound => {
                ServiceError::conflict("request was reviewed concurrently")
            }
            other => other.into(),
        }
    }
}
