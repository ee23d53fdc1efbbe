//! Connection management: admin assignment, relationship queries, and
//! authorized termination with its cascade.

use std::sync::Arc;

use haven_core::clock::Clock;
use haven_core::connection::{ClientType, ConnectionStatus, ConnectionType};
use haven_core::roles::Role;
use haven_core::types::DbId;
use haven_db::models::connection::{Connection, CreateConnection};
use haven_db::repositories::ConnectionRepo;
use haven_db::DbPool;
use haven_events::bus::event_types;
use haven_events::dispatcher::{NotificationDispatcher, NotificationPriority, Notify};

use crate::actors::{load_role, load_user};
use crate::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::permissions::PermissionService;

/// Creates, queries, and ends connections.
#[derive(Clone)]
pub struct ConnectionService {
    pool: DbPool,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl ConnectionService {
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

    /// Directly assign a guardian to a therapist.
    ///
    /// Administrators may only assign guardians; children reach a
    /// therapist exclusively through their guardian's child-assignment
    /// workflow.
    pub async fn create_admin_assignment(
        &self,
        therapist_id: DbId,
        client_id: DbId,
        admin_id: DbId,
    ) -> ServiceResult<Connection> {
        let admin_role = load_role(&self.pool, admin_id).await?;
        if !admin_role.can_assign_connections() {
            return Err(ServiceError::forbidden(
                "only administrators may assign connections directly",
            ));
        }

        let therapist_role = load_role(&self.pool, therapist_id).await?;
        if therapist_role != Role::Therapist {
            return Err(ServiceError::validation(format!(
                "user {therapist_id} is not a therapist"
            )));
        }

        let client_role = load_role(&self.pool, client_id).await?;
        if client_role != Role::Guardian {
            return Err(ServiceError::validation(
                "administrators may only assign guardians; children are \
                 assigned by their guardian",
            ));
        }

        if ConnectionRepo::find_active_for_pair(&self.pool, therapist_id, client_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::validation(
                "an active connection already exists for this pair",
            ));
        }

        let connection = ConnectionRepo::create(
            &self.pool,
            &CreateConnection {
                therapist_id,
                client_id,
                client_type: ClientType::Guardian,
                connection_type: ConnectionType::AdminAssigned,
                assigned_by: admin_id,
            },
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "uq_connections_active_pair") {
                ServiceError::validation("an active connection already exists for this pair")
            } else {
                e.into()
            }
        })?;

        tracing::info!(
            connection_id = connection.id,
            therapist_id,
            client_id,
            "Admin assigned connection"
        );

        self.dispatcher
            .notify_many(vec![
                Notify::new(
                    therapist_id,
                    event_types::CONNECTION_ASSIGNED,
                    "New client assigned",
                    "An administrator has assigned a new client to you.",
                )
                .with_data(serde_json::json!({ "connection_id": connection.id })),
                Notify::new(
                    client_id,
                    event_types::CONNECTION_ASSIGNED,
                    "Therapist assigned",
                    "An administrator has connected you with a therapist.",
                )
                .with_data(serde_json::json!({ "connection_id": connection.id })),
            ])
            .await;

        Ok(connection)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Connections visible to `actor_id`, scoped by their role:
    /// therapists see their clients, guardians/children see their
    /// therapists, administrators see everything.
    pub async fn connections_for(
        &self,
        actor_id: DbId,
        client_type_filter: Option<ClientType>,
    ) -> ServiceResult<Vec<Connection>> {
        let role = load_role(&self.pool, actor_id).await?;
        let connections = match role {
            Role::Admin => ConnectionRepo::list_all(&self.pool).await?,
            Role::Therapist => {
                ConnectionRepo::list_for_therapist(&self.pool, actor_id, client_type_filter)
                    .await?
            }
            Role::Guardian | Role::Child => {
                ConnectionRepo::list_for_client(&self.pool, actor_id).await?
            }
        };
        Ok(connections)
    }

    /// Whether an active connection exists between `a` and `b`, in
    /// either role ordering.
    pub async fn has_active_connection(&self, a: DbId, b: DbId) -> ServiceResult<bool> {
        Ok(ConnectionRepo::find_active_for_pair(&self.pool, a, b)
            .await?
            .is_some())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Permanently end a connection and cascade to its dependents.
    pub async fn terminate(
        &self,
        connection_id: DbId,
        actor_id: DbId,
        reason: Option<&str>,
    ) -> ServiceResult<Connection> {
        self.transition(
            connection_id,
            actor_id,
            ConnectionStatus::Terminated,
            reason,
        )
        .await
    }

    /// Reversibly suspend a connection. Future appointments are
    /// cancelled, but the record can be reactivated later.
    pub async fn deactivate(
        &self,
        connection_id: DbId,
        actor_id: DbId,
    ) -> ServiceResult<Connection> {
        self.transition(connection_id, actor_id, ConnectionStatus::Inactive, None)
            .await
    }

    /// Restore a deactivated connection. No data repair is needed:
    /// access comes back because every check reads current status.
    pub async fn reactivate(
        &self,
        connection_id: DbId,
        actor_id: DbId,
    ) -> ServiceResult<Connection> {
        self.transition(connection_id, actor_id, ConnectionStatus::Active, None)
            .await
    }

    /// Shared authorized status transition with cascade.
    async fn transition(
        &self,
        connection_id: DbId,
        actor_id: DbId,
        new_status: ConnectionStatus,
        reason: Option<&str>,
    ) -> ServiceResult<Connection> {
        let connection = ConnectionRepo::find_by_id(&self.pool, connection_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("connection", connection_id))?;

        let current = connection.status()?;
        if !current.can_transition(new_status) {
            return Err(ServiceError::conflict(format!(
                "connection {connection_id} is {current} and cannot become {new_status}"
            )));
        }

        let actor_role = load_role(&self.pool, actor_id).await?;
        let is_owning_therapist = connection.therapist_id == actor_id;
        if actor_role != Role::Admin && !is_owning_therapist {
            return Err(ServiceError::forbidden(
                "only an administrator or the owning therapist may change \
                 this connection",
            ));
        }

        // Status write and appointment cascade are one atomic unit: a
        // terminated connection with live future appointments (or the
        // reverse) would violate the feature-gating invariant.
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;
        let updated =
            ConnectionRepo::set_status_in(&mut tx, connection_id, new_status, now).await?;
        let cancelled = PermissionService::cascade_status_change(
            &mut tx,
            &connection,
            new_status,
            actor_id,
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            connection_id,
            actor_id,
            status = %new_status,
            cancelled_appointments = cancelled.len(),
            "Connection status changed"
        );

        self.notify_transition(&updated, new_status, reason, cancelled.len())
            .await;

        Ok(updated)
    }

    /// Post-commit cascade notifications: therapist, client, and the
    /// child's guardian when the client is a child. The transition has
    /// already committed, so failures here are logged, never returned.
    async fn notify_transition(
        &self,
        connection: &Connection,
        new_status: ConnectionStatus,
        reason: Option<&str>,
        cancelled_count: usize,
    ) {
        let (kind, title, body) = match new_status {
            ConnectionStatus::Terminated => (
                event_types::CONNECTION_TERMINATED,
                "Connection ended",
                "Your therapeutic connection has ended. Past records remain available.",
            ),
            ConnectionStatus::Inactive => (
                event_types::CONNECTION_DEACTIVATED,
                "Connection paused",
                "Your therapeutic connection has been paused.",
            ),
            ConnectionStatus::Active => (
                event_types::CONNECTION_REACTIVATED,
                "Connection restored",
                "Your therapeutic connection is active again.",
            ),
        };

        let data = serde_json::json!({
            "connection_id": connection.id,
            "reason": reason,
            "cancelled_appointments": cancelled_count,
        });

        let mut recipients = vec![connection.therapist_id, connection.client_id];
        match connection.client_type() {
            Ok(ClientType::Child) => match load_user(&self.pool, connection.client_id).await {
                Ok(child) => {
                    if let Some(guardian_id) = child.guardian_id {
                        recipients.push(guardian_id);
                    }
                }
                Err(e) => tracing::error!(
                    error = %e,
                    connection_id = connection.id,
                    "Failed to resolve guardian for a transition notification"
                ),
            },
            Ok(ClientType::Guardian) => {}
            Err(e) => tracing::error!(
                error = %e,
                connection_id = connection.id,
                "Failed to resolve client type for a transition notification"
            ),
        }

        let notifications = recipients
            .into_iter()
            .map(|user_id| {
                Notify::new(user_id, kind, title, body)
                    .with_data(data.clone())
                    .with_priority(NotificationPriority::High)
            })
            .collect();
        self.dispatcher.notify_many(notifications).await;
    }
}
