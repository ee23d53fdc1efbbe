//! Permission propagation: the cascade triggered by connection status
//! changes, and the single feature-access gate.
//!
//! Access checks re-read current storage state on every call, so a
//! concurrent termination is observed by the very next check. The
//! cascade itself runs inside the caller's transaction: a terminated
//! connection with live future appointments must never be observable.

use std::sync::Arc;

use haven_core::access::{self, Feature, Relationship};
use haven_core::appointment::{
    CANCEL_REASON_CONNECTION_DEACTIVATED, CANCEL_REASON_CONNECTION_TERMINATED,
};
use haven_core::clock::Clock;
use haven_core::connection::ConnectionStatus;
use haven_core::roles::Role;
use haven_core::types::{DbId, Timestamp};
use haven_db::models::appointment::Appointment;
use haven_db::models::connection::Connection;
use haven_db::models::mood::MoodEntry;
use haven_db::repositories::{AppointmentRepo, ConnectionRepo, MoodRepo};
use haven_db::DbPool;
use sqlx::PgConnection;

use crate::actors::load_user;
use crate::error::{ServiceError, ServiceResult};

/// Resolves relationships and gates feature access.
#[derive(Clone)]
pub struct PermissionService {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl PermissionService {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    // -----------------------------------------------------------------------
    // Cascade
    // -----------------------------------------------------------------------

    /// Apply the dependent-record updates for a connection status
    /// transition, inside the caller's transaction.
    ///
    /// - `→ terminated` and `→ inactive`: cancel every blocking future
    ///   appointment for the exact (therapist, client) pair. Past
    ///   appointments and other pairs are untouched; nothing is ever
    ///   deleted or redacted.
    /// - `→ active`: no destructive action. Access comes back on its own
    ///   because every downstream check reads current status.
    ///
    /// Returns the appointments the cascade cancelled so the caller can
    /// emit notifications after commit.
    pub async fn cascade_status_change(
        conn: &mut PgConnection,
        connection: &Connection,
        new_status: ConnectionStatus,
        actor_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let reason = match new_status {
            ConnectionStatus::Terminated => CANCEL_REASON_CONNECTION_TERMINATED,
            ConnectionStatus::Inactive => CANCEL_REASON_CONNECTION_DEACTIVATED,
            ConnectionStatus::Active => return Ok(Vec::new()),
        };

        let cancelled = AppointmentRepo::cancel_future_for_pair_in(
            conn,
            connection.therapist_id,
            connection.client_id,
            reason,
            actor_id,
            now,
        )
        .await?;

        if !cancelled.is_empty() {
            tracing::info!(
                connection_id = connection.id,
                cancelled = cancelled.len(),
                status = %new_status,
                "Connection cascade cancelled future appointments"
            );
        }

        Ok(cancelled)
    }

    // -----------------------------------------------------------------------
    // Access gate
    // -----------------------------------------------------------------------

    /// Resolve the relationship between `actor_id` and `other_id`
    /// against current storage state.
    ///
    /// Precedence: admin actor, then active connection, then the family
    /// link (a guardian and their own child, verified via the child's
    /// `guardian_id` — never via connections), then a terminated
    /// connection, then nothing.
    pub async fn resolve_relationship(
        &self,
        actor_id: DbId,
        other_id: DbId,
    ) -> ServiceResult<Relationship> {
        let actor = load_user(&self.pool, actor_id).await?;
        if actor.role()? == Role::Admin {
            return Ok(Relationship::Admin);
        }

        if ConnectionRepo::find_active_for_pair(&self.pool, actor_id, other_id)
            .await?
            .is_some()
        {
            return Ok(Relationship::ActiveConnection);
        }

        let other = load_user(&self.pool, other_id).await?;
        let family = actor.guardian_id == Some(other_id) || other.guardian_id == Some(actor_id);
        if family {
            return Ok(Relationship::Family);
        }

        if ConnectionRepo::find_terminated_for_pair(&self.pool, actor_id, other_id)
            .await?
            .is_some()
        {
            return Ok(Relationship::TerminatedConnection);
        }

        Ok(Relationship::None)
    }

    /// The single authorization gate used by messaging, mood-data
    /// viewing, and appointment scheduling.
    pub async fn can_access_feature(
        &self,
        actor_id: DbId,
        other_id: DbId,
        feature: Feature,
    ) -> ServiceResult<bool> {
        let relationship = self.resolve_relationship(actor_id, other_id).await?;
        Ok(access::evaluate(relationship, feature))
    }

    /// Mood entries of `child_id` visible to `viewer_id`.
    ///
    /// Live viewers (family, active connection, admin) see the requested
    /// range as-is. A viewer whose only relationship is a terminated
    /// connection is limited to entries recorded on or before
    /// `terminated_at`, regardless of the requested range.
    pub async fn accessible_mood_entries(
        &self,
        viewer_id: DbId,
        child_id: DbId,
        from: Option<Timestamp>,
        until: Option<Timestamp>,
    ) -> ServiceResult<Vec<MoodEntry>> {
        let relationship = self.resolve_relationship(viewer_id, child_id).await?;

        let live = access::evaluate(relationship, Feature::MoodDataView);
        let historical = access::evaluate(relationship, Feature::MoodDataHistory);
        if !live && !historical {
            return Err(ServiceError::forbidden(
                "no access to this child's mood data",
            ));
        }

        let mut until = until;
        if relationship == Relationship::TerminatedConnection {
            let terminated_at =
                ConnectionRepo::find_terminated_for_pair(&self.pool, viewer_id, child_id)
                    .await?
                    .and_then(|c| c.terminated_at)
                    // A terminated row without a stamp would be a data
                    // bug; clamping to now fails closed.
                    .unwrap_or_else(|| self.clock.now());
            until = Some(match until {
                Some(requested) => requested.min(terminated_at),
                None => terminated_at,
            });
        }

        Ok(MoodRepo::list_for_child(&self.pool, child_id, from, until).await?)
    }
}
