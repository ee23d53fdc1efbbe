//! Appointment status vocabulary and state machine.
//!
//! `Requested → Confirmed → Completed`, with `Cancelled` reachable from
//! either non-terminal state (by a user or by a connection cascade).
//! Cancelled and Completed are terminal.

use serde::{Deserialize, Serialize};

/// Cancellation reason recorded when a connection termination cascade
/// cancels future appointments.
pub const CANCEL_REASON_CONNECTION_TERMINATED: &str = "connection terminated";

/// Cancellation reason recorded when a connection is reversibly
/// deactivated.
pub const CANCEL_REASON_CONNECTION_DEACTIVATED: &str = "connection deactivated";

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Requested,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "requested",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "requested" => Some(AppointmentStatus::Requested),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }

    /// Statuses reachable from `self`. Terminal states return an empty
    /// slice.
    pub fn valid_transitions(self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Requested => {
                &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => {
                &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => &[],
        }
    }

    pub fn can_transition(self, to: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Whether this appointment occupies its time interval for conflict
    /// checks and is subject to cascade cancellation.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Requested | AppointmentStatus::Confirmed
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_to_confirmed() {
        assert!(AppointmentStatus::Requested.can_transition(AppointmentStatus::Confirmed));
    }

    #[test]
    fn confirmed_to_completed() {
        assert!(AppointmentStatus::Confirmed.can_transition(AppointmentStatus::Completed));
    }

    #[test]
    fn both_live_states_can_cancel() {
        assert!(AppointmentStatus::Requested.can_transition(AppointmentStatus::Cancelled));
        assert!(AppointmentStatus::Confirmed.can_transition(AppointmentStatus::Cancelled));
    }

    #[test]
    fn requested_cannot_skip_to_completed() {
        assert!(!AppointmentStatus::Requested.can_transition(AppointmentStatus::Completed));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(AppointmentStatus::Cancelled.valid_transitions().is_empty());
        assert!(AppointmentStatus::Completed.valid_transitions().is_empty());
    }

    #[test]
    fn only_live_states_block() {
        assert!(AppointmentStatus::Requested.is_blocking());
        assert!(AppointmentStatus::Confirmed.is_blocking());
        assert!(!AppointmentStatus::Cancelled.is_blocking());
        assert!(!AppointmentStatus::Completed.is_blocking());
    }
}
