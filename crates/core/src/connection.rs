//! Connection and connection-request vocabulary and state machines.
//!
//! A `Connection` is a recorded therapist ↔ client trust relationship.
//! It is never row-deleted: termination is a status write so historical
//! queries keep working. A `ConnectionRequest` is a guardian's pending
//! ask for a connection to be formed, reviewed by the target therapist.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Connection status
// ---------------------------------------------------------------------------

/// Lifecycle status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// The relationship is live; all gated features are available.
    Active,
    /// Reversibly suspended. Future appointments are cancelled when a
    /// connection goes inactive, but no `terminated_at` is stamped.
    Inactive,
    /// Permanently ended. Terminal; the record becomes immutable.
    Terminated,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Active => "active",
            ConnectionStatus::Inactive => "inactive",
            ConnectionStatus::Terminated => "terminated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ConnectionStatus::Active),
            "inactive" => Some(ConnectionStatus::Inactive),
            "terminated" => Some(ConnectionStatus::Terminated),
            _ => None,
        }
    }

    /// Statuses reachable from `self`.
    ///
    /// `Terminated` is terminal and returns an empty slice.
    pub fn valid_transitions(self) -> &'static [ConnectionStatus] {
        match self {
            ConnectionStatus::Active => {
                &[ConnectionStatus::Inactive, ConnectionStatus::Terminated]
            }
            ConnectionStatus::Inactive => {
                &[ConnectionStatus::Active, ConnectionStatus::Terminated]
            }
            ConnectionStatus::Terminated => &[],
        }
    }

    pub fn can_transition(self, to: ConnectionStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Connection type / client type
// ---------------------------------------------------------------------------

/// How the connection came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    AdminAssigned,
    GuardianRequested,
    GuardianChildAssignment,
}

impl ConnectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionType::AdminAssigned => "admin_assigned",
            ConnectionType::GuardianRequested => "guardian_requested",
            ConnectionType::GuardianChildAssignment => "guardian_child_assignment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin_assigned" => Some(ConnectionType::AdminAssigned),
            "guardian_requested" => Some(ConnectionType::GuardianRequested),
            "guardian_child_assignment" => Some(ConnectionType::GuardianChildAssignment),
            _ => None,
        }
    }
}

/// Which side of the family the client id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Guardian,
    Child,
}

impl ClientType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientType::Guardian => "guardian",
            ClientType::Child => "child",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "guardian" => Some(ClientType::Guardian),
            "child" => Some(ClientType::Child),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Connection requests
// ---------------------------------------------------------------------------

/// Status of a connection request. `Pending` transitions exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "declined" => Some(RequestStatus::Declined),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    /// All three review outcomes are terminal.
    pub fn valid_transitions(self) -> &'static [RequestStatus] {
        match self {
            RequestStatus::Pending => &[
                RequestStatus::Approved,
                RequestStatus::Declined,
                RequestStatus::Cancelled,
            ],
            RequestStatus::Approved | RequestStatus::Declined | RequestStatus::Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: RequestStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

/// Kind of relationship being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Guardian asks for a connection between themselves and a therapist.
    GuardianToTherapist,
    /// Guardian asks for one of their children to be assigned to a
    /// therapist the guardian already has an active connection with.
    GuardianChildAssignment,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::GuardianToTherapist => "guardian_to_therapist",
            RequestType::GuardianChildAssignment => "guardian_child_assignment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "guardian_to_therapist" => Some(RequestType::GuardianToTherapist),
            "guardian_child_assignment" => Some(RequestType::GuardianChildAssignment),
            _ => None,
        }
    }

    /// The connection shape an approval of this request produces.
    pub fn approved_connection(self) -> (ClientType, ConnectionType) {
        match self {
            RequestType::GuardianToTherapist => {
                (ClientType::Guardian, ConnectionType::GuardianRequested)
            }
            RequestType::GuardianChildAssignment => {
                (ClientType::Child, ConnectionType::GuardianChildAssignment)
            }
        }
    }
}
