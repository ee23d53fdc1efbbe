//! Feature-access decision table.
//!
//! This is the single authorization gate used by messaging, mood-data
//! viewing, and appointment scheduling. The service layer resolves the
//! [`Relationship`] between two users (re-reading current storage state
//! so a concurrent termination is seen immediately) and this module
//! answers whether a given [`Feature`] is allowed for it.

use serde::{Deserialize, Serialize};

/// A gated platform feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    // Live-interaction features.
    Messaging,
    MoodDataView,
    AppointmentScheduling,
    VideoSession,
    // Historical, read-only features.
    AppointmentHistory,
    MoodDataHistory,
    MessageHistory,
}

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Messaging => "messaging",
            Feature::MoodDataView => "mood_data_view",
            Feature::AppointmentScheduling => "appointment_scheduling",
            Feature::VideoSession => "video_session",
            Feature::AppointmentHistory => "appointment_history",
            Feature::MoodDataHistory => "mood_data_history",
            Feature::MessageHistory => "message_history",
        }
    }

    /// Read-only look at records that already exist.
    pub fn is_historical(self) -> bool {
        matches!(
            self,
            Feature::AppointmentHistory | Feature::MoodDataHistory | Feature::MessageHistory
        )
    }
}

/// The relationship between an actor and another user, as resolved
/// against current storage state.
///
/// Resolution order matters: an admin actor short-circuits everything,
/// an active connection beats the family link, and the family link beats
/// a terminated connection (a guardian keeps live access to their own
/// child even after a therapist connection ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// The actor is an administrator.
    Admin,
    /// An active connection exists between the two users.
    ActiveConnection,
    /// Guardian and their own child (either direction), independent of
    /// any connection record.
    Family,
    /// The only connection between the two users is terminated.
    TerminatedConnection,
    /// No relationship at all.
    None,
}

/// Features a guardian/child pair may use without any connection record.
const FAMILY_FEATURES: &[Feature] = &[
    Feature::Messaging,
    Feature::MoodDataView,
    Feature::AppointmentScheduling,
];

/// Features that survive termination: historical record access only.
const HISTORICAL_FEATURES: &[Feature] = &[
    Feature::AppointmentHistory,
    Feature::MoodDataHistory,
    Feature::MessageHistory,
];

/// Decide whether `feature` is allowed under `relationship`.
pub fn evaluate(relationship: Relationship, feature: Feature) -> bool {
    match relationship {
        Relationship::Admin => true,
        Relationship::ActiveConnection => true,
        Relationship::Family => FAMILY_FEATURES.contains(&feature),
        Relationship::TerminatedConnection => HISTORICAL_FEATURES.contains(&feature),
        Relationship::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FEATURES: &[Feature] = &[
        Feature::Messaging,
        Feature::MoodDataView,
        Feature::AppointmentScheduling,
        Feature::VideoSession,
        Feature::AppointmentHistory,
        Feature::MoodDataHistory,
        Feature::MessageHistory,
    ];

    #[test]
    fn admin_gets_everything() {
        for &feature in ALL_FEATURES {
            assert!(evaluate(Relationship::Admin, feature));
        }
    }

    #[test]
    fn active_connection_gets_everything() {
        for &feature in ALL_FEATURES {
            assert!(evaluate(Relationship::ActiveConnection, feature));
        }
    }

    #[test]
    fn family_gets_only_family_safe_features() {
        assert!(evaluate(Relationship::Family, Feature::Messaging));
        assert!(evaluate(Relationship::Family, Feature::MoodDataView));
        assert!(evaluate(Relationship::Family, Feature::AppointmentScheduling));
        assert!(!evaluate(Relationship::Family, Feature::VideoSession));
        assert!(!evaluate(Relationship::Family, Feature::AppointmentHistory));
    }

    #[test]
    fn terminated_connection_gets_history_only() {
        assert!(evaluate(
            Relationship::TerminatedConnection,
            Feature::AppointmentHistory
        ));
        assert!(evaluate(
            Relationship::TerminatedConnection,
            Feature::MoodDataHistory
        ));
        assert!(evaluate(
            Relationship::TerminatedConnection,
            Feature::MessageHistory
        ));
        assert!(!evaluate(
            Relationship::TerminatedConnection,
            Feature::Messaging
        ));
        assert!(!evaluate(
            Relationship::TerminatedConnection,
            Feature::AppointmentScheduling
        ));
    }

    #[test]
    fn no_relationship_gets_nothing() {
        for &feature in ALL_FEATURES {
            assert!(!evaluate(Relationship::None, feature));
        }
    }
}
