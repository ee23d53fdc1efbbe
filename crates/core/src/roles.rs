//! Platform roles and their capabilities.
//!
//! The database stores the role as text; [`Role::parse`] is the single
//! place where that string is resolved. Everything downstream matches on
//! the enum, so a new role fails to compile rather than silently falling
//! through a string comparison.

use serde::{Deserialize, Serialize};

/// Closed set of platform roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Therapist,
    Guardian,
    Child,
}

impl Role {
    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Therapist => "therapist",
            Role::Guardian => "guardian",
            Role::Child => "child",
        }
    }

    /// Resolve a stored role string. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "admin" => Some(Role::Admin),
            "therapist" => Some(Role::Therapist),
            "guardian" => Some(Role::Guardian),
            "child" => Some(Role::Child),
            _ => None,
        }
    }

    /// May this role create admin-assigned connections?
    pub fn can_assign_connections(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// May this role review (approve/decline) connection requests?
    ///
    /// Reviewing is further restricted to the request's target therapist;
    /// this predicate only gates the role dimension.
    pub fn can_review_requests(self) -> bool {
        matches!(self, Role::Therapist)
    }

    /// May this role initiate connection requests?
    pub fn can_initiate_requests(self) -> bool {
        matches!(self, Role::Guardian)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
