//! Pure domain logic for the Haven therapy-coordination platform.
//!
//! This crate has zero internal dependencies so that the persistence,
//! event, and service layers can all share the same vocabulary:
//!
//! - [`error`] — the [`CoreError`](error::CoreError) taxonomy surfaced by
//!   every service operation.
//! - [`roles`] — the closed [`Role`](roles::Role) enum and capability
//!   predicates.
//! - [`connection`] — connection / connection-request status enums and
//!   their state machines.
//! - [`appointment`] — appointment status enum and state machine.
//! - [`access`] — the feature-access decision table.
//! - [`slots`] — pure bookable-slot generation and interval overlap math.
//! - [`clock`] — injectable time source for deterministic tests.

pub mod access;
pub mod appointment;
pub mod clock;
pub mod connection;
pub mod error;
pub mod roles;
pub mod slots;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult};
