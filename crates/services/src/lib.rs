//! Lifecycle orchestration services.
//!
//! This crate is the exposed surface of the coordination core: plain
//! async function calls taking ids/enums and returning domain entities
//! or typed failures. HTTP controllers (out of scope here) sit on top
//! and translate [`ServiceError`] kinds into responses.
//!
//! - [`requests`] — guardian-initiated connection request workflow.
//! - [`connections`] — admin assignment, relationship queries,
//!   authorized termination.
//! - [`permissions`] — cascade on status change and the single
//!   feature-access gate.
//! - [`scheduling`] — slot computation and race-safe booking.
//!
//! Every authorization or availability decision re-reads current storage
//! state; there is no long-lived in-process state to go stale during a
//! concurrent termination.

mod actors;

pub mod connections;
pub mod error;
pub mod permissions;
pub mod requests;
pub mod scheduling;

pub use connections::ConnectionService;
pub use error::{ServiceError, ServiceResult};
pub use permissions::PermissionService;
pub use requests::ConnectionRequestService;
pub use scheduling::SchedulingService;
