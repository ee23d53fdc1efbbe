//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - Accessor methods resolving stored text columns to core enums

pub mod appointment;
pub mod availability;
pub mod connection;
pub mod connection_request;
pub mod event;
pub mod mood;
pub mod notification;
pub mod user;
