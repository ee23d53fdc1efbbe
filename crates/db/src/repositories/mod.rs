//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Methods that must run inside
//! a caller-owned transaction accept `&mut PgConnection` instead and
//! carry an `_in` suffix.

pub mod appointment_repo;
pub mod availability_repo;
pub mod connection_repo;
pub mod connection_request_repo;
pub mod event_repo;
pub mod mood_repo;
pub mod notification_repo;
pub mod user_repo;

pub use appointment_repo::AppointmentRepo;
pub use availability_repo::AvailabilityRepo;
pub use connection_repo::ConnectionRepo;
pub use connection_request_repo::ConnectionRequestRepo;
pub use event_repo::EventRepo;
pub use mood_repo::MoodRepo;
pub use notification_repo::NotificationRepo;
pub use user_repo::UserRepo;
