/// Primary key type for every persisted entity (PostgreSQL BIGSERIAL).
pub type DbId = i64;

/// Instants are always stored and compared in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
