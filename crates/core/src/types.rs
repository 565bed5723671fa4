/// All surrogate primary keys are PostgreSQL BIGSERIAL; user ids are the
/// chat platform's own (immutable) user identifiers.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
