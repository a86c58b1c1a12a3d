/// Room, participant, round and vote ids are opaque 15-character
/// alphanumeric strings (standard UUIDs are also accepted at the
/// boundary).
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
