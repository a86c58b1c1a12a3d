//! Boundary input validation: names and entity ids.
//!
//! Everything arriving from a form field or WebSocket frame passes through
//! here before it reaches the persistence layer.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum room name length, in characters.
pub const MAX_ROOM_NAME_LENGTH: usize = 100;
/// Maximum participant name length, in characters.
pub const MAX_PARTICIPANT_NAME_LENGTH: usize = 50;

/// Opaque server-generated id: 15 alphanumeric characters.
static OPAQUE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{15}$").expect("valid regex"));

/// Standard lowercase UUID, accepted for compatibility.
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("valid regex")
});

/// Names may contain Unicode letters and digits, whitespace, apostrophes,
/// hyphens, underscores, and dots.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}\s'\-_.]+$").expect("valid regex"));

/// Characters with shell or markup meaning are rejected outright.
static DANGEROUS_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>{}\[\]\\;|&$()`]").expect("valid regex"));

/// Validate that a string is a server-generated opaque id or a UUID.
pub fn validate_entity_id(id: &str) -> Result<(), CoreError> {
    if id.is_empty() {
        return Err(CoreError::Validation("id cannot be empty".to_string()));
    }
    if OPAQUE_ID_RE.is_match(id) || UUID_RE.is_match(&id.to_lowercase()) {
        return Ok(());
    }
    Err(CoreError::Validation(
        "invalid id format (expected 15-character id or UUID)".to_string(),
    ))
}

/// Validate and sanitize a name, returning the trimmed value.
pub fn validate_name(name: &str, max_len: usize) -> Result<String, CoreError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(CoreError::Validation("name cannot be empty".to_string()));
    }
    if name.chars().count() > max_len {
        return Err(CoreError::Validation(format!(
            "name too long (max {max_len} characters)"
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(CoreError::Validation(
            "name contains invalid characters (allowed: letters, numbers, spaces, apostrophes, hyphens, underscores, dots)"
                .to_string(),
        ));
    }
    if DANGEROUS_CHARS_RE.is_match(name) {
        return Err(CoreError::Validation(
            "name contains potentially dangerous characters".to_string(),
        ));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(CoreError::Validation(
            "name contains control characters".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Validate a room name (1-100 characters).
pub fn validate_room_name(name: &str) -> Result<String, CoreError> {
    validate_name(name, MAX_ROOM_NAME_LENGTH)
}

/// Validate a participant name (1-50 characters).
pub fn validate_participant_name(name: &str) -> Result<String, CoreError> {
    validate_name(name, MAX_PARTICIPANT_NAME_LENGTH)
}
