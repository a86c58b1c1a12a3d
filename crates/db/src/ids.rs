//! Opaque entity id generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of server-generated entity ids.
pub const ENTITY_ID_LENGTH: usize = 15;

/// Generate a new opaque 15-character alphanumeric id.
pub fn new_entity_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ENTITY_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_expected_shape() {
        let id = new_entity_id();
        assert_eq!(id.len(), ENTITY_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        poker_core::validation::validate_entity_id(&id).unwrap();
    }

    #[test]
    fn ids_are_unique_enough() {
        let a = new_entity_id();
        let b = new_entity_id();
        assert_ne!(a, b);
    }
}
