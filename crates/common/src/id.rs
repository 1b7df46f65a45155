//! ID utilities.
//!
//! Entity IDs are lowercase ULIDs (26 characters, Crockford base32).

use ulid::Ulid;

/// Length of an encoded entity ID.
pub const ID_LENGTH: usize = 26;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}

/// Returns whether `id` is a well-formed entity ID.
///
/// Uppercase input is rejected even though ULID decoding is case-insensitive,
/// since stored IDs are always lowercase and an uppercase lookup would never match.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LENGTH
        && !id.bytes().any(|b| b.is_ascii_uppercase())
        && Ulid::from_string(id).is_ok()
}
