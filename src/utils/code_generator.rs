//! Short ID generation.
//!
//! IDs are drawn from the operating system CSPRNG and encoded as URL-safe
//! base64 without padding, so every ID is exactly [`SHORT_ID_LENGTH`]
//! characters from `[A-Za-z0-9_-]`.

use crate::error::AppError;
use base64::Engine as _;
use serde_json::json;

/// Length of random bytes before base64 encoding.
const SHORT_ID_BYTES: usize = 6;

/// Length of every generated short ID.
pub const SHORT_ID_LENGTH: usize = 8;

/// Maximum number of candidates tried before allocation gives up.
pub const MAX_ID_ATTEMPTS: usize = 10;

/// Generates a random short ID.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the system random number generator fails.
pub fn generate_short_id() -> Result<String, AppError> {
    let mut buffer = [0u8; SHORT_ID_BYTES];

    getrandom::fill(&mut buffer).map_err(|e| {
        AppError::internal(
            "Failed to generate random bytes",
            json!({ "reason": e.to_string() }),
        )
    })?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer))
}

/// Allocates a short ID that `is_taken` reports as free.
///
/// `is_taken` must consider live and deleted links alike.
///
/// # Errors
///
/// Returns [`AppError::IdSpaceExhausted`] after [`MAX_ID_ATTEMPTS`] collisions.
pub fn allocate_short_id(mut is_taken: impl FnMut(&str) -> bool) -> Result<String, AppError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = generate_short_id()?;
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }

    Err(id_space_exhausted())
}

/// Error returned once [`MAX_ID_ATTEMPTS`] candidates all collided.
pub fn id_space_exhausted() -> AppError {
    tracing::error!(
        attempts = MAX_ID_ATTEMPTS,
        "Failed to allocate unique short ID"
    );
    metrics::counter!("short_id_exhausted_total").increment(1);

    AppError::id_space_exhausted(
        "Failed to generate unique short ID",
        json!({ "attempts": MAX_ID_ATTEMPTS }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_short_id_has_correct_length() {
        let id = generate_short_id().unwrap();
        assert_eq!(id.len(), SHORT_ID_LENGTH);
    }

    #[test]
    fn test_generate_short_id_url_safe_characters() {
        let id = generate_short_id().unwrap();
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_short_id_produces_unique_ids() {
        let mut ids = HashSet::new();

        for _ in 0..1000 {
            ids.insert(generate_short_id().unwrap());
        }

        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_allocate_returns_first_free_candidate() {
        let id = allocate_short_id(|_| false).unwrap();
        assert_eq!(id.len(), SHORT_ID_LENGTH);
    }

    #[test]
    fn test_allocate_retries_on_collision() {
        let mut calls = 0;
        let id = allocate_short_id(|_| {
            calls += 1;
            calls < 3
        });

        assert!(id.is_ok());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_allocate_exhausts_after_max_attempts() {
        let mut calls = 0;
        let result = allocate_short_id(|_| {
            calls += 1;
            true
        });

        assert!(matches!(result, Err(AppError::IdSpaceExhausted { .. })));
        assert_eq!(calls, MAX_ID_ATTEMPTS);
    }
}
