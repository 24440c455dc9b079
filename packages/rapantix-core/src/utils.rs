//! General utilities shared across the application.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{GameError, GameResult};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Field Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Trims a required text field, failing with `InvalidRequest` when blank.
pub fn require_field<'a>(value: &'a str, field: &str) -> GameResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GameError::InvalidRequest(format!("Missing {field}")));
    }
    Ok(trimmed)
}

/// Canonicalizes a session code as typed by a player (trimmed, uppercased).
pub fn canonical_code(code: &str) -> GameResult<String> {
    require_field(code, "code").map(str::to_ascii_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_field_trims() {
        assert_eq!(require_field("  abc ", "client_id").unwrap(), "abc");
    }

    #[test]
    fn require_field_rejects_blank() {
        let err = require_field(" \t", "client_id").unwrap_err();
        assert_eq!(err, GameError::InvalidRequest("Missing client_id".into()));
    }

    #[test]
    fn canonical_code_uppercases() {
        assert_eq!(canonical_code(" ab12cd ").unwrap(), "AB12CD");
        assert!(canonical_code("").is_err());
    }
}
