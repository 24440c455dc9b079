//! Fixed game constants that should NOT be changed.
//!
//! Clients depend on these values (code shape, player count), so changing
//! them breaks compatibility with deployed front-ends.

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "rapantix-server";

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum number of members in a team or versus session.
pub const MAX_PLAYERS: usize = 2;

/// Length of a session code.
pub const SESSION_CODE_LENGTH: usize = 6;

/// Characters a session code is drawn from (36^6 ≈ 2.18×10⁹ codes).
pub const SESSION_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Attempts at drawing an unused code before giving up.
pub const SESSION_CODE_ATTEMPTS: usize = 50;

/// Default idle TTL for sessions (seconds). 12 hours.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 43_200;

// ─────────────────────────────────────────────────────────────────────────────
// Similarity
// ─────────────────────────────────────────────────────────────────────────────

/// Upper bound on the number of neighbours returned by a similarity lookup.
pub const MAX_TOPN: usize = 60;

/// Number of neighbours returned when the client does not ask for a count.
pub const DEFAULT_TOPN: i64 = 15;
