//! Session records shared by team and versus modes.
//!
//! A [`SessionCore`] holds what both modes have in common (code, host,
//! members, song, timestamps). A [`Ledger`] is an append-only list of guess
//! events with a dedup index keyed by normalized word; team sessions own one,
//! versus sessions own one per player.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};
use crate::protocol_constants::MAX_PLAYERS;
use crate::utils::require_field;

// ─────────────────────────────────────────────────────────────────────────────
// Payload Types
// ─────────────────────────────────────────────────────────────────────────────

/// Game mode of a session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Team,
    Versus,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team => f.write_str("Team"),
            Self::Versus => f.write_str("Versus"),
        }
    }
}

/// Song to guess, supplied by the catalog at create time.
///
/// Opaque to the engine apart from the title, which title guesses are
/// compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub artist: String,
    pub title: String,
    pub lyrics: String,
}

impl Song {
    fn is_complete(&self) -> bool {
        !self.artist.trim().is_empty()
            && !self.title.trim().is_empty()
            && !self.lyrics.trim().is_empty()
    }
}

/// Role of the requesting client in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

/// A recorded word guess. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessEvent {
    /// Position in the owning ledger, starting at 1, gap-free.
    pub seq: u64,
    /// Text as submitted (trimmed), not the normalized key.
    pub word: String,
    pub client_id: String,
    /// Unix milliseconds.
    pub created_at: u64,
}

/// Result of submitting a word guess.
///
/// `accepted` is false when the normalized word was already in the ledger;
/// `event` is then the first recorded event for that word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessOutcome {
    pub accepted: bool,
    pub event: GuessEvent,
}

/// Result of a title guess, together with the caller's refreshed view.
#[derive(Debug, Clone, Serialize)]
pub struct TitleGuessOutcome<V> {
    pub correct: bool,
    /// Stored title, revealed only on a correct guess.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub state: V,
}

// ─────────────────────────────────────────────────────────────────────────────
// Create-time Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Validated input for a new session.
///
/// The only way to build a [`SessionCore`]; guarantees a non-blank host and
/// a complete song.
#[derive(Debug, Clone)]
pub struct NewSession {
    host_id: String,
    min_streams: u64,
    song: Song,
}

impl NewSession {
    /// Validates create parameters.
    ///
    /// Negative `min_streams` is clamped to 0.
    pub fn validate(host_id: &str, min_streams: i64, song: Song) -> GameResult<Self> {
        let host_id = require_field(host_id, "client_id")?.to_string();
        if !song.is_complete() {
            return Err(GameError::InvalidRequest("Incomplete song payload".into()));
        }
        Ok(Self {
            host_id,
            min_streams: min_streams.max(0) as u64,
            song,
        })
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    /// Builds the session record under the allocated `code`, host seeded as sole member.
    pub(crate) fn into_core(self, mode: Mode, code: String, now: u64) -> SessionCore {
        SessionCore {
            members: vec![Member {
                client_id: self.host_id.clone(),
                joined_at: now,
            }],
            code,
            mode,
            host_id: self.host_id,
            created_at: now,
            updated_at: now,
            min_streams: self.min_streams,
            song: self.song,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Core
// ─────────────────────────────────────────────────────────────────────────────

/// A session member and when they joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub client_id: String,
    pub joined_at: u64,
}

/// State common to every session regardless of mode.
#[derive(Debug, Clone)]
pub struct SessionCore {
    code: String,
    mode: Mode,
    host_id: String,
    created_at: u64,
    updated_at: u64,
    min_streams: u64,
    song: Song,
    /// Join order; never more than [`MAX_PLAYERS`].
    members: Vec<Member>,
}

impl SessionCore {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Timestamp the idle TTL is measured from.
    pub fn last_activity(&self) -> u64 {
        self.updated_at.max(self.created_at)
    }

    #[must_use]
    pub fn is_member(&self, client_id: &str) -> bool {
        self.members.iter().any(|m| m.client_id == client_id)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_PLAYERS
    }

    /// The other member, if any.
    pub fn opponent_of(&self, client_id: &str) -> Option<&str> {
        self.members
            .iter()
            .map(|m| m.client_id.as_str())
            .find(|id| *id != client_id)
    }

    pub fn role_of(&self, client_id: &str) -> Role {
        if self.host_id == client_id {
            Role::Host
        } else {
            Role::Guest
        }
    }

    /// Fails with `Forbidden` unless `client_id` is a member.
    pub(crate) fn require_member(&self, client_id: &str) -> GameResult<()> {
        if self.is_member(client_id) {
            Ok(())
        } else {
            Err(GameError::Forbidden("Join session first".into()))
        }
    }

    /// Adds `client_id` as a member.
    ///
    /// Re-admitting an existing member is a no-op. Returns `true` if the
    /// client was newly added.
    pub(crate) fn admit(&mut self, client_id: &str, now: u64) -> GameResult<bool> {
        if self.is_member(client_id) {
            return Ok(false);
        }
        if self.is_full() {
            return Err(GameError::Conflict("Session is full".into()));
        }
        self.members.push(Member {
            client_id: client_id.to_string(),
            joined_at: now,
        });
        Ok(true)
    }

    pub(crate) fn touch(&mut self, now: u64) {
        self.updated_at = now;
    }

    /// Fields every projected view starts with.
    pub fn summary(&self, client_id: &str) -> SessionSummary {
        SessionSummary {
            code: self.code.clone(),
            role: self.role_of(client_id),
            player_count: self.members.len(),
            is_full: self.is_full(),
            min_streams: self.min_streams,
            song: self.song.clone(),
        }
    }
}

/// Mode-independent part of a projected session view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub code: String,
    pub role: Role,
    pub player_count: usize,
    pub is_full: bool,
    pub min_streams: u64,
    pub song: Song,
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only guess ledger with a first-writer-wins dedup index.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<GuessEvent>,
    /// Normalized word -> position in `entries`. Entries are never replaced.
    index: HashMap<String, usize>,
}

impl Ledger {
    /// Records a guess under its normalized `key`.
    ///
    /// If the key is already present, returns the first event recorded for it
    /// with `accepted: false` and leaves the ledger untouched.
    pub fn record(&mut self, key: String, word: &str, client_id: &str, now: u64) -> GuessOutcome {
        match self.index.entry(key) {
            Entry::Occupied(slot) => GuessOutcome {
                accepted: false,
                event: self.entries[*slot.get()].clone(),
            },
            Entry::Vacant(slot) => {
                let event = GuessEvent {
                    seq: self.entries.len() as u64 + 1,
                    word: word.to_string(),
                    client_id: client_id.to_string(),
                    created_at: now,
                };
                slot.insert(self.entries.len());
                self.entries.push(event.clone());
                GuessOutcome {
                    accepted: true,
                    event,
                }
            }
        }
    }

    pub fn entries(&self) -> &[GuessEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> Song {
        Song {
            artist: "X".into(),
            title: "Y Z".into(),
            lyrics: "...".into(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // NewSession Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn validate_rejects_blank_host() {
        let err = NewSession::validate("  ", 0, song()).unwrap_err();
        assert!(matches!(err, GameError::InvalidRequest(_)));
    }

    #[test]
    fn validate_rejects_each_blank_song_field() {
        for blank in 0..3 {
            let mut s = song();
            match blank {
                0 => s.artist = " ".into(),
                1 => s.title = String::new(),
                _ => s.lyrics = "\n".into(),
            }
            let err = NewSession::validate("A", 0, s).unwrap_err();
            assert_eq!(err, GameError::InvalidRequest("Incomplete song payload".into()));
        }
    }

    #[test]
    fn validate_clamps_negative_min_streams() {
        let core = NewSession::validate("A", -5, song())
            .unwrap()
            .into_core(Mode::Team, "ABC123".into(), 10);
        assert_eq!(core.summary("A").min_streams, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // SessionCore Tests
    // ─────────────────────────────────────────────────────────────────────────

    fn core() -> SessionCore {
        NewSession::validate(" A ", 3, song())
            .unwrap()
            .into_core(Mode::Versus, "ABC123".into(), 100)
    }

    #[test]
    fn host_is_seeded_as_sole_member() {
        let core = core();
        assert_eq!(core.host_id(), "A");
        assert_eq!(core.members().len(), 1);
        assert_eq!(core.members()[0].joined_at, 100);
        assert_eq!(core.role_of("A"), Role::Host);
        assert_eq!(core.role_of("B"), Role::Guest);
    }

    #[test]
    fn admit_is_idempotent_and_capped() {
        let mut core = core();
        assert!(core.admit("B", 200).unwrap());
        assert!(!core.admit("B", 300).unwrap());
        assert!(!core.admit("A", 300).unwrap());
        assert!(core.is_full());
        assert_eq!(
            core.admit("C", 300).unwrap_err(),
            GameError::Conflict("Session is full".into())
        );
        assert_eq!(core.members().len(), 2);
    }

    #[test]
    fn opponent_is_the_other_member() {
        let mut core = core();
        assert_eq!(core.opponent_of("A"), None);
        core.admit("B", 200).unwrap();
        assert_eq!(core.opponent_of("A"), Some("B"));
        assert_eq!(core.opponent_of("B"), Some("A"));
    }

    #[test]
    fn require_member_forbids_strangers() {
        let core = core();
        assert!(core.require_member("A").is_ok());
        assert!(matches!(
            core.require_member("Z"),
            Err(GameError::Forbidden(_))
        ));
    }

    #[test]
    fn summary_serializes_snake_case() {
        let json = serde_json::to_value(core().summary("B")).unwrap();
        assert_eq!(json["role"], "guest");
        assert_eq!(json["player_count"], 1);
        assert_eq!(json["is_full"], false);
        assert_eq!(json["min_streams"], 3);
        assert_eq!(json["song"]["title"], "Y Z");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn ledger_assigns_gap_free_sequence() {
        let mut ledger = Ledger::default();
        let a = ledger.record("un".into(), "un", "A", 1);
        let b = ledger.record("deux".into(), "deux", "B", 2);
        assert_eq!((a.event.seq, b.event.seq), (1, 2));
        assert!(a.accepted && b.accepted);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn ledger_returns_first_event_for_duplicate_key() {
        let mut ledger = Ledger::default();
        let first = ledger.record("bonjour".into(), "bonjour", "A", 1);
        let dup = ledger.record("bonjour".into(), "Bonjour", "B", 2);
        assert!(!dup.accepted);
        assert_eq!(dup.event, first.event);
        assert_eq!(ledger.len(), 1);

        // The next fresh word continues from seq 2.
        let next = ledger.record("salut".into(), "salut", "B", 3);
        assert_eq!(next.event.seq, 2);
    }
}
