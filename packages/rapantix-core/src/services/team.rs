//! Cooperative (team) sessions.
//!
//! Both members share one guess ledger, so a word found by either player is
//! visible to both and is never recorded twice. Finding the title is not
//! terminal: the session keeps accepting guesses until it expires.

use std::sync::Arc;

use serde::Serialize;

use super::registry::{SessionRecord, SessionRegistry};
use super::session::{
    GuessEvent, GuessOutcome, Ledger, Mode, NewSession, SessionCore, SessionSummary, Song,
    TitleGuessOutcome,
};
use crate::clock::Clock;
use crate::error::{GameError, GameResult};
use crate::normalize::{normalize_guess, titles_match};
use crate::utils::{canonical_code, require_field};

/// A team session record.
#[derive(Debug, Clone)]
pub struct TeamSession {
    core: SessionCore,
    ledger: Ledger,
    /// Members who guessed the title, in the order they found it.
    title_finders: Vec<String>,
}

impl SessionRecord for TeamSession {
    fn from_core(core: SessionCore) -> Self {
        Self {
            core,
            ledger: Ledger::default(),
            title_finders: Vec::new(),
        }
    }

    fn core(&self) -> &SessionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SessionCore {
        &mut self.core
    }
}

impl TeamSession {
    /// Projects the session as seen by `client_id`.
    pub fn view(&self, client_id: &str) -> TeamView {
        let you_found_title = self.title_finders.iter().any(|id| id == client_id);
        TeamView {
            session: self.core.summary(client_id),
            guesses: self.ledger.entries().to_vec(),
            title_found: !self.title_finders.is_empty(),
            title_found_count: self.title_finders.len(),
            you_found_title,
            partner_found_title: self.title_finders.iter().any(|id| id != client_id),
        }
    }
}

/// Team session state as returned to one client.
#[derive(Debug, Clone, Serialize)]
pub struct TeamView {
    #[serde(flatten)]
    pub session: SessionSummary,
    /// The shared ledger, in sequence order.
    pub guesses: Vec<GuessEvent>,
    pub title_found: bool,
    pub title_found_count: usize,
    pub you_found_title: bool,
    pub partner_found_title: bool,
}

/// Registry and operations for team sessions.
pub struct TeamSessions {
    registry: SessionRegistry<TeamSession>,
}

impl TeamSessions {
    /// Creates an empty team registry. `ttl_secs <= 0` disables expiry.
    pub fn new(ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: SessionRegistry::new(Mode::Team, ttl_secs, clock),
        }
    }

    /// Number of live team sessions.
    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    /// Starts a session with `host_id` as its only member.
    pub fn create(&self, host_id: &str, min_streams: i64, song: Song) -> GameResult<TeamView> {
        let new = NewSession::validate(host_id, min_streams, song)?;
        let mut guard = self.registry.lock();
        let session = guard.create(new)?;
        Ok(session.view(session.core.host_id()))
    }

    /// Joins a session. Re-joining as an existing member is a no-op.
    pub fn join(&self, code: &str, client_id: &str) -> GameResult<TeamView> {
        let code = canonical_code(code)?;
        let client_id = require_field(client_id, "client_id")?;
        let mut guard = self.registry.lock();
        let session = guard.join(&code, client_id)?;
        Ok(session.view(client_id))
    }

    /// Returns the caller's view and refreshes the session's activity.
    pub fn state(&self, code: &str, client_id: &str) -> GameResult<TeamView> {
        let code = canonical_code(code)?;
        let client_id = require_field(client_id, "client_id")?;
        let mut guard = self.registry.lock();
        let now = guard.now();
        let session = guard.member_mut(&code, client_id)?;
        session.core.touch(now);
        Ok(session.view(client_id))
    }

    /// Records a word in the shared ledger.
    ///
    /// A word whose normalized form was already guessed by either member
    /// yields the original event with `accepted: false`.
    pub fn guess(&self, code: &str, client_id: &str, word: &str) -> GameResult<GuessOutcome> {
        let code = canonical_code(code)?;
        let client_id = require_field(client_id, "client_id")?;
        let word = require_field(word, "word")?;
        let key = normalize_guess(word);
        if key.is_empty() {
            return Err(GameError::InvalidRequest("Invalid word".into()));
        }

        let mut guard = self.registry.lock();
        let now = guard.now();
        let session = guard.member_mut(&code, client_id)?;
        let outcome = session.ledger.record(key, word, client_id, now);
        session.core.touch(now);
        if outcome.accepted {
            log::debug!(
                "[Team] {} recorded guess #{} in {}",
                client_id,
                outcome.event.seq,
                code
            );
        }
        Ok(outcome)
    }

    /// Checks a title guess; a correct one marks the caller as a finder.
    pub fn title_guess(
        &self,
        code: &str,
        client_id: &str,
        title: &str,
    ) -> GameResult<TitleGuessOutcome<TeamView>> {
        let code = canonical_code(code)?;
        let client_id = require_field(client_id, "client_id")?;
        let title = require_field(title, "title")?;

        let mut guard = self.registry.lock();
        let now = guard.now();
        let session = guard.member_mut(&code, client_id)?;
        let stored = session.core.song().title.clone();
        if stored.trim().is_empty() {
            return Err(GameError::Internal(format!("Session {code} has no title")));
        }

        let correct = titles_match(title, &stored);
        if correct && !session.title_finders.iter().any(|id| id == client_id) {
            session.title_finders.push(client_id.to_string());
            log::info!("[Team] {} found the title in {}", client_id, code);
        }
        session.core.touch(now);
        Ok(TitleGuessOutcome {
            correct,
            title: correct.then_some(stored),
            state: session.view(client_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn song() -> Song {
        Song {
            artist: "X".into(),
            title: "Y Z".into(),
            lyrics: "...".into(),
        }
    }

    fn sessions() -> (Arc<ManualClock>, TeamSessions) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        (clock.clone(), TeamSessions::new(3600, clock))
    }

    fn pair(sessions: &TeamSessions) -> String {
        let code = sessions.create("A", 0, song()).unwrap().session.code;
        sessions.join(&code, "B").unwrap();
        code
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create / Join
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn create_returns_host_view() {
        let (_, sessions) = sessions();
        let view = sessions.create("A", 1_000_000, song()).unwrap();
        assert_eq!(view.session.code.len(), 6);
        assert_eq!(view.session.role, crate::services::Role::Host);
        assert_eq!(view.session.player_count, 1);
        assert!(!view.session.is_full);
        assert_eq!(view.session.min_streams, 1_000_000);
        assert!(view.guesses.is_empty());
        assert!(!view.title_found);
    }

    #[test]
    fn create_validates_payload() {
        let (_, sessions) = sessions();
        let mut bad = song();
        bad.lyrics = "  ".into();
        assert!(matches!(
            sessions.create("A", 0, bad),
            Err(GameError::InvalidRequest(_))
        ));
        assert!(matches!(
            sessions.create("", 0, song()),
            Err(GameError::InvalidRequest(_))
        ));
        assert_eq!(sessions.active_sessions(), 0);
    }

    #[test]
    fn join_fills_session_and_rejects_third_player() {
        let (_, sessions) = sessions();
        let code = sessions.create("A", 0, song()).unwrap().session.code;
        let view = sessions.join(&code.to_lowercase(), " B ").unwrap();
        assert_eq!(view.session.player_count, 2);
        assert!(view.session.is_full);
        assert_eq!(view.session.role, crate::services::Role::Guest);

        // Re-join is idempotent.
        assert_eq!(sessions.join(&code, "B").unwrap().session.player_count, 2);
        assert!(matches!(
            sessions.join(&code, "C"),
            Err(GameError::Conflict(_))
        ));
    }

    #[test]
    fn join_unknown_code_is_not_found() {
        let (_, sessions) = sessions();
        assert!(matches!(
            sessions.join("ZZZZZZ", "B"),
            Err(GameError::SessionNotFound(_))
        ));
    }

    #[test]
    fn state_requires_membership() {
        let (_, sessions) = sessions();
        let code = sessions.create("A", 0, song()).unwrap().session.code;
        assert!(matches!(
            sessions.state(&code, "B"),
            Err(GameError::Forbidden(_))
        ));
        assert_eq!(sessions.state(&code, "A").unwrap().session.code, code);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guesses
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn duplicate_guess_returns_first_event() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);

        let first = sessions.guess(&code, "A", "bonjour").unwrap();
        assert!(first.accepted);
        assert_eq!(first.event.seq, 1);

        let dup = sessions.guess(&code, "B", "Bonjour").unwrap();
        assert!(!dup.accepted);
        assert_eq!(dup.event, first.event);

        let again = sessions.guess(&code, "A", " BONJOUR! ").unwrap();
        assert!(!again.accepted);
        assert_eq!(again.event, first.event);

        let view = sessions.state(&code, "B").unwrap();
        assert_eq!(view.guesses.len(), 1);
        assert_eq!(view.guesses[0].client_id, "A");
    }

    #[test]
    fn guesses_share_one_sequence() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        let seqs: Vec<u64> = [("A", "un"), ("B", "deux"), ("A", "trois")]
            .iter()
            .map(|(who, w)| sessions.guess(&code, who, w).unwrap().event.seq)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn guess_rejects_non_member_and_empty_word() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        assert!(matches!(
            sessions.guess(&code, "C", "mot"),
            Err(GameError::Forbidden(_))
        ));
        assert_eq!(
            sessions.guess(&code, "A", "?!").unwrap_err(),
            GameError::InvalidRequest("Invalid word".into())
        );
        assert_eq!(
            sessions.guess(&code, "A", "   ").unwrap_err(),
            GameError::InvalidRequest("Missing word".into())
        );
    }

    #[test]
    fn concurrent_identical_guesses_record_once() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);

        let outcomes: Vec<GuessOutcome> = std::thread::scope(|s| {
            let handles: Vec<_> = ["A", "B", "A", "B"]
                .into_iter()
                .map(|who| {
                    let sessions = &sessions;
                    let code = &code;
                    s.spawn(move || sessions.guess(code, who, "Évidemment").unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|o| o.accepted).count(), 1);
        let event = &outcomes[0].event;
        assert!(outcomes.iter().all(|o| &o.event == event));
        assert_eq!(event.seq, 1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Title Guesses
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn wrong_title_hides_stored_title() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        let outcome = sessions.title_guess(&code, "A", "Y").unwrap();
        assert!(!outcome.correct);
        assert!(outcome.title.is_none());
        assert!(!outcome.state.title_found);
    }

    #[test]
    fn title_found_is_tracked_per_member() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);

        let outcome = sessions.title_guess(&code, "A", "y z (feat. Q)").unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.title.as_deref(), Some("Y Z"));
        assert!(outcome.state.you_found_title);
        assert!(!outcome.state.partner_found_title);
        assert_eq!(outcome.state.title_found_count, 1);

        // Repeat is idempotent.
        let again = sessions.title_guess(&code, "A", "Y Z").unwrap();
        assert_eq!(again.state.title_found_count, 1);

        let partner = sessions.state(&code, "B").unwrap();
        assert!(partner.title_found);
        assert!(!partner.you_found_title);
        assert!(partner.partner_found_title);

        let both = sessions.title_guess(&code, "B", "y-z").unwrap();
        assert_eq!(both.state.title_found_count, 2);
        assert!(both.state.you_found_title && both.state.partner_found_title);
    }

    #[test]
    fn guessing_continues_after_title_found() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        sessions.title_guess(&code, "A", "Y Z").unwrap();
        assert!(sessions.guess(&code, "B", "encore").unwrap().accepted);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expiry
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn idle_session_expires_and_polling_keeps_it_alive() {
        let (clock, sessions) = sessions();
        let idle = sessions.create("A", 0, song()).unwrap().session.code;
        let polled = sessions.create("A", 0, song()).unwrap().session.code;

        clock.advance(3_599_000);
        sessions.state(&polled, "A").unwrap();
        clock.advance(2_000);

        assert!(matches!(
            sessions.state(&idle, "A"),
            Err(GameError::SessionNotFound(_))
        ));
        assert!(sessions.state(&polled, "A").is_ok());
        assert_eq!(sessions.active_sessions(), 1);
    }

    #[test]
    fn guesses_keep_session_alive_even_when_deduplicated() {
        let (clock, sessions) = sessions();
        let code = pair(&sessions);
        sessions.guess(&code, "A", "bonjour").unwrap();

        clock.advance(3_599_000);
        assert!(!sessions.guess(&code, "B", "Bonjour").unwrap().accepted);
        clock.advance(3_599_000);
        assert!(sessions.guess(&code, "A", "salut").unwrap().accepted);

        clock.advance(3_600_001);
        assert!(matches!(
            sessions.guess(&code, "A", "trop tard"),
            Err(GameError::SessionNotFound(_))
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // End-to-end
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn full_round() {
        let (_, sessions) = sessions();
        let code = sessions.create("A", 0, song()).unwrap().session.code;
        assert_eq!(sessions.join(&code, "B").unwrap().session.player_count, 2);

        let a = sessions.guess(&code, "A", "bonjour").unwrap();
        assert!(a.accepted);
        assert_eq!(a.event.seq, 1);

        let b = sessions.guess(&code, "B", "Bonjour").unwrap();
        assert!(!b.accepted);
        assert_eq!(b.event.seq, 1);

        assert!(sessions.title_guess(&code, "A", "y z (feat. Q)").unwrap().correct);
    }

    #[test]
    fn view_serializes_flat() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        sessions.guess(&code, "A", "bonjour").unwrap();
        let outcome = sessions.title_guess(&code, "B", "Y Z").unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["correct"], true);
        assert_eq!(json["title"], "Y Z");
        assert_eq!(json["code"], code.as_str());
        assert_eq!(json["role"], "guest");
        assert_eq!(json["guesses"][0]["word"], "bonjour");
        assert_eq!(json["guesses"][0]["client_id"], "A");
        assert_eq!(json["partner_found_title"], false);
    }
}
