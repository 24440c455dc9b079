//! Competitive (versus) sessions.
//!
//! Each player has a private ledger and dedup index, so both players may
//! guess the same word. The first correct title guess latches the winner;
//! from then on the session is finished and rejects word guesses.

use std::collections::HashMap;
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

/// A versus session record.
#[derive(Debug, Clone)]
pub struct VersusSession {
    core: SessionCore,
    /// Client id -> that player's private ledger.
    ledgers: HashMap<String, Ledger>,
    /// Set once by the first correct title guess, never cleared.
    winner: Option<String>,
}

impl SessionRecord for VersusSession {
    fn from_core(core: SessionCore) -> Self {
        Self {
            core,
            ledgers: HashMap::new(),
            winner: None,
        }
    }

    fn core(&self) -> &SessionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SessionCore {
        &mut self.core
    }
}

impl VersusSession {
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    fn guesses_of(&self, client_id: &str) -> Vec<GuessEvent> {
        self.ledgers
            .get(client_id)
            .map(|l| l.entries().to_vec())
            .unwrap_or_default()
    }

    /// Latches `client_id` as winner if nobody has won yet.
    ///
    /// Returns `true` if this call set the winner.
    fn try_claim_win(&mut self, client_id: &str) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.winner = Some(client_id.to_string());
        true
    }

    /// Projects the session as seen by `client_id`.
    pub fn view(&self, client_id: &str) -> VersusView {
        let opponent = self.core.opponent_of(client_id);
        let winner = self.winner.as_deref();
        VersusView {
            session: self.core.summary(client_id),
            guesses: self.guesses_of(client_id),
            opponent_guesses: opponent.map(|id| self.guesses_of(id)).unwrap_or_default(),
            winner: winner.unwrap_or_default().to_string(),
            finished: winner.is_some(),
            you_won: winner == Some(client_id),
            opponent_won: winner.is_some_and(|w| w != client_id),
        }
    }
}

/// Versus session state as returned to one client.
#[derive(Debug, Clone, Serialize)]
pub struct VersusView {
    #[serde(flatten)]
    pub session: SessionSummary,
    /// The requester's own ledger.
    pub guesses: Vec<GuessEvent>,
    /// The other member's ledger (empty until someone joins).
    pub opponent_guesses: Vec<GuessEvent>,
    /// Winner's client id, empty while the game is running.
    pub winner: String,
    pub finished: bool,
    pub you_won: bool,
    pub opponent_won: bool,
}

/// Registry and operations for versus sessions.
pub struct VersusSessions {
    registry: SessionRegistry<VersusSession>,
}

impl VersusSessions {
    /// Creates an empty versus registry. `ttl_secs <= 0` disables expiry.
    pub fn new(ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: SessionRegistry::new(Mode::Versus, ttl_secs, clock),
        }
    }

    /// Number of live versus sessions.
    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    /// Starts a session with `host_id` as its only member.
    pub fn create(&self, host_id: &str, min_streams: i64, song: Song) -> GameResult<VersusView> {
        let new = NewSession::validate(host_id, min_streams, song)?;
        let mut guard = self.registry.lock();
        let session = guard.create(new)?;
        Ok(session.view(session.core.host_id()))
    }

    /// Joins a session. Re-joining as an existing member is a no-op.
    pub fn join(&self, code: &str, client_id: &str) -> GameResult<VersusView> {
        let code = canonical_code(code)?;
        let client_id = require_field(client_id, "client_id")?;
        let mut guard = self.registry.lock();
        let session = guard.join(&code, client_id)?;
        Ok(session.view(client_id))
    }

    /// Returns the caller's view and refreshes the session's activity.
    pub fn state(&self, code: &str, client_id: &str) -> GameResult<VersusView> {
        let code = canonical_code(code)?;
        let client_id = require_field(client_id, "client_id")?;
        let mut guard = self.registry.lock();
        let now = guard.now();
        let session = guard.member_mut(&code, client_id)?;
        session.core.touch(now);
        Ok(session.view(client_id))
    }

    /// Records a word in the caller's private ledger.
    ///
    /// Dedup only considers the caller's own earlier guesses. Fails with
    /// `Conflict` once the session has a winner.
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
        if session.is_finished() {
            return Err(GameError::Conflict("Session is finished".into()));
        }
        let outcome = session
            .ledgers
            .entry(client_id.to_string())
            .or_default()
            .record(key, word, client_id, now);
        session.core.touch(now);
        Ok(outcome)
    }

    /// Checks a title guess; the first correct one wins the session.
    ///
    /// A later correct guess, even one racing the winner, is reported as
    /// correct but leaves the winner unchanged.
    pub fn title_guess(
        &self,
        code: &str,
        client_id: &str,
        title: &str,
    ) -> GameResult<TitleGuessOutcome<VersusView>> {
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
        if correct && session.try_claim_win(client_id) {
            log::info!("[Versus] {} won session {}", client_id, code);
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

    fn sessions() -> (Arc<ManualClock>, VersusSessions) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        (clock.clone(), VersusSessions::new(3600, clock))
    }

    fn pair(sessions: &VersusSessions) -> String {
        let code = sessions.create("A", 0, song()).unwrap().session.code;
        sessions.join(&code, "B").unwrap();
        code
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create / Join
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn create_starts_unfinished() {
        let (_, sessions) = sessions();
        let view = sessions.create("A", 0, song()).unwrap();
        assert_eq!(view.session.player_count, 1);
        assert!(view.winner.is_empty());
        assert!(!view.finished && !view.you_won && !view.opponent_won);
        assert!(view.opponent_guesses.is_empty());
    }

    #[test]
    fn join_is_capped_at_two() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        assert!(sessions.join(&code, "A").unwrap().session.is_full);
        assert!(matches!(
            sessions.join(&code, "C"),
            Err(GameError::Conflict(_))
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guesses
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn dedup_is_per_player() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);

        let a = sessions.guess(&code, "A", "bonjour").unwrap();
        let b = sessions.guess(&code, "B", "Bonjour").unwrap();
        assert!(a.accepted && b.accepted);
        assert_eq!((a.event.seq, b.event.seq), (1, 1));

        let dup = sessions.guess(&code, "A", "BONJOUR").unwrap();
        assert!(!dup.accepted);
        assert_eq!(dup.event, a.event);
    }

    #[test]
    fn view_splits_own_and_opponent_ledgers() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        sessions.guess(&code, "A", "un").unwrap();
        sessions.guess(&code, "A", "deux").unwrap();
        sessions.guess(&code, "B", "trois").unwrap();

        let a = sessions.state(&code, "A").unwrap();
        assert_eq!(a.guesses.len(), 2);
        assert_eq!(a.opponent_guesses.len(), 1);
        assert_eq!(a.opponent_guesses[0].word, "trois");

        let b = sessions.state(&code, "B").unwrap();
        assert_eq!(b.guesses.len(), 1);
        assert_eq!(b.opponent_guesses.len(), 2);
    }

    #[test]
    fn guess_rejects_non_member() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        assert!(matches!(
            sessions.guess(&code, "C", "mot"),
            Err(GameError::Forbidden(_))
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Winner Latch
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn first_correct_title_wins_and_finishes() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);

        let miss = sessions.title_guess(&code, "B", "Y").unwrap();
        assert!(!miss.correct && !miss.state.finished);

        let win = sessions.title_guess(&code, "A", "Y Z (feat. Q)").unwrap();
        assert!(win.correct);
        assert_eq!(win.title.as_deref(), Some("Y Z"));
        assert!(win.state.finished && win.state.you_won && !win.state.opponent_won);
        assert_eq!(win.state.winner, "A");

        let late = sessions.title_guess(&code, "B", "y z").unwrap();
        assert!(late.correct);
        assert_eq!(late.state.winner, "A");
        assert!(late.state.finished && late.state.opponent_won && !late.state.you_won);
    }

    #[test]
    fn finished_session_rejects_guesses() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        sessions.title_guess(&code, "B", "Y Z").unwrap();
        for who in ["A", "B"] {
            assert_eq!(
                sessions.guess(&code, who, "encore").unwrap_err(),
                GameError::Conflict("Session is finished".into())
            );
        }
        assert!(sessions.state(&code, "A").unwrap().guesses.is_empty());
    }

    #[test]
    fn concurrent_correct_titles_latch_one_winner() {
        for _ in 0..50 {
            let (_, sessions) = sessions();
            let code = pair(&sessions);

            std::thread::scope(|s| {
                for who in ["A", "B"] {
                    let sessions = &sessions;
                    let code = &code;
                    s.spawn(move || {
                        assert!(sessions.title_guess(code, who, "Y Z").unwrap().correct);
                    });
                }
            });

            let a = sessions.state(&code, "A").unwrap();
            let b = sessions.state(&code, "B").unwrap();
            assert!(a.finished && b.finished);
            assert_eq!(a.winner, b.winner);
            assert!(a.you_won ^ b.you_won);
            assert_eq!(a.opponent_won, b.you_won);
            assert_eq!(b.opponent_won, a.you_won);
        }
    }

    #[test]
    fn view_serializes_winner_as_empty_string() {
        let (_, sessions) = sessions();
        let code = pair(&sessions);
        let json = serde_json::to_value(sessions.state(&code, "B").unwrap()).unwrap();
        assert_eq!(json["winner"], "");
        assert_eq!(json["finished"], false);
        assert_eq!(json["role"], "guest");
        assert!(json["opponent_guesses"].as_array().unwrap().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expiry
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn idle_session_expires_and_guesses_keep_it_alive() {
        let (clock, sessions) = sessions();
        let idle = pair(&sessions);
        let active = pair(&sessions);
        sessions.guess(&active, "A", "bonjour").unwrap();

        clock.advance(3_599_000);
        assert!(!sessions.guess(&active, "A", "Bonjour").unwrap().accepted);
        clock.advance(3_599_000);

        assert!(matches!(
            sessions.state(&idle, "A"),
            Err(GameError::SessionNotFound(_))
        ));
        assert_eq!(sessions.state(&active, "B").unwrap().opponent_guesses.len(), 1);
        assert_eq!(sessions.active_sessions(), 1);

        clock.advance(3_600_001);
        assert!(matches!(
            sessions.guess(&active, "B", "salut"),
            Err(GameError::SessionNotFound(_))
        ));
    }
}
