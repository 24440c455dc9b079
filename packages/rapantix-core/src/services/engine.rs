//! Mode-agnostic session operations.
//!
//! The API layer mounts the same routes for every mode; [`SessionEngine`]
//! is the seam that lets it stay generic over team and versus sessions.

use serde::Serialize;

use super::session::{GuessOutcome, Song, TitleGuessOutcome};
use super::team::{TeamSessions, TeamView};
use super::versus::{VersusSessions, VersusView};
use crate::error::GameResult;

/// Operations every session mode supports.
pub trait SessionEngine: Send + Sync + 'static {
    /// Per-client projection of a session.
    type View: Serialize + Send + 'static;

    fn create(&self, host_id: &str, min_streams: i64, song: Song) -> GameResult<Self::View>;

    fn join(&self, code: &str, client_id: &str) -> GameResult<Self::View>;

    fn state(&self, code: &str, client_id: &str) -> GameResult<Self::View>;

    fn guess(&self, code: &str, client_id: &str, word: &str) -> GameResult<GuessOutcome>;

    fn title_guess(
        &self,
        code: &str,
        client_id: &str,
        title: &str,
    ) -> GameResult<TitleGuessOutcome<Self::View>>;

    fn active_sessions(&self) -> usize;
}

impl SessionEngine for TeamSessions {
    type View = TeamView;

    fn create(&self, host_id: &str, min_streams: i64, song: Song) -> GameResult<TeamView> {
        TeamSessions::create(self, host_id, min_streams, song)
    }

    fn join(&self, code: &str, client_id: &str) -> GameResult<TeamView> {
        TeamSessions::join(self, code, client_id)
    }

    fn state(&self, code: &str, client_id: &str) -> GameResult<TeamView> {
        TeamSessions::state(self, code, client_id)
    }

    fn guess(&self, code: &str, client_id: &str, word: &str) -> GameResult<GuessOutcome> {
        TeamSessions::guess(self, code, client_id, word)
    }

    fn title_guess(
        &self,
        code: &str,
        client_id: &str,
        title: &str,
    ) -> GameResult<TitleGuessOutcome<TeamView>> {
        TeamSessions::title_guess(self, code, client_id, title)
    }

    fn active_sessions(&self) -> usize {
        TeamSessions::active_sessions(self)
    }
}

impl SessionEngine for VersusSessions {
    type View = VersusView;

    fn create(&self, host_id: &str, min_streams: i64, song: Song) -> GameResult<VersusView> {
        VersusSessions::create(self, host_id, min_streams, song)
    }

    fn join(&self, code: &str, client_id: &str) -> GameResult<VersusView> {
        VersusSessions::join(self, code, client_id)
    }

    fn state(&self, code: &str, client_id: &str) -> GameResult<VersusView> {
        VersusSessions::state(self, code, client_id)
    }

    fn guess(&self, code: &str, client_id: &str, word: &str) -> GameResult<GuessOutcome> {
        VersusSessions::guess(self, code, client_id, word)
    }

    fn title_guess(
        &self,
        code: &str,
        client_id: &str,
        title: &str,
    ) -> GameResult<TitleGuessOutcome<VersusView>> {
        VersusSessions::title_guess(self, code, client_id, title)
    }

    fn active_sessions(&self) -> usize {
        VersusSessions::active_sessions(self)
    }
}
