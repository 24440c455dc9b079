//! Multiplayer session engine.
//!
//! This module contains the session services that the API layer delegates
//! to. Each mode owns one [`SessionRegistry`]; every operation runs inside
//! that registry's lock and never performs I/O while holding it.

pub mod engine;
pub mod registry;
pub mod session;
pub mod team;
pub mod versus;

pub use engine::SessionEngine;
pub use registry::{evict_expired, generate_code, random_code, SessionRecord, SessionRegistry};
pub use session::{
    GuessEvent, GuessOutcome, Ledger, Member, Mode, NewSession, Role, SessionCore, SessionSummary,
    Song, TitleGuessOutcome,
};
pub use team::{TeamSession, TeamSessions, TeamView};
pub use versus::{VersusSession, VersusSessions, VersusView};
