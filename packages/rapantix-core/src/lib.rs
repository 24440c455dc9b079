//! Rapantix Core - shared library for the Rapantix guessing game server.
//!
//! Players guess the title of a song from its lyrics by submitting words,
//! each scored by semantic closeness. Two players can cooperate (team mode)
//! or compete (versus mode) inside a shared session addressed by a short
//! code.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`normalize`]: Canonical forms for guesses, lookup tokens and titles
//! - [`services`]: Session registries and the team/versus engines
//! - [`similarity`]: Word similarity oracle seam and its precomputed table
//! - [`api`]: Thin HTTP handlers over the services
//! - [`clock`]: Injectable time source for expiry
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Concurrency
//!
//! Each mode has one registry guarded by one mutex. Every session operation
//! runs entirely inside that critical section, evicting idle sessions first.
//! Guess sequence numbers and dedup winners follow lock-acquisition order.
//! Clients observe each other's progress by polling session state.

#![warn(clippy::all)]

pub mod api;
pub mod clock;
pub mod error;
pub mod normalize;
pub mod protocol_constants;
pub mod services;
pub mod similarity;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GameError, GameResult};
pub use normalize::{normalize_guess, normalize_title, normalize_word, titles_match};
pub use state::Config;
pub use utils::now_millis;

// Re-export session types
pub use services::{
    GuessEvent, GuessOutcome, Mode, Role, SessionEngine, Song, TeamSessions, TeamView,
    TitleGuessOutcome, VersusSessions, VersusView,
};

// Re-export similarity types
pub use similarity::{NeighborTable, NeighborTableError, SimilarTerm, SimilarityOracle};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
