//! Lock-guarded session registry with lazy idle expiry.
//!
//! One registry exists per mode. Every engine operation runs inside a single
//! critical section obtained from [`SessionRegistry::lock`], which evicts
//! idle sessions before handing out the map. There is no background timer.
//!
//! Operations are serialized in lock-acquisition order. Sequence numbers and
//! dedup winners follow that order, which is not necessarily the order in
//! which requests were sent.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rand::Rng;

use super::session::{Mode, NewSession, SessionCore};
use crate::clock::Clock;
use crate::error::{GameError, GameResult};
use crate::protocol_constants::{SESSION_CODE_ALPHABET, SESSION_CODE_ATTEMPTS, SESSION_CODE_LENGTH};

/// A mode-specific session record stored in a registry.
pub trait SessionRecord: Send {
    /// Builds the mode's initial state around a freshly created core.
    fn from_core(core: SessionCore) -> Self;

    fn core(&self) -> &SessionCore;

    fn core_mut(&mut self) -> &mut SessionCore;
}

/// Owned mapping from session code to session record.
pub struct SessionRegistry<S> {
    mode: Mode,
    sessions: Mutex<HashMap<String, S>>,
    /// Idle TTL in milliseconds; `None` disables eviction.
    ttl_ms: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl<S: SessionRecord> SessionRegistry<S> {
    /// Creates an empty registry. A `ttl_secs` of zero or less disables expiry.
    pub fn new(mode: Mode, ttl_secs: i64, clock: Arc<dyn Clock>) -> Self {
        let ttl_ms = (ttl_secs > 0).then(|| (ttl_secs as u64).saturating_mul(1000));
        Self {
            mode,
            sessions: Mutex::new(HashMap::new()),
            ttl_ms,
            clock,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Enters the registry's critical section.
    ///
    /// Expired sessions are evicted before the guard is returned, so callers
    /// never observe a session past its TTL.
    pub fn lock(&self) -> RegistryGuard<'_, S> {
        let mut sessions = self.sessions.lock();
        let now = self.clock.now_millis();
        let evicted = evict_expired(&mut sessions, now, self.ttl_ms);
        if evicted > 0 {
            log::debug!("[Registry] {} evicted {} idle session(s)", self.mode, evicted);
        }
        RegistryGuard {
            mode: self.mode,
            sessions,
            now,
        }
    }

    /// Number of live sessions (after eviction).
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to a registry's sessions for the duration of one operation.
pub struct RegistryGuard<'a, S> {
    mode: Mode,
    sessions: MutexGuard<'a, HashMap<String, S>>,
    now: u64,
}

impl<S: SessionRecord> RegistryGuard<'_, S> {
    /// Time the critical section was entered (Unix milliseconds).
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Allocates a fresh code and stores a new session under it.
    pub fn create(&mut self, new: NewSession) -> GameResult<&mut S> {
        let mut rng = rand::rng();
        let code = generate_code(&self.sessions, || random_code(&mut rng)).ok_or_else(|| {
            log::error!(
                "[Registry] {} code space exhausted after {} attempts ({} live sessions)",
                self.mode,
                SESSION_CODE_ATTEMPTS,
                self.sessions.len()
            );
            GameError::Internal("Unable to generate unique session code".into())
        })?;
        log::info!(
            "[{}] Session {} created by {}",
            self.mode,
            code,
            new.host_id()
        );
        let session = S::from_core(new.into_core(self.mode, code.clone(), self.now));
        Ok(self.sessions.entry(code).or_insert(session))
    }

    /// Looks up a session by canonical code.
    pub fn get_mut(&mut self, code: &str) -> GameResult<&mut S> {
        self.sessions
            .get_mut(code)
            .ok_or_else(|| GameError::SessionNotFound(code.to_string()))
    }

    /// Looks up a session and checks that `client_id` belongs to it.
    pub fn member_mut(&mut self, code: &str, client_id: &str) -> GameResult<&mut S> {
        let session = self.get_mut(code)?;
        session.core().require_member(client_id)?;
        Ok(session)
    }

    /// Adds `client_id` to a session (idempotent) and refreshes its activity.
    pub fn join(&mut self, code: &str, client_id: &str) -> GameResult<&mut S> {
        let now = self.now;
        let mode = self.mode;
        let session = self.get_mut(code)?;
        if session.core_mut().admit(client_id, now)? {
            log::info!("[{}] {} joined session {}", mode, client_id, code);
        }
        session.core_mut().touch(now);
        Ok(session)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expiry and Code Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Removes every session idle for longer than `ttl_ms`.
///
/// Returns the number of sessions removed. No-op when `ttl_ms` is `None`.
pub fn evict_expired<S: SessionRecord>(
    sessions: &mut HashMap<String, S>,
    now: u64,
    ttl_ms: Option<u64>,
) -> usize {
    let Some(ttl_ms) = ttl_ms else {
        return 0;
    };
    let before = sessions.len();
    sessions.retain(|_, s| now.saturating_sub(s.core().last_activity()) <= ttl_ms);
    before - sessions.len()
}

/// Draws candidate codes until one is not in use.
///
/// Gives up after [`SESSION_CODE_ATTEMPTS`] collisions.
pub fn generate_code<S>(
    sessions: &HashMap<String, S>,
    mut draw: impl FnMut() -> String,
) -> Option<String> {
    (0..SESSION_CODE_ATTEMPTS)
        .map(|_| draw())
        .find(|code| !sessions.contains_key(code))
}

/// A random code of [`SESSION_CODE_LENGTH`] characters from A–Z and 0–9.
pub fn random_code<R: Rng>(rng: &mut R) -> String {
    (0..SESSION_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..SESSION_CODE_ALPHABET.len());
            SESSION_CODE_ALPHABET[idx] as char
        })
        .collect()
}
