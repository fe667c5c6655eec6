//! Request tokens waiting for their user to come back.
//!
//! A web front-end starts the handshake in one HTTP exchange and finishes it
//! in another, after the provider redirected the user to the callback. The
//! request secret has to survive in between, keyed by the session the front
//! end issued to that user.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::TokenPair;

/// Server-issued identifier of one pending handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        SessionId::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

#[derive(Debug)]
struct Pending {
    request_token: TokenPair,
    inserted_at: Instant,
}

/// Request tokens keyed by session, shareable between request handlers.
///
/// Handshakes the user never finishes stay until [`PendingTokens::discard`]
/// or [`PendingTokens::purge_older_than`] drops them.
#[derive(Debug, Default)]
pub struct PendingTokens {
    pending: Mutex<HashMap<SessionId, Pending>>,
}

impl PendingTokens {
    pub fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Pending>> {
        // the map stays consistent even if a holder panicked
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `request_token` under a fresh session id.
    pub fn insert(&self, request_token: TokenPair) -> SessionId {
        let session = SessionId::new();
        let pending = Pending {
            request_token,
            inserted_at: Instant::now(),
        };
        self.lock().insert(session, pending);
        session
    }

    /// Removes and returns the pair of `session` if its token is `oauth_token`.
    ///
    /// A mismatching token leaves the entry in place.
    pub fn take(&self, session: &SessionId, oauth_token: &str) -> Option<TokenPair> {
        let mut pending = self.lock();
        let token_matches = pending
            .get(session)
            .map(|entry| entry.request_token.token == oauth_token);
        match token_matches {
            Some(true) => pending.remove(session).map(|entry| entry.request_token),
            Some(false) => {
                warn!(%session, "callback token does not match the pending request token");
                None
            }
            None => None,
        }
    }

    /// Drops the pending pair of `session`, e.g. when the user denied access.
    pub fn discard(&self, session: &SessionId) -> bool {
        self.lock().remove(session).is_some()
    }

    /// Drops every pair inserted more than `max_age` ago and returns how many
    /// were dropped.
    pub fn purge_older_than(&self, max_age: Duration) -> usize {
        let mut pending = self.lock();
        let before = pending.len();
        pending.retain(|_, entry| entry.inserted_at.elapsed() < max_age);
        let purged = before - pending.len();
        if purged > 0 {
            debug!(purged, "dropped abandoned handshakes");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
