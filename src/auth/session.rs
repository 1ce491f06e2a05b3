//! Server-side session store
//!
//! Sessions live in process memory, keyed by an opaque random identifier
//! that is the only thing the cookie carries. The same store also tracks
//! the short-lived state nonces of in-flight login attempts.
//!
//! A single `RwLock` covers sessions, the per-identity index, and the
//! pending nonces, so "invalidate the old session, install the new one"
//! happens atomically with respect to concurrent requests.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::RwLock;

use crate::config::SessionConfig;
use crate::error::AppError;

use super::provider::{Principal, Provider};

/// An authenticated session
///
/// Owns its `Principal` exclusively; the principal is dropped with the
/// session on logout or expiry.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque identifier, also the `SESSION_ID` cookie value
    pub id: String,
    pub principal: Principal,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// A pending login attempt awaiting its provider callback
#[derive(Debug, Clone)]
struct PendingState {
    provider: Provider,
    /// Correlation id carried by the initiating browser's cookie
    login_id: String,
    issued_at: DateTime<Utc>,
}

/// A freshly issued login attempt
///
/// The state nonce travels through the provider round-trip; the login id
/// only ever lives in the initiating browser's cookie. The callback must
/// present both, which ties the flow to the browser that started it.
#[derive(Debug, Clone)]
pub struct IssuedLogin {
    pub state: String,
    pub login_id: String,
}

#[derive(Default)]
struct StoreInner {
    /// session id -> session
    sessions: HashMap<String, Session>,
    /// identity key (provider:id) -> session id
    by_identity: HashMap<String, String>,
    /// state nonce -> pending login
    pending_states: HashMap<String, PendingState>,
}

/// Thread-safe session and login-state store
pub struct SessionStore {
    inner: RwLock<StoreInner>,
    max_age: Duration,
    idle_timeout: Duration,
    state_ttl: Duration,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_durations(
            Duration::seconds(config.max_age),
            Duration::seconds(config.idle_timeout),
            Duration::seconds(config.state_ttl),
        )
    }

    pub fn with_durations(max_age: Duration, idle_timeout: Duration, state_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            max_age,
            idle_timeout,
            state_ttl,
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Create a session for a freshly authenticated principal
    ///
    /// Enforces the single-session-per-identity invariant: any prior
    /// session for the same provider identity is removed under the same
    /// write lock before the new one is installed.
    pub async fn create(&self, principal: Principal) -> Session {
        let now = Utc::now();
        let session = Session {
            id: random_token(48),
            principal,
            created_at: now,
            last_seen_at: now,
        };

        let identity = session.principal.identity();
        let mut inner = self.inner.write().await;
        if let Some(previous_id) = inner.by_identity.insert(identity.clone(), session.id.clone()) {
            inner.sessions.remove(&previous_id);
            tracing::debug!(identity = %identity, "evicted previous session for identity");
        }
        inner.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a session by id, enforcing idle and absolute timeouts
    ///
    /// A stale session is removed and reported as `SessionExpired`;
    /// an unknown id is `NotAuthenticated`. A live session has its
    /// `last_seen_at` refreshed.
    pub async fn get(&self, session_id: &str) -> Result<Session, AppError> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        match inner.sessions.get_mut(session_id) {
            None => return Err(AppError::NotAuthenticated),
            Some(session) => {
                let stale = now - session.created_at > self.max_age
                    || now - session.last_seen_at > self.idle_timeout;
                if !stale {
                    session.last_seen_at = now;
                    return Ok(session.clone());
                }
            }
        }

        if let Some(session) = inner.sessions.remove(session_id) {
            inner.by_identity.remove(&session.principal.identity());
        }
        Err(AppError::SessionExpired)
    }

    /// Invalidate a session (logout)
    ///
    /// # Returns
    /// The removed session, if one existed.
    pub async fn invalidate(&self, session_id: &str) -> Option<Session> {
        let mut inner = self.inner.write().await;
        let session = inner.sessions.remove(session_id)?;
        inner.by_identity.remove(&session.principal.identity());
        Some(session)
    }

    // =========================================================================
    // Pending login state nonces
    // =========================================================================

    /// Issue a state nonce and correlation id for a new login attempt
    pub async fn issue_state(&self, provider: Provider) -> IssuedLogin {
        let issued = IssuedLogin {
            state: random_token(32),
            login_id: random_token(32),
        };
        let mut inner = self.inner.write().await;
        inner.pending_states.insert(
            issued.state.clone(),
            PendingState {
                provider,
                login_id: issued.login_id.clone(),
                issued_at: Utc::now(),
            },
        );
        issued
    }

    /// Consume a state nonce on the callback path
    ///
    /// Single use: the nonce is removed before validation so a replayed
    /// state can never succeed. Absent, expired, wrong-provider, or
    /// wrong-browser states (the `login_id` must match the correlation
    /// cookie set when the flow began) all fail closed as `StateMismatch`.
    pub async fn consume_state(
        &self,
        state: &str,
        provider: Provider,
        login_id: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let pending = inner
            .pending_states
            .remove(state)
            .ok_or(AppError::StateMismatch)?;

        if pending.provider != provider || pending.login_id != login_id {
            return Err(AppError::StateMismatch);
        }
        if Utc::now() - pending.issued_at > self.state_ttl {
            return Err(AppError::StateMismatch);
        }
        Ok(())
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// Drop expired sessions and stale pending states
    ///
    /// Called periodically from a background task.
    pub async fn prune_expired(&self) {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        let stale_ids: Vec<String> = inner
            .sessions
            .values()
            .filter(|s| {
                now - s.created_at > self.max_age || now - s.last_seen_at > self.idle_timeout
            })
            .map(|s| s.id.clone())
            .collect();

        let removed_sessions = stale_ids.len();
        for id in stale_ids {
            if let Some(session) = inner.sessions.remove(&id) {
                inner.by_identity.remove(&session.principal.identity());
            }
        }

        let before = inner.pending_states.len();
        let state_ttl = self.state_ttl;
        inner
            .pending_states
            .retain(|_, pending| now - pending.issued_at <= state_ttl);
        let removed_states = before - inner.pending_states.len();

        if removed_sessions > 0 || removed_states > 0 {
            tracing::info!(
                sessions = removed_sessions,
                states = removed_states,
                "pruned expired session store entries"
            );
        }
    }

    /// Number of live sessions (diagnostics)
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

/// Generate an opaque random token (alphanumeric, cookie-safe)
fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
