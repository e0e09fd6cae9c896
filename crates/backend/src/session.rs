//! Session primitives and auth-state-change notifications.

use std::pin::Pin;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::broadcast;

use crate::{BackendError, Result};

/// An authenticated session with the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The signed-in user.
    pub user_id: UserId,
    /// Bearer token for backend requests.
    pub access_token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns true once the token's expiry has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Auth state changes pushed by the backend's session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user signed in.
    SignedIn(UserId),
    /// The active user signed out.
    SignedOut,
    /// The active user's profile changed.
    UserUpdated(UserId),
}

/// A stream of auth state changes.
pub type AuthEventStream = Pin<Box<dyn Stream<Item = AuthEvent> + Send>>;

/// Trait for session management against the remote backend.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Returns the current session, or None when signed out.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Terminates the remote session and clears the local token.
    async fn sign_out(&self) -> Result<()>;

    /// Subscribes to auth state changes (sign-in, sign-out, user-updated).
    fn auth_events(&self) -> AuthEventStream;
}

/// Wraps a broadcast subscription into an [`AuthEventStream`], skipping over
/// lagged gaps.
pub(crate) fn subscribe(events: &broadcast::Sender<AuthEvent>) -> AuthEventStream {
    let rx = events.subscribe();
    futures_util::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

#[derive(Debug, Default)]
struct InMemorySessionState {
    session: Option<Session>,
    fail_on_sign_out: bool,
}

/// In-memory session service for testing.
#[derive(Debug, Clone)]
pub struct InMemorySession {
    state: Arc<RwLock<InMemorySessionState>>,
    events: broadcast::Sender<AuthEvent>,
}

impl InMemorySession {
    /// Creates a new signed-out session service.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(RwLock::new(InMemorySessionState::default())),
            events,
        }
    }

    /// Signs in a user with a fresh one-hour token and emits `SignedIn`.
    pub fn sign_in(&self, user_id: UserId) {
        let session = Session {
            user_id,
            access_token: format!("token-{}", uuid::Uuid::new_v4().simple()),
            expires_at: Utc::now() + Duration::hours(1),
        };
        self.state.write().unwrap().session = Some(session);
        let _ = self.events.send(AuthEvent::SignedIn(user_id));
    }

    /// Marks the current session's token as already expired.
    pub fn expire_session(&self) {
        if let Some(session) = self.state.write().unwrap().session.as_mut() {
            session.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    /// Configures the service to fail on the next sign-out call.
    pub fn set_fail_on_sign_out(&self, fail: bool) {
        self.state.write().unwrap().fail_on_sign_out = fail;
    }

    /// Returns true while a session is held.
    pub fn is_signed_in(&self) -> bool {
        self.state.read().unwrap().session.is_some()
    }
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionApi for InMemorySession {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.state.read().unwrap().session.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        {
            let mut state = self.state.write().unwrap();
            if state.fail_on_sign_out {
                return Err(BackendError::Network(
                    "simulated sign-out failure".to_string(),
                ));
            }
            state.session = None;
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    fn auth_events(&self) -> AuthEventStream {
        subscribe(&self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_then_out_roundtrip() {
        let sessions = InMemorySession::new();
        assert!(sessions.current_session().await.unwrap().is_none());

        let user = UserId::new();
        sessions.sign_in(user);

        let session = sessions.current_session().await.unwrap().unwrap();
        assert_eq!(session.user_id, user);
        assert!(!session.is_expired(Utc::now()));

        sessions.sign_out().await.unwrap();
        assert!(sessions.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn auth_events_are_delivered_in_order() {
        let sessions = InMemorySession::new();
        let mut events = sessions.auth_events();

        let user = UserId::new();
        sessions.sign_in(user);
        sessions.sign_out().await.unwrap();

        assert_eq!(events.next().await, Some(AuthEvent::SignedIn(user)));
        assert_eq!(events.next().await, Some(AuthEvent::SignedOut));
    }

    #[tokio::test]
    async fn expired_session_reports_expired() {
        let sessions = InMemorySession::new();
        sessions.sign_in(UserId::new());
        sessions.expire_session();

        let session = sessions.current_session().await.unwrap().unwrap();
        assert!(session.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn failed_sign_out_keeps_session() {
        let sessions = InMemorySession::new();
        sessions.sign_in(UserId::new());
        sessions.set_fail_on_sign_out(true);

        assert!(sessions.sign_out().await.is_err());
        assert!(sessions.is_signed_in());
    }
}
