//! Auth-state route gating.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::{AuthEvent, AuthProvider, AuthSession};

/// Route for signed-out visitors.
pub const SIGN_IN_ROUTE: &str = "/auth";
/// Landing route once signed in.
pub const SIGNED_IN_ROUTE: &str = "/chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Initial session lookup has not finished.
    Loading,
    SignedOut,
    SignedIn(AuthSession),
}

/// What a page handler should do for the current auth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow(Option<AuthSession>),
    Loading,
    Redirect(&'static str),
}

/// Tracks the auth state that page routes are gated on.
pub struct AuthGate {
    state: RwLock<AuthState>,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthGate {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AuthState::Loading),
        }
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn set(&self, state: AuthState) {
        *self.state.write().await = state;
    }

    /// Re-read the session from the provider. Lookup failures count as signed out.
    pub async fn refresh(&self, auth: &dyn AuthProvider) {
        let state = match auth.get_session().await {
            Ok(Some(session)) => AuthState::SignedIn(session),
            Ok(None) => AuthState::SignedOut,
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                AuthState::SignedOut
            }
        };
        self.set(state).await;
    }

    pub async fn apply(&self, event: &AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => self.set(AuthState::SignedIn(session.clone())).await,
            AuthEvent::SignedOut => self.set(AuthState::SignedOut).await,
            AuthEvent::PasswordRecoveryRequested { .. } => {}
        }
    }

    /// Resolve the initial state, then follow provider events until the stream closes.
    pub fn watch(self: Arc<Self>, auth: Arc<dyn AuthProvider>) -> JoinHandle<()> {
        // Subscribe before the lookup so no event is missed in between.
        let mut rx = auth.subscribe();
        tokio::spawn(async move {
            self.refresh(auth.as_ref()).await;
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        debug!("auth state changed");
                        self.apply(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "auth events lagged, refreshing");
                        self.refresh(auth.as_ref()).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Access for `/chat` and `/upgrade`.
    pub async fn protected(&self) -> Access {
        match self.state().await {
            AuthState::Loading => Access::Loading,
            AuthState::SignedOut => Access::Redirect(SIGN_IN_ROUTE),
            AuthState::SignedIn(session) => Access::Allow(Some(session)),
        }
    }

    /// Access for `/auth`, which signed-in users skip.
    pub async fn sign_in_page(&self) -> Access {
        match self.state().await {
            AuthState::Loading => Access::Loading,
            AuthState::SignedOut => Access::Allow(None),
            AuthState::SignedIn(_) => Access::Redirect(SIGNED_IN_ROUTE),
        }
    }

    pub async fn session(&self) -> Option<AuthSession> {
        match self.state().await {
            AuthState::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}
