//! Auth provider and row store seams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use super::BackendError;

/// Provider metadata attached to a user by the auth service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

/// A signed-in auth session. Consumed for display and for gating only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Auth state change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    SignedOut,
    PasswordRecoveryRequested { email: String },
}

/// Hosted authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, if any.
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError>;

    /// Stream of auth state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Ask the service to mail a reset link that lands on `redirect_to`.
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError>;
}

/// Hosted row store.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn insert(&self, table: &str, record: Value) -> Result<(), BackendError>;
}
