//! In-process backend used when no hosted service is configured.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use uuid::Uuid;

use super::{AppMetadata, AuthEvent, AuthProvider, AuthSession, AuthUser, BackendError, RowStore};

struct Account {
    password: String,
    user: AuthUser,
}

/// Auth provider and row store backed by process memory.
pub struct MemoryBackend {
    accounts: RwLock<HashMap<String, Account>>,
    session: RwLock<Option<AuthSession>>,
    rows: Mutex<Vec<(String, Value)>>,
    reject_inserts: Mutex<Option<String>>,
    tx: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            accounts: RwLock::new(HashMap::new()),
            session: RwLock::new(None),
            rows: Mutex::new(Vec::new()),
            reject_inserts: Mutex::new(None),
            tx,
        }
    }

    /// Register an email/password account.
    pub async fn add_user(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::now_v7().to_string(),
            email: Some(email.to_string()),
            app_metadata: AppMetadata {
                provider: Some("email".to_string()),
            },
        };
        self.accounts.write().await.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Make every following insert fail with `reason`.
    #[cfg(test)]
    pub fn reject_inserts(&self, reason: impl Into<String>) {
        *self
            .reject_inserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    /// Rows inserted into `table`, in insertion order.
    #[cfg(test)]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(t, _)| t == table)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

fn access_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError> {
        Ok(self.session.read().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&email.trim().to_lowercase())
            .filter(|a| a.password == password)
            .ok_or(BackendError::InvalidCredentials)?;

        let session = AuthSession {
            access_token: access_token(),
            user: account.user.clone(),
        };
        *self.session.write().await = Some(session.clone());
        info!(user_id = %session.user.id, "signed in");
        let _ = self.tx.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.session.write().await.take().is_some() {
            let _ = self.tx.send(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(BackendError::InvalidInput(format!("not an email: {email}")));
        }
        info!(email, redirect_to, "password reset requested");
        let _ = self.tx.send(AuthEvent::PasswordRecoveryRequested {
            email: email.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl RowStore for MemoryBackend {
    async fn insert(&self, table: &str, record: Value) -> Result<(), BackendError> {
        if let Some(reason) = self
            .reject_inserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(BackendError::Rejected {
                table: table.to_string(),
                reason,
            });
        }
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((table.to_string(), record));
        Ok(())
    }
}
