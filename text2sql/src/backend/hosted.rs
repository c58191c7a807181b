//! Client for a hosted auth + REST row store service (GoTrue / PostgREST style).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use super::{AuthEvent, AuthProvider, AuthSession, AuthUser, BackendError, RowStore};

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

pub struct HostedBackend {
    base_url: String,
    api_key: String,
    client: Client,
    session: RwLock<Option<AuthSession>>,
    tx: broadcast::Sender<AuthEvent>,
}

impl HostedBackend {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
            session: RwLock::new(None),
            tx,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/auth/v1/token?grant_type=password", self.base_url)
    }

    fn logout_url(&self) -> String {
        format!("{}/auth/v1/logout", self.base_url)
    }

    fn recover_url(&self, redirect_to: &str) -> String {
        format!(
            "{}/auth/v1/recover?redirect_to={}",
            self.base_url,
            urlencoding::encode(redirect_to)
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }

    /// Attach the API key and the best available bearer token.
    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .session
            .read()
            .await
            .as_ref()
            .map_or_else(|| self.api_key.clone(), |s| s.access_token.clone());
        request.header("apikey", &self.api_key).bearer_auth(bearer)
    }
}

/// Turn a non-success response into [`BackendError::Api`].
async fn check(resp: Response) -> Result<Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pull a readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl AuthProvider for HostedBackend {
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
        let resp = self
            .client
            .post(self.token_url())
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let resp = match check(resp).await {
            Err(BackendError::Api { status: 400, .. }) => {
                return Err(BackendError::InvalidCredentials)
            }
            other => other?,
        };
        let token: TokenResponse = resp.json().await?;
        let session = AuthSession {
            access_token: token.access_token,
            user: token.user,
        };

        *self.session.write().await = Some(session.clone());
        info!(user_id = %session.user.id, "signed in");
        let _ = self.tx.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// The local session is dropped before the token is revoked remotely,
    /// so a failed logout call still leaves the user signed out here.
    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        let _ = self.tx.send(AuthEvent::SignedOut);

        let resp = self
            .client
            .post(self.logout_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let resp = self
            .client
            .post(self.recover_url(redirect_to))
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        check(resp).await?;

        let _ = self.tx.send(AuthEvent::PasswordRecoveryRequested {
            email: email.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl RowStore for HostedBackend {
    async fn insert(&self, table: &str, record: Value) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&record);
        let resp = self.authorized(request).await.send().await?;

        check(resp).await.map_err(|e| match e {
            BackendError::Api { message, .. } => BackendError::Rejected {
                table: table.to_string(),
                reason: message,
            },
            other => other,
        })?;
        debug!(table, "row inserted");
        Ok(())
    }
}
