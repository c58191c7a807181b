//! JSON API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::backend::{AuthUser, BackendError};
use crate::chat::ManagerSnapshot;
use crate::contact::{ContactError, ContactForm};
use crate::notify::Notice;
use crate::upgrade::{PaymentForm, UpgradeError, UpgradeOutcome};

// === Errors ===

/// Error response: status code plus a notice body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub notice: Notice,
}

impl ApiError {
    pub fn new(status: StatusCode, title: &str, description: impl Into<String>) -> Self {
        Self {
            status,
            notice: Notice::error(title, description),
        }
    }

    fn backend(title: &str, e: &BackendError) -> Self {
        Self::new(backend_status(e), title, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.notice)).into_response()
    }
}

fn backend_status(e: &BackendError) -> StatusCode {
    match e {
        BackendError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        BackendError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        BackendError::Api { .. } | BackendError::Rejected { .. } | BackendError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl From<UpgradeError> for ApiError {
    fn from(e: UpgradeError) -> Self {
        let status = match &e {
            UpgradeError::MissingField(_) => StatusCode::BAD_REQUEST,
            UpgradeError::NotSignedIn => StatusCode::UNAUTHORIZED,
            UpgradeError::Backend(inner) => backend_status(inner),
            UpgradeError::Receipt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            notice: e.notice(),
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(e: ContactError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            notice: e.notice(),
        }
    }
}

/// Rejects chat API calls without a signed-in session.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.gate.session().await.is_none() {
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Not Signed In",
            "Sign in to use the chat.",
        ));
    }
    Ok(next.run(request).await)
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub session_id: String,
    pub cancelled: usize,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

// === Chat ===

pub async fn get_chat(State(state): State<Arc<AppState>>) -> Json<ManagerSnapshot> {
    Json(state.chat.snapshot().await)
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendRequest>,
) -> Json<ManagerSnapshot> {
    Json(state.chat.send(&req.text).await)
}

pub async fn new_chat(State(state): State<Arc<AppState>>) -> Json<ManagerSnapshot> {
    Json(state.chat.new_chat().await)
}

pub async fn activate_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ManagerSnapshot>, ApiError> {
    state.chat.switch_session(&id).await.map(Json).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "Unknown Session",
            format!("no chat session with id {id}"),
        )
    })
}

pub async fn cancel_replies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<CancelResponse> {
    let cancelled = state.chat.cancel_replies(&id);
    Json(CancelResponse {
        session_id: id,
        cancelled,
    })
}

// === Auth ===

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthUser>, ApiError> {
    let session = state
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| ApiError::backend("Sign In Failed", &e))?;
    Ok(Json(session.user))
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state
        .sign_out()
        .await
        .map_err(|e| ApiError::backend("Sign Out Failed", &e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<Notice>, ApiError> {
    state
        .reset_password(&req.email)
        .await
        .map(Json)
        .map_err(|e| ApiError::backend("Reset Failed", &e))
}

// === Forms ===

pub async fn contact(Json(form): Json<ContactForm>) -> Result<Json<Notice>, ApiError> {
    Ok(Json(form.submit()?))
}

pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    Json(form): Json<PaymentForm>,
) -> Result<Json<UpgradeOutcome>, ApiError> {
    match state.upgrade.submit(&form).await {
        Ok(outcome) => {
            info!(route = "/api/upgrade", "upgrade succeeded");
            Ok(Json(outcome))
        }
        Err(e) => {
            warn!(route = "/api/upgrade", error = %e, "upgrade failed");
            Err(e.into())
        }
    }
}
