//! Text2SQL server - serves the site and the chat API from one process.
//!
//! Endpoints:
//! - GET / - Landing page
//! - GET|POST /auth, POST /auth/reset, POST /auth/sign-out - Sign in
//! - GET|POST /contact - Sales contact form
//! - GET /chat, POST /chat/send, /chat/new, /chat/sessions/{id} - Chat UI (signed in)
//! - GET|POST /upgrade - Pro upgrade (signed in)
//! - GET /api/chat - Manager snapshot
//! - POST /api/chat/messages, /api/chat/new - Send, start a new chat
//! - POST /api/chat/sessions/{id}/activate, /api/chat/sessions/{id}/cancel
//! - POST /api/auth/sign-in, /api/auth/sign-out, /api/auth/reset-password
//! - POST /api/contact, /api/upgrade
//! - WS /ws - Chat events in real time

mod api;
mod gate;
mod pages;
mod site;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::backend::{AuthSession, Backend, BackendError, MemoryBackend};
use crate::chat::{ChatService, ChatSessionManager, StubResponder};
use crate::config::AppConfig;
use crate::notify::Notice;
use crate::upgrade::UpgradeFlow;
use gate::{AuthGate, AuthState};

/// Shared server state.
pub struct AppState {
    pub config: AppConfig,
    pub chat: ChatService,
    pub backend: Backend,
    pub upgrade: UpgradeFlow,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Backend) -> Self {
        let chat = ChatService::new(
            ChatSessionManager::new(),
            Arc::new(StubResponder::new(config.reply_delay)),
        );
        let upgrade = UpgradeFlow::new(
            backend.clone(),
            config.processing_delay,
            config.receipt_dir.clone(),
        );
        Self {
            config,
            chat,
            backend,
            upgrade,
            gate: Arc::new(AuthGate::new()),
        }
    }

    /// Sign in and update the gate without waiting for the provider event.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let session = self
            .backend
            .auth
            .sign_in_with_password(email.trim(), password)
            .await?;
        self.gate.set(AuthState::SignedIn(session.clone())).await;
        Ok(session)
    }

    /// Sign out locally even when the provider reports an error.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let result = self.backend.auth.sign_out().await;
        self.gate.set(AuthState::SignedOut).await;
        result
    }

    /// Request a reset mail whose link lands on the chat page.
    pub async fn reset_password(&self, email: &str) -> Result<Notice, BackendError> {
        let redirect_to = format!("{}{}", self.config.site_url(), gate::SIGNED_IN_ROUTE);
        self.backend
            .auth
            .reset_password_for_email(email.trim(), &redirect_to)
            .await?;
        Ok(Notice::success(
            "Check your email",
            "We sent you a link to reset your password.",
        ))
    }
}

/// Build the backend named by `config`. Without a hosted service, an
/// in-memory backend holding only the demo account is used.
pub async fn backend_for(config: &AppConfig) -> Backend {
    match &config.backend {
        Some(hosted) => Backend::hosted(&hosted.url, &hosted.key),
        None => {
            let memory = Arc::new(MemoryBackend::new());
            let demo = &config.demo_account;
            memory.add_user(&demo.email, &demo.password).await;
            Backend::memory(memory)
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let chat_api = Router::new()
        .route("/api/chat", get(api::get_chat))
        .route("/api/chat/messages", post(api::send_message))
        .route("/api/chat/new", post(api::new_chat))
        .route(
            "/api/chat/sessions/{id}/activate",
            post(api::activate_session),
        )
        .route("/api/chat/sessions/{id}/cancel", post(api::cancel_replies))
        .route("/ws", get(websocket_handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            api::require_session,
        ));

    Router::new()
        .route("/", get(site::index))
        .route("/auth", get(site::auth_page).post(site::sign_in))
        .route("/auth/reset", post(site::reset_password))
        .route("/auth/sign-out", post(site::sign_out))
        .route("/contact", get(site::contact_page).post(site::contact))
        .route("/chat", get(site::chat_page))
        .route("/chat/send", post(site::send_message))
        .route("/chat/new", post(site::new_chat))
        .route("/chat/sessions/{id}", post(site::switch_session))
        .route("/upgrade", get(site::upgrade_page).post(site::upgrade))
        .route("/api/auth/sign-in", post(api::sign_in))
        .route("/api/auth/sign-out", post(api::sign_out))
        .route("/api/auth/reset-password", post(api::reset_password))
        .route("/api/contact", post(api::contact))
        .route("/api/upgrade", post(api::upgrade))
        .merge(chat_api)
        .fallback(site::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Server Lifecycle ===

/// Start the server.
pub async fn start_server(config: AppConfig) -> Result<()> {
    let backend = backend_for(&config).await;
    let port = config.port;
    let open_browser = config.open_browser;
    let state = Arc::new(AppState::new(config, backend));

    let _watcher = Arc::clone(&state.gate).watch(Arc::clone(&state.backend.auth));
    let app = build_router(Arc::clone(&state));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, hosted = state.config.backend.is_some(), "server listening");
    println!("Text2SQL server starting on http://{addr}");
    if state.config.backend.is_none() {
        println!(
            "Using in-memory backend; sign in as {} / {}",
            state.config.demo_account.email, state.config.demo_account.password
        );
    }

    if open_browser {
        let _ = open::that(format!("http://{addr}"));
    }

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// === WebSocket ===

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(mut socket: axum::extract::ws::WebSocket, state: Arc<AppState>) {
    use axum::extract::ws::Message;
    use tokio_stream::{wrappers::BroadcastStream, StreamExt};

    let mut events = BroadcastStream::new(state.chat.subscribe());

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "websocket client lagged");
                continue;
            }
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if socket.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AuthEvent, AuthProvider};
    use crate::config::{DEMO_EMAIL, DEMO_PASSWORD};

    #[tokio::test]
    async fn test_sign_in_updates_gate() {
        let memory = Arc::new(MemoryBackend::new());
        memory.add_user("jane@example.com", "pw").await;
        let state = AppState::new(AppConfig::default(), Backend::memory(memory));

        state.sign_in(" jane@example.com ", "pw").await.unwrap();
        assert!(state.gate.session().await.is_some());

        state.sign_out().await.unwrap();
        assert_eq!(state.gate.state().await, AuthState::SignedOut);
    }

    /// Auth provider whose logout call always fails.
    struct FailingLogout(tokio::sync::broadcast::Sender<AuthEvent>);

    #[async_trait::async_trait]
    impl AuthProvider for FailingLogout {
        async fn get_session(&self) -> Result<Option<AuthSession>, BackendError> {
            Ok(None)
        }

        fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AuthEvent> {
            self.0.subscribe()
        }

        async fn sign_in_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<AuthSession, BackendError> {
            Err(BackendError::InvalidCredentials)
        }

        async fn sign_out(&self) -> Result<(), BackendError> {
            Err(BackendError::Api {
                status: 503,
                message: "unavailable".into(),
            })
        }

        async fn reset_password_for_email(
            &self,
            _email: &str,
            _redirect_to: &str,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_sign_out_still_closes_gate() {
        let mut backend = Backend::memory(Arc::new(MemoryBackend::new()));
        backend.auth = Arc::new(FailingLogout(tokio::sync::broadcast::channel(4).0));
        let state = AppState::new(AppConfig::default(), backend);
        state
            .gate
            .set(AuthState::SignedIn(AuthSession {
                access_token: "token".into(),
                user: serde_json::from_value(serde_json::json!({ "id": "u1" })).unwrap(),
            }))
            .await;

        assert!(state.sign_out().await.is_err());
        assert_eq!(state.gate.state().await, AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_reset_password_notice() {
        let state = AppState::new(
            AppConfig::default(),
            Backend::memory(Arc::new(MemoryBackend::new())),
        );

        let notice = state.reset_password("jane@example.com").await.unwrap();
        assert_eq!(notice.title, "Check your email");
        assert!(state.reset_password("not-an-email").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_backend_has_demo_account() {
        let config = AppConfig::default();
        let backend = backend_for(&config).await;

        let session = backend
            .auth
            .sign_in_with_password(DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        assert_eq!(session.user.email.as_deref(), Some(DEMO_EMAIL));
    }
}
